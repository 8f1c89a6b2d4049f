use clap::{Parser, Subcommand};
use eyre::Context;
use std::io::IsTerminal;
use std::path::PathBuf;
use tokio_stream::StreamExt;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use youtube_remote::setup_youtube_client;

#[derive(Debug, Parser)]
#[command(version, about = "Resolve and inspect YouTube live streams for the authenticated user")]
struct Args {
    /// OAuth client secrets file from Google API Console
    #[arg(short = 'S', long, value_name = "FILE")]
    client_secret: Option<PathBuf>,

    /// OAuth token cache
    #[arg(short = 'T', long, value_name = "FILE")]
    token: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve an ingestion stream name to its stream id
    Resolve {
        /// The stream name as configured in the encoder
        name: String,
    },
    /// List the authenticated user's live streams
    Streams,
    /// List the authenticated user's live broadcasts
    Broadcasts,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    let args = Args::parse();
    let yt = setup_youtube_client(args.client_secret.as_deref(), args.token)
        .await
        .context("set up authenticated YouTube client")?;

    match args.command {
        Command::Resolve { name } => {
            let id = yt.stream_id(&name).await?;
            println!("{id}");
        }
        Command::Streams => {
            let streams = yt.list_my_live_streams();
            let mut streams = std::pin::pin!(streams);
            while let Some(stream) = streams.next().await {
                let stream = stream.context("fetch live stream")?;
                let title = stream
                    .snippet
                    .map(|s| s.title)
                    .unwrap_or_else(|| "(untitled)".to_string());
                println!(
                    "{}\t{}\t{}",
                    stream.id, stream.cdn.ingestion_info.stream_name, title
                );
            }
        }
        Command::Broadcasts => {
            let broadcasts = yt.list_my_live_broadcasts();
            let mut broadcasts = std::pin::pin!(broadcasts);
            while let Some(broadcast) = broadcasts.next().await {
                let broadcast = broadcast.context("fetch broadcast")?;
                println!(
                    "{}\t{}\t{}",
                    broadcast.id, broadcast.status.life_cycle_status, broadcast.snippet.title
                );
            }
        }
    }

    Ok(())
}
