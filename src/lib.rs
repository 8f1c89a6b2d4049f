//! Remote control for YouTube Live: authenticate against the YouTube Data
//! API with cached OAuth credentials and resolve ingestion stream names to
//! `liveStream` ids.
//!
//! The pieces compose in one direction: a [`CredentialStore`] produces a
//! valid [`Credential`] (from cache, by refresh, or by running an
//! [`AuthorizationFlow`]), and a [`YouTubeClient`] built from it serves
//! lookups and listings. [`setup_youtube_client`] wires the three together
//! the way the CLI does.

use std::path::{Path, PathBuf};

pub mod credentials;
pub mod oauth;
pub mod youtube_api;

pub use credentials::{AuthError, Credential, CredentialStore};
pub use oauth::{AuthorizationFlow, ClientSecrets, InstalledFlow};
pub use youtube_api::{StreamNotFound, YouTubeClient};

/// Acquires a credential and builds an authenticated [`YouTubeClient`].
///
/// `secrets_file` enables the interactive authorization fallback; without it,
/// only a cached (possibly refreshed) credential can succeed. `token_file`
/// overrides the default cache location
/// ([`credentials::default_cache_path`]).
pub async fn setup_youtube_client(
    secrets_file: Option<&Path>,
    token_file: Option<PathBuf>,
) -> eyre::Result<YouTubeClient> {
    let store = CredentialStore::new(token_file)?;

    let credential = match secrets_file {
        Some(path) => {
            let secrets = ClientSecrets::from_file(path).await?;
            let flow = InstalledFlow::new(secrets);
            store.acquire(Some(&flow)).await?
        }
        None => store.acquire(None::<&InstalledFlow>).await?,
    };

    Ok(YouTubeClient::new(credential))
}
