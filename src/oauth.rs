//! OAuth 2.0 plumbing for YouTube API authentication.
//!
//! Covers the three exchanges this crate performs against Google's
//! authorization server: the interactive authorization-code flow (with PKCE
//! and a loopback redirect server), and the refresh-token exchange for
//! expired cached credentials. The interactive flow hides behind the
//! [`AuthorizationFlow`] trait so tests can substitute a fake.

use crate::credentials::Credential;
use eyre::Context;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::service::service_fn;
use hyper::{Request, Response, body};
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge, RedirectUrl,
    RefreshToken, Scope, TokenUrl, reqwest,
};
use serde::Deserialize;
use std::future::Future;
use std::path::Path;

/// Google OAuth2 authorization endpoint, used when the client secrets file
/// does not name one.
const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google OAuth2 token endpoint, used for both the code exchange and refresh.
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Scope requested during authorization. Live-stream lookups need the
/// `force-ssl` scope.
const SCOPE: &str = "https://www.googleapis.com/auth/youtube.force-ssl";

/// Page shown in the user's browser once the redirect has been captured.
const AUTHORIZATION_DONE_HTML: &str = "<!DOCTYPE html>\n<html>\n<body>\n\
    <p>Authorization complete. You can close this tab and return to the terminal.</p>\n\
    </body>\n</html>\n";

/// OAuth client configuration from the Google API Console.
///
/// Matches the `client_secrets.json` layout for installed applications; the
/// endpoint URLs are optional there and default to Google's.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    AUTH_URL.to_string()
}

fn default_token_uri() -> String {
    TOKEN_URL.to_string()
}

/// Wrapper object in `client_secrets.json`; Google nests the configuration
/// under `installed` (desktop apps) or `web`.
#[derive(Deserialize)]
struct ClientSecretsFile {
    #[serde(alias = "web")]
    installed: ClientSecrets,
}

impl ClientSecrets {
    /// Reads a `client_secrets.json` file as downloaded from the Google API
    /// Console.
    pub async fn from_file(path: &Path) -> eyre::Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("read client secrets file {}", path.display()))?;
        let file: ClientSecretsFile =
            serde_json::from_slice(&bytes).context("parse client secrets file")?;
        Ok(file.installed)
    }
}

/// An interactive authorization capability.
///
/// The credential store only ever invokes this once it has ruled out the
/// cached and refreshed alternatives; implementations may block for as long
/// as the user takes to finish authorizing.
pub trait AuthorizationFlow {
    /// Runs the flow to completion and returns the issued credential.
    async fn run(&self) -> eyre::Result<Credential>;
}

/// The authorization-code flow for installed applications.
///
/// Opens the user's browser at the authorization endpoint, captures the
/// redirect on a loopback HTTP server bound to an ephemeral port, and
/// exchanges the authorization code (with PKCE) for tokens.
#[derive(Debug, Clone)]
pub struct InstalledFlow {
    secrets: ClientSecrets,
}

impl InstalledFlow {
    pub fn new(secrets: ClientSecrets) -> Self {
        Self { secrets }
    }

    /// Binds the loopback redirect server and returns the redirect URL
    /// together with a future resolving to the authorization code once the
    /// browser hits it.
    ///
    /// The server accepts a single connection, verifies the `state` parameter
    /// against the CSRF token, and shuts down gracefully after responding.
    async fn bind_redirect_server(
        &self,
        csrf: CsrfToken,
    ) -> eyre::Result<(
        RedirectUrl,
        impl Future<Output = eyre::Result<AuthorizationCode>>,
    )> {
        let socket = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind loopback redirect server")?;
        let addr = socket.local_addr().context("get local address")?;
        let url = RedirectUrl::new(format!("http://{}:{}", addr.ip(), addr.port()))
            .context("construct redirect url")?;

        let (tx, rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            let r = async move {
                let (conn, _) = socket.accept().await.context("accept redirect connection")?;
                let conn = hyper_util::rt::TokioIo::new(conn);
                let (got, mut gotten) = tokio::sync::mpsc::channel(1);
                let service = service_fn(move |req: Request<body::Incoming>| {
                    let csrf = csrf.clone();
                    let got = got.clone();
                    async move {
                        let mut state = None;
                        let mut code = None;
                        for (k, v) in
                            form_urlencoded::parse(req.uri().query().unwrap_or("").as_bytes())
                        {
                            match &*k {
                                "state" => state = Some(v),
                                "code" => code = Some(v),
                                _ => {}
                            }
                        }
                        if state.as_deref() != Some(csrf.secret().as_str()) {
                            return Err("invalid csrf token");
                        }
                        let Some(code) = code else {
                            return Err("no authorization code found");
                        };
                        let code = AuthorizationCode::new(code.into_owned());
                        got.send(code)
                            .await
                            .expect("channel won't be closed until server exit");
                        Ok(Response::new(Full::<Bytes>::from(AUTHORIZATION_DONE_HTML)))
                    }
                });
                let mut serve = std::pin::pin!(
                    hyper::server::conn::http1::Builder::new().serve_connection(conn, service)
                );

                tokio::select! {
                    exit = &mut serve => {
                        if let Err(e) = exit {
                            Err(e).context("redirect server got bad request")
                        } else {
                            eyre::bail!("redirect server exited before delivering a code");
                        }
                    }
                    code = gotten.recv() => {
                        serve.graceful_shutdown();
                        let code = code.expect("channel won't be closed until service_fn is dropped");
                        Ok(code)
                    }
                }
            };
            let _ = tx.send(r.await);
        });
        Ok((url, async move {
            rx.await.context("redirect future dropped prematurely")?
        }))
    }
}

impl AuthorizationFlow for InstalledFlow {
    async fn run(&self) -> eyre::Result<Credential> {
        // The CSRF token is never re-used; the flow runs exactly once.
        let csrf = CsrfToken::new_random();
        let (redirect_url, eventually_authorization_code) = self
            .bind_redirect_server(csrf.clone())
            .await
            .context("set up redirect endpoint")?;

        let auth_url =
            AuthUrl::new(self.secrets.auth_uri.clone()).context("invalid authorization endpoint URL")?;
        let token_url =
            TokenUrl::new(self.secrets.token_uri.clone()).context("invalid token endpoint URL")?;
        let client = BasicClient::new(ClientId::new(self.secrets.client_id.clone()))
            .set_client_secret(ClientSecret::new(self.secrets.client_secret.clone()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url);

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (auth_url, _csrf_token) = client
            .authorize_url(move || csrf.clone())
            .add_scope(Scope::new(SCOPE.to_string()))
            .set_pkce_challenge(pkce_challenge)
            .url();

        tracing::info!(url = %auth_url, "asking user to follow OAuth flow");
        webbrowser::open(auth_url.as_ref()).context("open user's browser")?;
        let authorization_code = eventually_authorization_code
            .await
            .context("await user authorization code")?;

        let token = client
            .exchange_code(authorization_code)
            .set_pkce_verifier(pkce_verifier)
            .request_async(&token_exchange_client())
            .await
            .context("exchange authorization code for access token")?;

        Ok(Credential::from_token_response(
            &token,
            &self.secrets.client_id,
            &self.secrets.client_secret,
            &self.secrets.token_uri,
        ))
    }
}

/// Exchanges a credential's refresh token for a fresh access token.
///
/// The exchange runs against the token endpoint recorded in the credential
/// itself, so it works without the client secrets file. Some servers omit the
/// refresh token from the response; the old one is carried over so the
/// credential stays refreshable.
pub(crate) async fn refresh(credential: &Credential) -> eyre::Result<Credential> {
    let refresh_token = credential
        .refresh_token
        .clone()
        .ok_or_else(|| eyre::eyre!("credential has no refresh token"))?;

    tracing::debug!("attempting to refresh OAuth token");

    // Minimal client: refresh needs only the token endpoint.
    let client = BasicClient::new(ClientId::new(credential.client_id.clone()))
        .set_client_secret(ClientSecret::new(credential.client_secret.clone()))
        .set_token_uri(
            TokenUrl::new(credential.token_uri.clone()).context("invalid token endpoint URL")?,
        );

    let token = match client
        .exchange_refresh_token(&RefreshToken::new(refresh_token))
        .request_async(&token_exchange_client())
        .await
    {
        Ok(token) => token,
        Err(e @ oauth2::RequestTokenError::ServerResponse(_)) => {
            tracing::warn!("authorization server rejected refresh token: {}", e);
            return Err(e).context("exchange refresh token");
        }
        Err(e) => return Err(e).context("exchange refresh token"),
    };

    let mut refreshed = Credential::from_token_response(
        &token,
        &credential.client_id,
        &credential.client_secret,
        &credential.token_uri,
    );
    if refreshed.refresh_token.is_none() {
        tracing::trace!("refresh response lacks refresh token, preserving original");
        refreshed.refresh_token = credential.refresh_token.clone();
    }
    tracing::debug!("successfully refreshed OAuth token");
    Ok(refreshed)
}

/// HTTP client for token-endpoint exchanges.
fn token_exchange_client() -> reqwest::Client {
    reqwest::ClientBuilder::new()
        // SSRF no thank you.
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("building reqwest client should not fail")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn client_secrets_parse_with_endpoint_defaults() {
        let json = r#"{
            "installed": {
                "client_id": "id.apps.googleusercontent.com",
                "client_secret": "shhh",
                "project_id": "some-project",
                "redirect_uris": ["http://localhost"]
            }
        }"#;
        let file: ClientSecretsFile = serde_json::from_str(json).unwrap();
        let secrets = file.installed;
        assert_eq!(secrets.client_id, "id.apps.googleusercontent.com");
        assert_eq!(secrets.client_secret, "shhh");
        assert_eq!(secrets.auth_uri, AUTH_URL);
        assert_eq!(secrets.token_uri, TOKEN_URL);
    }

    #[test]
    fn client_secrets_accept_web_applications() {
        let json = r#"{
            "web": {
                "client_id": "id",
                "client_secret": "shhh",
                "auth_uri": "https://example.com/auth",
                "token_uri": "https://example.com/token"
            }
        }"#;
        let file: ClientSecretsFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.installed.auth_uri, "https://example.com/auth");
        assert_eq!(file.installed.token_uri, "https://example.com/token");
    }
}
