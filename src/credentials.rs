//! Credential caching and acquisition.
//!
//! This module owns the on-disk credential cache and the precedence order for
//! producing a usable credential: reuse a valid cached one, refresh an expired
//! one, or fall back to an interactive authorization flow. Whatever it hands
//! out has been persisted back to the cache with owner-only permissions.

use crate::oauth::{self, AuthorizationFlow};
use jiff::{SignedDuration, Timestamp};
use oauth2::TokenResponse;
use oauth2::basic::BasicTokenResponse;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// File name of the credential cache inside the user's cache directory.
pub const CACHE_FILE_NAME: &str = "youtube-remote.json";

/// Safety buffer subtracted from the advertised token lifetime so a credential
/// is treated as expired slightly before the server would reject it.
const EXPIRY_BUFFER: SignedDuration = SignedDuration::from_secs(300);

/// Conservative lifetime assumed when the token response carries no
/// `expires_in` field (one hour minus the safety buffer).
const FALLBACK_LIFETIME: SignedDuration = SignedDuration::from_secs(3300);

/// Errors that mean no valid credential could be produced.
///
/// These are always fatal to the current operation; nothing in this module
/// retries or silently re-authorizes.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The cache file exists but does not hold a credential we wrote.
    #[error("credential cache at {path} is corrupt")]
    CorruptCache {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// The cache file exists but could not be read.
    #[error("failed to read credential cache at {path}")]
    ReadCache {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The refreshed or newly issued credential could not be persisted.
    #[error("failed to write credential cache at {path}")]
    WriteCache {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The refresh token exchange failed (network error or server rejection).
    #[error("failed to refresh expired credential")]
    Refresh(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// Re-authorization is required but no terminal is attached.
    #[error("invalid OAuth credentials in non-interactive mode")]
    NonInteractive,
    /// Re-authorization is required but no client secrets were supplied.
    #[error("client secrets file required (-S)")]
    MissingClientSecrets,
    /// The interactive authorization flow itself failed.
    #[error("interactive authorization flow failed")]
    Flow(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// A bearer-token credential for the YouTube API, together with everything
/// needed to refresh it without re-reading the client secrets file.
///
/// The refresh context (client id, client secret, token endpoint) travels
/// inside the serialized blob, so a cached credential remains refreshable in
/// later invocations that were given no `-S` flag.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// When the access token stops being usable (already includes the safety
    /// buffer). `None` means the server advertised no expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<Timestamp>,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub client_id: String,
    pub client_secret: String,
    pub token_uri: String,
}

impl Credential {
    /// Builds a credential from a token endpoint response.
    ///
    /// The expiry is derived from the response's `expires_in` minus
    /// [`EXPIRY_BUFFER`]; granted scopes are recorded when the server echoes
    /// them back.
    pub(crate) fn from_token_response(
        token: &BasicTokenResponse,
        client_id: &str,
        client_secret: &str,
        token_uri: &str,
    ) -> Self {
        let now = Timestamp::now();
        let expiry = match token.expires_in() {
            Some(expires_in) => {
                now + SignedDuration::from_secs(expires_in.as_secs() as i64) - EXPIRY_BUFFER
            }
            None => now + FALLBACK_LIFETIME,
        };
        Self {
            access_token: token.access_token().secret().clone(),
            refresh_token: token.refresh_token().map(|t| t.secret().clone()),
            expiry: Some(expiry),
            scopes: token
                .scopes()
                .map(|scopes| scopes.iter().map(|s| s.to_string()).collect())
                .unwrap_or_default(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            token_uri: token_uri.to_string(),
        }
    }

    /// Whether the access token is past its (buffered) expiry.
    pub fn expired(&self) -> bool {
        self.expiry.is_some_and(|expiry| Timestamp::now() >= expiry)
    }

    /// A credential is valid when it carries an access token that has not
    /// expired. Revocation only surfaces once the API rejects the token.
    pub fn is_valid(&self) -> bool {
        !self.access_token.is_empty() && !self.expired()
    }
}

// Token and client secrets stay out of debug output.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[redacted]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[redacted]"))
            .field("expiry", &self.expiry)
            .field("scopes", &self.scopes)
            .field("client_id", &self.client_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

/// Default location of the credential cache:
/// `${XDG_CACHE_HOME:-$HOME/.cache}/youtube-remote.json`.
pub fn default_cache_path() -> eyre::Result<PathBuf> {
    dirs::cache_dir()
        .map(|dir| dir.join(CACHE_FILE_NAME))
        .ok_or_else(|| eyre::eyre!("no cache directory (neither XDG_CACHE_HOME nor HOME is set)"))
}

/// Loads, refreshes, or interactively acquires a credential, keeping the
/// on-disk cache in sync.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    cache_path: PathBuf,
    interactive: bool,
}

impl CredentialStore {
    /// Creates a store over `cache_path`, or over [`default_cache_path`] when
    /// none is given.
    ///
    /// Interactivity defaults to whether stdin is attached to a terminal;
    /// override it with [`Self::interactive`].
    pub fn new(cache_path: Option<PathBuf>) -> eyre::Result<Self> {
        let cache_path = match cache_path {
            Some(path) => path,
            None => default_cache_path()?,
        };
        Ok(Self {
            cache_path,
            interactive: std::io::stdin().is_terminal(),
        })
    }

    /// Overrides the interactivity detection, mainly for embedders that know
    /// no user is present.
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Produces a valid credential, trying in order: the cached credential
    /// as-is, a refresh exchange for an expired one, and finally the supplied
    /// interactive flow.
    ///
    /// A valid cached credential is returned without touching the network or
    /// the cache file. Credentials obtained by refresh or by running `flow`
    /// are persisted (owner-only permissions) before being returned. Pass
    /// `flow = None` when no client secrets were supplied; reaching the
    /// interactive branch then fails with [`AuthError::MissingClientSecrets`].
    pub async fn acquire(
        &self,
        flow: Option<&impl AuthorizationFlow>,
    ) -> Result<Credential, AuthError> {
        let cached = self.load_cached().await?;

        if let Some(credential) = &cached {
            if credential.is_valid() {
                tracing::debug!(path = %self.cache_path.display(), "using cached credential");
                return Ok(credential.clone());
            }
        }

        let credential = match cached {
            Some(credential) if credential.expired() && credential.refresh_token.is_some() => {
                tracing::info!("cached credential expired, refreshing");
                oauth::refresh(&credential)
                    .await
                    .map_err(|e| AuthError::Refresh(e.into()))?
            }
            _ => {
                // No cached credential worth refreshing; only an interactive
                // authorization can help, and only when a user is attached.
                if !self.interactive {
                    return Err(AuthError::NonInteractive);
                }
                let Some(flow) = flow else {
                    return Err(AuthError::MissingClientSecrets);
                };
                tracing::info!("starting interactive authorization flow");
                flow.run().await.map_err(|e| AuthError::Flow(e.into()))?
            }
        };

        self.persist(&credential).await?;
        Ok(credential)
    }

    async fn load_cached(&self) -> Result<Option<Credential>, AuthError> {
        match tokio::fs::read(&self.cache_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|source| {
                AuthError::CorruptCache {
                    path: self.cache_path.clone(),
                    source,
                }
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(AuthError::ReadCache {
                path: self.cache_path.clone(),
                source,
            }),
        }
    }

    /// Writes the credential to the cache file with owner-only permissions
    /// established before any credential bytes hit the disk.
    async fn persist(&self, credential: &Credential) -> Result<(), AuthError> {
        let write_err = |source| AuthError::WriteCache {
            path: self.cache_path.clone(),
            source,
        };

        if let Some(parent) = self.cache_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let json = serde_json::to_vec(credential).expect("credentials always serialize");

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options.open(&self.cache_path).await.map_err(write_err)?;
        file.write_all(&json).await.map_err(write_err)?;
        file.flush().await.map_err(write_err)?;

        // The mode above only applies on creation; clamp a pre-existing file
        // that may have been created with looser permissions.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&self.cache_path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(write_err)?;
        }

        tracing::debug!(path = %self.cache_path.display(), "persisted credential");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Flow stand-in for cases where the interactive branch must not run.
    struct PanicFlow;

    impl AuthorizationFlow for PanicFlow {
        async fn run(&self) -> eyre::Result<Credential> {
            panic!("authorization flow must not run");
        }
    }

    /// Flow stand-in that hands back a fixed credential.
    struct StaticFlow(Credential);

    impl AuthorizationFlow for StaticFlow {
        async fn run(&self) -> eyre::Result<Credential> {
            Ok(self.0.clone())
        }
    }

    fn credential(expiry: Option<Timestamp>) -> Credential {
        Credential {
            access_token: "atoken".to_string(),
            refresh_token: Some("rtoken".to_string()),
            expiry,
            scopes: vec!["https://www.googleapis.com/auth/youtube.force-ssl".to_string()],
            client_id: "cid".to_string(),
            client_secret: "csecret".to_string(),
            token_uri: "https://oauth2.example/token".to_string(),
        }
    }

    fn in_one_hour() -> Timestamp {
        Timestamp::now() + SignedDuration::from_secs(3600)
    }

    fn one_hour_ago() -> Timestamp {
        Timestamp::now() - SignedDuration::from_secs(3600)
    }

    fn store_at(path: PathBuf) -> CredentialStore {
        CredentialStore::new(Some(path)).unwrap().interactive(true)
    }

    #[cfg(unix)]
    fn file_mode(path: &Path) -> u32 {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    #[test]
    fn serialized_credential_round_trips() {
        let original = credential(Some(in_one_hour()));
        let json = serde_json::to_string(&original).unwrap();
        let parsed: Credential = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, original);
        assert_eq!(parsed.is_valid(), original.is_valid());
    }

    #[test]
    fn token_response_expiry_carries_safety_buffer() {
        use oauth2::basic::BasicTokenType;
        use oauth2::{AccessToken, EmptyExtraTokenFields, Scope, StandardTokenResponse};

        let mut token = StandardTokenResponse::new(
            AccessToken::new("tok".to_string()),
            BasicTokenType::Bearer,
            EmptyExtraTokenFields {},
        );
        token.set_expires_in(Some(&std::time::Duration::from_secs(3600)));
        token.set_scopes(Some(vec![Scope::new(
            "https://www.googleapis.com/auth/youtube.force-ssl".to_string(),
        )]));

        let before = Timestamp::now();
        let cred =
            Credential::from_token_response(&token, "cid", "csecret", "https://oauth2.example/token");
        let after = Timestamp::now();

        let expiry = cred.expiry.unwrap();
        assert!(expiry >= before + SignedDuration::from_secs(3300));
        assert!(expiry <= after + SignedDuration::from_secs(3300));
        assert!(cred.is_valid());
        assert_eq!(
            cred.scopes,
            vec!["https://www.googleapis.com/auth/youtube.force-ssl".to_string()]
        );
        assert_eq!(cred.refresh_token, None);
    }

    #[test]
    fn validity_follows_expiry() {
        assert!(credential(Some(in_one_hour())).is_valid());
        assert!(credential(None).is_valid());
        assert!(!credential(Some(one_hour_ago())).is_valid());
        assert!(!Credential {
            access_token: String::new(),
            ..credential(Some(in_one_hour()))
        }
        .is_valid());
    }

    #[tokio::test]
    async fn valid_cached_credential_is_returned_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join(CACHE_FILE_NAME);
        let cached = credential(Some(in_one_hour()));
        // Pretty-printed on purpose: a rewrite by the store would compact it.
        let written = serde_json::to_string_pretty(&cached).unwrap();
        std::fs::write(&cache, &written).unwrap();

        let got = store_at(cache.clone())
            .acquire(Some(&PanicFlow))
            .await
            .unwrap();

        assert_eq!(got, cached);
        assert_eq!(std::fs::read_to_string(&cache).unwrap(), written);
    }

    #[tokio::test]
    async fn missing_cache_without_secrets_fails_before_any_flow() {
        let dir = tempfile::tempdir().unwrap();
        let err = store_at(dir.path().join(CACHE_FILE_NAME))
            .acquire(None::<&PanicFlow>)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingClientSecrets), "{err:?}");
    }

    #[tokio::test]
    async fn missing_cache_in_non_interactive_mode_fails_without_prompting() {
        let dir = tempfile::tempdir().unwrap();
        let err = store_at(dir.path().join(CACHE_FILE_NAME))
            .interactive(false)
            .acquire(Some(&PanicFlow))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NonInteractive), "{err:?}");
    }

    #[tokio::test]
    async fn corrupt_cache_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join(CACHE_FILE_NAME);
        std::fs::write(&cache, b"not json").unwrap();

        let err = store_at(cache)
            .acquire(Some(&PanicFlow))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::CorruptCache { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn interactive_flow_result_is_persisted_owner_only() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join(CACHE_FILE_NAME);
        let issued = credential(Some(in_one_hour()));

        let got = store_at(cache.clone())
            .acquire(Some(&StaticFlow(issued.clone())))
            .await
            .unwrap();

        assert_eq!(got, issued);
        let on_disk: Credential =
            serde_json::from_slice(&std::fs::read(&cache).unwrap()).unwrap();
        assert_eq!(on_disk, issued);
        #[cfg(unix)]
        assert_eq!(file_mode(&cache), 0o600);
    }

    #[tokio::test]
    async fn expired_credential_triggers_exactly_one_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh-token",
                "token_type": "Bearer",
                "expires_in": 3600,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join(CACHE_FILE_NAME);
        let stale = Credential {
            expiry: Some(one_hour_ago()),
            token_uri: format!("{}/token", server.uri()),
            ..credential(None)
        };
        std::fs::write(&cache, serde_json::to_vec(&stale).unwrap()).unwrap();

        let got = store_at(cache.clone())
            .acquire(Some(&PanicFlow))
            .await
            .unwrap();

        assert_eq!(got.access_token, "fresh-token");
        // The response carried no refresh token; the old one must survive.
        assert_eq!(got.refresh_token, stale.refresh_token);
        assert!(got.is_valid());

        let on_disk: Credential =
            serde_json::from_slice(&std::fs::read(&cache).unwrap()).unwrap();
        assert_eq!(on_disk, got);
        #[cfg(unix)]
        assert_eq!(file_mode(&cache), 0o600);
    }

    #[tokio::test]
    async fn rejected_refresh_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join(CACHE_FILE_NAME);
        let stale = Credential {
            expiry: Some(one_hour_ago()),
            token_uri: format!("{}/token", server.uri()),
            ..credential(None)
        };
        std::fs::write(&cache, serde_json::to_vec(&stale).unwrap()).unwrap();

        let err = store_at(cache)
            .acquire(Some(&PanicFlow))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Refresh(_)), "{err:?}");
    }
}
