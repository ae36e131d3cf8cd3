//! Client configuration and credential resolution.

use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

/// Environment variable holding the service secret.
pub const SECRET_ENV_VAR: &str = "INTERNAL_SERVICE_SECRET";
/// Default memory service URL.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
/// Default user identifier.
pub const DEFAULT_USER_ID: &str = "default";

/// Secret token sent to the memory service.
///
/// Resolved once at startup and never changed afterwards. A missing secret is
/// valid: requests are simply sent without the auth header.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    secret: Option<String>,
}

impl Credentials {
    /// Credentials carrying the given secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Some(secret.into()),
        }
    }

    /// No secret; requests go out unauthenticated.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Resolves from `INTERNAL_SERVICE_SECRET`, then `~/.openclaw/.env`.
    pub fn resolve() -> Self {
        Self::resolve_from(
            std::env::var(SECRET_ENV_VAR).ok(),
            default_env_file().as_deref(),
        )
    }

    /// Resolves from an explicit environment value, falling back to `env_file`.
    pub fn resolve_from(env_value: Option<String>, env_file: Option<&Path>) -> Self {
        if let Some(secret) = env_value.filter(|s| !s.trim().is_empty()) {
            return Self::new(secret);
        }

        let secret = env_file.and_then(read_secret_from_file);
        if secret.is_none() {
            tracing::debug!("No {} found, requests will be unauthenticated", SECRET_ENV_VAR);
        }
        Self { secret }
    }

    /// The secret, if any.
    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    /// Whether a secret is present.
    pub fn is_present(&self) -> bool {
        self.secret.is_some()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secret = if self.secret.is_some() {
            "Some(<redacted>)"
        } else {
            "None"
        };
        f.debug_struct("Credentials").field("secret", &secret).finish()
    }
}

/// `~/.openclaw/.env`
pub fn default_env_file() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".openclaw").join(".env"))
}

fn secret_line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(&format!(r"(?m)^{SECRET_ENV_VAR}=(.+)$")).expect("static regex is valid")
    })
}

/// Takes the value of the `INTERNAL_SERVICE_SECRET=` line verbatim: no
/// quoting, escaping or `$VAR` expansion.
fn read_secret_from_file(path: &Path) -> Option<String> {
    let contents = std::fs::read_to_string(path).ok()?;
    secret_line_pattern()
        .captures(&contents)
        .and_then(|caps| caps.get(1))
        .map(|value| value.as_str().trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Sizing for the background writer.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Maximum number of add requests in flight at once
    pub workers: usize,
    /// Pending writes buffered before new ones are dropped
    pub queue_depth: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_depth: 256,
        }
    }
}

/// Configuration for [`MemosClient`](crate::MemosClient).
#[derive(Debug, Clone)]
pub struct MemosConfig {
    /// Base URL of the memory service, without trailing slash
    pub api_url: String,
    /// User the memories belong to
    pub user_id: String,
    /// Auth secret
    pub credentials: Credentials,
    /// Hard deadline for a single attempt
    pub request_timeout: Duration,
    /// Additional attempts for search and complete
    pub retries: u32,
    /// Additional attempts for background adds
    pub add_retries: u32,
    /// Backoff before retry `n` is `backoff_step * n`
    pub backoff_step: Duration,
    /// Background writer sizing
    pub writer: WriterConfig,
}

impl Default for MemosConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            user_id: DEFAULT_USER_ID.to_string(),
            credentials: Credentials::anonymous(),
            request_timeout: Duration::from_secs(5),
            retries: 2,
            add_retries: 1,
            backoff_step: Duration::from_millis(100),
            writer: WriterConfig::default(),
        }
    }
}

impl MemosConfig {
    /// Reads `MEMOS_API_URL`, `MEMOS_USER_ID` and resolves credentials.
    pub fn from_env() -> Self {
        Self {
            api_url: std::env::var("MEMOS_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            user_id: std::env::var("MEMOS_USER_ID")
                .unwrap_or_else(|_| DEFAULT_USER_ID.to_string()),
            credentials: Credentials::resolve(),
            ..Default::default()
        }
    }

    /// Sets the service URL.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Sets the user identifier.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    /// Sets the credentials.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Sets the per-attempt timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the retry budget for search/complete.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Sets the retry budget for background adds.
    pub fn with_add_retries(mut self, retries: u32) -> Self {
        self.add_retries = retries;
        self
    }

    /// Sets the backoff step.
    pub fn with_backoff_step(mut self, step: Duration) -> Self {
        self.backoff_step = step;
        self
    }

    /// Sets the writer sizing.
    pub fn with_writer(mut self, writer: WriterConfig) -> Self {
        self.writer = writer;
        self
    }

    /// Checks the values that would otherwise fail on first use.
    pub fn validate(&self) -> crate::Result<()> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(crate::MemosError::Config(format!(
                "api_url must be an http(s) URL, got {:?}",
                self.api_url
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(crate::MemosError::Config(
                "request_timeout must be non-zero".to_string(),
            ));
        }
        if self.writer.workers == 0 || self.writer.queue_depth == 0 {
            return Err(crate::MemosError::Config(
                "writer workers and queue_depth must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_default() {
        let config = MemosConfig::default();
        assert_eq!(config.api_url, "http://127.0.0.1:8000");
        assert_eq!(config.user_id, "default");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.retries, 2);
        assert_eq!(config.add_retries, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(MemosConfig::default().with_api_url("localhost:8000").validate().is_err());
        assert!(
            MemosConfig::default()
                .with_request_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_env_value_wins() {
        let creds = Credentials::resolve_from(Some("from-env".into()), None);
        assert_eq!(creds.secret(), Some("from-env"));
    }

    #[test]
    fn test_secret_from_env_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "OTHER=value").unwrap();
        writeln!(file, "INTERNAL_SERVICE_SECRET=s3cret  ").unwrap();

        let creds = Credentials::resolve_from(None, Some(file.path()));
        assert_eq!(creds.secret(), Some("s3cret"));
    }

    #[test]
    fn test_secret_from_env_file_is_taken_verbatim() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# INTERNAL_SERVICE_SECRET=commented").unwrap();
        writeln!(file, r##"INTERNAL_SERVICE_SECRET=ab$cdef\n"q"#x1"##).unwrap();

        let creds = Credentials::resolve_from(None, Some(file.path()));
        assert_eq!(creds.secret(), Some(r##"ab$cdef\n"q"#x1"##));
    }

    #[test]
    fn test_secret_from_crlf_env_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "OTHER=1\r\nINTERNAL_SERVICE_SECRET=s3cret\r\n").unwrap();

        let creds = Credentials::resolve_from(None, Some(file.path()));
        assert_eq!(creds.secret(), Some("s3cret"));
    }

    #[test]
    fn test_missing_secret_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        let creds = Credentials::resolve_from(None, Some(&dir.path().join("missing.env")));
        assert!(!creds.is_present());

        let creds = Credentials::resolve_from(Some("   ".into()), None);
        assert!(!creds.is_present());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = Credentials::new("top-secret");
        let debug = format!("{creds:?}");
        assert!(!debug.contains("top-secret"));
        assert!(debug.contains("redacted"));
    }
}
