use crate::error::{Error, Result};
use crate::utils::FileSizeUtils;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://upload.gofile.io/uploadfile";
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024 * 1024;
const CONFIG_DIR_NAME: &str = "gofile-uploader";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Where uploads land on the remote side and the credentials used to get there.
#[derive(Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Destination {
    pub token: Option<String>,
    pub folder_id: Option<String>,
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destination")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("folder_id", &self.folder_id)
            .finish()
    }
}

/// Wait applied between two attempts on the same file.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backoff {
    Fixed { delay_ms: u64 },
    Exponential { initial_ms: u64, max_ms: u64 },
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::Fixed { delay_ms: 2000 }
    }
}

impl Backoff {
    /// Delay to wait after the `attempt`-th failed attempt (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            Backoff::Exponential { initial_ms, max_ms } => {
                let shift = attempt.saturating_sub(1).min(63);
                let factor = 1u64.checked_shl(shift).unwrap_or(u64::MAX);
                Duration::from_millis(initial_ms.saturating_mul(factor).min(max_ms))
            }
        }
    }
}

/// Rules applied to one batch run. Not modified once the batch starts.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct UploadPolicy {
    /// Total number of attempts per file, the first one included.
    pub max_retries: u32,
    #[serde(deserialize_with = "FileSizeUtils::deserialize")]
    pub max_file_size: u64,
    pub allowed_extensions: Vec<String>,
    pub max_concurrent_uploads: usize,
    pub backoff: Backoff,
    pub attempt_timeout_secs: Option<u64>,
    pub respect_ignore_files: bool,
    pub follow_links: bool,
    pub destination: Destination,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_extensions: ["jpg", "jpeg", "png", "gif", "mp4", "zip", "rar", "txt", "pdf"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            max_concurrent_uploads: 4,
            backoff: Backoff::default(),
            attempt_timeout_secs: Some(1800),
            respect_ignore_files: false,
            follow_links: false,
            destination: Destination::default(),
        }
    }
}

impl UploadPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(Error::invalid_policy("max_retries must be at least 1"));
        }
        if self.max_concurrent_uploads == 0 {
            return Err(Error::invalid_policy(
                "max_concurrent_uploads must be at least 1",
            ));
        }
        if self.max_file_size == 0 {
            return Err(Error::invalid_policy("max_file_size must be positive"));
        }
        if self.allowed_extensions.is_empty() {
            return Err(Error::invalid_policy(
                "allowed_extensions is empty; use \"*\" to accept every extension",
            ));
        }
        if self.attempt_timeout_secs == Some(0) {
            return Err(Error::invalid_policy("attempt_timeout_secs must be positive"));
        }
        Ok(())
    }

    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub endpoint: String,
    pub policy: UploadPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            policy: UploadPolicy::default(),
        }
    }
}

impl Settings {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Loads settings from `path`, or from the per-user config file when no
    /// path is given. A missing per-user file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path().filter(|path| path.is_file()) {
                Some(path) => path,
                None => {
                    tracing::debug!("no configuration file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        tracing::debug!(path = %path.display(), "loading configuration");
        let text = fs::read_to_string(&path).map_err(|e| {
            Error::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_the_documented_policy() {
        let policy = UploadPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.max_file_size, DEFAULT_MAX_FILE_SIZE);
        assert_eq!(policy.backoff, Backoff::Fixed { delay_ms: 2000 });
        assert!(policy.allowed_extensions.contains(&"pdf".to_string()));
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn parses_partial_toml() {
        let settings = Settings::from_toml(
            r#"
            endpoint = "http://localhost:9000/upload"

            [policy]
            max_retries = 5
            max_file_size = "10MiB"
            allowed_extensions = [".TXT", "md"]

            [policy.backoff]
            kind = "exponential"
            initial_ms = 100
            max_ms = 1000

            [policy.destination]
            token = "secret"
            folder_id = "abc"
            "#,
        )
        .unwrap();

        assert_eq!(settings.endpoint, "http://localhost:9000/upload");
        assert_eq!(settings.policy.max_retries, 5);
        assert_eq!(settings.policy.max_file_size, 10 * 1024 * 1024);
        assert_eq!(settings.policy.max_concurrent_uploads, 4);
        assert_eq!(
            settings.policy.backoff,
            Backoff::Exponential {
                initial_ms: 100,
                max_ms: 1000
            }
        );
        assert_eq!(settings.policy.destination.folder_id.as_deref(), Some("abc"));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(Settings::from_toml("[policy]\nmax_retry = 2\n").is_err());
    }

    #[test]
    fn token_is_redacted_in_debug_output() {
        let destination = Destination {
            token: Some("super-secret".into()),
            folder_id: None,
        };
        let printed = format!("{:?}", destination);
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn exponential_backoff_doubles_and_caps() {
        let backoff = Backoff::Exponential {
            initial_ms: 100,
            max_ms: 500,
        };
        assert_eq!(backoff.delay(1), Duration::from_millis(100));
        assert_eq!(backoff.delay(2), Duration::from_millis(200));
        assert_eq!(backoff.delay(3), Duration::from_millis(400));
        assert_eq!(backoff.delay(4), Duration::from_millis(500));
        assert_eq!(backoff.delay(200), Duration::from_millis(500));
    }

    #[test]
    fn fixed_backoff_is_constant() {
        let backoff = Backoff::Fixed { delay_ms: 2000 };
        assert_eq!(backoff.delay(1), backoff.delay(7));
    }

    #[test]
    fn validate_rejects_degenerate_policies() {
        let cases = [
            UploadPolicy {
                max_retries: 0,
                ..UploadPolicy::default()
            },
            UploadPolicy {
                max_concurrent_uploads: 0,
                ..UploadPolicy::default()
            },
            UploadPolicy {
                allowed_extensions: Vec::new(),
                ..UploadPolicy::default()
            },
            UploadPolicy {
                attempt_timeout_secs: Some(0),
                ..UploadPolicy::default()
            },
        ];
        for policy in cases {
            assert!(matches!(
                policy.validate(),
                Err(Error::InvalidPolicy { .. })
            ));
        }
    }

    #[test]
    fn load_reads_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[policy]\nmax_concurrent_uploads = 8\n").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.policy.max_concurrent_uploads, 8);
        assert_eq!(settings.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn load_reports_missing_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
