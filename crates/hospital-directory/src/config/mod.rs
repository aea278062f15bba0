use std::env;
use std::fmt;
use std::time::Duration;

use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:5000/api/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Matches the "up to 10MB" promise of the hospital creation form.
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Distinguishes runtime behavior for different stages of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the directory client.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub backend: BackendConfig,
    pub submission: SubmissionConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let raw_url = env::var("DIRECTORY_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let base_url = parse_api_url(&raw_url)?;

        let timeout_secs = env::var("DIRECTORY_API_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_TIMEOUT_SECS.to_string())
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::InvalidTimeout)?;

        let max_image_bytes = match env::var("DIRECTORY_MAX_IMAGE_BYTES") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|bytes| *bytes > 0)
                .ok_or(ConfigError::InvalidImageLimit)?,
            Err(_) => DEFAULT_MAX_IMAGE_BYTES,
        };

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            backend: BackendConfig {
                base_url,
                timeout: Duration::from_secs(timeout_secs),
            },
            submission: SubmissionConfig { max_image_bytes },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

/// Location and request policy of the hospital backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: Url,
    pub timeout: Duration,
}

impl BackendConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Scheme, host and port of the backend; relative image paths hang off this.
    pub fn origin(&self) -> String {
        self.base_url.origin().ascii_serialization()
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        let base_url = Url::parse(DEFAULT_API_URL).expect("default api url is valid");
        Self::new(base_url)
    }
}

/// Limits applied to drafts before anything leaves the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionConfig {
    pub max_image_bytes: usize,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let value = raw.trim().to_string();
    let url = Url::parse(&value).map_err(|source| ConfigError::InvalidApiUrl {
        value: value.clone(),
        source,
    })?;

    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(ConfigError::UnsupportedScheme { value });
    }

    Ok(url)
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidApiUrl {
        value: String,
        source: url::ParseError,
    },
    UnsupportedScheme {
        value: String,
    },
    InvalidTimeout,
    InvalidImageLimit,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidApiUrl { value, .. } => {
                write!(f, "DIRECTORY_API_URL '{}' is not a valid URL", value)
            }
            ConfigError::UnsupportedScheme { value } => {
                write!(f, "DIRECTORY_API_URL '{}' must be an http(s) URL", value)
            }
            ConfigError::InvalidTimeout => {
                write!(f, "DIRECTORY_API_TIMEOUT_SECS must be a positive integer")
            }
            ConfigError::InvalidImageLimit => {
                write!(f, "DIRECTORY_MAX_IMAGE_BYTES must be a positive integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidApiUrl { source, .. } => Some(source),
            ConfigError::UnsupportedScheme { .. }
            | ConfigError::InvalidTimeout
            | ConfigError::InvalidImageLimit => None,
        }
    }
}
