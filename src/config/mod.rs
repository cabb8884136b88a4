use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Distinguishes runtime behavior for different stages of the service.
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

/// Top-level configuration for the service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub dialer: DialerConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let dialer = DialerConfig::load()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            dialer,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Settings for the outbound dialer pipeline.
///
/// Per-bucket overrides (thresholds, batch sizes) live on `BucketConfig`;
/// these are the process-wide defaults and vendor plumbing values.
#[derive(Debug, Clone)]
pub struct DialerConfig {
    /// Plain URL the vendor must post call results back to. Encoded to
    /// base64 when building the vendor request.
    pub callback_url: String,
    pub batch_size: usize,
    pub max_upload_attempts: u32,
    /// Local time window the vendor is allowed to dial in.
    pub call_start_time: String,
    pub call_end_time: String,
    /// Windows inside the calling window the vendor must not dial during.
    pub rest_windows: Vec<(String, String)>,
}

impl DialerConfig {
    fn load() -> Result<Self, ConfigError> {
        let callback_url = env::var("DIALER_CALLBACK_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:3000/api/v1/dialer/callbacks".to_string());

        let batch_size = env::var("DIALER_BATCH_SIZE")
            .unwrap_or_else(|_| "500".to_string())
            .parse::<usize>()
            .map_err(|_| ConfigError::InvalidBatchSize)?;
        if batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize);
        }

        let max_upload_attempts = env::var("DIALER_MAX_UPLOAD_ATTEMPTS")
            .unwrap_or_else(|_| "3".to_string())
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidUploadAttempts)?;
        if max_upload_attempts == 0 {
            return Err(ConfigError::InvalidUploadAttempts);
        }

        let call_start_time =
            env::var("DIALER_CALL_START").unwrap_or_else(|_| "08:00".to_string());
        let call_end_time = env::var("DIALER_CALL_END").unwrap_or_else(|_| "20:00".to_string());

        Ok(Self {
            callback_url,
            batch_size,
            max_upload_attempts,
            call_start_time,
            call_end_time,
            rest_windows: vec![("12:00".to_string(), "13:00".to_string())],
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidBatchSize,
    InvalidUploadAttempts,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidBatchSize => {
                write!(f, "DIALER_BATCH_SIZE must be a positive integer")
            }
            ConfigError::InvalidUploadAttempts => {
                write!(f, "DIALER_MAX_UPLOAD_ATTEMPTS must be a positive integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
