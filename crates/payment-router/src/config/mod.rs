use std::env;
use std::fmt;

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

/// Top-level process configuration for the router tooling.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub telemetry: TelemetryConfig,
    pub routing: RoutingSourceConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        if log_level.trim().is_empty() {
            return Err(ConfigError::EmptyLogLevel);
        }

        let log_format = LogFormat::parse(
            &env::var("APP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
        )?;

        let overrides_path = env::var("ROUTER_OVERRIDES_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty());
        let explain_log_path = env::var("ROUTER_EXPLAIN_LOG")
            .ok()
            .filter(|value| !value.trim().is_empty());

        Ok(Self {
            environment,
            telemetry: TelemetryConfig {
                log_level,
                log_format,
            },
            routing: RoutingSourceConfig {
                overrides_path,
                explain_log_path,
            },
        })
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

/// Event layout on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    /// One JSON object per event, for log shippers.
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "compact" | "text" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::UnknownLogFormat(other.to_string())),
        }
    }
}

/// Where selection overrides come from and where decision explanations go.
#[derive(Debug, Clone, Default)]
pub struct RoutingSourceConfig {
    /// JSON document with selection overrides; environment overrides apply when absent.
    pub overrides_path: Option<String>,
    /// JSON-lines file receiving one explanation entry per decision.
    pub explain_log_path: Option<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    EmptyLogLevel,
    UnknownLogFormat(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptyLogLevel => write!(f, "APP_LOG_LEVEL must not be empty"),
            ConfigError::UnknownLogFormat(value) => {
                write!(f, "APP_LOG_FORMAT '{}' is not one of compact, json", value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
