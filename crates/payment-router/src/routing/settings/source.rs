use std::env;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{ScoringWeightOverrides, SelectionConfig, SelectionOverrides};

/// Supplier of partial selection overrides. `Ok(None)` means "nothing configured".
pub trait ConfigSource: Send + Sync {
    fn load_overrides(&self) -> Result<Option<SelectionOverrides>, ConfigSourceError>;
}

/// Error enumeration for configuration sources.
#[derive(Debug, thiserror::Error)]
pub enum ConfigSourceError {
    #[error("failed to read overrides from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid overrides document {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("overrides document {path} is not a JSON object")]
    NotAnObject { path: String },
    #[error("configuration source unavailable: {0}")]
    Unavailable(String),
}

/// Load overrides from `source` and resolve them. A failing source yields the defaults.
pub fn resolve_from(source: &dyn ConfigSource) -> SelectionConfig {
    match source.load_overrides() {
        Ok(overrides) => SelectionConfig::resolve(overrides.as_ref()),
        Err(err) => {
            warn!(error = %err, "selection overrides unavailable, using defaults");
            SelectionConfig::default()
        }
    }
}

/// Overrides held in process, mostly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigSource {
    overrides: Option<SelectionOverrides>,
}

impl StaticConfigSource {
    pub fn new(overrides: SelectionOverrides) -> Self {
        Self {
            overrides: Some(overrides),
        }
    }

    pub fn empty() -> Self {
        Self { overrides: None }
    }
}

impl ConfigSource for StaticConfigSource {
    fn load_overrides(&self) -> Result<Option<SelectionOverrides>, ConfigSourceError> {
        Ok(self.overrides.clone())
    }
}

/// Reads a JSON [`SelectionOverrides`] document. A missing file counts as no overrides.
///
/// Fields are extracted one at a time, so a mistyped field falls back to its default alone.
#[derive(Debug, Clone)]
pub struct JsonFileConfigSource {
    path: PathBuf,
}

impl JsonFileConfigSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ConfigSource for JsonFileConfigSource {
    fn load_overrides(&self) -> Result<Option<SelectionOverrides>, ConfigSourceError> {
        let shown = self.path.display().to_string();
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %shown, "no overrides file present");
                return Ok(None);
            }
            Err(source) => {
                return Err(ConfigSourceError::Io {
                    path: shown,
                    source,
                })
            }
        };

        let document: Value = serde_json::from_str(&raw).map_err(|source| {
            ConfigSourceError::Parse {
                path: shown.clone(),
                source,
            }
        })?;
        let Value::Object(fields) = document else {
            return Err(ConfigSourceError::NotAnObject { path: shown });
        };

        let weights = match fields.get("weights") {
            Some(Value::Object(weights)) => Some(ScoringWeightOverrides {
                capacity: field(weights, "capacity"),
                success_rate: field(weights, "success_rate"),
                amount_fit: field(weights, "amount_fit"),
                freshness: field(weights, "freshness"),
                speed: field(weights, "speed"),
                recency_penalty: field(weights, "recency_penalty"),
            }),
            Some(Value::Null) | None => None,
            Some(other) => {
                warn!(field = "weights", value = %other, "ignoring mistyped override");
                None
            }
        };

        Ok(Some(SelectionOverrides {
            min_score_threshold: field(&fields, "min_score_threshold"),
            max_candidates: field(&fields, "max_candidates"),
            weight_exponent: field(&fields, "weight_exponent"),
            cooldown_minutes: field(&fields, "cooldown_minutes"),
            fallback_enabled: field(&fields, "fallback_enabled"),
            max_fallback_attempts: field(&fields, "max_fallback_attempts"),
            max_active_workload: field(&fields, "max_active_workload"),
            max_daily_transactions: field(&fields, "max_daily_transactions"),
            max_daily_cancellations: field(&fields, "max_daily_cancellations"),
            small_amount_ceiling: field(&fields, "small_amount_ceiling"),
            large_amount_floor: field(&fields, "large_amount_floor"),
            logging_enabled: field(&fields, "logging_enabled"),
            weights,
        }))
    }
}

/// One override field of a JSON document. A value of the wrong type is dropped with a warning
/// so the remaining fields still apply.
fn field<T: DeserializeOwned>(fields: &Map<String, Value>, name: &'static str) -> Option<T> {
    let value = fields.get(name)?;
    if value.is_null() {
        return None;
    }
    match serde_json::from_value::<T>(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            warn!(field = name, value = %value, error = %err, "ignoring mistyped override");
            None
        }
    }
}

/// Reads `<PREFIX>_*` environment variables, e.g. `PAYIN_MIN_SCORE=40`.
///
/// Unparseable values are skipped with a warning so one typo never disables the rest.
#[derive(Debug, Clone)]
pub struct EnvConfigSource {
    prefix: String,
}

impl EnvConfigSource {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn var(&self, name: &str) -> Option<String> {
        env::var(format!("{}_{}", self.prefix, name))
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn parsed<T: FromStr>(&self, name: &str) -> Option<T> {
        let raw = self.var(name)?;
        match raw.parse::<T>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(
                    variable = %format!("{}_{}", self.prefix, name),
                    value = %raw,
                    "ignoring unparseable override"
                );
                None
            }
        }
    }

    fn flag(&self, name: &str) -> Option<bool> {
        let raw = self.var(name)?;
        match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => {
                warn!(
                    variable = %format!("{}_{}", self.prefix, name),
                    value = %raw,
                    "ignoring unparseable flag"
                );
                None
            }
        }
    }
}

impl ConfigSource for EnvConfigSource {
    fn load_overrides(&self) -> Result<Option<SelectionOverrides>, ConfigSourceError> {
        let overrides = SelectionOverrides {
            min_score_threshold: self.parsed("MIN_SCORE"),
            max_candidates: self.parsed("MAX_CANDIDATES"),
            weight_exponent: self.parsed("WEIGHT_EXPONENT"),
            cooldown_minutes: self.parsed("COOLDOWN_MINUTES"),
            fallback_enabled: self.flag("FALLBACK_ENABLED"),
            max_fallback_attempts: self.parsed("MAX_ATTEMPTS"),
            max_active_workload: self.parsed("MAX_ACTIVE_WORKLOAD"),
            max_daily_transactions: self.parsed("MAX_DAILY_TRANSACTIONS"),
            max_daily_cancellations: self.parsed("MAX_DAILY_CANCELLATIONS"),
            small_amount_ceiling: self.parsed("SMALL_AMOUNT_CEILING"),
            large_amount_floor: self.parsed("LARGE_AMOUNT_FLOOR"),
            logging_enabled: self.flag("LOGGING_ENABLED"),
            weights: None,
        };

        if overrides == SelectionOverrides::default() {
            Ok(None)
        } else {
            Ok(Some(overrides))
        }
    }
}
