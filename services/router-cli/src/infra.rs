use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use payment_router::config::RoutingSourceConfig;
use payment_router::routing::{
    seeded_source, AssignmentRecord, Candidate, ConfigSource, EnvConfigSource, ExplanationEntry,
    ExplanationSink, FixedClock, JsonFileConfigSource, JsonLinesSink, LedgerRepository,
    MemoryCandidateStore, MemoryLedger, RouterKind, SelectionEngine, SinkError, TeeSink,
    TracingSink,
};
use rust_decimal::Decimal;

/// Router selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum KindArg {
    Payin,
    Payout,
}

impl From<KindArg> for RouterKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Payin => RouterKind::Payin,
            KindArg::Payout => RouterKind::Payout,
        }
    }
}

pub(crate) type SnapshotRepository<C> = LedgerRepository<MemoryCandidateStore<C>, MemoryLedger>;

pub(crate) type SnapshotEngine<C> =
    SelectionEngine<C, SnapshotRepository<C>, dyn ExplanationSink>;

/// Knobs shared by every engine the CLI builds.
#[derive(Debug, Clone, Default)]
pub(crate) struct EngineOptions {
    pub(crate) seed: Option<u64>,
    pub(crate) at: Option<DateTime<Utc>>,
}

pub(crate) fn parse_amount(value: &str) -> Result<Decimal, String> {
    Decimal::from_str(value.trim()).map_err(|err| format!("invalid amount '{value}': {err}"))
}

pub(crate) fn parse_instant(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|err| format!("invalid RFC 3339 timestamp '{value}': {err}"))
}

/// JSON overrides file when configured, otherwise `PAYIN_*` / `PAYOUT_*` variables.
pub(crate) fn config_source(
    kind: RouterKind,
    routing: &RoutingSourceConfig,
) -> Arc<dyn ConfigSource> {
    match &routing.overrides_path {
        Some(path) => Arc::new(JsonFileConfigSource::new(path)),
        None => Arc::new(EnvConfigSource::new(kind.env_prefix())),
    }
}

/// Tracing output, teed into a JSON-lines file when one is configured.
pub(crate) fn explanation_sink(
    routing: &RoutingSourceConfig,
    explain_log: Option<&Path>,
) -> Arc<dyn ExplanationSink> {
    let path = explain_log
        .map(Path::to_path_buf)
        .or_else(|| routing.explain_log_path.as_ref().map(PathBuf::from));
    match path {
        Some(path) => Arc::new(TeeSink::new(TracingSink, JsonLinesSink::new(path))),
        None => Arc::new(TracingSink),
    }
}

/// Drops entries; simulations would otherwise flood the log.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct DiscardSink;

impl ExplanationSink for DiscardSink {
    fn record(&self, _entry: &ExplanationEntry) -> Result<(), SinkError> {
        Ok(())
    }
}

pub(crate) fn snapshot_engine<C: Candidate>(
    kind: RouterKind,
    candidates: Vec<C>,
    assignments: Vec<AssignmentRecord>,
    sink: Arc<dyn ExplanationSink>,
    config_source: Arc<dyn ConfigSource>,
    options: &EngineOptions,
) -> SnapshotEngine<C> {
    let repository = Arc::new(LedgerRepository::new(
        Arc::new(MemoryCandidateStore::new(candidates)),
        Arc::new(MemoryLedger::new(assignments)),
    ));
    let mut engine = SelectionEngine::new(kind, repository, sink, config_source);
    if let Some(at) = options.at {
        engine = engine.with_clock(Arc::new(FixedClock::new(at)));
    }
    if let Some(seed) = options.seed {
        engine = engine.with_random_source(seeded_source(seed));
    }
    engine
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_amounts_and_instants() {
        assert_eq!(parse_amount(" 1250.75 "), Ok(Decimal::new(125075, 2)));
        assert!(parse_amount("ten").is_err());
        assert!(parse_instant("2025-06-02T12:00:00+02:00").is_ok());
        assert!(parse_instant("yesterday").is_err());
    }

    #[test]
    fn overrides_file_takes_precedence_over_environment() {
        let routing = RoutingSourceConfig {
            overrides_path: Some("/nonexistent/overrides.json".to_string()),
            explain_log_path: None,
        };

        let source = config_source(RouterKind::Payin, &routing);

        assert!(matches!(source.load_overrides(), Ok(None)));
    }
}
