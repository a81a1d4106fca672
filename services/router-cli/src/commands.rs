use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::Args;
use payment_router::config::RoutingSourceConfig;
use payment_router::error::AppError;
use payment_router::routing::{
    resolve_from, Candidate, CandidateId, ExplanationSink, RouterKind, RoutingSnapshot,
    ScoredCandidate, SelectionConfig, SelectionResult, WeightedSelector,
};
use rust_decimal::Decimal;
use tracing::info;

use crate::infra::{
    config_source, explanation_sink, parse_amount, parse_instant, snapshot_engine, DiscardSink,
    EngineOptions, KindArg,
};

#[derive(Args, Debug)]
pub(crate) struct SelectArgs {
    /// Router to run
    #[arg(long, value_enum)]
    pub(crate) kind: KindArg,
    /// Requested amount
    #[arg(long, value_parser = parse_amount)]
    pub(crate) amount: Decimal,
    /// JSON snapshot with `endpoints`, `agents` and `assignments`
    #[arg(long)]
    pub(crate) snapshot: PathBuf,
    /// Seed for a reproducible draw
    #[arg(long)]
    pub(crate) seed: Option<u64>,
    /// Evaluate as of this RFC 3339 instant instead of now
    #[arg(long, value_parser = parse_instant)]
    pub(crate) at: Option<DateTime<Utc>>,
    /// Merchant or customer the request belongs to
    #[arg(long, default_value = "cli")]
    pub(crate) subject: String,
    /// Request identifier recorded in the explanation trail
    #[arg(long, default_value = "cli-request")]
    pub(crate) request: String,
    /// Append the explanation entry to this JSON-lines file
    #[arg(long)]
    pub(crate) explain_log: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct SimulateArgs {
    /// Router to run
    #[arg(long, value_enum)]
    pub(crate) kind: KindArg,
    /// Requested amount
    #[arg(long, value_parser = parse_amount)]
    pub(crate) amount: Decimal,
    /// JSON snapshot with `endpoints`, `agents` and `assignments`
    #[arg(long)]
    pub(crate) snapshot: PathBuf,
    /// Number of independent selections
    #[arg(long, default_value_t = 1000)]
    pub(crate) trials: usize,
    /// Seed for a reproducible run
    #[arg(long)]
    pub(crate) seed: Option<u64>,
    /// Evaluate as of this RFC 3339 instant instead of now
    #[arg(long, value_parser = parse_instant)]
    pub(crate) at: Option<DateTime<Utc>>,
}

#[derive(Args, Debug)]
pub(crate) struct ConfigArgs {
    /// Router whose configuration to resolve
    #[arg(long, value_enum)]
    pub(crate) kind: KindArg,
}

/// One candidate's share of a simulation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SimulationRow {
    pub(crate) candidate_id: CandidateId,
    pub(crate) candidate_name: String,
    pub(crate) score: f64,
    pub(crate) expected: f64,
    pub(crate) observed: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SimulationReport {
    pub(crate) trials: usize,
    pub(crate) successes: usize,
    pub(crate) failures: BTreeMap<String, usize>,
    pub(crate) rows: Vec<SimulationRow>,
}

pub(crate) fn run_select(args: SelectArgs, routing: &RoutingSourceConfig) -> Result<(), AppError> {
    let sink = explanation_sink(routing, args.explain_log.as_deref());
    let result = select(&args, routing, sink)?;

    println!("{}", serde_json::to_string_pretty(&result.to_contract())?);
    println!("\n{}", result.explanation());
    Ok(())
}

pub(crate) fn run_simulate(
    args: SimulateArgs,
    routing: &RoutingSourceConfig,
) -> Result<(), AppError> {
    let report = simulate(&args, routing)?;
    render_simulation(&report, args.amount, args.kind.into());
    Ok(())
}

pub(crate) fn run_config(args: ConfigArgs, routing: &RoutingSourceConfig) -> Result<(), AppError> {
    let kind: RouterKind = args.kind.into();
    let source = config_source(kind, routing);
    let config: SelectionConfig = resolve_from(source.as_ref());
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

pub(crate) fn select(
    args: &SelectArgs,
    routing: &RoutingSourceConfig,
    sink: Arc<dyn ExplanationSink>,
) -> Result<SelectionResult, AppError> {
    let snapshot = load_snapshot(&args.snapshot)?;
    let kind: RouterKind = args.kind.into();
    let options = EngineOptions {
        seed: args.seed,
        at: args.at,
    };
    let source = config_source(kind, routing);

    let result = match kind {
        RouterKind::Payin => snapshot_engine(
            kind,
            snapshot.endpoints,
            snapshot.assignments,
            sink,
            source,
            &options,
        )
        .select_endpoint(args.amount, &args.subject, &args.request),
        RouterKind::Payout => snapshot_engine(
            kind,
            snapshot.agents,
            snapshot.assignments,
            sink,
            source,
            &options,
        )
        .select_agent(args.amount, &args.subject, &args.request),
    };
    Ok(result)
}

pub(crate) fn simulate(
    args: &SimulateArgs,
    routing: &RoutingSourceConfig,
) -> Result<SimulationReport, AppError> {
    if args.trials == 0 {
        return Err(AppError::InvalidArgument(
            "--trials must be at least 1".to_string(),
        ));
    }

    let snapshot = load_snapshot(&args.snapshot)?;
    let kind: RouterKind = args.kind.into();
    let options = EngineOptions {
        seed: args.seed,
        at: args.at,
    };
    let source = config_source(kind, routing);
    let sink: Arc<dyn ExplanationSink> = Arc::new(DiscardSink);

    let report = match kind {
        RouterKind::Payin => {
            let engine = snapshot_engine(
                kind,
                snapshot.endpoints,
                snapshot.assignments,
                sink,
                source,
                &options,
            );
            tally(
                args.trials,
                engine.rank(args.amount).unwrap_or_default(),
                &engine.config(),
                |trial| engine.select_endpoint(args.amount, "simulation", &format!("sim-{trial}")),
            )
        }
        RouterKind::Payout => {
            let engine = snapshot_engine(
                kind,
                snapshot.agents,
                snapshot.assignments,
                sink,
                source,
                &options,
            );
            tally(
                args.trials,
                engine.rank(args.amount).unwrap_or_default(),
                &engine.config(),
                |trial| engine.select_agent(args.amount, "simulation", &format!("sim-{trial}")),
            )
        }
    };
    Ok(report)
}

fn load_snapshot(path: &Path) -> Result<RoutingSnapshot, AppError> {
    let snapshot = RoutingSnapshot::from_path(path)?;
    info!(
        path = %path.display(),
        endpoints = snapshot.endpoints.len(),
        agents = snapshot.agents.len(),
        assignments = snapshot.assignments.len(),
        "routing snapshot loaded"
    );
    Ok(snapshot)
}

fn tally<C: Candidate>(
    trials: usize,
    ranked: Vec<ScoredCandidate<C>>,
    config: &SelectionConfig,
    mut select: impl FnMut(usize) -> SelectionResult,
) -> SimulationReport {
    let expected: BTreeMap<CandidateId, f64> =
        WeightedSelector::probabilities(&ranked, config).into_iter().collect();

    let mut wins: BTreeMap<CandidateId, usize> = BTreeMap::new();
    let mut failures: BTreeMap<String, usize> = BTreeMap::new();
    for trial in 0..trials {
        let result = select(trial);
        match (result.selected_candidate(), result.error()) {
            (Some(selected), _) => *wins.entry(selected.candidate_id.clone()).or_default() += 1,
            (None, Some(error)) => *failures.entry(error.to_string()).or_default() += 1,
            (None, None) => {}
        }
    }

    let rows = ranked
        .iter()
        .map(|candidate| SimulationRow {
            candidate_id: candidate.id().clone(),
            candidate_name: candidate.name().to_string(),
            score: candidate.score,
            expected: expected.get(candidate.id()).copied().unwrap_or(0.0),
            observed: wins.get(candidate.id()).copied().unwrap_or(0) as f64 / trials as f64,
        })
        .collect();

    SimulationReport {
        trials,
        successes: wins.values().sum(),
        failures,
        rows,
    }
}

fn render_simulation(report: &SimulationReport, amount: Decimal, kind: RouterKind) {
    println!(
        "{} simulation for amount {} over {} trials",
        kind.label(),
        amount,
        report.trials
    );
    println!(
        "- {} selections succeeded ({:.1}%)",
        report.successes,
        report.successes as f64 / report.trials as f64 * 100.0
    );
    for (reason, count) in &report.failures {
        println!("- {count} failed: {reason}");
    }
    println!("Candidates (draw probability vs observed):");
    for row in &report.rows {
        println!(
            "  - {} [{}] score {:.1} | expected {:.1}% | observed {:.1}%",
            row.candidate_name,
            row.candidate_id,
            row.score,
            row.expected * 100.0,
            row.observed * 100.0
        );
    }
}
