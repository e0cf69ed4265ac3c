//! Comandos del operador: `run`, `status`, `list`, `paths`.

use std::path::PathBuf;

use phase_core::{build_scorecard, OutcomeStatus, PipelineStore, RunFilter, RunRequest, Runner, RunStatus,
                 RunnerError, StoreError};
use phase_handlers::default_registry;
use phase_persistence::{FsArtifactStore, PersistenceError, SqliteStore, StoreConfig};
use thiserror::Error;

use crate::args::CliArgs;
use crate::render::render_table;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Runner(#[from] RunnerError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

fn open_env(args: &CliArgs) -> Result<(SqliteStore, FsArtifactStore), CliError> {
    let config = StoreConfig::from_env();
    let db_path = args.get("db-path").map(PathBuf::from).unwrap_or(config.db_path);
    let artifacts_dir = args.get("artifacts-dir").map(PathBuf::from).unwrap_or(config.artifacts_dir);
    Ok((SqliteStore::open(&db_path)?, FsArtifactStore::new(artifacts_dir)))
}

fn require(args: &CliArgs, key: &str) -> Result<String, CliError> {
    args.require(key).map(str::to_string).map_err(CliError::Usage)
}

/// `run --run-id <id> --through <stage> [...]`. Exit 0 al completar, 1 ante
/// cualquier fallo de etapa.
pub fn cmd_run(args: &CliArgs) -> Result<i32, CliError> {
    let run_id = require(args, "run-id")?;
    let through = require(args, "through")?;
    let (store, artifacts) = open_env(args)?;
    let registry = default_registry()?;
    let runner = Runner::new(&store, &artifacts, &registry);

    let mut request = RunRequest::new(run_id, through);
    request.country = args.get("country").map(str::to_string);
    request.industry = args.get("industry").map(str::to_string);
    request.client_context = args.get("client-context").map(str::to_string);
    request.strict_template = args.get_bool("strict-template");

    let outcome = runner.execute(&request)?;
    if args.get_bool("json") {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        for report in &outcome.stages {
            println!("stage {:<3} attempt {} — {}ms", report.stage, report.attempt, report.duration_ms);
        }
        match outcome.status {
            OutcomeStatus::Completed => {
                println!("run {}: {} ({} stage(s) executed)",
                         outcome.run_id,
                         outcome.run_status.as_str(),
                         outcome.stages.len());
            }
            OutcomeStatus::Failed => {
                println!("run {}: failed at stage {} — {}",
                         outcome.run_id,
                         outcome.failed_stage.as_deref().unwrap_or("?"),
                         outcome.error.as_deref().unwrap_or("unknown error"));
            }
        }
    }
    Ok(match outcome.status {
        OutcomeStatus::Completed => 0,
        OutcomeStatus::Failed => 1,
    })
}

/// `status --run-id <id> [--json]`: alcance, completadas, próxima pendiente
/// y scorecard.
pub fn cmd_status(args: &CliArgs) -> Result<i32, CliError> {
    let run_id = require(args, "run-id")?;
    let (store, _artifacts) = open_env(args)?;
    let Some(scorecard) = build_scorecard(&store, &run_id)? else {
        eprintln!("run `{run_id}` not found");
        return Ok(1);
    };

    if args.get_bool("json") {
        println!("{}", serde_json::to_string_pretty(&scorecard)?);
        return Ok(0);
    }

    let run = &scorecard.run;
    println!("run {} — {} / {}", run.id, run.country, run.industry);
    if let Some(context) = &run.client_context {
        println!("context: {context}");
    }
    println!("status: {} (target stage {})", run.status.as_str(), run.target_stage);
    println!("completed: {}",
             if scorecard.completed.is_empty() { "none".to_string() } else { scorecard.completed.join(", ") });
    println!("next pending: {}", scorecard.next_pending.as_deref().unwrap_or("none"));
    println!();

    let rows: Vec<Vec<String>> = scorecard.stages
                                          .iter()
                                          .map(|s| {
                                              vec![s.stage.clone(),
                                                   s.label.clone(),
                                                   s.kind.clone(),
                                                   s.status.map(|st| st.as_str().to_string())
                                                           .unwrap_or_else(|| "-".to_string()),
                                                   s.attempts.to_string(),
                                                   s.duration_ms.map(|d| format!("{d}ms"))
                                                                .unwrap_or_else(|| "-".to_string())]
                                          })
                                          .collect();
    print!("{}", render_table(&["stage", "label", "kind", "status", "attempts", "duration"], &rows));
    Ok(0)
}

/// `list [--status <s>] [--limit <n>] [--json]`.
pub fn cmd_list(args: &CliArgs) -> Result<i32, CliError> {
    let (store, _artifacts) = open_env(args)?;
    let status = match args.get("status") {
        Some(raw) => Some(RunStatus::parse(raw)
            .ok_or_else(|| CliError::Usage(format!("unknown status `{raw}`")))?),
        None => None,
    };
    let mut filter = RunFilter { status, ..RunFilter::default() };
    if let Some(limit) = args.get_i64("limit") {
        filter.limit = limit;
    }

    let runs = store.list_runs(&filter)?;
    if args.get_bool("json") {
        println!("{}", serde_json::to_string_pretty(&runs)?);
        return Ok(0);
    }

    let rows: Vec<Vec<String>> = runs.iter()
                                     .map(|r| {
                                         vec![r.id.clone(),
                                              r.status.as_str().to_string(),
                                              r.country.clone(),
                                              r.industry.clone(),
                                              r.target_stage.clone(),
                                              r.created_at.to_rfc3339()]
                                     })
                                     .collect();
    print!("{}", render_table(&["run", "status", "country", "industry", "target", "created"], &rows));
    Ok(0)
}

/// `paths --run-id <id> [--stage <s>] [--json]`: artefactos registrados con
/// su ruta bajo la base configurada.
pub fn cmd_paths(args: &CliArgs) -> Result<i32, CliError> {
    let run_id = require(args, "run-id")?;
    let (store, artifacts_store) = open_env(args)?;
    let records = store.artifacts(&run_id, args.get("stage"))?;

    if args.get_bool("json") {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(0);
    }

    let base = artifacts_store.base_dir();
    let rows: Vec<Vec<String>> = records.iter()
                                        .map(|r| {
                                            vec![r.stage.clone(),
                                                 r.attempt.to_string(),
                                                 r.filename.clone(),
                                                 base.join(&r.path).display().to_string(),
                                                 r.size_bytes.to_string()]
                                        })
                                        .collect();
    print!("{}", render_table(&["stage", "attempt", "filename", "path", "bytes"], &rows));
    Ok(0)
}
