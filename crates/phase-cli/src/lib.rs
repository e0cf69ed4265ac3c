//! phase-cli: superficie de operador del phase-tracker.
//!
//! Comandos: `run`, `status`, `list`, `paths`. Todos comparten el parser
//! (`--key=value` o `--key value`; `--flag` pelado = true) y la resolución de
//! `--db-path` / `--artifacts-dir` con fallback a variables de entorno.

pub mod args;
pub mod commands;
pub mod render;

pub use args::CliArgs;
pub use commands::{cmd_list, cmd_paths, cmd_run, cmd_status, CliError};

pub const USAGE: &str = "\
phase-tracker — resumable pipeline orchestrator

USAGE:
  phase-tracker run --run-id <id> --through <stage> [--country <c> --industry <i>]
                    [--client-context <s>] [--strict-template <bool>]
                    [--db-path <p>] [--artifacts-dir <p>] [--json]
  phase-tracker status --run-id <id> [--json] [--db-path <p>]
  phase-tracker list [--status <s>] [--limit <n>] [--json] [--db-path <p>]
  phase-tracker paths --run-id <id> [--stage <s>] [--json] [--db-path <p>]
";

/// Despacha el comando parseado; devuelve el exit code del proceso.
pub fn dispatch(args: &CliArgs) -> Result<i32, CliError> {
    match args.command.as_deref() {
        Some("run") => cmd_run(args),
        Some("status") => cmd_status(args),
        Some("list") => cmd_list(args),
        Some("paths") => cmd_paths(args),
        Some(other) => Err(CliError::Usage(format!("unknown command `{other}`\n\n{USAGE}"))),
        None => Err(CliError::Usage(USAGE.to_string())),
    }
}
