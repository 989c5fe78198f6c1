//! opsjson: diff, patch, render and report on JSON documents.
//!
//! Usage:
//!   opsjson [--output json|pretty] [--config FILE] <operation> [--flags...]
//!
//! The engine configuration comes from `--config`, or else the file named by
//! `OPSJSON_CONFIG`. Logs go to stderr, filtered by `RUST_LOG`.

use std::path::Path;
use std::process::ExitCode;

use opslib_cli::builtin;
use opslib_json::{serialize, EngineConfig, OpsError};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const CONFIG_ENV: &str = "OPSJSON_CONFIG";
const DEFAULT_LOG_FILTER: &str = "opsjson=info,opslib_cli=warn,opslib_json=warn";

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let app = match base_config().and_then(builtin::app) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("{}", serialize(&e.to_value(), false));
            return exit_code(e.exit_code());
        }
    };

    let outcome = app.run(std::env::args_os().skip(1));
    print!("{}", outcome.stdout);
    eprint!("{}", outcome.stderr);
    exit_code(outcome.exit_code)
}

fn base_config() -> Result<EngineConfig, OpsError> {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) => {
            tracing::debug!(path = %Path::new(&path).display(), "loading config from {CONFIG_ENV}");
            EngineConfig::load(Path::new(&path))
        }
        None => Ok(EngineConfig::default()),
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(3))
}
