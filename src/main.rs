use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hanalyzer::logging;
use hanalyzer::{Args, Settings};

fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::load(&args)?;

    init_logging(settings.log_path())?;

    hanalyzer::run(&settings)?;
    Ok(())
}

/// Log to `log_file` if given, stderr otherwise. `RUST_LOG` overrides the level.
///
/// Stderr goes through the gate the terminal session holds while the table is up.
fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(logging::stderr_gate().clone()).init(),
    }
    Ok(())
}
