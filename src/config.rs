//! Command-line arguments and layered settings.
//!
//! Settings are resolved in this order, later layers winning:
//!
//! ```text
//! built-in defaults → config file (--config) → HANALYZER_* env vars → CLI flags
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use config::{Config, Environment, File};
use reqwest::header::HeaderName;
use reqwest::{Method, Url};
use serde::Deserialize;

use crate::error::{Error, Result};

pub const DEFAULT_THREADS: usize = 1;
pub const DEFAULT_REQUESTS: i64 = 10_000;
pub const DEFAULT_HEADER: &str = "X-Node-ID";
pub const DEFAULT_METHOD: &str = "GET";
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Prefix for environment overrides, e.g. `HANALYZER_THREADS=8`.
pub const ENV_PREFIX: &str = "HANALYZER";

#[derive(Parser, Debug, Default)]
#[command(name = "hanalyzer")]
#[command(
    about = "Sends many probes to an endpoint to test High-Availability and Load-Balancing"
)]
pub struct Args {
    /// The URL you'd like to perform the testing against
    #[arg(value_name = "URL")]
    pub url: Option<String>,

    /// Number of worker threads to launch
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Hide per-worker output
    #[arg(short, long)]
    pub quiet: bool,

    /// Number of requests to perform (-1 to run forever)
    #[arg(short, long, allow_negative_numbers = true)]
    pub requests: Option<i64>,

    /// Response header used to tell nodes apart
    #[arg(short = 'H', long)]
    pub header: Option<String>,

    /// HTTP method to use
    #[arg(short = 'X', long)]
    pub method: Option<String>,

    /// Optional TOML file with default settings
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Maximum number of pending probes before the producer blocks
    #[arg(long)]
    pub queue_capacity: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

/// Fully resolved run settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub url: String,
    pub threads: usize,
    pub quiet: bool,
    pub requests: i64,
    pub header: String,
    pub method: String,
    pub queue_capacity: usize,
    pub timeout: u64,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

/// How many probes the dispatcher should enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestBudget {
    Limited(u64),
    Unbounded,
}

impl RequestBudget {
    /// Take one probe from the budget. Returns false once exhausted.
    pub fn take(&mut self) -> bool {
        match self {
            RequestBudget::Unbounded => true,
            RequestBudget::Limited(0) => false,
            RequestBudget::Limited(n) => {
                *n -= 1;
                true
            }
        }
    }
}

impl Settings {
    /// Resolve settings from all layers, with `args` taking precedence.
    pub fn load(args: &Args) -> Result<Self> {
        Self::load_with_env(args, Environment::with_prefix(ENV_PREFIX).try_parsing(true))
    }

    fn load_with_env(args: &Args, env: Environment) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("threads", DEFAULT_THREADS as u64)?
            .set_default("quiet", false)?
            .set_default("requests", DEFAULT_REQUESTS)?
            .set_default("header", DEFAULT_HEADER)?
            .set_default("method", DEFAULT_METHOD)?
            .set_default("queue_capacity", DEFAULT_QUEUE_CAPACITY as u64)?
            .set_default("timeout", DEFAULT_TIMEOUT_SECS)?;

        if let Some(path) = &args.config {
            builder = builder.add_source(File::from(path.as_path()));
        }

        builder = builder
            .add_source(env)
            .set_override_option("url", args.url.clone())?
            .set_override_option("threads", args.threads.map(|t| t as u64))?
            .set_override_option("requests", args.requests)?
            .set_override_option("header", args.header.clone())?
            .set_override_option("method", args.method.clone())?
            .set_override_option("queue_capacity", args.queue_capacity.map(|c| c as u64))?
            .set_override_option("timeout", args.timeout)?
            .set_override_option(
                "log_file",
                args.log_file.as_deref().map(|p| p.display().to_string()),
            )?;

        // A bare flag can only switch quiet on; it never overrides a configured `true`.
        if args.quiet {
            builder = builder.set_override("quiet", true)?;
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check every setting before anything is spawned or drawn.
    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(invalid("threads", "at least one worker is required"));
        }
        if self.requests < -1 {
            return Err(invalid("requests", "use a positive count or -1 for unbounded"));
        }
        if self.queue_capacity == 0 {
            return Err(invalid("queue_capacity", "must be at least 1"));
        }
        if self.timeout == 0 {
            return Err(invalid("timeout", "must be greater than zero"));
        }
        self.http_method()?;
        self.header_name()?;
        self.target_url()?;
        Ok(())
    }

    pub fn budget(&self) -> RequestBudget {
        if self.requests < 0 {
            RequestBudget::Unbounded
        } else {
            RequestBudget::Limited(self.requests as u64)
        }
    }

    pub fn http_method(&self) -> Result<Method> {
        Method::from_bytes(self.method.to_ascii_uppercase().as_bytes())
            .map_err(|e| invalid("method", e.to_string()))
    }

    pub fn header_name(&self) -> Result<HeaderName> {
        HeaderName::from_bytes(self.header.as_bytes()).map_err(|e| invalid("header", e.to_string()))
    }

    pub fn target_url(&self) -> Result<Url> {
        let url = Url::parse(&self.url).map_err(|e| Error::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(Error::InvalidUrl {
                url: self.url.clone(),
                reason: format!("unsupported scheme `{}`", other),
            }),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }
}

fn invalid(name: &'static str, reason: impl Into<String>) -> Error {
    Error::InvalidSetting {
        name,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn no_env() -> Environment {
        Environment::with_prefix(ENV_PREFIX).source(Some(HashMap::new()))
    }

    fn args_for(url: &str) -> Args {
        Args {
            url: Some(url.to_string()),
            ..Args::default()
        }
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::load_with_env(&args_for("http://lb.local/"), no_env()).unwrap();
        assert_eq!(settings.threads, 1);
        assert!(!settings.quiet);
        assert_eq!(settings.requests, 10_000);
        assert_eq!(settings.header, "X-Node-ID");
        assert_eq!(settings.method, "GET");
        assert_eq!(settings.queue_capacity, 1000);
        assert_eq!(settings.budget(), RequestBudget::Limited(10_000));
    }

    #[test]
    fn test_cli_parsing_accepts_negative_requests() {
        let args = Args::try_parse_from(["hanalyzer", "-r", "-1", "-t", "4", "http://x/"]).unwrap();
        assert_eq!(args.requests, Some(-1));
        assert_eq!(args.threads, Some(4));

        let settings = Settings::load_with_env(&args, no_env()).unwrap();
        assert_eq!(settings.budget(), RequestBudget::Unbounded);
    }

    #[test]
    fn test_layering_cli_over_env_over_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "url = \"http://from-file/\"\nthreads = 3\nmethod = \"HEAD\"\nheader = \"X-Backend\""
        )
        .unwrap();

        let mut env = HashMap::new();
        env.insert("HANALYZER_THREADS".to_string(), "5".to_string());
        env.insert("HANALYZER_QUEUE_CAPACITY".to_string(), "16".to_string());
        let env = Environment::with_prefix(ENV_PREFIX).try_parsing(true).source(Some(env));

        let args = Args {
            config: Some(file.path().to_path_buf()),
            method: Some("post".to_string()),
            ..Args::default()
        };
        let settings = Settings::load_with_env(&args, env).unwrap();

        assert_eq!(settings.url, "http://from-file/");
        assert_eq!(settings.threads, 5);
        assert_eq!(settings.queue_capacity, 16);
        assert_eq!(settings.header, "X-Backend");
        assert_eq!(settings.http_method().unwrap(), Method::POST);
    }

    #[test]
    fn test_validation_failures() {
        let base = args_for("http://lb.local/");

        let args = Args { threads: Some(0), ..base };
        assert!(matches!(
            Settings::load_with_env(&args, no_env()),
            Err(Error::InvalidSetting { name: "threads", .. })
        ));

        let args = Args { requests: Some(-2), ..args_for("http://lb.local/") };
        assert!(matches!(
            Settings::load_with_env(&args, no_env()),
            Err(Error::InvalidSetting { name: "requests", .. })
        ));

        let args = Args { header: Some("bad header".into()), ..args_for("http://lb.local/") };
        assert!(matches!(
            Settings::load_with_env(&args, no_env()),
            Err(Error::InvalidSetting { name: "header", .. })
        ));

        assert!(matches!(
            Settings::load_with_env(&args_for("ftp://lb.local/"), no_env()),
            Err(Error::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_missing_url_is_a_config_error() {
        assert!(matches!(
            Settings::load_with_env(&Args::default(), no_env()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_budget_take() {
        let mut budget = RequestBudget::Limited(2);
        assert!(budget.take());
        assert!(budget.take());
        assert!(!budget.take());
        assert_eq!(budget, RequestBudget::Limited(0));

        let mut forever = RequestBudget::Unbounded;
        for _ in 0..100 {
            assert!(forever.take());
        }
    }
}
