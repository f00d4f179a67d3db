//! Error types for the analyzer.

use thiserror::Error;

/// Errors that can stop a run before or while the display is up.
///
/// Per-probe failures never show up here; see [`crate::probe::ProbeError`].
#[derive(Debug, Error)]
pub enum Error {
    /// Layered configuration could not be built or deserialized.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// A setting was present but out of range.
    #[error("Invalid setting `{name}`: {reason}")]
    InvalidSetting { name: &'static str, reason: String },

    /// The target URL could not be parsed.
    #[error("Invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    /// Terminal setup, drawing or restore failed.
    #[error("Terminal error: {0}")]
    Terminal(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
