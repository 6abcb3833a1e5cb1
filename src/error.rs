//! Rich diagnostic error types for the study planner.
//!
//! Stage modules define their own error enums with miette `#[diagnostic]`
//! derives (error codes plus help text). `PlannerError` wraps them so the
//! pipeline and the CLI can propagate any stage failure with `?` while keeping
//! the full diagnostic chain intact.

use miette::Diagnostic;
use thiserror::Error;

use crate::history::HistoryError;
use crate::predict::PredictError;
use crate::reason::invoke::InvokeError;
use crate::reason::parse::ParseError;

/// Top-level error type for the planner.
#[derive(Debug, Error, Diagnostic)]
pub enum PlannerError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Invoke(#[from] InvokeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Predict(#[from] PredictError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(planner::config::read),
        help("Create one with `studyplan init` or pass --config with an existing TOML file.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    #[diagnostic(
        code(planner::config::parse),
        help("Check the TOML syntax of the config file.")
    )]
    Parse { path: String, message: String },

    #[error("missing required config key \"{key}\"")]
    #[diagnostic(
        code(planner::config::missing_key),
        help(
            "Add `{key} = <value>` to planner.toml. Both `daily_capacity_min` and \
             `near_deadline_days` are required before facts can be derived."
        )
    )]
    MissingKey { key: String },

    #[error("invalid value for config key \"{key}\": {message}")]
    #[diagnostic(
        code(planner::config::invalid),
        help("Fix the value in planner.toml; see the defaults written by `studyplan init`.")
    )]
    Invalid { key: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(planner::config::write),
        help("Ensure you have write permissions to the project directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Artifact errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ArtifactError {
    #[error("failed to write artifact: {path}")]
    #[diagnostic(
        code(planner::artifact::write),
        help(
            "A stage output could not be written. Check that the project directory \
             exists, is writable, and that the disk is not full. The previous \
             artifact, if any, is left untouched."
        )
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read artifact: {path}")]
    #[diagnostic(
        code(planner::artifact::read),
        help("Run the stage that produces this artifact first (see `studyplan --help`).")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed artifact {path}: {message}")]
    #[diagnostic(
        code(planner::artifact::serde),
        help("The artifact is not in the expected format. Re-run the stage that produces it.")
    )]
    Serialization { path: String, message: String },
}

/// Convenience result type for planner operations.
pub type PlannerResult<T> = std::result::Result<T, PlannerError>;

/// Result type for configuration loading and validation.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type for artifact I/O.
pub type ArtifactResult<T> = std::result::Result<T, ArtifactError>;
