//! Error types for the fallible edges of the crate.
//!
//! The engine itself never fails; unassignable trips are reported as warnings
//! in the result.

use thiserror::Error;

/// Invalid or unreadable assignment options.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("night shift cutoff hour must be in 0..=23, got {0}")]
    InvalidCutoffHour(u32),

    #[error("minimum separation of {0} hours exceeds one week")]
    SeparationTooLarge(u32),

    #[error("invalid options document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failures of the language-model proposal path.
#[derive(Debug, Error)]
pub enum ProposalError {
    /// Transport failure talking to the completion endpoint.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status.
    #[error("completion endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Endpoint answered but without any message content.
    #[error("completion response had no content")]
    EmptyResponse,

    /// The reply text contained no JSON object.
    #[error("no JSON object found in response")]
    NoJson,

    /// The extracted JSON did not match the expected shape.
    #[error("malformed proposal JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failures reported by a repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("unknown trip: {0}")]
    UnknownTrip(String),

    #[error("unknown driver: {0}")]
    UnknownDriver(String),

    #[error("trip {0} already has a committed assignment")]
    AlreadyAssigned(String),

    #[error("store lock poisoned")]
    Poisoned,
}
