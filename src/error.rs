//! Error types for the restaurant insight orchestrator

use std::time::Duration;
use thiserror::Error;

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestrationError>;

#[derive(Error, Debug)]
pub enum OrchestrationError {

    // =============================
    // Core Pipeline Errors
    // =============================

    #[error("Planning error: {0}")]
    PlanningError(String),

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Contract violation: {0}")]
    ContractViolation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("LLM API returned {status}: {body}")]
    LlmStatus { status: u16, body: String },

    #[error("Supplementary data error: {0}")]
    SupplementaryError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),
}

impl OrchestrationError {
    /// Whether retrying the same generative call could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            OrchestrationError::Timeout(_) => true,
            OrchestrationError::LlmStatus { status, .. } => *status == 429 || *status >= 500,
            OrchestrationError::HttpError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}
