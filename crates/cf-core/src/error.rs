//! Error types for CurveForge

use thiserror::Error;

use crate::ValueKind;

/// Core error type
#[derive(Error, Debug)]
pub enum CfError {
    #[error("Capacity exceeded: at most {max} automations per track")]
    CapacityExceeded { max: usize },

    #[error("Value kind mismatch: expected {expected}, found {found}")]
    KindMismatch { expected: ValueKind, found: ValueKind },

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Lock contention: curve busy past the render budget")]
    LockContention,

    #[error("Parameter already automated: {0}")]
    AlreadyBound(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias
pub type CfResult<T> = Result<T, CfError>;
