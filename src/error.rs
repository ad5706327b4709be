//! Error types for stage access, value coercion and configuration

use crate::stage::{SdfPath, ValueKind};

/// Failure of a command or lookup against a stage
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StageError {
    /// No prim exists at the path
    #[error("prim not found: {0}")]
    UnknownPrim(SdfPath),

    /// No attribute exists at the path
    #[error("attribute not found: {0}")]
    UnknownAttribute(SdfPath),

    /// The value kind doesn't match the attribute's declared kind
    #[error("cannot write {actual} value to {path} (declared {expected})")]
    KindMismatch {
        path: SdfPath,
        expected: ValueKind,
        actual: ValueKind,
    },

    /// The attribute already exists and can't be created again
    #[error("attribute already exists: {0}")]
    AttributeExists(SdfPath),

    /// No layer with this identifier is part of the stage
    #[error("layer not found: {0}")]
    UnknownLayer(String),

    /// The undo history is empty
    #[error("nothing to undo")]
    NothingToUndo,
}

/// A value couldn't be converted to an attribute kind
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("cannot convert {value:?} to {kind}")]
pub struct CoercionError {
    pub kind: ValueKind,
    pub value: String,
}

impl CoercionError {
    pub fn new(kind: ValueKind, value: impl ToString) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Loading or interpreting the configuration failed
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid node identifier pattern: {0}")]
    Pattern(#[from] regex::Error),
}
