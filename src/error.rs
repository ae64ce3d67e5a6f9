//!
//! Error types of model-type resolution and graph/flat conversion
//!
use crate::common::StateId;
use std::path::PathBuf;
use thiserror::Error;

///
/// Errors raised while editing, resolving or converting a HMM.
///
#[derive(Error, Debug)]
pub enum HmmError {
    /// type selector of the editor properties is not Discrete/Continuous/DiscretePair
    #[error("invalid model family selector: {0}")]
    InvalidFamily(i64),

    /// bitmask combines incompatible family bits or carries unknown bits
    #[error("unsupported model type {bits:#x}: {reason}")]
    UnsupportedModelType { bits: u32, reason: String },

    /// transition read/written with a class count it was not built for
    #[error("invalid transition class count: expected {expected}, found {found}")]
    InvalidClassCount { expected: usize, found: usize },

    /// emission parameter length does not match the alphabet
    #[error("emission shape mismatch for {owner}: expected {expected} parameters, found {found}")]
    EmissionShapeMismatch {
        owner: String,
        expected: usize,
        found: usize,
    },

    /// emission order is zero or its table would not fit in memory
    #[error("no emission table of order {order} over {size} symbols")]
    InvalidOrder { order: u32, size: usize },

    /// a state lacks an attribute its model type mandates
    #[error("state {state} has no `{attribute}` attribute required by the model type")]
    InconsistentModelType {
        state: StateId,
        attribute: &'static str,
    },

    /// file carries more than one embedded model
    #[error("file contains {0} models, only one model per file is supported")]
    MultiModelUnsupported(usize),

    /// dangling id/code reference or malformed array in a flat record
    #[error("corrupt record: {0}")]
    CorruptRecord(String),

    #[error("unknown symbol `{0}`")]
    UnknownSymbol(String),

    #[error("index {index} out of range 0..{size}")]
    IndexOutOfRange { index: usize, size: usize },

    #[error("symbol `{0}` is already in the alphabet")]
    DuplicateSymbol(String),

    #[error("unknown state {0}")]
    UnknownState(StateId),

    #[error("transition {0} -> {1} already exists")]
    DuplicateTransition(StateId, StateId),

    #[error("no transition {0} -> {1}")]
    UnknownTransition(StateId, StateId),

    /// weight outside of `[0, 1]`
    #[error("invalid weight {0}, must be in [0, 1]")]
    InvalidWeight(f64),

    #[error("unknown file type: {}", .0.display())]
    UnknownFileType(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias with `HmmError`
pub type Result<T> = std::result::Result<T, HmmError>;

impl HmmError {
    /// Create an `UnsupportedModelType` error
    pub fn unsupported(bits: u32, reason: impl Into<String>) -> Self {
        HmmError::UnsupportedModelType {
            bits,
            reason: reason.into(),
        }
    }
    /// Create a `CorruptRecord` error
    pub fn corrupt(message: impl Into<String>) -> Self {
        HmmError::CorruptRecord(message.into())
    }
}
