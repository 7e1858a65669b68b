//! Error taxonomy (§7). Internally the pipeline works with
//! [`PicoruleError`], a `thiserror` enum with one variant per taxonomy
//! entry; at the public boundary every error is converted into the flat
//! [`Error`] record, and the pipeline never panics or propagates a
//! `Result` across `compile`.

use serde::Serialize;
use thiserror::Error as ThisError;

/// Internal error taxonomy. One variant per §7 kind.
#[derive(Debug, Clone, ThisError)]
pub enum PicoruleError {
    #[error("ruleblock name '{name}' must match [a-z_][a-z0-9_]* and be 1..100 characters")]
    InvalidName { name: String },

    #[error("ruleblock '{name}' text exceeds the 1 MiB size ceiling")]
    TextTooLarge { name: String },

    #[error("unsupported dialect '{dialect}'")]
    UnsupportedDialect { dialect: String },

    #[error("ruleblock '{ruleblock}': invalid fetch statement: {detail}")]
    InvalidFetch { ruleblock: String, detail: String },

    #[error("ruleblock '{ruleblock}': invalid compute statement: {detail}")]
    InvalidCompute { ruleblock: String, detail: String },

    #[error("ruleblock '{ruleblock}': invalid bind statement: {detail}")]
    InvalidBind { ruleblock: String, detail: String },

    #[error("Circular dependency: {path}")]
    CircularDependency { path: String },

    #[error("ruleblock '{ruleblock}': unsupported function '{function}'")]
    UnsupportedFunction {
        ruleblock: String,
        function: String,
    },

    #[error("duplicate ruleblock name '{name}'")]
    DuplicateRuleblock { name: String },
}

impl PicoruleError {
    fn ruleblock_name(&self) -> Option<String> {
        match self {
            PicoruleError::InvalidName { name } => Some(name.clone()),
            PicoruleError::TextTooLarge { name } => Some(name.clone()),
            PicoruleError::InvalidFetch { ruleblock, .. } => Some(ruleblock.clone()),
            PicoruleError::InvalidCompute { ruleblock, .. } => Some(ruleblock.clone()),
            PicoruleError::InvalidBind { ruleblock, .. } => Some(ruleblock.clone()),
            PicoruleError::UnsupportedFunction { ruleblock, .. } => Some(ruleblock.clone()),
            PicoruleError::DuplicateRuleblock { name } => Some(name.clone()),
            PicoruleError::UnsupportedDialect { .. } => None,
            PicoruleError::CircularDependency { .. } => None,
        }
    }
}

/// Public error record (§6, §7). Returned by value — never raised.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Error {
    pub message: String,
    pub ruleblock: Option<String>,
    pub line: Option<usize>,
}

impl From<PicoruleError> for Error {
    fn from(err: PicoruleError) -> Self {
        Error {
            message: err.to_string(),
            ruleblock: err.ruleblock_name(),
            line: None,
        }
    }
}

/// Non-fatal diagnostic (e.g. an ignored `#` directive segment, §4.2/§7).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Warning {
    pub message: String,
    pub ruleblock: Option<String>,
}

impl Warning {
    pub fn new(ruleblock: impl Into<String>, message: impl Into<String>) -> Self {
        Warning {
            message: message.into(),
            ruleblock: Some(ruleblock.into()),
        }
    }
}
