//! Error types for this crate.
//!
//! All fallible operations return [`Result<T>`] which uses [`PipelineError`] as the error type.

use thiserror::Error;

/// A [`Result`](std::result::Result) alias using [`PipelineError`] as the error type.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// The unified error type for all crate errors.
///
/// Every variant aborts the current run. Per-row failures during scoring can be
/// downgraded to warnings with [`RowFailurePolicy::Skip`](crate::tweets::RowFailurePolicy).
///
/// # Example
///
/// ```rust,no_run
/// use tweet_topics::error::PipelineError;
///
/// fn handle_error(e: PipelineError) {
///     match &e {
///         PipelineError::SourceNotFound(_) | PipelineError::Schema(_) => {
///             // Bad input file - fix the path or the header row
///         }
///         PipelineError::ModelUnavailable(_) => {
///             // Network or cache issue - retry later
///         }
///         PipelineError::Encoding(_) => {
///             // Input too long or tokenizer mismatch
///         }
///         _ => eprintln!("pipeline failed: {e}"),
///     }
/// }
/// ```
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PipelineError {
    /// The tweet source could not be located or opened.
    #[error("{0}")]
    SourceNotFound(String),

    /// The tweet source is missing required columns.
    #[error("{0}")]
    Schema(String),

    /// A row of the tweet source could not be parsed.
    #[error("malformed row at line {line}: {reason}")]
    MalformedRow {
        /// 1-based line number in the source, header included.
        line: u64,
        /// What failed to parse.
        reason: String,
    },

    /// The pretrained encoder or its tokenizer could not be acquired.
    #[error("{0}")]
    ModelUnavailable(String),

    /// Tokenization or the encoder forward pass failed.
    #[error("{0}")]
    Encoding(String),

    /// Caller-supplied text or labels were rejected.
    #[error("{0}")]
    InvalidInput(String),

    /// Device initialization failure. Fall back to CPU.
    #[error("{0}")]
    Device(String),

    /// The scored snapshot could not be written.
    #[error("{0}")]
    Persist(String),

    /// Internal error. Report if seen.
    #[error("{0}")]
    Unexpected(String),
}

impl From<hf_hub::api::sync::ApiError> for PipelineError {
    fn from(value: hf_hub::api::sync::ApiError) -> Self {
        PipelineError::ModelUnavailable(format!("HuggingFace API error: {value}"))
    }
}

impl From<candle_core::Error> for PipelineError {
    fn from(value: candle_core::Error) -> Self {
        PipelineError::Encoding(value.to_string())
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(value: std::io::Error) -> Self {
        PipelineError::Unexpected(value.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(value: serde_json::Error) -> Self {
        PipelineError::Unexpected(value.to_string())
    }
}

impl From<csv::Error> for PipelineError {
    fn from(value: csv::Error) -> Self {
        match value.position() {
            Some(pos) => PipelineError::MalformedRow {
                line: pos.line(),
                reason: value.to_string(),
            },
            None => PipelineError::Unexpected(value.to_string()),
        }
    }
}
