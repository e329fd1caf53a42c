use thiserror::Error;

/// Failures of store-level operations.
///
/// Every variant is a local, recoverable condition: operating on a missing
/// path, colliding with an occupied path, or using a folder where a file is
/// required. None of these abort the store; callers match and recover.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Path already exists: {0}")]
    AlreadyExists(String),

    #[error("Path is not a file: {0}")]
    NotAFile(String),

    #[error("Path is not a folder: {0}")]
    NotAFolder(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Failures of patch operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// The operation's recorded old text no longer matches live content.
    /// Carries both sides so the caller can drive resolution; the target
    /// content is never partially mutated.
    #[error("Content mismatch at {path}:{line}: expected {expected:?}, found {actual:?}")]
    ContentMismatch {
        path: String,
        line: usize,
        expected: String,
        actual: String,
    },

    #[error("Line range {start}..={end} is out of range for {path} ({line_count} lines)")]
    LineOutOfRange {
        path: String,
        start: usize,
        end: usize,
        line_count: usize,
    },

    #[error("Target file not found: {0}")]
    FileNotFound(String),

    #[error("Operation has no line range: {0}")]
    MissingRange(String),
}
