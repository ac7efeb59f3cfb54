//! Error types for test selection

/// Test selection error type
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FilterError {
    /// Exclusion is not a plain test identifier
    #[error("invalid test identifier {0:?}")]
    InvalidIdentifier(String),

    /// Identifier is an operator of the `-k` expression language
    #[error("{0:?} is a filter expression keyword, not a test identifier")]
    ReservedKeyword(String),

    /// Same identifier excluded twice
    #[error("test identifier {0:?} excluded more than once")]
    DuplicateIdentifier(String),

    /// Name matches no supported library
    #[error("unknown library {0:?}, expected httpstan or pystan")]
    UnknownLibrary(String),

    /// Identifier pattern failed to compile
    #[error("identifier pattern: {0}")]
    Pattern(#[from] regex::Error),
}
