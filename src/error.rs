use thiserror::Error;

/// Failure modes of a filing extraction.
///
/// Only `MalformedDocument` aborts a whole filing. `UnknownConcept` means the
/// catalogue and the caller are out of sync and is always a caller error.
/// `ConceptNotFound` is expected for filers that never report a concept and
/// must be absorbed by callers as an absent series, not propagated.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("malformed filing document: {0}")]
    MalformedDocument(String),

    #[error("unknown concept: {0}")]
    UnknownConcept(String),

    #[error("concept not found in filing: {0}")]
    ConceptNotFound(String),

    #[error("invalid concept catalogue: {0}")]
    InvalidCatalogue(String),
}

impl ExtractError {
    /// True for per-concept failures that callers record as absence and move on.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ExtractError::ConceptNotFound(_))
    }
}
