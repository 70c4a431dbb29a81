pub mod catalogue;
pub mod disambiguate;
pub mod engine;
pub mod error;
pub mod parsing;
pub mod resolve;
pub mod series;

// Re-exports
pub use catalogue::{Category, ConceptCatalogue, ConceptDefinition};
pub use engine::{Extraction, ExtractionDiagnostics, ExtractionEngine};
pub use error::ExtractError;
pub use series::ExtractionResult;
