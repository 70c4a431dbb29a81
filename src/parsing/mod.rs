pub mod context;
pub mod document;

pub use context::{ContextDescriptor, ContextRegistry, PeriodKind, UnitDescriptor};
pub use document::{DocumentIndex, RawFact};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ExtractError;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Locates the instance document(s) among one filing's file set.
///
/// A filing arrives as a bag of files: the instance document plus auxiliary
/// schema and label files, none of them predictably named. Anything that
/// parses as XML with an `xbrl` root element is an instance document; the
/// rest (XSD schemas, linkbases, stray text) is skipped. Returned contents
/// are whitespace-normalized and ready for indexing.
pub fn locate_instance_documents(files: &[String]) -> Result<Vec<String>, ExtractError> {
    let mut instances = Vec::new();

    for (i, raw) in files.iter().enumerate() {
        let content = WHITESPACE.replace_all(raw, " ").to_string();
        match roxmltree::Document::parse(&content) {
            Ok(doc) if doc.root_element().tag_name().name() == "xbrl" => {
                log::debug!("input {} is an instance document", i);
                instances.push(content);
            }
            Ok(doc) => {
                log::debug!(
                    "skipping input {}: root element <{}> is not an instance document",
                    i,
                    doc.root_element().tag_name().name()
                );
            }
            Err(e) => {
                log::debug!("skipping unparseable input {}: {}", i, e);
            }
        }
    }

    if instances.is_empty() {
        return Err(ExtractError::MalformedDocument(format!(
            "no instance document among {} input file(s)",
            files.len()
        )));
    }

    Ok(instances)
}
