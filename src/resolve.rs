use std::collections::BTreeMap;

use crate::catalogue::ConceptCatalogue;
use crate::error::ExtractError;
use crate::parsing::{ContextRegistry, DocumentIndex};

/// Maps abstract concepts to the concrete tag a filer used.
///
/// Resolution walks the catalogue's candidate list (primary, then aliases in
/// order) and returns the first tag with at least one surviving fact in the
/// filing. The primary wins regardless of where tags appear in the document.
pub struct ConceptResolver<'a> {
    catalogue: &'a ConceptCatalogue,
    index: &'a DocumentIndex,
    registry: &'a ContextRegistry,
}

impl<'a> ConceptResolver<'a> {
    pub fn new(
        catalogue: &'a ConceptCatalogue,
        index: &'a DocumentIndex,
        registry: &'a ContextRegistry,
    ) -> Self {
        Self {
            catalogue,
            index,
            registry,
        }
    }

    /// Resolves one concept to a tag.
    ///
    /// `UnknownConcept` means the catalogue and the caller disagree and is
    /// always fatal. `ConceptNotFound` means this filer never reported the
    /// concept under any known tag; callers record the concept as absent and
    /// continue.
    pub fn resolve(&self, concept: &str) -> Result<&'a str, ExtractError> {
        let definition = self
            .catalogue
            .get(concept)
            .ok_or_else(|| ExtractError::UnknownConcept(concept.to_string()))?;

        for tag in definition.candidates() {
            if self.has_surviving_facts(tag) {
                log::debug!("concept {} resolved to tag {}", concept, tag);
                return Ok(tag);
            }
        }

        Err(ExtractError::ConceptNotFound(concept.to_string()))
    }

    /// Resolves a batch of concepts independently. A concept absent from the
    /// filing becomes `None`; it never aborts the rest of the batch. A
    /// concept absent from the catalogue still fails the whole call.
    pub fn resolve_all(
        &self,
        concepts: &[&str],
    ) -> Result<BTreeMap<String, Option<String>>, ExtractError> {
        let mut resolved = BTreeMap::new();
        for &concept in concepts {
            match self.resolve(concept) {
                Ok(tag) => {
                    resolved.insert(concept.to_string(), Some(tag.to_string()));
                }
                Err(e) if e.is_recoverable() => {
                    log::info!("concept {} not found in filing", concept);
                    resolved.insert(concept.to_string(), None);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(resolved)
    }

    fn has_surviving_facts(&self, tag: &str) -> bool {
        self.index
            .facts_for(tag)
            .is_some_and(|facts| facts.iter().any(|f| self.registry.survives(f)))
    }
}
