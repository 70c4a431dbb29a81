use std::collections::HashMap;

use crate::error::ExtractError;

/// One tagged occurrence exactly as it appears in the instance document.
///
/// `tag` is the namespace-stripped local name: `us-gaap:NetIncomeLoss` and a
/// filer's own prefixed variant of the same local name index identically.
/// The value is kept as text; numeric interpretation happens at selection
/// time so non-numeric facts pass through unparsed.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFact {
    pub tag: String,
    pub prefix: String,
    pub value: String,
    pub context_ref: Option<String>,
    pub unit_ref: Option<String>,
    pub decimals: Option<String>,
    /// Position across the whole filing, in document order. Restated values
    /// are conventionally re-emitted later, so higher wins ties.
    pub doc_order: usize,
}

impl RawFact {
    pub fn numeric_value(&self) -> Option<f64> {
        self.value.trim().parse::<f64>().ok()
    }
}

/// In-memory index of one filing: tag local-name to its facts in document
/// order. Built once per filing, discarded after extraction.
#[derive(Debug, Default)]
pub struct DocumentIndex {
    facts: HashMap<String, Vec<RawFact>>,
    fact_count: usize,
}

impl DocumentIndex {
    /// Indexes every fact element in the given instance documents.
    ///
    /// Inputs are the already-located instance documents (see
    /// [`crate::parsing::locate_instance_documents`]); multiple instance
    /// documents merge into one index with a shared document order.
    pub fn parse(instances: &[String]) -> Result<Self, ExtractError> {
        let mut facts: HashMap<String, Vec<RawFact>> = HashMap::new();
        let mut fact_count = 0usize;

        // Declarations and linkbase housekeeping living under the root, not
        // reported facts.
        let non_fact_ele = [
            "context",
            "unit",
            "xbrl",
            "schemaRef",
            "linkbaseRef",
            "roleRef",
            "arcroleRef",
            "footnoteLink",
        ];

        for content in instances {
            let xml_tree = roxmltree::Document::parse(content)
                .map_err(|e| ExtractError::MalformedDocument(e.to_string()))?;

            let fact_ele = xml_tree
                .root_element()
                .children()
                .filter(|e| e.is_element())
                .filter(|e| {
                    !non_fact_ele.contains(&e.tag_name().name())
                        && e.tag_name().namespace().is_some()
                });

            for child in fact_ele {
                let name = child.tag_name().name().to_string();
                let namespace = child.tag_name().namespace().unwrap_or("");
                let prefix = child.lookup_prefix(namespace).unwrap_or("");
                let value = child.text().unwrap_or("").trim().to_string();

                let fact = RawFact {
                    tag: name.clone(),
                    prefix: prefix.to_string(),
                    value,
                    context_ref: child.attribute("contextRef").map(str::to_string),
                    unit_ref: child.attribute("unitRef").map(str::to_string),
                    decimals: child.attribute("decimals").map(str::to_string),
                    doc_order: fact_count,
                };
                fact_count += 1;

                log::debug!(
                    "fact {}:{} context={} unit={}",
                    fact.prefix,
                    fact.tag,
                    fact.context_ref.as_deref().unwrap_or("-"),
                    fact.unit_ref.as_deref().unwrap_or("-")
                );

                facts.entry(name).or_default().push(fact);
            }
        }

        log::info!(
            "document index built: {} facts across {} tags",
            fact_count,
            facts.len()
        );

        Ok(Self { facts, fact_count })
    }

    /// Facts for a tag local-name, in document order.
    pub fn facts_for(&self, tag: &str) -> Option<&[RawFact]> {
        self.facts.get(tag).map(Vec::as_slice)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.facts.get(tag).is_some_and(|f| !f.is_empty())
    }

    pub fn fact_count(&self) -> usize {
        self.fact_count
    }

    pub fn tag_count(&self) -> usize {
        self.facts.len()
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.facts.keys().map(String::as_str)
    }
}
