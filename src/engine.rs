use serde::Serialize;

use crate::catalogue::ConceptCatalogue;
use crate::disambiguate::DisambiguationPolicy;
use crate::error::ExtractError;
use crate::parsing::{self, ContextRegistry, DocumentIndex};
use crate::resolve::ConceptResolver;
use crate::series::{ExtractionResult, ResolvedConcept, TimeSeriesBuilder};

/// Counts surfaced alongside the result instead of being printed: what was
/// indexed, what was dropped, what never resolved.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionDiagnostics {
    pub facts_indexed: usize,
    pub facts_dropped: usize,
    pub concepts_requested: usize,
    pub concepts_resolved: usize,
    pub unresolved: Vec<String>,
}

/// A completed extraction. Always returned unless the filing itself was
/// unreadable; absence shows up as sentinels in the result, not as errors.
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    pub result: ExtractionResult,
    pub diagnostics: ExtractionDiagnostics,
}

/// Per-filing orchestration: index the documents once, then resolve,
/// disambiguate and collect every requested concept.
pub struct ExtractionEngine<'a> {
    catalogue: &'a ConceptCatalogue,
    policy: DisambiguationPolicy,
}

impl<'a> ExtractionEngine<'a> {
    pub fn new(catalogue: &'a ConceptCatalogue) -> Self {
        Self {
            catalogue,
            policy: DisambiguationPolicy::default(),
        }
    }

    pub fn with_policy(catalogue: &'a ConceptCatalogue, policy: DisambiguationPolicy) -> Self {
        Self { catalogue, policy }
    }

    /// Extracts every catalogued concept from one filing's file set.
    pub fn extract(&self, files: &[String]) -> Result<Extraction, ExtractError> {
        let names: Vec<&str> = self.catalogue.names().collect();
        self.extract_concepts(files, &names)
    }

    /// Extracts a catalogue subset. One concept missing from the filing
    /// never aborts the others; an unknown concept name or an unreadable
    /// filing does.
    pub fn extract_concepts(
        &self,
        files: &[String],
        concepts: &[&str],
    ) -> Result<Extraction, ExtractError> {
        let instances = parsing::locate_instance_documents(files)?;
        let index = DocumentIndex::parse(&instances)?;
        let registry = ContextRegistry::parse(&instances)?;
        let resolver = ConceptResolver::new(self.catalogue, &index, &registry);

        // Dangling-reference drops are a property of the filing, counted
        // over the whole index: drops on a primary tag that failed to
        // resolve still show up here.
        let facts_dropped = index
            .tags()
            .filter_map(|tag| index.facts_for(tag))
            .flatten()
            .filter(|fact| !registry.survives(fact))
            .count();

        let mut diagnostics = ExtractionDiagnostics {
            facts_indexed: index.fact_count(),
            facts_dropped,
            concepts_requested: concepts.len(),
            ..Default::default()
        };

        let mut builder = TimeSeriesBuilder::new();

        for &name in concepts {
            let definition = self
                .catalogue
                .get(name)
                .ok_or_else(|| ExtractError::UnknownConcept(name.to_string()))?;

            match resolver.resolve(name) {
                Ok(tag) => {
                    let all = index.facts_for(tag).unwrap_or(&[]);
                    let surviving = registry.surviving_facts(all);

                    let values = self.policy.select_by_year(&surviving, &registry);
                    diagnostics.concepts_resolved += 1;
                    builder.push(
                        definition.category,
                        ResolvedConcept {
                            name: name.to_string(),
                            tag: Some(tag.to_string()),
                            values,
                        },
                    );
                }
                Err(e) if e.is_recoverable() => {
                    log::info!("concept {} absent from filing", name);
                    diagnostics.unresolved.push(name.to_string());
                    builder.push(definition.category, ResolvedConcept::absent(name));
                }
                Err(e) => return Err(e),
            }
        }

        diagnostics.unresolved.sort();
        log::info!(
            "extraction complete: {}/{} concepts resolved, {} facts dropped",
            diagnostics.concepts_resolved,
            diagnostics.concepts_requested,
            diagnostics.facts_dropped
        );

        Ok(Extraction {
            result: builder.build(),
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::Category;

    const FILING: &str = r#"
        <xbrli:xbrl xmlns:xbrli="http://www.xbrl.org/2003/instance"
                    xmlns:us-gaap="http://fasb.org/us-gaap/2023">
            <xbrli:context id="FY2023">
                <xbrli:period>
                    <xbrli:startDate>2023-01-01</xbrli:startDate>
                    <xbrli:endDate>2023-12-31</xbrli:endDate>
                </xbrli:period>
            </xbrli:context>
            <xbrli:context id="EOY2023">
                <xbrli:period><xbrli:instant>2023-12-31</xbrli:instant></xbrli:period>
            </xbrli:context>
            <xbrli:unit id="usd"><xbrli:measure>iso4217:USD</xbrli:measure></xbrli:unit>
            <us-gaap:NetIncomeLoss contextRef="FY2023" unitRef="usd">100</us-gaap:NetIncomeLoss>
            <us-gaap:Assets contextRef="EOY2023" unitRef="usd">500</us-gaap:Assets>
            <us-gaap:Assets contextRef="dangling" unitRef="usd">999</us-gaap:Assets>
        </xbrli:xbrl>
    "#;

    #[test]
    fn one_missing_concept_does_not_abort_the_filing() {
        let engine = ExtractionEngine::new(ConceptCatalogue::builtin());
        let extraction = engine
            .extract_concepts(&[FILING.to_string()], &["NetIncome", "TotalAssets", "Revenue"])
            .unwrap();

        let result = &extraction.result;
        assert_eq!(result.years, vec![2023]);
        assert_eq!(
            result.series_for(Category::IncomeStatement, "NetIncome"),
            Some(&[Some(100.0)][..])
        );
        assert_eq!(
            result.series_for(Category::BalanceSheet, "TotalAssets"),
            Some(&[Some(500.0)][..])
        );
        // Absent concept keeps its key, filled with the sentinel.
        assert_eq!(
            result.series_for(Category::IncomeStatement, "Revenue"),
            Some(&[None][..])
        );
        assert_eq!(result.unresolved, vec!["Revenue".to_string()]);

        let diagnostics = &extraction.diagnostics;
        assert_eq!(diagnostics.concepts_requested, 3);
        assert_eq!(diagnostics.concepts_resolved, 2);
        assert_eq!(diagnostics.facts_dropped, 1);
        assert_eq!(diagnostics.unresolved, vec!["Revenue".to_string()]);
    }

    #[test]
    fn drops_on_a_primary_forced_to_alias_fallback_are_still_counted() {
        // Every NetIncomeLoss fact dangles, so resolution falls through to
        // ProfitLoss; the dropped primary facts must still reach the
        // diagnostics.
        let filing = r#"
            <xbrli:xbrl xmlns:xbrli="http://www.xbrl.org/2003/instance"
                        xmlns:us-gaap="http://fasb.org/us-gaap/2023">
                <xbrli:context id="FY2023">
                    <xbrli:period>
                        <xbrli:startDate>2023-01-01</xbrli:startDate>
                        <xbrli:endDate>2023-12-31</xbrli:endDate>
                    </xbrli:period>
                </xbrli:context>
                <xbrli:unit id="usd"><xbrli:measure>iso4217:USD</xbrli:measure></xbrli:unit>
                <us-gaap:NetIncomeLoss contextRef="nosuchcontext" unitRef="usd">120</us-gaap:NetIncomeLoss>
                <us-gaap:ProfitLoss contextRef="FY2023" unitRef="usd">100</us-gaap:ProfitLoss>
            </xbrli:xbrl>
        "#;

        let engine = ExtractionEngine::new(ConceptCatalogue::builtin());
        let extraction = engine
            .extract_concepts(&[filing.to_string()], &["NetIncome"])
            .unwrap();

        assert_eq!(
            extraction
                .result
                .series_for(Category::IncomeStatement, "NetIncome"),
            Some(&[Some(100.0)][..])
        );
        assert_eq!(extraction.diagnostics.facts_dropped, 1);
        assert_eq!(extraction.diagnostics.concepts_resolved, 1);
    }

    #[test]
    fn unknown_concept_aborts_the_batch() {
        let engine = ExtractionEngine::new(ConceptCatalogue::builtin());
        let err = engine
            .extract_concepts(&[FILING.to_string()], &["NetIncome", "NotAConcept"])
            .unwrap_err();
        assert!(matches!(err, ExtractError::UnknownConcept(_)));
    }

    #[test]
    fn unreadable_filing_aborts_extraction() {
        let engine = ExtractionEngine::new(ConceptCatalogue::builtin());
        let err = engine
            .extract(&["<html>this is not a filing</html>".to_string()])
            .unwrap_err();
        assert!(matches!(err, ExtractError::MalformedDocument(_)));
    }
}
