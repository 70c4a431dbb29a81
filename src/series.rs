use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::catalogue::Category;

/// One concept after resolution and disambiguation: the tag that matched
/// (None when the filer never reported the concept) and one value per fiscal
/// year it was reported in.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConcept {
    pub name: String,
    pub tag: Option<String>,
    pub values: BTreeMap<i32, f64>,
}

impl ResolvedConcept {
    /// A concept the filing never reported: present in the output with the
    /// missing-value sentinel across every year, never a missing key.
    pub fn absent(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: None,
            values: BTreeMap::new(),
        }
    }
}

/// Per-filing output: every concept's series re-expressed on one common
/// ascending fiscal-year axis.
///
/// Invariants: every series has the same length as `years`; the final
/// element is the most recent fiscal year; missing entries are `None`,
/// which is distinguishable from a reported zero by construction.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionResult {
    pub years: Vec<i32>,
    pub series: BTreeMap<Category, BTreeMap<String, Vec<Option<f64>>>>,
    /// Concepts the filing never reported under any catalogued tag.
    pub unresolved: Vec<String>,
}

impl ExtractionResult {
    pub fn series_for(&self, category: Category, concept: &str) -> Option<&[Option<f64>]> {
        self.series
            .get(&category)
            .and_then(|concepts| concepts.get(concept))
            .map(Vec::as_slice)
    }

    pub fn latest_year(&self) -> Option<i32> {
        self.years.last().copied()
    }

    pub fn concept_count(&self) -> usize {
        self.series.values().map(BTreeMap::len).sum()
    }
}

/// Aggregates independently disambiguated concepts onto a common year axis.
#[derive(Debug, Default)]
pub struct TimeSeriesBuilder {
    concepts: Vec<(Category, ResolvedConcept)>,
}

impl TimeSeriesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, category: Category, concept: ResolvedConcept) {
        self.concepts.push((category, concept));
    }

    pub fn build(self) -> ExtractionResult {
        let years: Vec<i32> = self
            .concepts
            .iter()
            .flat_map(|(_, c)| c.values.keys().copied())
            .collect::<BTreeSet<i32>>()
            .into_iter()
            .collect();

        let mut series: BTreeMap<Category, BTreeMap<String, Vec<Option<f64>>>> = BTreeMap::new();
        let mut unresolved = Vec::new();

        for (category, concept) in self.concepts {
            let aligned: Vec<Option<f64>> = years
                .iter()
                .map(|year| concept.values.get(year).copied())
                .collect();
            if concept.tag.is_none() {
                unresolved.push(concept.name.clone());
            }
            series
                .entry(category)
                .or_default()
                .insert(concept.name, aligned);
        }

        unresolved.sort();
        ExtractionResult {
            years,
            series,
            unresolved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concept(name: &str, tag: &str, values: &[(i32, f64)]) -> ResolvedConcept {
        ResolvedConcept {
            name: name.to_string(),
            tag: Some(tag.to_string()),
            values: values.iter().copied().collect(),
        }
    }

    #[test]
    fn all_series_share_one_ascending_axis() {
        let mut builder = TimeSeriesBuilder::new();
        builder.push(
            Category::IncomeStatement,
            concept("NetIncome", "NetIncomeLoss", &[(2022, 90.0), (2023, 100.0)]),
        );
        builder.push(
            Category::BalanceSheet,
            concept("TotalAssets", "Assets", &[(2021, 400.0), (2023, 500.0)]),
        );

        let result = builder.build();
        assert_eq!(result.years, vec![2021, 2022, 2023]);
        assert_eq!(result.latest_year(), Some(2023));

        let net_income = result
            .series_for(Category::IncomeStatement, "NetIncome")
            .unwrap();
        let assets = result
            .series_for(Category::BalanceSheet, "TotalAssets")
            .unwrap();
        assert_eq!(net_income.len(), result.years.len());
        assert_eq!(assets.len(), result.years.len());

        // Years the concept lacks carry the sentinel, never zero.
        assert_eq!(net_income, &[None, Some(90.0), Some(100.0)]);
        assert_eq!(assets, &[Some(400.0), None, Some(500.0)]);
    }

    #[test]
    fn reported_zero_is_distinguishable_from_missing() {
        let mut builder = TimeSeriesBuilder::new();
        builder.push(
            Category::CashFlow,
            concept("DividendsPaid", "PaymentsOfDividends", &[(2023, 0.0)]),
        );
        builder.push(
            Category::CashFlow,
            ResolvedConcept::absent("StockBasedCompensation"),
        );

        let result = builder.build();
        assert_eq!(
            result.series_for(Category::CashFlow, "DividendsPaid"),
            Some(&[Some(0.0)][..])
        );
        assert_eq!(
            result.series_for(Category::CashFlow, "StockBasedCompensation"),
            Some(&[None][..])
        );
    }

    #[test]
    fn absent_concepts_keep_their_key_and_are_marked_unresolved() {
        let mut builder = TimeSeriesBuilder::new();
        builder.push(
            Category::IncomeStatement,
            concept("NetIncome", "NetIncomeLoss", &[(2022, 90.0), (2023, 100.0)]),
        );
        builder.push(Category::IncomeStatement, ResolvedConcept::absent("Revenue"));

        let result = builder.build();
        let revenue = result
            .series_for(Category::IncomeStatement, "Revenue")
            .unwrap();
        assert_eq!(revenue, &[None, None]);
        assert_eq!(result.unresolved, vec!["Revenue".to_string()]);
    }

    #[test]
    fn empty_builder_yields_an_empty_result() {
        let result = TimeSeriesBuilder::new().build();
        assert!(result.years.is_empty());
        assert!(result.series.is_empty());
        assert_eq!(result.latest_year(), None);
    }
}
