use std::cmp::Reverse;
use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use itertools::Itertools;

use crate::parsing::{ContextRegistry, PeriodKind, RawFact};

/// Annual-duration window in days. Fiscal years run 350-370 days; anything
/// shorter is a quarter or stub period, anything longer spans two years.
pub const FULL_YEAR_MIN_DAYS: i64 = 350;
pub const FULL_YEAR_MAX_DAYS: i64 = 370;

/// One preference applied while narrowing a year's candidate facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionRule {
    /// Prefer facts whose context has no dimensional segment members over
    /// segment or subsidiary breakdowns.
    ConsolidatedScope,
    /// Prefer facts denominated in the tag's dominant currency, filtering
    /// out values incidentally disclosed in another currency.
    ReportingCurrency,
    /// Prefer full-fiscal-year durations over quarters and stub periods;
    /// for instants, prefer the date closest to the fiscal year-end.
    PeriodCompleteness,
}

/// Ordered selection policy for picking one fact per fiscal year.
///
/// Rules narrow the candidate pool top to bottom and never empty it: a rule
/// matching nothing leaves the pool unchanged. Whatever ties remain are
/// settled by latest document order, since restated values are re-emitted
/// later in the document. That terminal tie-break is always applied and is
/// not configurable.
#[derive(Debug, Clone)]
pub struct DisambiguationPolicy {
    pub rules: Vec<SelectionRule>,
}

impl Default for DisambiguationPolicy {
    fn default() -> Self {
        Self {
            rules: vec![
                SelectionRule::ConsolidatedScope,
                SelectionRule::ReportingCurrency,
                SelectionRule::PeriodCompleteness,
            ],
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate<'f, 'r> {
    fact: &'f RawFact,
    period: PeriodKind,
    consolidated: bool,
    currency: Option<&'r str>,
    value: f64,
}

impl Candidate<'_, '_> {
    fn is_full_year(&self) -> bool {
        self.period
            .duration_days()
            .is_some_and(|d| (FULL_YEAR_MIN_DAYS..=FULL_YEAR_MAX_DAYS).contains(&d))
    }
}

impl DisambiguationPolicy {
    pub fn new(rules: Vec<SelectionRule>) -> Self {
        Self { rules }
    }

    /// Selects exactly one value per fiscal year from one tag's surviving
    /// facts. Years with zero surviving numeric facts get no entry, never a
    /// fabricated zero. Pure: identical inputs always yield identical
    /// selections.
    pub fn select_by_year(
        &self,
        facts: &[&RawFact],
        registry: &ContextRegistry,
    ) -> BTreeMap<i32, f64> {
        let candidates: Vec<Candidate> = facts
            .iter()
            .filter_map(|fact| {
                let value = fact.numeric_value()?;
                let context = registry.context(fact.context_ref.as_deref()?)?;
                let currency = fact
                    .unit_ref
                    .as_deref()
                    .and_then(|id| registry.unit_measure(id));
                Some(Candidate {
                    fact,
                    period: context.period,
                    consolidated: context.consolidated,
                    currency,
                    value,
                })
            })
            .collect();

        let dominant = dominant_currency(&candidates);
        let year_ends = fiscal_year_ends(registry);

        let mut by_year: BTreeMap<i32, Vec<Candidate>> = BTreeMap::new();
        for candidate in candidates {
            by_year
                .entry(candidate.period.fiscal_year())
                .or_default()
                .push(candidate);
        }

        let mut selected = BTreeMap::new();
        for (year, mut pool) in by_year {
            let year_end = year_ends.get(&year).copied();
            for rule in &self.rules {
                if pool.len() <= 1 {
                    break;
                }
                pool = apply_rule(*rule, pool, dominant, year_end);
            }
            if let Some(winner) = pool.into_iter().max_by_key(|c| c.fact.doc_order) {
                log::debug!(
                    "selected {}:{} = {} for fiscal year {}",
                    winner.fact.prefix,
                    winner.fact.tag,
                    winner.value,
                    year
                );
                selected.insert(year, winner.value);
            }
        }
        selected
    }
}

/// Most frequent currency among one tag's facts; ties break to the
/// lexicographically smallest code so the choice is deterministic.
fn dominant_currency<'r>(candidates: &[Candidate<'_, 'r>]) -> Option<&'r str> {
    candidates
        .iter()
        .filter_map(|c| c.currency)
        .counts()
        .into_iter()
        .max_by_key(|&(code, count)| (count, Reverse(code)))
        .map(|(code, _)| code)
}

/// Fiscal year-end per year, anchored to the annual duration contexts the
/// filing declares: the balance-sheet date of a fiscal year is the end date
/// of its full-year flow period, not December 31. Years with several annual
/// durations keep the latest end date.
fn fiscal_year_ends(registry: &ContextRegistry) -> BTreeMap<i32, NaiveDate> {
    let mut ends: BTreeMap<i32, NaiveDate> = BTreeMap::new();
    for context in registry.contexts() {
        if let PeriodKind::Duration { start, end } = context.period {
            let days = (end - start).num_days();
            if (FULL_YEAR_MIN_DAYS..=FULL_YEAR_MAX_DAYS).contains(&days) {
                let entry = ends.entry(end.year()).or_insert(end);
                if end > *entry {
                    *entry = end;
                }
            }
        }
    }
    ends
}

fn apply_rule<'f, 'r>(
    rule: SelectionRule,
    pool: Vec<Candidate<'f, 'r>>,
    dominant: Option<&'r str>,
    year_end: Option<NaiveDate>,
) -> Vec<Candidate<'f, 'r>> {
    let narrowed: Vec<Candidate> = match rule {
        SelectionRule::ConsolidatedScope => {
            pool.iter().copied().filter(|c| c.consolidated).collect()
        }
        SelectionRule::ReportingCurrency => match dominant {
            Some(code) => pool
                .iter()
                .copied()
                .filter(|c| c.currency == Some(code))
                .collect(),
            None => Vec::new(),
        },
        SelectionRule::PeriodCompleteness => {
            let full_year: Vec<Candidate> =
                pool.iter().copied().filter(|c| c.is_full_year()).collect();
            if !full_year.is_empty() {
                full_year
            } else {
                // Stock concepts: keep the instant dated closest to the
                // fiscal year-end. Non-calendar filers carry interim
                // instants dated later in the same calendar year, so
                // "latest" is only a fallback for filings that declare no
                // annual duration to anchor the year-end to.
                let instants = pool.iter().filter_map(|c| match c.period {
                    PeriodKind::Instant(date) => Some(date),
                    PeriodKind::Duration { .. } => None,
                });
                let best = match year_end {
                    Some(year_end) => instants
                        .min_by_key(|date| ((*date - year_end).num_days().abs(), *date)),
                    None => instants.max(),
                };
                match best {
                    Some(date) => pool
                        .iter()
                        .copied()
                        .filter(|c| c.period == PeriodKind::Instant(date))
                        .collect(),
                    None => Vec::new(),
                }
            }
        }
    };

    // A preference never eliminates every candidate.
    if narrowed.is_empty() {
        pool
    } else {
        narrowed
    }
}
