use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};

use crate::error::ExtractError;
use crate::parsing::document::RawFact;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Reporting period of a context: a balance-sheet date or a flow period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodKind {
    Instant(NaiveDate),
    Duration { start: NaiveDate, end: NaiveDate },
}

impl PeriodKind {
    /// Year bucket a fact belongs to: the instant's year, or the year the
    /// duration ends in.
    pub fn fiscal_year(&self) -> i32 {
        match self {
            PeriodKind::Instant(date) => date.year(),
            PeriodKind::Duration { end, .. } => end.year(),
        }
    }

    pub fn duration_days(&self) -> Option<i64> {
        match self {
            PeriodKind::Instant(_) => None,
            PeriodKind::Duration { start, end } => Some((*end - *start).num_days()),
        }
    }
}

/// Parsed context declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextDescriptor {
    pub id: String,
    pub period: PeriodKind,
    /// True when the context carries no dimensional segment members, i.e. it
    /// covers the whole reporting entity rather than a segment breakdown.
    pub consolidated: bool,
}

/// Parsed unit declaration. `measure` keeps the local part of the first
/// measure element, so `iso4217:USD` becomes `USD`.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitDescriptor {
    pub id: String,
    pub measure: String,
}

/// Every context and unit declaration of one filing, indexed by id.
///
/// Facts referencing an id that is not here are dropped from consideration:
/// a dangling reference is a rare filer error, not grounds to abort.
#[derive(Debug, Default)]
pub struct ContextRegistry {
    contexts: HashMap<String, ContextDescriptor>,
    units: HashMap<String, UnitDescriptor>,
}

impl ContextRegistry {
    pub fn parse(instances: &[String]) -> Result<Self, ExtractError> {
        let mut contexts = HashMap::new();
        let mut units = HashMap::new();

        for content in instances {
            let xml_tree = roxmltree::Document::parse(content)
                .map_err(|e| ExtractError::MalformedDocument(e.to_string()))?;
            let elements = xml_tree
                .root_element()
                .children()
                .filter(|e| e.is_element());

            for child in elements {
                match child.tag_name().name() {
                    "context" => {
                        let id = child.attribute("id").unwrap_or("");
                        if id.is_empty() {
                            continue;
                        }
                        match parse_period(&child) {
                            Some(period) => {
                                let consolidated = !child
                                    .descendants()
                                    .any(|n| n.tag_name().name() == "explicitMember");
                                contexts.insert(
                                    id.to_string(),
                                    ContextDescriptor {
                                        id: id.to_string(),
                                        period,
                                        consolidated,
                                    },
                                );
                            }
                            None => {
                                log::warn!("context {} has no parseable period, skipped", id);
                            }
                        }
                    }
                    "unit" => {
                        let id = child.attribute("id").unwrap_or("");
                        if id.is_empty() {
                            continue;
                        }
                        if let Some(measure) = child
                            .descendants()
                            .find(|n| n.tag_name().name() == "measure")
                            .and_then(|n| n.text())
                        {
                            let local = measure.rsplit(':').next().unwrap_or(measure).trim();
                            units.insert(
                                id.to_string(),
                                UnitDescriptor {
                                    id: id.to_string(),
                                    measure: local.to_string(),
                                },
                            );
                        }
                    }
                    _ => {}
                }
            }
        }

        log::info!(
            "context registry built: {} contexts, {} units",
            contexts.len(),
            units.len()
        );

        Ok(Self { contexts, units })
    }

    pub fn context(&self, id: &str) -> Option<&ContextDescriptor> {
        self.contexts.get(id)
    }

    pub fn contexts(&self) -> impl Iterator<Item = &ContextDescriptor> {
        self.contexts.values()
    }

    /// Currency (or other measure) for a unit id.
    pub fn unit_measure(&self, id: &str) -> Option<&str> {
        self.units.get(id).map(|u| u.measure.as_str())
    }

    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    /// A fact survives when its context reference resolves and its unit
    /// reference, if any, resolves too.
    pub fn survives(&self, fact: &RawFact) -> bool {
        let context_ok = fact
            .context_ref
            .as_deref()
            .is_some_and(|id| self.contexts.contains_key(id));
        let unit_ok = match fact.unit_ref.as_deref() {
            Some(id) => self.units.contains_key(id),
            None => true,
        };
        context_ok && unit_ok
    }

    /// Filters out facts with dangling context or unit references, logging
    /// each drop. Never fatal.
    pub fn surviving_facts<'f>(&self, facts: &'f [RawFact]) -> Vec<&'f RawFact> {
        facts
            .iter()
            .filter(|fact| {
                let ok = self.survives(fact);
                if !ok {
                    log::warn!(
                        "dropping fact {}:{} with dangling reference (context={}, unit={})",
                        fact.prefix,
                        fact.tag,
                        fact.context_ref.as_deref().unwrap_or("-"),
                        fact.unit_ref.as_deref().unwrap_or("-")
                    );
                }
                ok
            })
            .collect()
    }
}

fn parse_period(context: &roxmltree::Node) -> Option<PeriodKind> {
    let period = context
        .descendants()
        .find(|n| n.tag_name().name() == "period")?;

    if let Some(instant) = period
        .descendants()
        .find(|n| n.tag_name().name() == "instant")
        .and_then(|n| n.text())
    {
        let date = NaiveDate::parse_from_str(instant.trim(), DATE_FORMAT).ok()?;
        return Some(PeriodKind::Instant(date));
    }

    let start = period
        .descendants()
        .find(|n| n.tag_name().name() == "startDate")
        .and_then(|n| n.text())?;
    let end = period
        .descendants()
        .find(|n| n.tag_name().name() == "endDate")
        .and_then(|n| n.text())?;

    let start = NaiveDate::parse_from_str(start.trim(), DATE_FORMAT).ok()?;
    let end = NaiveDate::parse_from_str(end.trim(), DATE_FORMAT).ok()?;
    Some(PeriodKind::Duration { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::locate_instance_documents;

    const INSTANCE: &str = r#"
        <xbrli:xbrl xmlns:xbrli="http://www.xbrl.org/2003/instance"
                    xmlns:xbrldi="http://xbrl.org/2006/xbrldi"
                    xmlns:us-gaap="http://fasb.org/us-gaap/2023"
                    xmlns:acme="http://acme.example.com/20231231">
            <xbrli:context id="FY2023">
                <xbrli:period>
                    <xbrli:startDate>2023-01-01</xbrli:startDate>
                    <xbrli:endDate>2023-12-31</xbrli:endDate>
                </xbrli:period>
            </xbrli:context>
            <xbrli:context id="FY2023_widgets">
                <xbrli:entity>
                    <xbrli:segment>
                        <xbrldi:explicitMember dimension="us-gaap:StatementBusinessSegmentsAxis">acme:WidgetsMember</xbrldi:explicitMember>
                    </xbrli:segment>
                </xbrli:entity>
                <xbrli:period>
                    <xbrli:startDate>2023-01-01</xbrli:startDate>
                    <xbrli:endDate>2023-12-31</xbrli:endDate>
                </xbrli:period>
            </xbrli:context>
            <xbrli:context id="EOY2023">
                <xbrli:period><xbrli:instant>2023-12-31</xbrli:instant></xbrli:period>
            </xbrli:context>
            <xbrli:unit id="usd"><xbrli:measure>iso4217:USD</xbrli:measure></xbrli:unit>
            <us-gaap:Assets contextRef="EOY2023" unitRef="usd">200</us-gaap:Assets>
            <us-gaap:Assets contextRef="missing" unitRef="usd">300</us-gaap:Assets>
            <us-gaap:Assets contextRef="EOY2023" unitRef="nosuchunit">400</us-gaap:Assets>
        </xbrli:xbrl>
    "#;

    fn registry() -> ContextRegistry {
        let instances = locate_instance_documents(&[INSTANCE.to_string()]).unwrap();
        ContextRegistry::parse(&instances).unwrap()
    }

    #[test]
    fn periods_and_consolidation_are_parsed() {
        let registry = registry();

        let fy = registry.context("FY2023").unwrap();
        assert!(fy.consolidated);
        assert_eq!(fy.period.fiscal_year(), 2023);
        assert_eq!(fy.period.duration_days(), Some(364));

        let segment = registry.context("FY2023_widgets").unwrap();
        assert!(!segment.consolidated);

        let eoy = registry.context("EOY2023").unwrap();
        assert_eq!(
            eoy.period,
            PeriodKind::Instant(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap())
        );
        assert_eq!(eoy.period.duration_days(), None);
    }

    #[test]
    fn unit_measure_strips_the_namespace_prefix() {
        let registry = registry();
        assert_eq!(registry.unit_measure("usd"), Some("USD"));
        assert_eq!(registry.unit_measure("nope"), None);
    }

    #[test]
    fn facts_with_dangling_references_are_dropped() {
        let instances = locate_instance_documents(&[INSTANCE.to_string()]).unwrap();
        let registry = ContextRegistry::parse(&instances).unwrap();
        let index = crate::parsing::DocumentIndex::parse(&instances).unwrap();

        let facts = index.facts_for("Assets").unwrap();
        assert_eq!(facts.len(), 3);

        let surviving = registry.surviving_facts(facts);
        assert_eq!(surviving.len(), 1);
        assert_eq!(surviving[0].value, "200");
    }

    #[test]
    fn duration_fiscal_year_is_the_end_year() {
        // Fiscal year straddling the calendar year boundary buckets to the
        // year it ends in.
        let period = PeriodKind::Duration {
            start: NaiveDate::from_ymd_opt(2022, 10, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2023, 9, 30).unwrap(),
        };
        assert_eq!(period.fiscal_year(), 2023);
    }
}
