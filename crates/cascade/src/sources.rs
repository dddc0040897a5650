use crate::types::WORLD_PARTNER;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

/// A source call that did not complete, with the attempted URL for audit.
#[derive(Debug, Clone)]
pub struct SourceFailure {
    pub url: String,
    pub message: String,
}

/// Which (year, partner) combinations a reporter has data for.
///
/// The world aggregate is always treated as available: a partner-independent
/// rate can be asked for in any reported year.
#[derive(Debug, Clone, Default)]
pub struct Availability {
    years: BTreeMap<i32, BTreeSet<String>>,
}

impl Availability {
    pub fn insert_year(&mut self, year: i32, partners: impl IntoIterator<Item = String>) {
        let entry = self.years.entry(year).or_default();
        entry.extend(partners);
        entry.insert(WORLD_PARTNER.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn years_descending(&self) -> impl Iterator<Item = i32> + '_ {
        self.years.keys().rev().copied()
    }

    pub fn has_partner(&self, year: i32, partner: &str) -> bool {
        self.years
            .get(&year)
            .is_some_and(|partners| partners.contains(partner))
    }
}

/// One observation lookup against the primary source.
#[derive(Debug, Clone)]
pub struct ObservationQuery<'a> {
    pub reporter: &'a str,
    pub partner: &'a str,
    pub product: &'a str,
    pub year: i32,
}

/// Primary-source lookup outcome.
///
/// `Failed` and `NoData` are not errors: the cascade counts them as that
/// combination's failure and keeps scanning. `Invalid` is fatal, it means
/// the source broke its numeric-rate contract.
#[derive(Debug, Clone)]
pub enum Observation {
    Value { rate: f64, url: String },
    NoData { url: String },
    Failed { url: String, message: String },
    Invalid { url: String, raw: String },
}

/// Bulk trade-data source (WITS-like): availability discovery plus
/// per-combination observations.
#[async_trait]
pub trait PrimarySource: Send + Sync {
    async fn availability(
        &self,
        reporter: &str,
    ) -> std::result::Result<Availability, SourceFailure>;

    async fn observation(&self, query: &ObservationQuery<'_>) -> Observation;
}

/// One entry of the secondary source's indicator catalog.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Indicator {
    pub code: String,
    pub name: String,
}

/// Data request against the secondary source. Optional dimensions are only
/// sent when the selected indicator supports them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorQuery {
    pub indicator: String,
    pub reporter: String,
    pub partner: Option<String>,
    pub product: Option<String>,
}

/// Secondary-source lookup outcome. `DimensionRejected` triggers the one
/// simplified retry; everything else is terminal for the cross-reference.
#[derive(Debug, Clone)]
pub enum IndicatorOutcome {
    Value { rate: f64, url: String },
    NoData { url: String },
    DimensionRejected { url: String, message: String },
    Failed { url: String, message: String },
}

/// Indicator-based source (WTO-like), used only to cross-reference the
/// primary rate. Every failure on this path is soft.
#[async_trait]
pub trait SecondarySource: Send + Sync {
    async fn indicators(&self) -> std::result::Result<Vec<Indicator>, SourceFailure>;

    async fn data(&self, query: &IndicatorQuery) -> IndicatorOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_partner_is_always_available() {
        let mut availability = Availability::default();
        availability.insert_year(2020, ["156".to_string()]);

        assert!(availability.has_partner(2020, "156"));
        assert!(availability.has_partner(2020, WORLD_PARTNER));
        assert!(!availability.has_partner(2020, "368"));
        assert!(!availability.has_partner(2021, WORLD_PARTNER));
    }

    #[test]
    fn years_iterate_most_recent_first() {
        let mut availability = Availability::default();
        availability.insert_year(2018, []);
        availability.insert_year(2021, []);
        availability.insert_year(2019, []);

        let years: Vec<i32> = availability.years_descending().collect();
        assert_eq!(years, vec![2021, 2019, 2018]);
    }
}
