//! End-to-end resolution scenarios: semantic code resolution feeding the
//! fallback cascade, with scripted trade-data sources.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tariff_cascade::{
    Availability, Dimension, Indicator, IndicatorOutcome, IndicatorQuery, Observation,
    ObservationQuery, PrimarySource, SecondarySource, SourceFailure, ZERO_RATE_CAVEAT,
};
use tariff_cli::models::TariffRequest;
use tariff_cli::orchestrator::{resolve_tariff, Resolvers};
use tariff_system_store::FileSystemStore;
use tariff_vector_store::HashEmbedder;
use tempfile::TempDir;

const PRODUCT_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<wits:datasource xmlns:wits="http://wits.worldbank.org">
  <wits:products>
    <wits:product productcode="851830" isgroup="No">
      <wits:productdescription>Wireless earbuds, headphones and earphones</wits:productdescription>
    </wits:product>
    <wits:product productcode="020230" isgroup="No">
      <wits:productdescription>Frozen boneless bovine meat</wits:productdescription>
    </wits:product>
    <wits:product productcode="870321" isgroup="No">
      <wits:productdescription>Passenger motor vehicles, spark ignition</wits:productdescription>
    </wits:product>
  </wits:products>
</wits:datasource>"#;

const COUNTRY_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<wits:datasource xmlns:wits="http://wits.worldbank.org">
  <wits:countries>
    <wits:country countrycode="076" iso3Code="BRA" isreporter="1" ispartner="0">
      <wits:name>Brazil</wits:name>
    </wits:country>
    <wits:country countrycode="840" iso3Code="USA" isreporter="1" ispartner="0">
      <wits:name>USA</wits:name>
    </wits:country>
    <wits:country countrycode="368" iso3Code="IRQ" isreporter="0" ispartner="1">
      <wits:name>Iraq</wits:name>
    </wits:country>
    <wits:country countrycode="156" iso3Code="CHN" isreporter="0" ispartner="1">
      <wits:name>China</wits:name>
    </wits:country>
  </wits:countries>
</wits:datasource>"#;

async fn open_resolvers(dir: &Path) -> Resolvers {
    let system_store = Arc::new(
        FileSystemStore::open(dir.join("system_store.json"))
            .await
            .unwrap(),
    );
    let resolvers =
        Resolvers::open(dir, system_store, Arc::new(HashEmbedder::new(64))).unwrap();
    resolvers.products.load_catalog(PRODUCT_XML).await.unwrap();
    resolvers.countries.load_catalog(COUNTRY_XML).await.unwrap();
    resolvers
}

#[derive(Default)]
struct FakePrimary {
    years: Vec<(i32, Vec<&'static str>)>,
    rates: BTreeMap<(String, String, i32), f64>,
}

impl FakePrimary {
    fn with_years(years: Vec<(i32, Vec<&'static str>)>) -> Self {
        Self {
            years,
            ..Self::default()
        }
    }

    fn rate(mut self, partner: &str, product: &str, year: i32, rate: f64) -> Self {
        self.rates
            .insert((partner.to_string(), product.to_string(), year), rate);
        self
    }
}

#[async_trait]
impl PrimarySource for FakePrimary {
    async fn availability(
        &self,
        _reporter: &str,
    ) -> std::result::Result<Availability, SourceFailure> {
        let mut availability = Availability::default();
        for (year, partners) in &self.years {
            availability.insert_year(*year, partners.iter().map(|p| (*p).to_string()));
        }
        Ok(availability)
    }

    async fn observation(&self, query: &ObservationQuery<'_>) -> Observation {
        let url = format!(
            "https://wits.worldbank.org/API/V1/SDMX/V21/datasource/TRN/reporter/{}/partner/{}/product/{}/year/{}/datatype/reported?format=JSON",
            query.reporter, query.partner, query.product, query.year
        );
        let key = (
            query.partner.to_string(),
            query.product.to_string(),
            query.year,
        );
        match self.rates.get(&key) {
            Some(rate) => Observation::Value { rate: *rate, url },
            None => Observation::NoData { url },
        }
    }
}

struct FakeSecondary {
    rate: f64,
}

#[async_trait]
impl SecondarySource for FakeSecondary {
    async fn indicators(&self) -> std::result::Result<Vec<Indicator>, SourceFailure> {
        Ok(vec![Indicator {
            code: "TP_A_0130".to_string(),
            name: "MFN - Simple average tariff rate".to_string(),
        }])
    }

    async fn data(&self, query: &IndicatorQuery) -> IndicatorOutcome {
        IndicatorOutcome::Value {
            rate: self.rate,
            url: format!(
                "https://api.wto.org/timeseries/v1/data?i={}&r={}",
                query.indicator, query.reporter
            ),
        }
    }
}

// Scenario: Iraq reports no bilateral data, so the cascade falls back to the
// world aggregate and finds the rate at the exact product code.
#[tokio::test]
async fn earbuds_to_iraq_relax_partner_to_world_aggregate() {
    let dir = TempDir::new().unwrap();
    let resolvers = open_resolvers(dir.path()).await;

    let primary = FakePrimary::with_years(vec![(2021, vec!["156"])]).rate(
        "000",
        "851830",
        2021,
        14.8,
    );
    let request = TariffRequest {
        product: "wireless earbuds".to_string(),
        reporter: "Brazil".to_string(),
        partner: "Iraq".to_string(),
        year: 2021,
    };

    let answer = resolve_tariff(&resolvers, &primary, None, &request)
        .await
        .unwrap();

    assert_eq!(answer.product.code, "851830");
    assert_eq!(answer.reporter.code, "076");
    assert_eq!(answer.partner.code, "368");
    assert_eq!(answer.rate, Some(14.8));

    let partner_events: Vec<_> = answer
        .trace
        .events
        .iter()
        .filter(|event| event.dimension == Dimension::Partner)
        .collect();
    assert_eq!(partner_events.len(), 1);
    assert_eq!(partner_events[0].substituted, "000");

    assert!(answer
        .trace
        .last_url
        .as_deref()
        .unwrap()
        .contains("reporter/076/partner/000/product/851830/year/2021"));
}

// Scenario: the primary source only has a zero world-aggregate rate, so the
// secondary source is cross-referenced and its differing rate is adopted.
#[tokio::test]
async fn usa_china_adopts_secondary_rate_on_discrepancy() {
    let dir = TempDir::new().unwrap();
    let resolvers = open_resolvers(dir.path()).await;

    let primary = FakePrimary::with_years(vec![(2022, vec![])]).rate("000", "851830", 2022, 0.0);
    let secondary = FakeSecondary { rate: 7.6 };
    let request = TariffRequest {
        product: "wireless earbuds".to_string(),
        reporter: "USA".to_string(),
        partner: "China".to_string(),
        year: 2024,
    };

    let answer = resolve_tariff(&resolvers, &primary, Some(&secondary), &request)
        .await
        .unwrap();

    assert_eq!(answer.reporter.code, "840");
    assert_eq!(answer.partner.code, "156");
    assert_eq!(answer.rate, Some(7.6));

    assert!(answer.trace.has_relaxed(Dimension::Partner));
    assert!(answer.trace.has_relaxed(Dimension::Year));
    assert!(answer
        .trace
        .notes
        .iter()
        .any(|note| note.contains("discrepancy")));
    assert!(answer.trace.notes.iter().any(|note| note == ZERO_RATE_CAVEAT));
}

// Resolution must fail fast when the catalogs were never built, never
// produce an empty-but-successful answer.
#[tokio::test]
async fn unbuilt_catalogs_fail_fast() {
    let dir = TempDir::new().unwrap();
    let system_store = Arc::new(
        FileSystemStore::open(dir.path().join("system_store.json"))
            .await
            .unwrap(),
    );
    let resolvers =
        Resolvers::open(dir.path(), system_store, Arc::new(HashEmbedder::new(64))).unwrap();

    let primary = FakePrimary::with_years(vec![(2021, vec![])]);
    let request = TariffRequest {
        product: "wireless earbuds".to_string(),
        reporter: "Brazil".to_string(),
        partner: "Iraq".to_string(),
        year: 2021,
    };

    let err = resolve_tariff(&resolvers, &primary, None, &request)
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("not initialized"));
}

// The matched reference rows ride along with the resolved codes.
#[tokio::test]
async fn answer_carries_the_matched_reference_rows() {
    let dir = TempDir::new().unwrap();
    let resolvers = open_resolvers(dir.path()).await;

    let primary = FakePrimary::with_years(vec![(2021, vec![])]).rate("000", "851830", 2021, 3.0);
    let request = TariffRequest {
        product: "wireless earbuds".to_string(),
        reporter: "Brazil".to_string(),
        partner: "Iraq".to_string(),
        year: 2021,
    };

    let answer = resolve_tariff(&resolvers, &primary, None, &request)
        .await
        .unwrap();

    let product_ref = answer.product.reference.expect("product reference");
    assert!(product_ref.text.contains("earbuds"));
    let reporter_ref = answer.reporter.reference.expect("reporter reference");
    assert_eq!(reporter_ref.attributes.get("iso3Code").map(String::as_str), Some("BRA"));
}
