use crate::error::{CascadeError, Result};
use crate::sources::{Availability, Observation, ObservationQuery, PrimarySource, SourceFailure};
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::time::Duration;

pub const WITS_API_BASE_URL: &str = "https://wits.worldbank.org/API/V1";

const QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// WITS bulk trade-data client: the primary source of the cascade.
pub struct WitsSource {
    http: reqwest::Client,
    base_url: String,
}

impl WitsSource {
    pub fn new() -> Result<Self> {
        Self::with_base_url(WITS_API_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(QUERY_TIMEOUT)
            .build()
            .map_err(|err| CascadeError::Http(err.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    fn availability_url(&self, reporter: &str) -> String {
        format!(
            "{}/wits/datasource/trn/dataavailability/country/{reporter}/year/all",
            self.base_url
        )
    }

    fn observation_url(&self, query: &ObservationQuery<'_>) -> String {
        format!(
            "{}/SDMX/V21/datasource/TRN/reporter/{}/partner/{}/product/{}/year/{}/datatype/reported?format=JSON",
            self.base_url, query.reporter, query.partner, query.product, query.year
        )
    }
}

#[async_trait]
impl PrimarySource for WitsSource {
    async fn availability(
        &self,
        reporter: &str,
    ) -> std::result::Result<Availability, SourceFailure> {
        let url = self.availability_url(reporter);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| SourceFailure {
                url: url.clone(),
                message: err.to_string(),
            })?;
        let body = response.text().await.map_err(|err| SourceFailure {
            url: url.clone(),
            message: err.to_string(),
        })?;

        parse_availability(&body).map_err(|message| SourceFailure { url, message })
    }

    async fn observation(&self, query: &ObservationQuery<'_>) -> Observation {
        let url = self.observation_url(query);
        let response = match self.http.get(&url).send().await {
            Ok(response) => response,
            Err(err) => {
                return Observation::Failed {
                    url,
                    message: err.to_string(),
                }
            }
        };

        // Anything but 200 means this combination has no reported figure.
        if !response.status().is_success() {
            return Observation::NoData { url };
        }

        let data: serde_json::Value = match response.json().await {
            Ok(data) => data,
            Err(err) => {
                return Observation::Failed {
                    url,
                    message: err.to_string(),
                }
            }
        };

        parse_observation(&data, url)
    }
}

/// Parse the WITS data-availability XML: one `reporter` element per reported
/// year, carrying the year and a semicolon-separated partner list.
fn parse_availability(body: &str) -> std::result::Result<Availability, String> {
    // WITS serves documents with a UTF-8 BOM.
    let body = body.strip_prefix('\u{feff}').unwrap_or(body);

    let mut reader = Reader::from_str(body);
    let mut availability = Availability::default();
    let mut in_reporter = false;
    let mut field: Option<String> = None;
    let mut year: Option<i32> = None;
    let mut partners: Vec<String> = Vec::new();
    let mut saw_reporter = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                let name = local_name(start.name().as_ref());
                if name == "reporter" {
                    in_reporter = true;
                    saw_reporter = true;
                    year = None;
                    partners.clear();
                } else if in_reporter {
                    field = Some(name);
                }
            }
            Ok(Event::Text(text)) => {
                if let (true, Some(field)) = (in_reporter, field.as_deref()) {
                    let value = text.unescape().map_err(|err| err.to_string())?;
                    let value = value.trim();
                    match field {
                        "year" => year = value.parse().ok(),
                        "partnerlist" => {
                            partners = value
                                .split(';')
                                .map(str::trim)
                                .filter(|p| !p.is_empty())
                                .map(str::to_string)
                                .collect();
                        }
                        _ => {}
                    }
                }
            }
            Ok(Event::End(end)) => {
                let name = local_name(end.name().as_ref());
                if name == "reporter" {
                    in_reporter = false;
                    // Years without a parseable year element are skipped.
                    if let Some(year) = year.take() {
                        availability.insert_year(year, partners.drain(..));
                    }
                } else if field.as_deref() == Some(name.as_str()) {
                    field = None;
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(format!("availability XML parse failed: {err}")),
            Ok(_) => {}
        }
    }

    if !saw_reporter {
        return Err("no reporter elements found in availability document".to_string());
    }
    Ok(availability)
}

/// Pull the first observation out of a WITS SDMX JSON document: first
/// series, observation "0", first array element.
fn parse_observation(data: &serde_json::Value, url: String) -> Observation {
    let first = data
        .get("dataSets")
        .and_then(|sets| sets.get(0))
        .and_then(|set| set.get("series"))
        .and_then(|series| series.as_object())
        .and_then(|series| series.values().next())
        .and_then(|series| series.get("observations"))
        .and_then(|observations| observations.get("0"))
        .and_then(|observation| observation.get(0));

    match first {
        None | Some(serde_json::Value::Null) => Observation::NoData { url },
        Some(serde_json::Value::Number(number)) => match number.as_f64() {
            Some(rate) => Observation::Value { rate, url },
            None => Observation::Invalid {
                url,
                raw: number.to_string(),
            },
        },
        Some(serde_json::Value::String(raw)) => match raw.trim().parse::<f64>() {
            Ok(rate) => Observation::Value { rate, url },
            Err(_) => Observation::Invalid {
                url,
                raw: raw.clone(),
            },
        },
        Some(other) => Observation::Invalid {
            url,
            raw: other.to_string(),
        },
    }
}

fn local_name(name: &[u8]) -> String {
    let local = match name.iter().rposition(|b| *b == b':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    };
    String::from_utf8_lossy(local).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const AVAILABILITY_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<wits:datasource xmlns:wits="http://wits.worldbank.org">
  <wits:reporter>
    <wits:year>2021</wits:year>
    <wits:partnerlist>076;156; 484</wits:partnerlist>
  </wits:reporter>
  <wits:reporter>
    <wits:year>2019</wits:year>
    <wits:partnerlist></wits:partnerlist>
  </wits:reporter>
</wits:datasource>"#;

    #[test]
    fn parses_years_and_partner_lists() {
        let availability = parse_availability(AVAILABILITY_XML).unwrap();
        assert!(availability.has_partner(2021, "156"));
        assert!(availability.has_partner(2021, "484"));
        assert!(availability.has_partner(2019, "000"));
        assert!(!availability.has_partner(2019, "156"));
    }

    #[test]
    fn missing_reporters_is_an_availability_error() {
        let err = parse_availability("<wits:datasource></wits:datasource>").unwrap_err();
        assert!(err.contains("no reporter elements"));
    }

    #[test]
    fn observation_parses_numeric_and_string_rates() {
        let url = "http://example/obs".to_string();
        let numeric = json!({"dataSets": [{"series": {"0:0:0": {"observations": {"0": [14.8]}}}}]});
        match parse_observation(&numeric, url.clone()) {
            Observation::Value { rate, .. } => assert_eq!(rate, 14.8),
            other => panic!("unexpected outcome: {other:?}"),
        }

        let stringy = json!({"dataSets": [{"series": {"0:0:0": {"observations": {"0": ["9.5"]}}}}]});
        assert!(matches!(
            parse_observation(&stringy, url.clone()),
            Observation::Value { rate, .. } if rate == 9.5
        ));
    }

    #[test]
    fn observation_without_series_is_no_data() {
        let url = "http://example/obs".to_string();
        let empty = json!({"dataSets": []});
        assert!(matches!(
            parse_observation(&empty, url.clone()),
            Observation::NoData { .. }
        ));

        let null_value = json!({"dataSets": [{"series": {"0:0:0": {"observations": {"0": [null]}}}}]});
        assert!(matches!(
            parse_observation(&null_value, url),
            Observation::NoData { .. }
        ));
    }

    #[test]
    fn non_numeric_observation_is_invalid() {
        let url = "http://example/obs".to_string();
        let bad = json!({"dataSets": [{"series": {"0:0:0": {"observations": {"0": ["n/a"]}}}}]});
        assert!(matches!(
            parse_observation(&bad, url),
            Observation::Invalid { raw, .. } if raw == "n/a"
        ));
    }

    #[test]
    fn urls_follow_the_documented_layout() {
        let source = WitsSource::with_base_url("http://localhost:9000").unwrap();
        assert_eq!(
            source.availability_url("076"),
            "http://localhost:9000/wits/datasource/trn/dataavailability/country/076/year/all"
        );
        let query = ObservationQuery {
            reporter: "076",
            partner: "000",
            product: "851830",
            year: 2021,
        };
        assert_eq!(
            source.observation_url(&query),
            "http://localhost:9000/SDMX/V21/datasource/TRN/reporter/076/partner/000/product/851830/year/2021/datatype/reported?format=JSON"
        );
    }
}
