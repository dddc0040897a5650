use crate::error::{CascadeError, Result};
use crate::sources::{Indicator, IndicatorOutcome, IndicatorQuery, SecondarySource, SourceFailure};
use async_trait::async_trait;
use std::env;
use std::time::Duration;

pub const WTO_API_BASE_URL: &str = "https://api.wto.org/timeseries/v1";

const QUERY_TIMEOUT: Duration = Duration::from_secs(10);
const API_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const ERROR_SNIPPET_CHARS: usize = 200;

/// WTO timeseries client: the optional secondary source used only to
/// cross-reference the primary rate.
pub struct WtoSource {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl WtoSource {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(WTO_API_BASE_URL, api_key)
    }

    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(QUERY_TIMEOUT)
            .build()
            .map_err(|err| CascadeError::Http(err.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    /// Build from `TARIFF_WTO_API_KEY`; `None` when no key is configured,
    /// which disables the cross-reference step entirely.
    pub fn from_env() -> Result<Option<Self>> {
        match env::var("TARIFF_WTO_API_KEY") {
            Ok(key) if !key.trim().is_empty() => Ok(Some(Self::new(key)?)),
            _ => Ok(None),
        }
    }

    fn request(&self, url: reqwest::Url) -> reqwest::RequestBuilder {
        self.http
            .get(url)
            .header("Cache-Control", "no-cache")
            .header(API_KEY_HEADER, &self.api_key)
    }
}

#[async_trait]
impl SecondarySource for WtoSource {
    async fn indicators(&self) -> std::result::Result<Vec<Indicator>, SourceFailure> {
        let url = format!(
            "{}/indicators?i=all&t=all&pc=all&tp=all&frq=all&lang=1",
            self.base_url
        );
        let parsed = reqwest::Url::parse(&url).map_err(|err| SourceFailure {
            url: url.clone(),
            message: err.to_string(),
        })?;

        let response = self
            .request(parsed)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| SourceFailure {
                url: url.clone(),
                message: err.to_string(),
            })?;
        let entries: serde_json::Value = response.json().await.map_err(|err| SourceFailure {
            url: url.clone(),
            message: err.to_string(),
        })?;

        // Entries missing a code or name are unusable and dropped.
        let indicators = entries
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        Some(Indicator {
                            code: entry.get("code")?.as_str()?.to_string(),
                            name: entry.get("name")?.as_str()?.to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(indicators)
    }

    async fn data(&self, query: &IndicatorQuery) -> IndicatorOutcome {
        let mut params: Vec<(&str, String)> = vec![
            ("i", query.indicator.clone()),
            ("r", query.reporter.clone()),
            ("fmt", "json".to_string()),
            ("mode", "full".to_string()),
            ("dec", "default".to_string()),
            ("off", "0".to_string()),
            ("max", "500".to_string()),
            ("head", "H".to_string()),
            ("lang", "1".to_string()),
            ("meta", "false".to_string()),
        ];
        if let Some(partner) = &query.partner {
            params.push(("p", partner.clone()));
            params.push(("ps", "default".to_string()));
        }
        if let Some(product) = &query.product {
            params.push(("pc", product.clone()));
            params.push(("spc", "false".to_string()));
        }

        let endpoint = format!("{}/data", self.base_url);
        let url = match reqwest::Url::parse_with_params(&endpoint, &params) {
            Ok(url) => url,
            Err(err) => {
                return IndicatorOutcome::Failed {
                    url: endpoint,
                    message: err.to_string(),
                }
            }
        };
        let url_text = url.to_string();

        let response = match self.request(url).send().await {
            Ok(response) => response,
            Err(err) => {
                return IndicatorOutcome::Failed {
                    url: url_text,
                    message: err.to_string(),
                }
            }
        };

        if response.status().is_success() {
            let data: serde_json::Value = match response.json().await {
                Ok(data) => data,
                Err(err) => {
                    return IndicatorOutcome::Failed {
                        url: url_text,
                        message: err.to_string(),
                    }
                }
            };
            return parse_dataset(&data, url_text);
        }

        let body = response.text().await.unwrap_or_default();
        if body.contains("does not have a partner dimension")
            || body.contains("does not have a product/sector dimension")
        {
            IndicatorOutcome::DimensionRejected {
                url: url_text,
                message: snippet(&body),
            }
        } else {
            IndicatorOutcome::Failed {
                url: url_text,
                message: snippet(&body),
            }
        }
    }
}

/// First numeric `Value` in the response dataset wins.
fn parse_dataset(data: &serde_json::Value, url: String) -> IndicatorOutcome {
    let items = data.get("Dataset").and_then(|dataset| dataset.as_array());
    let Some(items) = items else {
        return IndicatorOutcome::NoData { url };
    };

    for item in items {
        match item.get("Value") {
            Some(serde_json::Value::Number(number)) => {
                if let Some(rate) = number.as_f64() {
                    return IndicatorOutcome::Value { rate, url };
                }
            }
            Some(serde_json::Value::String(raw)) => {
                if let Ok(rate) = raw.trim().parse::<f64>() {
                    return IndicatorOutcome::Value { rate, url };
                }
                return IndicatorOutcome::Failed {
                    url,
                    message: format!("unparseable indicator value '{raw}'"),
                };
            }
            _ => {}
        }
    }
    IndicatorOutcome::NoData { url }
}

fn snippet(body: &str) -> String {
    body.chars().take(ERROR_SNIPPET_CHARS).collect()
}
