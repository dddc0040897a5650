use crate::error::Result;
use crate::source::{parse_rows, rows_to_records, ReferenceSource};
use tariff_vector_store::ReferenceRecord;

pub const WITS_BASE_URL: &str = "https://wits.worldbank.org/API/V1";

/// WITS TRN product catalog: HS codes keyed by their text description.
pub struct ProductCatalog {
    base_url: String,
}

impl ProductCatalog {
    pub fn new() -> Self {
        Self::with_base_url(WITS_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Default for ProductCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceSource for ProductCatalog {
    fn table_name(&self) -> &str {
        "hs_code_table"
    }

    fn metadata_key(&self) -> &str {
        "hs_code_metadata_columns"
    }

    fn catalog_url(&self) -> String {
        format!("{}/wits/datasource/trn/product/all", self.base_url)
    }

    fn content_field(&self) -> &str {
        "productdescription"
    }

    fn parse_catalog(&self, body: &str) -> Result<Vec<ReferenceRecord>> {
        let rows = parse_rows(body, "product")?;
        Ok(rows_to_records(rows, self.content_field()))
    }
}

/// WITS TRN country catalog: ISO 3-digit codes keyed by country name, with
/// the `isreporter`/`ispartner` flags the orchestrator filters on.
pub struct CountryCatalog {
    base_url: String,
}

impl CountryCatalog {
    pub fn new() -> Self {
        Self::with_base_url(WITS_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Default for CountryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceSource for CountryCatalog {
    fn table_name(&self) -> &str {
        "country_code_table"
    }

    fn metadata_key(&self) -> &str {
        "country_code_metadata_columns"
    }

    fn catalog_url(&self) -> String {
        format!("{}/wits/datasource/trn/country/ALL", self.base_url)
    }

    fn content_field(&self) -> &str {
        "name"
    }

    fn parse_catalog(&self, body: &str) -> Result<Vec<ReferenceRecord>> {
        let rows = parse_rows(body, "country")?;
        Ok(rows_to_records(rows, self.content_field()))
    }
}
