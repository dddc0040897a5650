use serde::{Deserialize, Serialize};
use tariff_cascade::FallbackTrace;
use tariff_vector_store::CodeMatch;

/// One end-to-end tariff question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TariffRequest {
    /// Natural-language product description.
    pub product: String,
    /// Reporter country name (whose tariff schedule is queried).
    pub reporter: String,
    /// Partner country name.
    pub partner: String,
    pub year: i32,
}

/// A canonical code plus the reference row it was resolved from. The
/// reference is absent when the catalog produced no match and the fallback
/// code was used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedCode {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<CodeMatch>,
}

/// Combined answer: resolved codes, their matched reference rows, and the
/// cascade outcome with its full trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TariffAnswer {
    pub product: ResolvedCode,
    pub reporter: ResolvedCode,
    pub partner: ResolvedCode,
    pub rate: Option<f64>,
    pub trace: FallbackTrace,
}
