use serde::{Deserialize, Serialize};

/// Partner code for the world aggregate: a partner-independent rate.
pub const WORLD_PARTNER: &str = "000";

/// Standing caveat attached whenever the primary rate is exactly zero.
pub const ZERO_RATE_CAVEAT: &str = "Zero rate may reflect genuine duty-free status or a data \
     gap; verify against an authoritative tariff-schedule lookup";

/// Input to the fallback cascade. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TariffQuery {
    /// 3-digit code of the country whose tariff schedule is queried.
    pub reporter: String,
    /// 3-digit partner code, or "000" for the world aggregate.
    pub partner: String,
    /// 2/4/6-digit product classification code.
    pub product_code: String,
    pub target_year: i32,
}

impl TariffQuery {
    pub fn new(
        reporter: impl Into<String>,
        partner: impl Into<String>,
        product_code: impl Into<String>,
        target_year: i32,
    ) -> Self {
        Self {
            reporter: reporter.into(),
            partner: partner.into(),
            product_code: product_code.into(),
            target_year,
        }
    }

    pub fn is_world_partner(&self) -> bool {
        self.partner == WORLD_PARTNER
    }

    /// Progressively shorter prefixes of the product code: full, 4-digit,
    /// 2-digit. Duplicates collapse when the code is already short.
    pub fn granularity_ladder(&self) -> Vec<String> {
        let code = self.product_code.as_str();
        let mut ladder = vec![code.to_string()];
        for len in [4usize, 2] {
            if code.len() >= len {
                let prefix = &code[..len];
                if ladder.iter().all(|c| c != prefix) {
                    ladder.push(prefix.to_string());
                }
            }
        }
        ladder
    }
}

/// A dimension the cascade may relax.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Year,
    Partner,
    Product,
}

/// One substitution the cascade made: which dimension, from what, to what.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelaxationEvent {
    pub dimension: Dimension,
    pub original: String,
    pub substituted: String,
}

/// Human-auditable record of everything the cascade did. Always attached to
/// the result; empty events and notes mean the exact combination matched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FallbackTrace {
    pub events: Vec<RelaxationEvent>,
    pub notes: Vec<String>,
    /// Last query URL attempted against the primary source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_url: Option<String>,
}

impl FallbackTrace {
    pub fn is_exact(&self) -> bool {
        self.events.is_empty() && self.notes.is_empty()
    }

    pub fn has_relaxed(&self, dimension: Dimension) -> bool {
        self.events.iter().any(|event| event.dimension == dimension)
    }

    pub(crate) fn relax(&mut self, dimension: Dimension, original: &str, substituted: &str) {
        log::debug!("Relaxing {dimension:?}: {original} -> {substituted}");
        self.events.push(RelaxationEvent {
            dimension,
            original: original.to_string(),
            substituted: substituted.to_string(),
        });
    }

    pub(crate) fn note(&mut self, note: impl Into<String>) {
        let note = note.into();
        log::debug!("Trace note: {note}");
        self.notes.push(note);
    }
}

/// Cascade outcome: the best rate found (absent only when every relaxation
/// was exhausted) plus the full trace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TariffResult {
    pub rate: Option<f64>,
    pub trace: FallbackTrace,
}
