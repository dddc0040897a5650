//! # Tariff Fallback Cascade
//!
//! Multi-source, multi-dimension tariff lookup with an auditable trace.
//!
//! Given a `(reporter, partner, product, year)` query, the cascade relaxes
//! the year, partner, and code-granularity dimensions against a primary
//! trade-data source until a usable rate appears, then optionally
//! cross-references a secondary indicator source. Every substitution is
//! recorded in a [`FallbackTrace`] attached to the result; auditability is
//! part of the contract, not logging.
//!
//! ## Search order
//!
//! ```text
//! TariffQuery
//!     │
//!     ├──> availability discovery        (hard precondition)
//!     ├──> year selection                (≤ target, descending)
//!     ├──> (partner × granularity) scan  (first non-zero wins,
//!     │                                   zero kept as last resort)
//!     ├──> secondary cross-reference     (soft, trace-noted)
//!     └──> final rate selection + caveats
//! ```
//!
//! Sources are consumed through the [`PrimarySource`] and
//! [`SecondarySource`] capabilities; [`WitsSource`] and [`WtoSource`] are
//! the production HTTP implementations.

mod cascade;
mod error;
mod sources;
mod types;
mod wits;
mod wto;

pub use cascade::resolve_rate;
pub use error::{CascadeError, Result};
pub use sources::{
    Availability, Indicator, IndicatorOutcome, IndicatorQuery, Observation, ObservationQuery,
    PrimarySource, SecondarySource, SourceFailure,
};
pub use types::{
    Dimension, FallbackTrace, RelaxationEvent, TariffQuery, TariffResult, WORLD_PARTNER,
    ZERO_RATE_CAVEAT,
};
pub use wits::{WitsSource, WITS_API_BASE_URL};
pub use wto::{WtoSource, WTO_API_BASE_URL};
