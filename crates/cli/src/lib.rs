//! # Tariff CLI
//!
//! The resolution orchestrator and the `tariff-finder` binary built on it.
//!
//! [`orchestrator::resolve_tariff`] sequences three concurrent semantic
//! resolutions (product description, reporter name, partner name) into one
//! fallback-cascade call and assembles the combined answer.

pub mod models;
pub mod orchestrator;

pub use models::{ResolvedCode, TariffAnswer, TariffRequest};
pub use orchestrator::{resolve_tariff, Resolvers};
