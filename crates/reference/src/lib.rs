//! # Tariff Reference Catalogs
//!
//! Reference-data sources and the semantic code resolver built on them.
//!
//! A [`ReferenceSource`] describes one catalog: where to fetch it, which
//! field carries the embedded text, and how to parse the delivered XML into
//! reference records. [`ProductCatalog`] (HS product codes) and
//! [`CountryCatalog`] (ISO 3-digit country codes) cover the two catalogs the
//! resolution pipeline needs.
//!
//! [`CodeResolver`] wires a source to the vector store and the system store:
//! `refresh` rebuilds the index from a freshly fetched catalog, `find`
//! answers "given free text and optional attribute constraints, return the
//! closest reference rows", and `drop_catalog` removes the index and its
//! schema so a later `find` fails fast instead of querying an indeterminate
//! structure.

mod catalogs;
mod error;
mod resolver;
mod source;

pub use catalogs::{CountryCatalog, ProductCatalog, WITS_BASE_URL};
pub use error::{ReferenceError, Result};
pub use resolver::CodeResolver;
pub use source::ReferenceSource;
