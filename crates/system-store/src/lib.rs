//! # Tariff System Store
//!
//! Durable key → JSON document mapping used to remember the attribute schema
//! of each code index across process restarts.
//!
//! The [`SystemStore`] trait is the capability consumed by resolvers; the
//! file-backed [`FileSystemStore`] is the default implementation so the
//! pipeline runs without a database server.

mod error;
mod store;

pub use error::{Result, SystemStoreError};
pub use store::{FileSystemStore, SystemStore};
