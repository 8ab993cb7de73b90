//! # rueckwand_core
//!
//! Core domain logic for Rueckwand: credentials, token sessions, the product
//! catalog and item artifacts.

pub mod artifact;
pub mod auth;
pub mod catalog;
pub mod db;
pub mod migrate;
pub mod models;
pub mod store;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
