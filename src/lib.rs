//! Local-first lookup of RIPE registry organisations and networks.
//!
//! Queries are answered from a SQLite cache when possible and fetched from the
//! RIPE REST API through a retrying HTTP pipeline otherwise.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod logging;
pub mod ripe;
