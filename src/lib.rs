//! Personal key-value vault.
//!
//! Owners store short named text values and read, list, or delete them
//! later. Storage sits behind one contract with interchangeable backends:
//! a JSON document on disk, a PostgreSQL table, or memory. The backend is
//! chosen once at startup by [`store::select_backend`].
//!
//! - [`validation`] - Name and value rules
//! - [`store`] - Record store contract and backends
//! - [`commands`] - User-facing save/get/delete/list handlers
//! - [`migrate`] - JSON to relational migration and verification
//! - [`config`] - Environment configuration

pub mod commands;
pub mod config;
pub mod constants;
pub mod error;
pub mod migrate;
pub mod store;
pub mod utils;
pub mod validation;
