//! Tabular domain model shared by every dashboard panel.
//!
//! # Responsibility
//! - Define cell values, explicit schemas, records and tables.
//! - Keep one table shape for calendar entries, call logs and reference lists.
//!
//! # Invariants
//! - Every record is identified by a stable `RecordId`, never by position.
//! - The column set of a table always equals its schema.

pub mod catalog;
pub mod schema;
pub mod table;
pub mod value;
