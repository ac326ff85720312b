//! Use-case services between presentation intents and record stores.
//!
//! # Responsibility
//! - Run add/edit/delete intents through editor validation and store
//!   persistence.
//! - Translate results into user-facing notices.

pub mod notice;
pub mod table_service;
