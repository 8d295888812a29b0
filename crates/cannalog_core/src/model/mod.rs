//! Domain model for grow-log entries.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep the growth-stage enumeration closed and ordered.
//!
//! # Invariants
//! - A persisted entry is identified by a stable `EntryId`.
//! - `owner_id` is fixed at creation and never rewritten.

pub mod entry;
