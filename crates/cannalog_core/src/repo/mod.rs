//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define synchronous CRUD contracts over persisted entries.
//! - Isolate SQLite query details from store and view-model orchestration.
//!
//! # Invariants
//! - Repository writes must enforce `Entry::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod entry_repo;
