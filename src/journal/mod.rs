//! Journal Module
//!
//! This module persists committed calls in an append-only SQLite journal.
//! Replaying the journal in sequence order rebuilds the ledger state.

mod database;
pub use database::{Journal, JournalEntry};
