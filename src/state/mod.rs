//! State Management Module
//!
//! This module owns the ledger state machine: batch registry, auction house,
//! and payout vault, applied together one call at a time.

mod ledger;


pub use ledger::Ledger;
