//! Payments Module
//!
//! This module defines how value leaves the auction house:
//! - `Payee`: the seam every outgoing transfer goes through
//! - `Vault`: in-process recipient ledger that can model refusing recipients

mod vault;
pub use vault::{Payee, TransferRejected, Vault};
