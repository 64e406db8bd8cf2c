//! Value Vault Module
//!
//! Records value pushed out of the auction house to external recipients.
//! A recipient may refuse incoming value, which models an uncooperative
//! contract on the receiving end of a payout.

use ethers::types::{Address, U256};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::warn;

/// Rejection of an outgoing transfer by its recipient
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("recipient {0:?} rejected the transfer")]
pub struct TransferRejected(pub Address);

/// Destination for value leaving the auction house
///
/// A rejected send must leave the payee untouched.
pub trait Payee {
    fn send(&mut self, to: Address, amount: U256) -> Result<(), TransferRejected>;
}

#[derive(Debug, Clone, Default)]
pub struct Vault {
    /// Total value each recipient has received
    received: HashMap<Address, U256>,
    /// Recipients that reject every incoming transfer
    refusing: HashSet<Address>,
}

impl Vault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total value delivered to `account` so far
    pub fn received(&self, account: &Address) -> U256 {
        self.received.get(account).copied().unwrap_or_default()
    }

    /// Make `account` reject all incoming transfers
    pub fn refuse(&mut self, account: Address) {
        self.refusing.insert(account);
    }

    /// Make `account` accept incoming transfers again
    pub fn accept(&mut self, account: Address) {
        self.refusing.remove(&account);
    }
}

impl Payee for Vault {
    fn send(&mut self, to: Address, amount: U256) -> Result<(), TransferRejected> {
        if self.refusing.contains(&to) {
            warn!("Recipient {:?} refused transfer of {}", to, amount);
            return Err(TransferRejected(to));
        }

        let balance = self.received.entry(to).or_default();
        *balance = balance.saturating_add(amount);
        Ok(())
    }
}
