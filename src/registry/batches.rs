//! Batch Registry Module
//!
//! Owns batch identity, the immutable content descriptor, and the
//! append-only custody chain of every registered batch.
//!
//! # Custody
//! - Index 0 of the custody chain is the originator
//! - The last entry is the current custodian
//! - Each entry carries the commit time at which it was appended

use crate::{Batch, BatchId, LedgerError, LedgerEvent, TxContext, error::Result};
use ethers::types::Address;
use tracing::{debug, warn};

/// Registry of all batches ever registered
///
/// Batches are stored densely by id (id `n` lives at index `n - 1`),
/// are never removed, and only grow by appending custody entries.
#[derive(Debug, Clone, Default)]
pub struct BatchRegistry {
    batches: Vec<Batch>,
}

impl BatchRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new batch with the caller as originator and first custodian
    ///
    /// # Arguments
    /// * `ctx` - Commit context (caller and commit time)
    /// * `content_descriptor` - Opaque descriptor (e.g. an IPFS hash)
    /// * `events` - Event buffer for the enclosing transaction
    ///
    /// # Returns
    /// The newly allocated batch id
    pub fn register_batch(
        &mut self,
        ctx: &TxContext,
        content_descriptor: String,
        events: &mut Vec<LedgerEvent>,
    ) -> BatchId {
        let id = self.batches.len() as BatchId + 1;

        self.batches.push(Batch {
            id,
            originator: ctx.sender,
            content_descriptor,
            custodian_history: vec![ctx.sender],
            timestamp_history: vec![ctx.timestamp],
        });

        debug!("Batch #{} registered by {:?}", id, ctx.sender);
        events.push(LedgerEvent::BatchRegistered {
            id,
            originator: ctx.sender,
        });
        id
    }

    /// Look up a batch
    ///
    /// Fails with `NotFound` if `id` is outside `[1, batch_count]`.
    pub fn get_batch(&self, id: BatchId) -> Result<&Batch> {
        id.checked_sub(1)
            .and_then(|idx| self.batches.get(idx as usize))
            .ok_or(LedgerError::NotFound(id))
    }

    pub fn current_custodian(&self, id: BatchId) -> Result<Address> {
        self.get_batch(id).map(Batch::current_custodian)
    }

    /// Total number of batches ever registered
    pub fn batch_count(&self) -> u64 {
        self.batches.len() as u64
    }

    /// Check that `caller` may move batch `id` to `to`, without mutating anything
    ///
    /// # Returns
    /// The current custodian (the `from` side of the transfer)
    pub fn check_transfer(&self, id: BatchId, caller: Address, to: Address) -> Result<Address> {
        let from = self.current_custodian(id)?;

        if caller != from {
            warn!("Transfer of batch #{} rejected: {:?} is not custodian", id, caller);
            return Err(LedgerError::Unauthorized {
                batch_id: id,
                caller,
            });
        }

        if to.is_zero() || to == from {
            return Err(LedgerError::InvalidTarget(to));
        }

        Ok(from)
    }

    /// Move custody of a batch to a new custodian
    ///
    /// Appends `(to, now)` to the custody chain. The caller must be the
    /// current custodian and `to` must be neither null nor the caller.
    pub fn transfer_ownership(
        &mut self,
        ctx: &TxContext,
        id: BatchId,
        to: Address,
        events: &mut Vec<LedgerEvent>,
    ) -> Result<()> {
        let from = self.check_transfer(id, ctx.sender, to)?;

        let batch = &mut self.batches[(id - 1) as usize];
        batch.custodian_history.push(to);
        batch.timestamp_history.push(ctx.timestamp);

        debug!("Batch #{} custody {:?} -> {:?}", id, from, to);
        events.push(LedgerEvent::OwnershipTransferred { id, from, to });
        Ok(())
    }
}
