use crate::{
    AuctionRecord, Batch, BatchId, Call, LedgerEvent, Outcome, TxContext,
    auction::AuctionHouse,
    config::LedgerConfig,
    error::Result,
    payments::Vault,
    registry::BatchRegistry,
};
use ethers::types::{Address, U256};
use tracing::debug;

/// Single logical owner of all ledger state
///
/// Holds the batch registry, the auction house, and the vault that receives
/// outgoing value. Calls are applied one at a time through `execute`.
#[derive(Debug, Clone)]
pub struct Ledger {
    registry: BatchRegistry,
    house: AuctionHouse,
    vault: Vault,
}

impl Ledger {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            registry: BatchRegistry::new(),
            house: AuctionHouse::new(config.house_address, config.require_custody_escrow),
            vault: Vault::new(),
        }
    }

    /// Apply one call atomically
    ///
    /// # Returns
    /// * `Ok((outcome, events))` if the call committed
    /// * `Err` if it was rejected; no state was changed
    pub fn execute(&mut self, ctx: &TxContext, call: &Call) -> Result<(Outcome, Vec<LedgerEvent>)> {
        debug!("Executing {} from {:?} at {}", call.name(), ctx.sender, ctx.timestamp);
        let mut events = Vec::new();

        let outcome = match call {
            Call::RegisterBatch { content_descriptor } => {
                let batch_id =
                    self.registry
                        .register_batch(ctx, content_descriptor.clone(), &mut events);
                Outcome::Registered { batch_id }
            }
            Call::TransferOwnership { batch_id, to } => {
                self.registry
                    .transfer_ownership(ctx, *batch_id, *to, &mut events)?;
                Outcome::Transferred
            }
            Call::CreateAuction {
                batch_id,
                starting_price,
                duration_seconds,
            } => {
                self.house.create_auction(
                    ctx,
                    *batch_id,
                    *starting_price,
                    *duration_seconds,
                    &self.registry,
                    &mut events,
                )?;
                Outcome::AuctionCreated
            }
            Call::Bid { batch_id, value } => {
                self.house.bid(ctx, *batch_id, *value, &mut events)?;
                Outcome::BidAccepted
            }
            Call::Withdraw => {
                let amount = self.house.withdraw(ctx, &mut self.vault, &mut events)?;
                Outcome::Withdrawn { amount }
            }
            Call::EndAuction { batch_id } => {
                let settlement = self.house.end_auction(
                    ctx,
                    *batch_id,
                    &mut self.registry,
                    &mut self.vault,
                    &mut events,
                )?;
                Outcome::Settled(settlement)
            }
        };

        Ok((outcome, events))
    }

    pub fn get_batch(&self, id: BatchId) -> Result<&Batch> {
        self.registry.get_batch(id)
    }

    pub fn batch_count(&self) -> u64 {
        self.registry.batch_count()
    }

    pub fn auction(&self, batch_id: BatchId) -> Option<&AuctionRecord> {
        self.house.auction(batch_id)
    }

    pub fn active_auctions(&self, now: u64) -> Vec<&AuctionRecord> {
        self.house.active_auctions(now)
    }

    pub fn pending_returns(&self, account: &Address) -> U256 {
        self.house.pending_returns(account)
    }

    pub fn escrow(&self) -> U256 {
        self.house.escrow()
    }

    pub fn house_address(&self) -> Address {
        self.house.address()
    }

    /// Value delivered to `account` by withdrawals and payouts
    pub fn received(&self, account: &Address) -> U256 {
        self.vault.received(account)
    }

    /// Mutable access to the payout vault, used to model refusing recipients
    #[cfg(test)]
    pub(crate) fn vault_mut(&mut self) -> &mut Vault {
        &mut self.vault
    }
}
