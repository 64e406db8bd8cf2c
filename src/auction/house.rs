//! Auction House Module
//!
//! Runs one time-bounded English auction per batch and escrows bid funds.
//!
//! # Lifecycle
//! `NotCreated -> Started -> Active (bids) -> Ended`. Nothing leaves `Ended`.
//!
//! # Funds
//! - Outbid value is credited to `pending_returns` and pulled via `withdraw`
//! - The winning bid is pushed to the seller at settlement
//!
//! Every operation validates before it mutates, and any effect that precedes
//! an outgoing transfer is reverted if the recipient rejects it.

use crate::{
    AuctionRecord, BatchId, LedgerError, LedgerEvent, Settlement, TxContext,
    error::Result,
    payments::Payee,
    registry::BatchRegistry,
};
use ethers::types::{Address, U256};
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct AuctionHouse {
    /// Identity the house acts under as a batch custodian
    address: Address,
    /// Reject `create_auction` unless the house already holds custody
    require_custody_escrow: bool,
    auctions: HashMap<BatchId, AuctionRecord>,
    pending_returns: HashMap<Address, U256>,
    /// All value currently held by the house
    escrow: U256,
}

impl AuctionHouse {
    /// Creates an auction house acting as `address`
    ///
    /// # Arguments
    /// * `address` - Custodian identity of the house inside the registry
    /// * `require_custody_escrow` - Whether `create_auction` verifies that
    ///   custody was moved to the house beforehand
    pub fn new(address: Address, require_custody_escrow: bool) -> Self {
        Self {
            address,
            require_custody_escrow,
            auctions: HashMap::new(),
            pending_returns: HashMap::new(),
            escrow: U256::zero(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Full auction record for a batch, if one was ever created
    pub fn auction(&self, batch_id: BatchId) -> Option<&AuctionRecord> {
        self.auctions.get(&batch_id)
    }

    /// Auctions still accepting bids at `now`, ordered by batch id
    pub fn active_auctions(&self, now: u64) -> Vec<&AuctionRecord> {
        let mut active: Vec<_> = self
            .auctions
            .values()
            .filter(|record| record.is_open(now))
            .collect();
        active.sort_by_key(|record| record.batch_id);
        active
    }

    /// Withdrawable balance of `account`
    pub fn pending_returns(&self, account: &Address) -> U256 {
        self.pending_returns.get(account).copied().unwrap_or_default()
    }

    /// Total value held by the house
    pub fn escrow(&self) -> U256 {
        self.escrow
    }

    /// Open an auction for a batch
    ///
    /// The caller becomes the seller. Unless `require_custody_escrow` is set,
    /// the house does not check that it holds custody of the batch; settlement
    /// will then fail `Unauthorized` when it tries to move custody.
    ///
    /// # Arguments
    /// * `ctx` - Commit context (seller and commit time)
    /// * `batch_id` - Batch being auctioned
    /// * `starting_price` - Floor; the first accepted bid must exceed it
    /// * `duration_seconds` - Bidding window from commit time
    /// * `registry` - Batch registry, consulted only under `require_custody_escrow`
    pub fn create_auction(
        &mut self,
        ctx: &TxContext,
        batch_id: BatchId,
        starting_price: U256,
        duration_seconds: u64,
        registry: &BatchRegistry,
        events: &mut Vec<LedgerEvent>,
    ) -> Result<()> {
        if self.auctions.get(&batch_id).is_some_and(|record| record.started) {
            return Err(LedgerError::AlreadyStarted(batch_id));
        }

        if self.require_custody_escrow && registry.current_custodian(batch_id)? != self.address {
            warn!("Auction for batch #{} rejected: house is not custodian", batch_id);
            return Err(LedgerError::Unauthorized {
                batch_id,
                caller: ctx.sender,
            });
        }

        let end_time = ctx
            .timestamp
            .checked_add(duration_seconds)
            .ok_or(LedgerError::ArithmeticOverflow)?;

        self.auctions.insert(
            batch_id,
            AuctionRecord {
                batch_id,
                seller: ctx.sender,
                starting_price,
                highest_bid: starting_price,
                highest_bidder: None,
                end_time,
                started: true,
                ended: false,
            },
        );

        info!(
            "Auction for batch #{} opened by {:?}, floor {}, ends at {}",
            batch_id, ctx.sender, starting_price, end_time
        );
        events.push(LedgerEvent::AuctionCreated {
            batch_id,
            seller: ctx.sender,
            starting_price,
            end_time,
        });
        Ok(())
    }

    /// Place a bid carrying `value`
    ///
    /// The bid must strictly exceed the current highest bid. The previous
    /// highest bidder's value is added to their pending returns.
    pub fn bid(
        &mut self,
        ctx: &TxContext,
        batch_id: BatchId,
        value: U256,
        events: &mut Vec<LedgerEvent>,
    ) -> Result<()> {
        // Step 1: Checks
        let record = self
            .auctions
            .get(&batch_id)
            .filter(|record| record.started)
            .ok_or(LedgerError::NotStarted(batch_id))?;

        if ctx.timestamp >= record.end_time {
            return Err(LedgerError::Expired {
                batch_id,
                end_time: record.end_time,
            });
        }

        if value <= record.highest_bid {
            debug!(
                "Bid of {} on batch #{} rejected, highest is {}",
                value, batch_id, record.highest_bid
            );
            return Err(LedgerError::InsufficientBid);
        }

        let escrow = self
            .escrow
            .checked_add(value)
            .ok_or(LedgerError::ArithmeticOverflow)?;

        let refund = match record.highest_bidder {
            Some(previous) => {
                let credited = self
                    .pending_returns(&previous)
                    .checked_add(record.highest_bid)
                    .ok_or(LedgerError::ArithmeticOverflow)?;
                Some((previous, credited))
            }
            None => None,
        };

        // Step 2: Effects
        if let Some((previous, credited)) = refund {
            self.pending_returns.insert(previous, credited);
        }
        self.escrow = escrow;

        if let Some(record) = self.auctions.get_mut(&batch_id) {
            record.highest_bid = value;
            record.highest_bidder = Some(ctx.sender);
        }

        debug!("Bid of {} on batch #{} by {:?} accepted", value, batch_id, ctx.sender);
        events.push(LedgerEvent::BidPlaced {
            batch_id,
            bidder: ctx.sender,
            amount: value,
        });
        Ok(())
    }

    /// Pull the caller's pending returns
    ///
    /// A zero balance is a no-op returning zero. The balance is cleared
    /// before the transfer is attempted and restored if it is rejected.
    pub fn withdraw(
        &mut self,
        ctx: &TxContext,
        payee: &mut impl Payee,
        events: &mut Vec<LedgerEvent>,
    ) -> Result<U256> {
        let amount = self.pending_returns(&ctx.sender);
        if amount.is_zero() {
            return Ok(U256::zero());
        }

        // Effects before interaction
        self.pending_returns.insert(ctx.sender, U256::zero());
        self.escrow -= amount;

        if let Err(rejected) = payee.send(ctx.sender, amount) {
            self.pending_returns.insert(ctx.sender, amount);
            self.escrow += amount;
            return Err(LedgerError::TransferFailed(rejected.0));
        }

        info!("{:?} withdrew {}", ctx.sender, amount);
        events.push(LedgerEvent::Withdrawal {
            account: ctx.sender,
            amount,
        });
        Ok(amount)
    }

    /// Settle an auction whose deadline has passed
    ///
    /// With no bids, custody returns to the seller and no funds move.
    /// Otherwise custody goes to the highest bidder and the winning bid is
    /// pushed to the seller. Anyone may call this.
    ///
    /// # Returns
    /// The settlement that was committed
    pub fn end_auction(
        &mut self,
        ctx: &TxContext,
        batch_id: BatchId,
        registry: &mut BatchRegistry,
        payee: &mut impl Payee,
        events: &mut Vec<LedgerEvent>,
    ) -> Result<Settlement> {
        // Step 1: Checks
        let record = self
            .auctions
            .get(&batch_id)
            .filter(|record| record.started)
            .ok_or(LedgerError::NotStarted(batch_id))?;

        if ctx.timestamp < record.end_time {
            return Err(LedgerError::NotEnded {
                batch_id,
                end_time: record.end_time,
            });
        }
        if record.ended {
            return Err(LedgerError::AlreadyEnded(batch_id));
        }

        let seller = record.seller;
        let (custodian, payout) = match record.highest_bidder {
            Some(winner) => (winner, Some(record.highest_bid)),
            None => (seller, None),
        };

        // Custody moves are authorized by the house's own identity.
        let house_ctx = TxContext::new(self.address, ctx.timestamp);
        registry.check_transfer(batch_id, house_ctx.sender, custodian)?;

        // Step 2: Effects
        self.set_ended(batch_id, true);

        // Step 3: Interaction, reverted on rejection
        if let Some(amount) = payout {
            self.escrow -= amount;
            if let Err(rejected) = payee.send(seller, amount) {
                warn!("Settlement of batch #{} reverted: seller rejected payout", batch_id);
                self.escrow += amount;
                self.set_ended(batch_id, false);
                return Err(LedgerError::TransferFailed(rejected.0));
            }
        }

        registry.transfer_ownership(&house_ctx, batch_id, custodian, events)?;

        let amount = payout.unwrap_or_default();
        let winner = payout.map(|_| custodian);
        info!(
            "Auction for batch #{} ended, custody to {:?}, paid {}",
            batch_id, custodian, amount
        );
        events.push(LedgerEvent::AuctionEnded {
            batch_id,
            winner,
            amount,
        });

        Ok(Settlement {
            batch_id,
            custodian,
            winner,
            amount,
        })
    }

    fn set_ended(&mut self, batch_id: BatchId, ended: bool) {
        if let Some(record) = self.auctions.get_mut(&batch_id) {
            record.ended = ended;
        }
    }
}
