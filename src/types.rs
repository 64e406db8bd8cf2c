use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};

/// Identifier of a registered batch. Dense, starting at 1.
pub type BatchId = u64;

/// Execution context stamped by the sequencer when a call is applied
///
/// `sender` is the identity vouched for by the signing layer, `timestamp` is
/// the commit-time clock in seconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxContext {
    pub sender: Address,
    pub timestamp: u64,
}

impl TxContext {
    pub fn new(sender: Address, timestamp: u64) -> Self {
        Self { sender, timestamp }
    }
}

/// A registered unit of provenance-tracked goods
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub id: BatchId,
    pub originator: Address,
    pub content_descriptor: String,
    pub custodian_history: Vec<Address>,
    pub timestamp_history: Vec<u64>,
}

impl Batch {
    /// The identity currently authorized to move this batch
    pub fn current_custodian(&self) -> Address {
        // Histories are never empty: index 0 is the originator.
        self.custodian_history
            .last()
            .copied()
            .unwrap_or(self.originator)
    }
}

/// Per-batch ascending-price auction state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionRecord {
    pub batch_id: BatchId,
    pub seller: Address,
    pub starting_price: U256,
    pub highest_bid: U256,
    pub highest_bidder: Option<Address>,
    pub end_time: u64,
    pub started: bool,
    pub ended: bool,
}

impl AuctionRecord {
    /// Running auctions accept bids until `end_time`
    pub fn is_open(&self, now: u64) -> bool {
        self.started && !self.ended && now < self.end_time
    }
}

/// Mutating calls accepted by the ledger
///
/// Every variant is applied as one atomic transaction and journaled
/// only when it commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "camelCase")]
pub enum Call {
    #[serde(rename_all = "camelCase")]
    RegisterBatch { content_descriptor: String },
    #[serde(rename_all = "camelCase")]
    TransferOwnership { batch_id: BatchId, to: Address },
    #[serde(rename_all = "camelCase")]
    CreateAuction {
        batch_id: BatchId,
        starting_price: U256,
        duration_seconds: u64,
    },
    #[serde(rename_all = "camelCase")]
    Bid { batch_id: BatchId, value: U256 },
    Withdraw,
    #[serde(rename_all = "camelCase")]
    EndAuction { batch_id: BatchId },
}

impl Call {
    pub fn name(&self) -> &'static str {
        match self {
            Call::RegisterBatch { .. } => "registerBatch",
            Call::TransferOwnership { .. } => "transferOwnership",
            Call::CreateAuction { .. } => "createAuction",
            Call::Bid { .. } => "bid",
            Call::Withdraw => "withdraw",
            Call::EndAuction { .. } => "endAuction",
        }
    }
}

/// Events emitted by committed calls, consumed by off-core indexers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum LedgerEvent {
    #[serde(rename_all = "camelCase")]
    BatchRegistered { id: BatchId, originator: Address },
    #[serde(rename_all = "camelCase")]
    OwnershipTransferred {
        id: BatchId,
        from: Address,
        to: Address,
    },
    #[serde(rename_all = "camelCase")]
    AuctionCreated {
        batch_id: BatchId,
        seller: Address,
        starting_price: U256,
        end_time: u64,
    },
    #[serde(rename_all = "camelCase")]
    BidPlaced {
        batch_id: BatchId,
        bidder: Address,
        amount: U256,
    },
    #[serde(rename_all = "camelCase")]
    Withdrawal { account: Address, amount: U256 },
    #[serde(rename_all = "camelCase")]
    AuctionEnded {
        batch_id: BatchId,
        winner: Option<Address>,
        amount: U256,
    },
}

impl LedgerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerEvent::BatchRegistered { .. } => "BatchRegistered",
            LedgerEvent::OwnershipTransferred { .. } => "OwnershipTransferred",
            LedgerEvent::AuctionCreated { .. } => "AuctionCreated",
            LedgerEvent::BidPlaced { .. } => "BidPlaced",
            LedgerEvent::Withdrawal { .. } => "Withdrawal",
            LedgerEvent::AuctionEnded { .. } => "AuctionEnded",
        }
    }
}

/// Result of settling an auction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub batch_id: BatchId,
    pub custodian: Address,
    pub winner: Option<Address>,
    pub amount: U256,
}

/// What a committed call produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Outcome {
    #[serde(rename_all = "camelCase")]
    Registered { batch_id: BatchId },
    Transferred,
    AuctionCreated,
    BidAccepted,
    Withdrawn { amount: U256 },
    Settled(Settlement),
}

/// Receipt handed back to the submitter of a committed call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub seq: u64,
    pub timestamp: u64,
    pub outcome: Outcome,
    pub events: Vec<LedgerEvent>,
}

/// A committed event together with the sequence number of its call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommittedEvent {
    pub seq: u64,
    pub timestamp: u64,
    pub event: LedgerEvent,
}
