//! Ledger error taxonomy.
//!
//! Every variant is a synchronous rejection: the call that produced it left
//! no trace in registry, auction, or payment state.

use crate::BatchId;
use ethers::types::Address;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Batch {0} not found")]
    NotFound(BatchId),

    #[error("Caller {caller:?} is not the current custodian of batch {batch_id}")]
    Unauthorized { batch_id: BatchId, caller: Address },

    #[error("Invalid transfer target {0:?}")]
    InvalidTarget(Address),

    #[error("Auction for batch {0} already started")]
    AlreadyStarted(BatchId),

    #[error("Auction for batch {0} already ended")]
    AlreadyEnded(BatchId),

    #[error("Auction for batch {0} not started")]
    NotStarted(BatchId),

    #[error("Auction for batch {batch_id} not yet ended (ends at {end_time})")]
    NotEnded { batch_id: BatchId, end_time: u64 },

    #[error("Auction for batch {batch_id} expired at {end_time}")]
    Expired { batch_id: BatchId, end_time: u64 },

    #[error("Bid must be higher than current highest bid")]
    InsufficientBid,

    #[error("Transfer to {0:?} was rejected")]
    TransferFailed(Address),

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    #[error("Sequencer halted: {0}")]
    Halted(String),

    #[error("Journal error: {0}")]
    Journal(String),
}

impl LedgerError {
    /// Stable kind name surfaced to clients
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::NotFound(_) => "NotFound",
            LedgerError::Unauthorized { .. } => "Unauthorized",
            LedgerError::InvalidTarget(_) => "InvalidTarget",
            LedgerError::AlreadyStarted(_) => "AlreadyStarted",
            LedgerError::AlreadyEnded(_) => "AlreadyEnded",
            LedgerError::NotStarted(_) => "NotStarted",
            LedgerError::NotEnded { .. } => "NotEnded",
            LedgerError::Expired { .. } => "Expired",
            LedgerError::InsufficientBid => "InsufficientBid",
            LedgerError::TransferFailed(_) => "TransferFailed",
            LedgerError::ArithmeticOverflow => "ArithmeticOverflow",
            LedgerError::Halted(_) => "Halted",
            LedgerError::Journal(_) => "Journal",
        }
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::Journal(e.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::Journal(e.to_string())
    }
}

pub type Result<T, E = LedgerError> = std::result::Result<T, E>;
