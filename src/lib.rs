//! This crate implements a provenance ledger: a custody registry for batches of
//! traceable goods and an auction house that runs English auctions over them.
//! It includes modules for data types, the ledger state machine, the sequencer
//! that serializes every mutation, persistence, the JSON-RPC API, and configuration.

pub mod types; // Defines common data structures and types used throughout the system.
pub mod error; // Ledger error taxonomy.
pub mod registry; // Batch identity and custody chains.
pub mod payments; // Outgoing value transfers and refusing recipients.
pub mod auction; // Per-batch auctions and bid escrow.
pub mod state; // The ledger state machine tying registry, auctions and payments together.
pub mod journal; // Append-only persistence of committed calls.
pub mod sequencer; // Single write-serialization point, commit clock and event fan-out.
pub mod api; // JSON-RPC interface.
pub mod config; // Defines and loads system configuration.

// Re-export commonly used types and configurations for easier access.
pub use types::*;
pub use error::LedgerError;
pub use config::Config;
pub use sequencer::Sequencer;
