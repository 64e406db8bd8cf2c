//! Sequencer Module
//!
//! This module serializes every mutation of the ledger behind one write lock,
//! stamps commit times, persists committed calls, and fans out events:
//! - `Sequencer`: the single write-serialization point
//! - `Clock`: commit-time source (`SystemClock`, `ManualClock`)

mod clock;
mod sequencer;


pub use clock::{Clock, ManualClock, SystemClock};
pub use sequencer::Sequencer;
