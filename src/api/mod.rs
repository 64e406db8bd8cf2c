//! API Module
//!
//! This module handles the JSON-RPC API in front of the ledger sequencer.
//! It provides the HTTP endpoint that signing clients submit calls to
//! and that dashboards and indexers read committed state from.

mod server;


pub use server::{Server, router};
