//! Batch Registry Module
//!
//! This module tracks registered batches and their custody chains.
//! Only the current custodian of a batch may move it further.

mod batches;


pub use batches::BatchRegistry;
