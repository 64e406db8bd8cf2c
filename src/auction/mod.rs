//! Auction Module
//!
//! This module runs single-item ascending-price auctions over registered batches.
//! The house escrows every accepted bid:
//! - Outbid value is credited to a pull-based refund balance
//! - The winning bid is pushed to the seller at settlement
//!
//! Custody of the batch moves through the registry under the house's own identity.

mod house;

#[cfg(test)]
mod tests;

pub use house::AuctionHouse;
