//! Tests for the auction house
//!
//! Exercises the auction lifecycle, bid ordering, pull refunds,
//! settlement, and rollback when a recipient refuses funds

#[cfg(test)]
mod tests {
    use crate::{
        LedgerError, LedgerEvent, TxContext,
        auction::AuctionHouse,
        payments::Vault,
        registry::BatchRegistry,
    };
    use ethers::types::{Address, U256};
    use ethers::utils::parse_ether;

    const HOUSE: u64 = 0xa11c;
    const SELLER: u64 = 1;
    const BIDDER1: u64 = 2;
    const BIDDER2: u64 = 3;

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    fn eth(amount: &str) -> U256 {
        parse_ether(amount).unwrap()
    }

    fn ctx(sender: u64, timestamp: u64) -> TxContext {
        TxContext::new(addr(sender), timestamp)
    }

    /// Registry with batch #1 moved into the house's custody, plus an
    /// auction on it created at t=1000 with the given duration
    fn setup(duration: u64) -> (BatchRegistry, AuctionHouse, Vault) {
        let mut registry = BatchRegistry::new();
        let mut house = AuctionHouse::new(addr(HOUSE), false);
        let mut events = Vec::new();

        registry.register_batch(&ctx(SELLER, 900), "ipfs_hash_for_auction".into(), &mut events);
        registry
            .transfer_ownership(&ctx(SELLER, 950), 1, addr(HOUSE), &mut events)
            .unwrap();
        house
            .create_auction(&ctx(SELLER, 1000), 1, eth("1"), duration, &registry, &mut events)
            .unwrap();

        (registry, house, Vault::new())
    }

    #[test]
    fn test_create_auction_records_seller() {
        let (_, house, _) = setup(3600);

        let record = house.auction(1).unwrap();
        assert_eq!(record.seller, addr(SELLER));
        assert_eq!(record.starting_price, eth("1"));
        assert_eq!(record.highest_bid, eth("1"));
        assert_eq!(record.highest_bidder, None);
        assert_eq!(record.end_time, 4600);
        assert!(record.started);
        assert!(!record.ended);
    }

    #[test]
    fn test_create_auction_twice_fails() {
        let (registry, mut house, _) = setup(3600);

        let result = house.create_auction(&ctx(SELLER, 1001), 1, eth("5"), 60, &registry, &mut Vec::new());
        assert_eq!(result, Err(LedgerError::AlreadyStarted(1)));
        assert_eq!(house.auction(1).unwrap().starting_price, eth("1"));
    }

    #[test]
    fn test_outbid_scenario_and_withdraw() {
        let (_, mut house, mut vault) = setup(3600);
        let mut events = Vec::new();

        house.bid(&ctx(BIDDER1, 1100), 1, eth("1.5"), &mut events).unwrap();
        assert_eq!(house.auction(1).unwrap().highest_bidder, Some(addr(BIDDER1)));

        let low = house.bid(&ctx(BIDDER2, 1200), 1, eth("1.4"), &mut events);
        assert_eq!(low, Err(LedgerError::InsufficientBid));
        assert_eq!(house.auction(1).unwrap().highest_bid, eth("1.5"));

        house.bid(&ctx(BIDDER2, 1300), 1, eth("2"), &mut events).unwrap();
        assert_eq!(house.pending_returns(&addr(BIDDER1)), eth("1.5"));
        assert_eq!(house.escrow(), eth("3.5"));

        let withdrawn = house.withdraw(&ctx(BIDDER1, 1400), &mut vault, &mut events).unwrap();
        assert_eq!(withdrawn, eth("1.5"));
        assert_eq!(vault.received(&addr(BIDDER1)), eth("1.5"));
        assert_eq!(house.pending_returns(&addr(BIDDER1)), U256::zero());
        assert_eq!(house.escrow(), eth("2"));
    }

    #[test]
    fn test_tie_bid_is_rejected() {
        let (_, mut house, _) = setup(3600);
        let mut events = Vec::new();

        assert_eq!(
            house.bid(&ctx(BIDDER1, 1100), 1, eth("1"), &mut events),
            Err(LedgerError::InsufficientBid)
        );
        house.bid(&ctx(BIDDER1, 1100), 1, eth("2"), &mut events).unwrap();
        assert_eq!(
            house.bid(&ctx(BIDDER2, 1200), 1, eth("2"), &mut events),
            Err(LedgerError::InsufficientBid)
        );
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_bid_on_unknown_auction() {
        let (_, mut house, _) = setup(3600);
        assert_eq!(
            house.bid(&ctx(BIDDER1, 1100), 42, eth("2"), &mut Vec::new()),
            Err(LedgerError::NotStarted(42))
        );
    }

    #[test]
    fn test_bid_after_deadline_expires() {
        let (_, mut house, _) = setup(60);
        assert_eq!(
            house.bid(&ctx(BIDDER1, 1060), 1, eth("2"), &mut Vec::new()),
            Err(LedgerError::Expired { batch_id: 1, end_time: 1060 })
        );
    }

    #[test]
    fn test_refunds_accumulate_across_auctions() {
        let (mut registry, mut house, _) = setup(3600);
        let mut events = Vec::new();

        registry.register_batch(&ctx(SELLER, 1000), "second".into(), &mut events);
        house
            .create_auction(&ctx(SELLER, 1000), 2, eth("1"), 3600, &registry, &mut events)
            .unwrap();

        house.bid(&ctx(BIDDER1, 1100), 1, eth("2"), &mut events).unwrap();
        house.bid(&ctx(BIDDER1, 1100), 2, eth("3"), &mut events).unwrap();
        house.bid(&ctx(BIDDER2, 1200), 1, eth("4"), &mut events).unwrap();
        house.bid(&ctx(BIDDER2, 1200), 2, eth("5"), &mut events).unwrap();

        assert_eq!(house.pending_returns(&addr(BIDDER1)), eth("5"));
    }

    #[test]
    fn test_withdraw_is_idempotent() {
        let (_, mut house, mut vault) = setup(3600);
        let mut events = Vec::new();

        house.bid(&ctx(BIDDER1, 1100), 1, eth("2"), &mut events).unwrap();
        house.bid(&ctx(BIDDER2, 1200), 1, eth("3"), &mut events).unwrap();

        let first = house.withdraw(&ctx(BIDDER1, 1300), &mut vault, &mut events).unwrap();
        let second = house.withdraw(&ctx(BIDDER1, 1301), &mut vault, &mut events).unwrap();

        assert_eq!(first, eth("2"));
        assert_eq!(second, U256::zero());
        assert_eq!(vault.received(&addr(BIDDER1)), eth("2"));
    }

    #[test]
    fn test_rejected_withdraw_restores_balance() {
        let (_, mut house, mut vault) = setup(3600);
        let mut events = Vec::new();

        house.bid(&ctx(BIDDER1, 1100), 1, eth("2"), &mut events).unwrap();
        house.bid(&ctx(BIDDER2, 1200), 1, eth("3"), &mut events).unwrap();
        vault.refuse(addr(BIDDER1));

        let result = house.withdraw(&ctx(BIDDER1, 1300), &mut vault, &mut events);
        assert_eq!(result, Err(LedgerError::TransferFailed(addr(BIDDER1))));
        assert_eq!(house.pending_returns(&addr(BIDDER1)), eth("2"));
        assert_eq!(house.escrow(), eth("5"));

        vault.accept(addr(BIDDER1));
        assert_eq!(
            house.withdraw(&ctx(BIDDER1, 1400), &mut vault, &mut events).unwrap(),
            eth("2")
        );
    }

    #[test]
    fn test_refusing_bidder_cannot_block_outbid_or_settlement() {
        let (mut registry, mut house, mut vault) = setup(60);
        let mut events = Vec::new();

        vault.refuse(addr(BIDDER1));
        house.bid(&ctx(BIDDER1, 1010), 1, eth("2"), &mut events).unwrap();
        house.bid(&ctx(BIDDER2, 1020), 1, eth("3"), &mut events).unwrap();

        let settlement = house
            .end_auction(&ctx(BIDDER1, 1060), 1, &mut registry, &mut vault, &mut events)
            .unwrap();
        assert_eq!(settlement.winner, Some(addr(BIDDER2)));
        assert_eq!(vault.received(&addr(SELLER)), eth("3"));
        assert_eq!(house.pending_returns(&addr(BIDDER1)), eth("2"));
    }

    #[test]
    fn test_end_before_deadline_fails() {
        let (mut registry, mut house, mut vault) = setup(3600);
        let result = house.end_auction(&ctx(SELLER, 4599), 1, &mut registry, &mut vault, &mut Vec::new());

        assert_eq!(result, Err(LedgerError::NotEnded { batch_id: 1, end_time: 4600 }));
        assert!(!house.auction(1).unwrap().ended);
    }

    #[test]
    fn test_end_with_winner_moves_custody_and_pays_seller() {
        let (mut registry, mut house, mut vault) = setup(1);
        let mut events = Vec::new();

        house.bid(&ctx(BIDDER1, 1000), 1, eth("2"), &mut events).unwrap();
        let settlement = house
            .end_auction(&ctx(BIDDER2, 1002), 1, &mut registry, &mut vault, &mut events)
            .unwrap();

        assert_eq!(settlement.custodian, addr(BIDDER1));
        assert_eq!(settlement.amount, eth("2"));
        assert_eq!(registry.current_custodian(1).unwrap(), addr(BIDDER1));
        assert_eq!(vault.received(&addr(SELLER)), eth("2"));
        assert_eq!(house.escrow(), U256::zero());
        assert!(house.auction(1).unwrap().ended);
        assert_eq!(
            events.last(),
            Some(&LedgerEvent::AuctionEnded {
                batch_id: 1,
                winner: Some(addr(BIDDER1)),
                amount: eth("2"),
            })
        );
    }

    #[test]
    fn test_end_without_bids_returns_custody_to_seller() {
        let (mut registry, mut house, mut vault) = setup(1);
        let mut events = Vec::new();

        let settlement = house
            .end_auction(&ctx(BIDDER2, 1002), 1, &mut registry, &mut vault, &mut events)
            .unwrap();

        assert_eq!(settlement.winner, None);
        assert_eq!(settlement.amount, U256::zero());
        let batch = registry.get_batch(1).unwrap();
        assert_eq!(
            batch.custodian_history,
            vec![addr(SELLER), addr(HOUSE), addr(SELLER)]
        );
        assert_eq!(vault.received(&addr(SELLER)), U256::zero());
    }

    #[test]
    fn test_end_twice_fails() {
        let (mut registry, mut house, mut vault) = setup(1);
        let mut events = Vec::new();

        house
            .end_auction(&ctx(SELLER, 1002), 1, &mut registry, &mut vault, &mut events)
            .unwrap();
        let again = house.end_auction(&ctx(SELLER, 1003), 1, &mut registry, &mut vault, &mut events);

        assert_eq!(again, Err(LedgerError::AlreadyEnded(1)));
        assert_eq!(registry.get_batch(1).unwrap().custodian_history.len(), 3);
    }

    #[test]
    fn test_rejected_payout_rolls_back_settlement() {
        let (mut registry, mut house, mut vault) = setup(1);
        let mut events = Vec::new();

        house.bid(&ctx(BIDDER1, 1000), 1, eth("2"), &mut events).unwrap();
        vault.refuse(addr(SELLER));

        let result = house.end_auction(&ctx(SELLER, 1002), 1, &mut registry, &mut vault, &mut events);
        assert_eq!(result, Err(LedgerError::TransferFailed(addr(SELLER))));
        assert!(!house.auction(1).unwrap().ended);
        assert_eq!(house.escrow(), eth("2"));
        assert_eq!(registry.current_custodian(1).unwrap(), addr(HOUSE));
        assert_eq!(events.len(), 1);

        vault.accept(addr(SELLER));
        house
            .end_auction(&ctx(SELLER, 1003), 1, &mut registry, &mut vault, &mut events)
            .unwrap();
        assert_eq!(registry.current_custodian(1).unwrap(), addr(BIDDER1));
    }

    #[test]
    fn test_settlement_without_custody_escrow_fails_unauthorized() {
        let mut registry = BatchRegistry::new();
        let mut house = AuctionHouse::new(addr(HOUSE), false);
        let mut vault = Vault::new();
        let mut events = Vec::new();

        // Seller skips moving custody to the house; creation is still accepted.
        registry.register_batch(&ctx(SELLER, 0), "h".into(), &mut events);
        house
            .create_auction(&ctx(SELLER, 0), 1, eth("1"), 1, &registry, &mut events)
            .unwrap();
        house.bid(&ctx(BIDDER1, 0), 1, eth("2"), &mut events).unwrap();

        let result = house.end_auction(&ctx(SELLER, 5), 1, &mut registry, &mut vault, &mut events);
        assert_eq!(
            result,
            Err(LedgerError::Unauthorized { batch_id: 1, caller: addr(HOUSE) })
        );
        assert!(!house.auction(1).unwrap().ended);
        assert_eq!(house.escrow(), eth("2"));
    }

    #[test]
    fn test_require_custody_escrow_rejects_unescrowed_batch() {
        let mut registry = BatchRegistry::new();
        let mut house = AuctionHouse::new(addr(HOUSE), true);
        let mut events = Vec::new();

        registry.register_batch(&ctx(SELLER, 0), "h".into(), &mut events);
        assert_eq!(
            house.create_auction(&ctx(SELLER, 0), 1, eth("1"), 60, &registry, &mut events),
            Err(LedgerError::Unauthorized { batch_id: 1, caller: addr(SELLER) })
        );
        assert_eq!(
            house.create_auction(&ctx(SELLER, 0), 9, eth("1"), 60, &registry, &mut events),
            Err(LedgerError::NotFound(9))
        );

        registry
            .transfer_ownership(&ctx(SELLER, 1), 1, addr(HOUSE), &mut events)
            .unwrap();
        house
            .create_auction(&ctx(SELLER, 2), 1, eth("1"), 60, &registry, &mut events)
            .unwrap();
    }

    #[test]
    fn test_conservation_of_bid_value() {
        let (mut registry, mut house, mut vault) = setup(100);
        let mut events = Vec::new();
        let bids = [("1.1", BIDDER1), ("1.2", BIDDER2), ("1.7", BIDDER1), ("2.5", BIDDER2)];

        let mut attached = U256::zero();
        for (i, (amount, bidder)) in bids.iter().enumerate() {
            house.bid(&ctx(*bidder, 1001 + i as u64), 1, eth(amount), &mut events).unwrap();
            attached += eth(amount);
        }

        let pending = house.pending_returns(&addr(BIDDER1)) + house.pending_returns(&addr(BIDDER2));
        assert_eq!(pending + house.auction(1).unwrap().highest_bid, attached);

        house
            .end_auction(&ctx(SELLER, 1100), 1, &mut registry, &mut vault, &mut events)
            .unwrap();
        assert_eq!(pending + vault.received(&addr(SELLER)), attached);
        assert_eq!(house.escrow(), pending);
    }

    #[test]
    fn test_active_auctions_excludes_expired_and_ended() {
        let (mut registry, mut house, mut vault) = setup(10);
        let mut events = Vec::new();

        registry.register_batch(&ctx(SELLER, 1000), "second".into(), &mut events);
        house
            .create_auction(&ctx(SELLER, 1000), 2, eth("1"), 1000, &registry, &mut events)
            .unwrap();

        let ids: Vec<_> = house.active_auctions(1005).iter().map(|r| r.batch_id).collect();
        assert_eq!(ids, vec![1, 2]);

        let ids: Vec<_> = house.active_auctions(1010).iter().map(|r| r.batch_id).collect();
        assert_eq!(ids, vec![2]);

        house
            .end_auction(&ctx(SELLER, 1010), 1, &mut registry, &mut vault, &mut events)
            .unwrap();
        assert_eq!(house.active_auctions(1010).len(), 1);
    }
}
