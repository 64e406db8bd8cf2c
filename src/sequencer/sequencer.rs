//! Ledger Sequencer Module
//!
//! This module is the single write-serialization point of the ledger.
//! Every mutating call goes through `submit`, which:
//! 1. Takes the write lock (no two mutations ever interleave)
//! 2. Stamps the commit time from the sequencer's clock
//! 3. Applies the call to a staged copy of the ledger
//! 4. Appends the call to the journal (if configured), then swaps the
//!    staged copy in
//! 5. Broadcasts the committed events to subscribers
//!
//! Readers take the read lock and only ever see committed state.

use crate::{
    AuctionRecord, Batch, BatchId, Call, CommittedEvent, LedgerError, Receipt, TxContext,
    config::{EventsConfig, LedgerConfig},
    error::Result,
    journal::{Journal, JournalEntry},
    sequencer::Clock,
    state::Ledger,
};
use ethers::types::{Address, U256};
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, error, info, warn};

struct Inner {
    ledger: Ledger,
    /// Sequence number assigned to the next committed call
    next_seq: u64,
    /// Latest commit time handed out; commit times never go backwards
    last_timestamp: u64,
    /// Set when the journal fell behind memory; no further writes are accepted
    halted: Option<String>,
}

/// Serialized front of the ledger
///
/// Cheap to clone; all clones share the same ledger.
#[derive(Clone)]
pub struct Sequencer {
    inner: Arc<RwLock<Inner>>,
    clock: Arc<dyn Clock>,
    journal: Option<Arc<Journal>>,
    events: broadcast::Sender<CommittedEvent>,
}

impl Sequencer {
    /// Creates a sequencer over an empty ledger
    ///
    /// # Arguments
    /// * `ledger_config` - House identity and auction policy
    /// * `events_config` - Broadcast channel sizing
    /// * `clock` - Commit-time source
    /// * `journal` - Where committed calls are persisted, if anywhere
    pub fn new(
        ledger_config: &LedgerConfig,
        events_config: &EventsConfig,
        clock: Arc<dyn Clock>,
        journal: Option<Arc<Journal>>,
    ) -> Self {
        Self::from_parts(Ledger::new(ledger_config), 1, 0, events_config, clock, journal)
    }

    /// Rebuild the ledger by replaying every journaled call in order
    ///
    /// Each call is re-applied with its recorded commit context, so the
    /// rebuilt state is identical to the state before shutdown. Refuses to
    /// start if `ledger_config` differs from the one the journal was written under.
    pub async fn recover(
        ledger_config: &LedgerConfig,
        events_config: &EventsConfig,
        clock: Arc<dyn Clock>,
        journal: Arc<Journal>,
    ) -> anyhow::Result<Self> {
        journal.bind_config(ledger_config).await?;
        let entries = journal.load().await?;
        let mut ledger = Ledger::new(ledger_config);
        let mut last_timestamp = 0;

        for (expected, entry) in (1u64..).zip(entries.iter()) {
            if entry.seq != expected {
                anyhow::bail!("journal gap: expected call #{}, found #{}", expected, entry.seq);
            }

            ledger.execute(&entry.context, &entry.call).map_err(|e| {
                anyhow::anyhow!("replay of call #{} ({}) failed: {}", entry.seq, entry.call.name(), e)
            })?;
            last_timestamp = entry.context.timestamp;
        }

        info!(
            "Recovered {} journaled calls ({} batches)",
            entries.len(),
            ledger.batch_count()
        );

        let next_seq = entries.len() as u64 + 1;
        Ok(Self::from_parts(
            ledger,
            next_seq,
            last_timestamp,
            events_config,
            clock,
            Some(journal),
        ))
    }

    fn from_parts(
        ledger: Ledger,
        next_seq: u64,
        last_timestamp: u64,
        events_config: &EventsConfig,
        clock: Arc<dyn Clock>,
        journal: Option<Arc<Journal>>,
    ) -> Self {
        let (events, _) = broadcast::channel(events_config.channel_capacity);
        Self {
            inner: Arc::new(RwLock::new(Inner {
                ledger,
                next_seq,
                last_timestamp,
                halted: None,
            })),
            clock,
            journal,
            events,
        }
    }

    /// Subscribe to events of calls committed from now on
    pub fn subscribe(&self) -> broadcast::Receiver<CommittedEvent> {
        self.events.subscribe()
    }

    /// Apply one call from `sender` as a single atomic transaction
    ///
    /// # Returns
    /// * `Ok(Receipt)` if the call committed
    /// * `Err` with the rejection kind; the ledger is unchanged
    pub async fn submit(&self, sender: Address, call: Call) -> Result<Receipt> {
        let mut inner = self.inner.write().await;

        if let Some(reason) = &inner.halted {
            return Err(LedgerError::Halted(reason.clone()));
        }

        // Step 1: Stamp the commit time
        let timestamp = self.clock.now().max(inner.last_timestamp);
        let ctx = TxContext::new(sender, timestamp);

        // Step 2: Apply to a staged copy; readers keep seeing the committed ledger
        let mut staged = inner.ledger.clone();
        let (outcome, events) = match staged.execute(&ctx, &call) {
            Ok(applied) => applied,
            Err(e) => {
                warn!("{} from {:?} rejected: {}", call.name(), sender, e);
                return Err(e);
            }
        };
        let seq = inner.next_seq;

        // Step 3: Persist. A failed append discards the staged copy and stops all writes.
        if let Some(journal) = &self.journal {
            let entry = JournalEntry {
                seq,
                context: ctx,
                call,
            };
            if let Err(e) = journal.append(&entry, &events).await {
                error!("Journal append for call #{} failed, halting: {}", seq, e);
                let reason = format!("journal append for call #{} failed: {}", seq, e);
                inner.halted = Some(reason.clone());
                return Err(LedgerError::Halted(reason));
            }
        }

        // Step 4: Commit
        inner.ledger = staged;
        inner.next_seq += 1;
        inner.last_timestamp = timestamp;

        // Step 5: Publish. Sending only fails when nobody is subscribed.
        for event in &events {
            let _ = self.events.send(CommittedEvent {
                seq,
                timestamp,
                event: event.clone(),
            });
        }

        debug!("Committed call #{} at {}", seq, timestamp);
        Ok(Receipt {
            seq,
            timestamp,
            outcome,
            events,
        })
    }

    pub async fn get_batch(&self, id: BatchId) -> Result<Batch> {
        let inner = self.inner.read().await;
        inner.ledger.get_batch(id).cloned()
    }

    pub async fn batch_count(&self) -> u64 {
        self.inner.read().await.ledger.batch_count()
    }

    pub async fn auction(&self, batch_id: BatchId) -> Option<AuctionRecord> {
        self.inner.read().await.ledger.auction(batch_id).cloned()
    }

    /// Auctions still accepting bids at the current commit time
    pub async fn active_auctions(&self) -> Vec<AuctionRecord> {
        let inner = self.inner.read().await;
        let now = self.clock.now().max(inner.last_timestamp);
        inner
            .ledger
            .active_auctions(now)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn pending_returns(&self, account: Address) -> U256 {
        self.inner.read().await.ledger.pending_returns(&account)
    }

    pub async fn escrow(&self) -> U256 {
        self.inner.read().await.ledger.escrow()
    }

    pub async fn received(&self, account: Address) -> U256 {
        self.inner.read().await.ledger.received(&account)
    }

    pub async fn house_address(&self) -> Address {
        self.inner.read().await.ledger.house_address()
    }

    /// Make `account` refuse (or accept again) value pushed to it
    #[cfg(test)]
    pub(crate) async fn set_refusing(&self, account: Address, refusing: bool) {
        let mut inner = self.inner.write().await;
        let vault = inner.ledger.vault_mut();
        if refusing {
            vault.refuse(account);
        } else {
            vault.accept(account);
        }
    }

    /// Journaled events of every call committed after `seq`
    ///
    /// Lets an indexer that missed broadcasts catch up from its last seen sequence.
    pub async fn events_since(&self, seq: u64) -> Result<Vec<CommittedEvent>> {
        match &self.journal {
            Some(journal) => journal.events_since(seq).await,
            None => Err(LedgerError::Journal("journal disabled".to_string())),
        }
    }

    /// Number of calls committed so far
    pub async fn committed(&self) -> u64 {
        self.inner.read().await.next_seq - 1
    }
}
