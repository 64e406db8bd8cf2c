use provenance_ledger::{
    api::Server,
    config::Config,
    journal::Journal,
    sequencer::{Clock, Sequencer, SystemClock},
};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

/// The main entry point for the ledger service.
///
/// This function initializes logging, loads the application configuration,
/// rebuilds the ledger from its journal, starts the event logger in the
/// background, and starts the API server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging using tracing_subscriber.
    tracing_subscriber::fmt::init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/default.toml".to_string());
    let config = Config::load(&path)?;
    info!("Ledger starting with config: {:?}", config);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Replay the journal if persistence is enabled, otherwise start empty.
    let sequencer = if config.journal.enabled {
        let journal = Arc::new(Journal::open(&config.journal.url).await?);
        Sequencer::recover(&config.ledger, &config.events, clock, journal).await?
    } else {
        warn!("Journal disabled; ledger state will not survive a restart");
        Sequencer::new(&config.ledger, &config.events, clock, None)
    };

    // Log committed events in the background, standing in for an off-core indexer.
    let mut events = sequencer.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(committed) => info!(
                    "Event #{} at {}: {:?}",
                    committed.seq, committed.timestamp, committed.event
                ),
                Err(RecvError::Lagged(missed)) => warn!("Event logger lagged, missed {}", missed),
                Err(RecvError::Closed) => break,
            }
        }
    });
    info!("Event logger started");

    let server = Server::new(config.api, sequencer);
    server.start().await?;

    Ok(())
}
