//! Queue-release event intake.
//!
//! The upstream queue emits one event per released user on a single topic.
//! The consumer-group transport itself lives behind [`ReleaseStream`]; this
//! module owns the dispatch loop: parse, signal the bot's release gate,
//! commit. Records that fail to parse are logged and committed anyway
//! (at-most-once) so a malformed record can never wedge the partition.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::signal::ReleaseRegistry;

/// A user was released from the upstream waiting queue.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotDequeuedEvent {
    pub match_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub ts: i64,
}

/// Ordered record source with explicit offset commits. The production
/// implementation is a Kafka consumer group configured by the `KAFKA_*`
/// settings.
#[async_trait]
pub trait ReleaseStream: Send {
    /// Next record payload; `None` means the stream ended.
    async fn next_record(&mut self) -> Option<Vec<u8>>;

    /// Commits the offset of the record last returned by `next_record`.
    async fn commit(&mut self) -> anyhow::Result<()>;
}

pub struct ReleaseConsumer {
    registry: Arc<ReleaseRegistry>,
}

impl ReleaseConsumer {
    pub fn new(registry: Arc<ReleaseRegistry>) -> Self {
        Self { registry }
    }

    pub async fn run<S: ReleaseStream>(self, mut stream: S, cancel: CancellationToken) {
        info!("release consumer started");

        loop {
            let record = tokio::select! {
                record = stream.next_record() => record,
                _ = cancel.cancelled() => {
                    info!("release consumer stopping");
                    return;
                }
            };

            let Some(payload) = record else {
                warn!("release stream closed; consumer exiting");
                return;
            };

            match serde_json::from_slice::<BotDequeuedEvent>(&payload) {
                Ok(event) => {
                    debug!(
                        match_id = event.match_id,
                        user_id = event.user_id,
                        ts = event.ts,
                        "bot dequeued"
                    );
                    self.registry.signal(event.match_id, event.user_id);
                }
                Err(err) => {
                    warn!(%err, "malformed release event; skipping record");
                }
            }

            if let Err(err) = stream.commit().await {
                warn!(%err, "offset commit failed");
            }
        }
    }
}
