//! Fire-and-forget cache maintenance
//!
//! Hit-count increments and cache writes leave the request path through a
//! bounded queue. A single worker drains it; when the queue is full the task
//! is dropped and counted.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::cache::{CacheEntry, ResponseCacheRepository};
use crate::infrastructure::embedding::EmbeddingClient;
use crate::infrastructure::observability::{record_background_dropped, record_cache_degraded};

#[derive(Debug)]
enum BackgroundTask {
    IncrementHitCount(Uuid),
    /// Entries without an embedding get one computed here
    Persist(Box<CacheEntry>),
    /// Acknowledged once every task queued before it has been handled
    Flush(oneshot::Sender<()>),
}

impl BackgroundTask {
    fn name(&self) -> &'static str {
        match self {
            Self::IncrementHitCount(_) => "increment_hit_count",
            Self::Persist(_) => "persist_entry",
            Self::Flush(_) => "flush",
        }
    }
}

/// Handle for enqueueing background cache work
#[derive(Debug, Clone)]
pub struct BackgroundQueue {
    tx: mpsc::Sender<BackgroundTask>,
}

impl BackgroundQueue {
    /// Create the queue and the worker future that drains it.
    ///
    /// The caller spawns the worker. It exits once every handle is dropped.
    pub fn new(
        cache: Arc<dyn ResponseCacheRepository>,
        embeddings: EmbeddingClient,
        capacity: usize,
    ) -> (Self, impl std::future::Future<Output = ()> + Send) {
        let (tx, rx) = mpsc::channel::<BackgroundTask>(capacity.max(1));

        (Self { tx }, Self::run_worker(rx, cache, embeddings))
    }

    pub fn increment_hit_count(&self, id: Uuid) {
        self.enqueue(BackgroundTask::IncrementHitCount(id));
    }

    pub fn persist(&self, entry: CacheEntry) {
        self.enqueue(BackgroundTask::Persist(Box::new(entry)));
    }

    /// Wait until everything queued so far has been processed
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();

        if self.tx.send(BackgroundTask::Flush(ack_tx)).await.is_err() {
            return;
        }

        let _ = ack_rx.await;
    }

    fn enqueue(&self, task: BackgroundTask) {
        let name = task.name();

        if let Err(e) = self.tx.try_send(task) {
            warn!(task = name, error = %e, "Failed to queue background task (channel full or closed)");
            record_background_dropped(name);
        }
    }

    async fn run_worker(
        mut rx: mpsc::Receiver<BackgroundTask>,
        cache: Arc<dyn ResponseCacheRepository>,
        embeddings: EmbeddingClient,
    ) {
        while let Some(task) = rx.recv().await {
            match task {
                BackgroundTask::IncrementHitCount(id) => {
                    if let Err(e) = cache.increment_hit_count(id).await {
                        debug!(entry_id = %id, error = %e, "Hit count increment failed");
                    }
                }
                BackgroundTask::Persist(entry) => {
                    let mut entry = *entry;

                    if entry.embedding.is_none() && embeddings.is_enabled() {
                        entry.embedding = embeddings.embed(&entry.prompt_normalized).await;
                    }

                    let id = entry.id;
                    let tag = entry.feature_tag;

                    match cache.insert(entry).await {
                        Ok(()) => debug!(entry_id = %id, feature_tag = %tag, "Cache entry persisted"),
                        Err(e) => {
                            warn!(entry_id = %id, feature_tag = %tag, error = %e, "Cache write failed");
                            record_cache_degraded("cache_write");
                        }
                    }
                }
                BackgroundTask::Flush(ack) => {
                    let _ = ack.send(());
                }
            }
        }

        debug!("Background queue closed");
    }
}
