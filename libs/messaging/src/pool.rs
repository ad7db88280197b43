//! Bounded worker pool for consumed events.
//!
//! Deliveries are queued on a bounded channel drained by a fixed number of
//! workers. When the queue is full [`HandlerPool::submit`] waits, which stalls
//! the consume loop instead of growing memory.

use std::sync::Arc;

use courier_events::EventPayload;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info_span, warn, Instrument};

use crate::{EventSink, MessagingError};

/// Default number of concurrent handlers.
pub const DEFAULT_WORKERS: usize = 8;

/// Default number of payloads waiting for a free handler.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

pub struct HandlerPool {
    tx: mpsc::Sender<EventPayload>,
    workers: Vec<JoinHandle<()>>,
}

impl HandlerPool {
    /// Spawn `workers` handler tasks fed by a queue of `capacity` payloads.
    /// Both values are clamped to at least one.
    pub fn new(workers: usize, capacity: usize, sink: Arc<dyn EventSink>) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));

        let workers = (0..workers.max(1))
            .map(|id| {
                let rx = Arc::clone(&rx);
                let sink = Arc::clone(&sink);
                tokio::spawn(worker_loop(id, rx, sink))
            })
            .collect();

        Self { tx, workers }
    }

    /// Queue a payload, waiting while the queue is full.
    pub async fn submit(&self, payload: EventPayload) -> Result<(), MessagingError> {
        self.tx
            .send(payload)
            .await
            .map_err(|_| MessagingError::PoolClosed)
    }

    /// Stop accepting payloads and wait for queued ones to be handled.
    pub async fn shutdown(self) {
        drop(self.tx);
        for worker in self.workers {
            if let Err(e) = worker.await {
                warn!(error = %e, "Event handler task panicked");
            }
        }
    }
}

async fn worker_loop(
    id: usize,
    rx: Arc<Mutex<mpsc::Receiver<EventPayload>>>,
    sink: Arc<dyn EventSink>,
) {
    loop {
        let next = { rx.lock().await.recv().await };
        let Some(payload) = next else {
            break;
        };

        let span = info_span!("event", worker = id, name = %payload.name);
        handle_payload(&payload, sink.as_ref())
            .instrument(span)
            .await;
    }
    debug!(worker = id, "Event handler stopped");
}

/// Route one payload by name.
///
/// Sink failures are logged and dropped: no retry, no redelivery.
pub async fn handle_payload(payload: &EventPayload, sink: &dyn EventSink) {
    let kind = payload.kind();
    if !kind.forwards_to_sink() {
        debug!(kind = %kind, "No handler registered for event");
        return;
    }

    if let Err(e) = sink.log_event(payload).await {
        warn!(error = %e, kind = %kind, "Failed to forward event to log sink");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Semaphore;

    use super::*;
    use crate::SinkError;

    #[derive(Default)]
    struct RecordingSink {
        seen: StdMutex<Vec<EventPayload>>,
    }

    impl RecordingSink {
        fn names(&self) -> Vec<String> {
            let mut names: Vec<String> = self
                .seen
                .lock()
                .unwrap()
                .iter()
                .map(|p| p.name.clone())
                .collect();
            names.sort();
            names
        }
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        async fn log_event(&self, payload: &EventPayload) -> Result<(), SinkError> {
            self.seen.lock().unwrap().push(payload.clone());
            if payload.data == "fail" {
                return Err(SinkError::UnexpectedStatus(500));
            }
            Ok(())
        }
    }

    /// Blocks every call until a permit is released.
    struct GatedSink {
        gate: Arc<Semaphore>,
    }

    #[async_trait]
    impl EventSink for GatedSink {
        async fn log_event(&self, _payload: &EventPayload) -> Result<(), SinkError> {
            let permit = self.gate.acquire().await.unwrap();
            permit.forget();
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_routes_by_event_name() {
        let sink = Arc::new(RecordingSink::default());

        for name in ["log", "event", "auth", "billing", ""] {
            handle_payload(&EventPayload::new(name, "x"), sink.as_ref()).await;
        }

        assert_eq!(sink.names(), vec!["", "billing", "event", "log"]);
    }

    #[tokio::test]
    async fn test_pool_handles_every_payload_before_shutdown() {
        let sink = Arc::new(RecordingSink::default());
        let pool = HandlerPool::new(4, 2, sink.clone());

        for i in 0..20 {
            pool.submit(EventPayload::new("log", i.to_string()))
                .await
                .unwrap();
        }
        pool.shutdown().await;

        assert_eq!(sink.seen.lock().unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_stop_workers() {
        let sink = Arc::new(RecordingSink::default());
        let pool = HandlerPool::new(1, 4, sink.clone());

        pool.submit(EventPayload::new("log", "fail")).await.unwrap();
        pool.submit(EventPayload::new("event", "ok")).await.unwrap();
        pool.shutdown().await;

        assert_eq!(sink.names(), vec!["event", "log"]);
    }

    #[tokio::test]
    async fn test_full_queue_applies_backpressure() {
        let gate = Arc::new(Semaphore::new(0));
        let sink = Arc::new(GatedSink {
            gate: Arc::clone(&gate),
        });
        let pool = HandlerPool::new(1, 1, sink);

        // First payload occupies the only worker, second fills the queue.
        pool.submit(EventPayload::new("log", "1")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        pool.submit(EventPayload::new("log", "2")).await.unwrap();

        let third = tokio::time::timeout(
            Duration::from_millis(50),
            pool.submit(EventPayload::new("log", "3")),
        )
        .await;
        assert!(third.is_err(), "submit should wait while the queue is full");

        gate.add_permits(3);
        pool.submit(EventPayload::new("log", "3")).await.unwrap();
        pool.shutdown().await;
    }
}
