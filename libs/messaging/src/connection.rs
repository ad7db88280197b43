//! Broker connection establishment.
//!
//! The broker is dialed once at process start. Failed dials back off
//! quadratically (`attempt²` units, no jitter) until the retry budget is
//! spent, at which point the caller gets [`MessagingError::RetriesExhausted`]
//! and must stop.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use lapin::{Channel, Connection, ConnectionProperties};
use tracing::{error, info, warn};

use crate::MessagingError;

/// Default number of retries after the first failed dial.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Retry budget and backoff unit for [`ConnectionManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Failures tolerated before giving up. One more failure is fatal.
    pub max_retries: u32,
    /// Backoff for attempt `n` is `unit * n²`.
    pub unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.unit.saturating_mul(attempt.saturating_mul(attempt))
    }
}

/// Progress of one connection loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionState {
    /// Failed dials so far.
    pub attempts: u32,
    /// Delay computed for the most recent failure.
    pub backoff: Duration,
    /// Set once the retry budget is spent.
    pub terminal: bool,
}

impl ConnectionState {
    /// Record a failed dial.
    ///
    /// Returns the delay before the next dial, or `None` when the budget is
    /// spent and the state became terminal.
    pub fn record_failure(&mut self, policy: &RetryPolicy) -> Option<Duration> {
        self.attempts += 1;
        if self.attempts > policy.max_retries {
            self.terminal = true;
            return None;
        }
        self.backoff = policy.backoff(self.attempts);
        Some(self.backoff)
    }
}

/// Dials the broker with retry.
#[derive(Debug, Clone, Default)]
pub struct ConnectionManager {
    policy: RetryPolicy,
}

impl ConnectionManager {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Connect to the AMQP broker at `url`. Blocks the caller through every
    /// backoff; meant to run once at startup.
    pub async fn connect(&self, url: &str) -> Result<BrokerHandle, MessagingError> {
        let connection = self
            .connect_with(|| Connection::connect(url, ConnectionProperties::default()))
            .await?;
        Ok(BrokerHandle::new(connection))
    }

    /// Run the retry loop around an arbitrary dialer.
    pub async fn connect_with<F, Fut, T, E>(&self, mut dial: F) -> Result<T, MessagingError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let mut state = ConnectionState::default();

        loop {
            match dial().await {
                Ok(connection) => {
                    info!(failed_attempts = state.attempts, "Connected to broker");
                    return Ok(connection);
                }
                Err(e) => match state.record_failure(&self.policy) {
                    Some(delay) => {
                        warn!(
                            attempt = state.attempts,
                            backoff_secs = delay.as_secs_f64(),
                            error = %e,
                            "Broker not ready, backing off"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        error!(
                            attempts = state.attempts,
                            error = %e,
                            "Broker connection retry budget exhausted"
                        );
                        return Err(MessagingError::RetriesExhausted {
                            attempts: state.attempts,
                            last_error: e.to_string(),
                        });
                    }
                },
            }
        }
    }
}

/// Shared handle to the live broker connection.
///
/// Cloning is cheap. Holders only open short-lived channels; the process
/// bootstrap closes the connection once at shutdown.
#[derive(Clone)]
pub struct BrokerHandle {
    connection: Arc<Connection>,
}

impl BrokerHandle {
    pub fn new(connection: Connection) -> Self {
        Self {
            connection: Arc::new(connection),
        }
    }

    pub async fn open_channel(&self) -> Result<Channel, MessagingError> {
        Ok(self.connection.create_channel().await?)
    }

    pub fn is_connected(&self) -> bool {
        self.connection.status().connected()
    }

    pub async fn close(&self) -> Result<(), MessagingError> {
        self.connection.close(200, "OK").await?;
        Ok(())
    }
}

impl fmt::Debug for BrokerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerHandle")
            .field("connected", &self.is_connected())
            .finish()
    }
}
