//! Shutdown coordination.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinHandle};

#[derive(Debug, Error)]
pub enum DrainError {
    #[error("shutdown deadline of {0:?} exceeded")]
    TimedOut(Duration),
    #[error("server task failed: {0}")]
    Join(#[from] JoinError),
}

/// Coordinator for graceful shutdown.
///
/// Every long-running task subscribes; one `trigger` reaches all of them.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Receiver that fires once on [`Shutdown::trigger`].
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Signal every subscriber.
    pub fn trigger(&self) {
        let receivers = self.tx.send(()).unwrap_or(0);
        tracing::info!(receivers, "Shutdown triggered");
    }

    /// Tasks still holding a receiver.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Trigger shutdown and wait up to `deadline` for `task` to finish.
    pub async fn drain<T>(&self, task: JoinHandle<T>, deadline: Duration) -> Result<T, DrainError> {
        self.trigger();
        match tokio::time::timeout(deadline, task).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                tracing::warn!(deadline_secs = deadline.as_secs(), "Shutdown deadline exceeded");
                Err(DrainError::TimedOut(deadline))
            }
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_drain_waits_for_subscribers() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();
        assert_eq!(shutdown.receiver_count(), 1);

        let task = tokio::spawn(async move {
            rx.recv().await.unwrap();
            "stopped"
        });

        let result = shutdown.drain(task, Duration::from_secs(1)).await.unwrap();
        assert_eq!(result, "stopped");
    }

    #[tokio::test]
    async fn test_drain_times_out() {
        let shutdown = Shutdown::new();
        let task = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });

        let err = shutdown.drain(task, Duration::from_millis(10)).await.unwrap_err();
        assert!(matches!(err, DrainError::TimedOut(_)));
    }
}
