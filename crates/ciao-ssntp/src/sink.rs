//! The outbound transport port (spec §2 "Command/Event Router", §4.2
//! forwarding rules). Fan-out to "all controllers" is realized as a
//! `tokio::sync::broadcast` channel rather than an explicit loop over a
//! registry snapshot, so a slow or disconnected controller connection can
//! never block the scheduler's dispatch path.

use crate::errors::SsntpResult;
use crate::frame::SsntpFrame;
use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::warn;

/// A point-to-point send to a single named peer (a compute agent, network
/// agent, or concentrator). Implemented by the real SSNTP transport; tests
/// use an in-memory fake.
#[async_trait]
pub trait FrameSink: Send + Sync {
    async fn send(&self, to: &str, frame: SsntpFrame) -> SsntpResult<()>;
}

/// Fan-out to every connected controller (spec §4.2: STATS and the error/
/// event frames forwarded "to all controllers by static rule").
///
/// Each controller connection subscribes once via `subscribe()` and drains
/// its own receiver; a controller that disconnects without unsubscribing
/// simply has its receiver dropped, and `send_to_all` never observes that —
/// broadcast delivery failure for lagged/closed receivers is swallowed, not
/// propagated, matching §5's "best-effort... must not fail the triggering
/// request".
pub struct AllControllersSink {
    sender: broadcast::Sender<(String, SsntpFrame)>,
}

impl AllControllersSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<(String, SsntpFrame)> {
        self.sender.subscribe()
    }

    /// Broadcasts `frame` as having come from `origin` (e.g. the node id a
    /// STATS frame was forwarded from) to every subscribed controller
    /// connection.
    pub fn send_to_all(&self, origin: impl Into<String>, frame: SsntpFrame) {
        if self.sender.send((origin.into(), frame)).is_err() {
            warn!("broadcast to controllers had no subscribers");
        }
    }
}

impl Default for AllControllersSink {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_delivers_to_every_subscriber() {
        let sink = AllControllersSink::new(16);
        let mut a = sink.subscribe();
        let mut b = sink.subscribe();

        sink.send_to_all("node-1", SsntpFrame::Full);

        let (origin_a, _) = a.recv().await.unwrap();
        let (origin_b, _) = b.recv().await.unwrap();
        assert_eq!(origin_a, "node-1");
        assert_eq!(origin_b, "node-1");
    }

    #[tokio::test]
    async fn no_subscribers_does_not_error() {
        let sink = AllControllersSink::new(16);
        sink.send_to_all("node-1", SsntpFrame::Full);
    }
}
