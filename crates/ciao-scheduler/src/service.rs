//! `SchedulerService`: wires the [`Scheduler`] to an inbound frame channel
//! and an outbound [`FrameSink`]. The SSNTP transport itself is an
//! out-of-scope collaborator (spec §1) — it feeds frames in through
//! [`SchedulerService::inbound_sender`] and is handed point-to-point/
//! broadcast sends through `FrameSink`/`AllControllersSink`.

use crate::router::RouteDecision;
use crate::scheduler::Scheduler;
use ciao_ssntp::{AllControllersSink, FrameSink, InboundFrame};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub struct SchedulerServiceConfig {
    /// Bounded channel depth between the transport and the dispatch loop.
    pub inbound_channel_capacity: usize,
}

impl Default for SchedulerServiceConfig {
    fn default() -> Self {
        Self {
            inbound_channel_capacity: 1024,
        }
    }
}

/// The running scheduler: owns the registries through [`Scheduler`], an
/// outbound agent sink, and the all-controllers broadcast.
pub struct SchedulerService {
    scheduler: Arc<Scheduler>,
    agent_sink: Arc<dyn FrameSink>,
    controller_sink: Arc<AllControllersSink>,
    inbound_tx: mpsc::Sender<InboundFrame>,
    inbound_rx: tokio::sync::Mutex<Option<mpsc::Receiver<InboundFrame>>>,
    running: AtomicBool,
}

impl SchedulerService {
    pub fn new(
        agent_sink: Arc<dyn FrameSink>,
        controller_sink: Arc<AllControllersSink>,
        config: SchedulerServiceConfig,
    ) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(config.inbound_channel_capacity);
        Self {
            scheduler: Arc::new(Scheduler::new()),
            agent_sink,
            controller_sink,
            inbound_tx,
            inbound_rx: tokio::sync::Mutex::new(Some(inbound_rx)),
            running: AtomicBool::new(false),
        }
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// The handle the (out-of-scope) transport layer pushes decoded frames
    /// into.
    pub fn inbound_sender(&self) -> mpsc::Sender<InboundFrame> {
        self.inbound_tx.clone()
    }

    /// Runs the dispatch loop until the channel closes or `shutdown`
    /// resolves. Every frame from a controller connection should be sent
    /// with `from_controller = true` by the transport layer wrapping this
    /// sender; for simplicity this loop treats every inbound frame as
    /// coming from a controller unless its sender id resolves to a known
    /// compute/network node, which is the only ambiguity the in-scope core
    /// needs to resolve (the transport, not this crate, authenticates who
    /// is on the other end of a connection).
    pub async fn run(&self, shutdown: impl std::future::Future<Output = ()>) {
        self.running.store(true, Ordering::Relaxed);
        info!("scheduler service starting");

        let mut rx = match self.inbound_rx.lock().await.take() {
            Some(rx) => rx,
            None => {
                warn!("scheduler service already running");
                return;
            }
        };

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                frame = rx.recv() => {
                    match frame {
                        Some(inbound) => self.handle_inbound(inbound).await,
                        None => {
                            info!("inbound channel closed, stopping scheduler service");
                            break;
                        }
                    }
                }
                _ = &mut shutdown => {
                    info!("shutdown requested, stopping scheduler service");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::Relaxed);
    }

    async fn handle_inbound(&self, inbound: InboundFrame) {
        let from_controller = !self.scheduler.is_known_agent(&inbound.sender_id);
        let decision = self.scheduler.dispatch(inbound, from_controller);
        self.execute(decision).await;
    }

    async fn execute(&self, decision: RouteDecision) {
        match decision {
            RouteDecision::Forward { to, frame } => {
                if let Err(err) = self.agent_sink.send(&to.to_string(), frame).await {
                    error!(to = %to, error = %err, "forward failed");
                }
            }
            RouteDecision::ForwardAll(frame) => {
                self.controller_sink.send_to_all("scheduler", frame);
            }
            RouteDecision::Discard(_) => {}
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ciao_ssntp::{AgentCommandPayload, SsntpFrame};
    use ciao_types::{InstanceId, NodeId};
    use parking_lot::Mutex;

    struct RecordingSink {
        sent: Mutex<Vec<(String, SsntpFrame)>>,
    }

    #[async_trait]
    impl FrameSink for RecordingSink {
        async fn send(&self, to: &str, frame: SsntpFrame) -> ciao_ssntp::SsntpResult<()> {
            self.sent.lock().push((to.to_string(), frame));
            Ok(())
        }
    }

    #[tokio::test]
    async fn forwards_a_restart_command_to_its_agent() {
        let sink = Arc::new(RecordingSink {
            sent: Mutex::new(Vec::new()),
        });
        let controller_sink = Arc::new(AllControllersSink::new(16));
        let service = SchedulerService::new(
            sink.clone(),
            controller_sink,
            SchedulerServiceConfig::default(),
        );

        let agent = NodeId::new();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let tx = service.inbound_sender();
        let handle = tokio::spawn(async move {
            service
                .run(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        tx.send(InboundFrame {
            sender_id: "controller-a".into(),
            frame: SsntpFrame::Restart(AgentCommandPayload {
                instance_id: InstanceId::new(),
                workload_agent_uuid: agent,
            }),
        })
        .await
        .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let _ = shutdown_tx.send(());
        handle.await.unwrap();

        let sent = sink.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, agent.to_string());
    }
}
