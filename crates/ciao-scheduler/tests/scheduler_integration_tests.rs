//! End-to-end scheduler scenarios (spec §8 "End-to-end scenarios").

use async_trait::async_trait;
use ciao_scheduler::service::{SchedulerService, SchedulerServiceConfig};
use ciao_scheduler::AgentKind;
use ciao_ssntp::{
    AllControllersSink, FrameSink, InboundFrame, ReadyPayload, RequestedResourceEntry,
    RequestedResourceKind, SsntpFrame, SsntpResult, StartPayload,
};
use ciao_types::{InstanceId, NodeId};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

struct RecordingSink {
    sent: Mutex<Vec<(String, SsntpFrame)>>,
}

impl RecordingSink {
    fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl FrameSink for RecordingSink {
    async fn send(&self, to: &str, frame: SsntpFrame) -> SsntpResult<()> {
        self.sent.lock().push((to.to_string(), frame));
        Ok(())
    }
}

fn start_frame(instance_id: InstanceId, mem_mb: i64) -> SsntpFrame {
    SsntpFrame::Start(StartPayload {
        instance_id,
        image_id: "clear-linux".into(),
        requested_resources: vec![RequestedResourceEntry {
            kind: RequestedResourceKind::MemMb,
            value: mem_mb,
            mandatory: true,
        }],
        firmware_type: "efi".into(),
        persistence_mode: "host".into(),
    })
}

async fn run_until_idle(service: &Arc<SchedulerService>, tx: tokio::sync::mpsc::Sender<InboundFrame>, frames: Vec<InboundFrame>) {
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let service_clone = service.clone();
    let handle = tokio::spawn(async move {
        service_clone
            .run(async move {
                let _ = shutdown_rx.await;
            })
            .await;
    });
    for frame in frames {
        tx.send(frame).await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(30)).await;
    let _ = shutdown_tx.send(());
    handle.await.unwrap();
}

/// Spec §8 scenario 1: empty cluster, START with mem_mb=256 -> StartFailure(NoComputeNodes).
#[tokio::test]
async fn empty_cluster_start_emits_no_compute_nodes_failure() {
    let agent_sink = Arc::new(RecordingSink::new());
    let controller_sink = Arc::new(AllControllersSink::new(16));
    let mut controller_rx = controller_sink.subscribe();
    let service = Arc::new(SchedulerService::new(
        agent_sink.clone(),
        controller_sink,
        SchedulerServiceConfig::default(),
    ));
    let tx = service.inbound_sender();
    service.scheduler().connect_controller("controller-a".into());

    let instance_id = InstanceId::new();
    run_until_idle(
        &service,
        tx,
        vec![InboundFrame {
            sender_id: "controller-a".into(),
            frame: start_frame(instance_id, 256),
        }],
    )
    .await;

    let (_, frame) = controller_rx.try_recv().expect("expected a broadcast frame");
    match frame {
        SsntpFrame::StartFailure(err) => {
            assert_eq!(err.reason, ciao_types::model::FailureReason::NoComputeNodes);
        }
        other => panic!("expected StartFailure, got {other:?}"),
    }
}

/// Spec §8 scenario 2: two small compute nodes (200 MB) and one large
/// (141312 MB); START with mem_mb=256 picks the large node.
#[tokio::test]
async fn start_with_small_and_large_nodes_picks_the_large_one() {
    let agent_sink = Arc::new(RecordingSink::new());
    let controller_sink = Arc::new(AllControllersSink::new(16));
    let service = Arc::new(SchedulerService::new(
        agent_sink.clone(),
        controller_sink,
        SchedulerServiceConfig::default(),
    ));
    let tx = service.inbound_sender();
    service.scheduler().connect_controller("controller-a".into());

    let small_a = NodeId::new();
    let small_b = NodeId::new();
    let large = NodeId::new();
    for (id, mb) in [(small_a, 200u64), (small_b, 200), (large, 141312)] {
        service
            .scheduler()
            .connect_agent(id, format!("node-{id}"), AgentKind::Compute);
        service.scheduler().handle_status(
            id,
            &SsntpFrame::Ready(ReadyPayload {
                node_id: id,
                memory_total_mb: mb,
                memory_available_mb: mb,
                disk_total_mb: 0,
                disk_available_mb: 0,
                load: 0.0,
                cpu_count: 4,
            }),
        );
    }

    let instance_id = InstanceId::new();
    run_until_idle(
        &service,
        tx,
        vec![InboundFrame {
            sender_id: "controller-a".into(),
            frame: start_frame(instance_id, 256),
        }],
    )
    .await;

    let sent = agent_sink.sent.lock();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, large.to_string());
}

/// Spec §8 scenario 6: controller A connects as master, B as backup;
/// disconnecting A promotes B to master.
#[tokio::test]
async fn disconnecting_master_controller_promotes_backup() {
    let agent_sink = Arc::new(RecordingSink::new());
    let controller_sink = Arc::new(AllControllersSink::new(16));
    let service = SchedulerService::new(
        agent_sink,
        controller_sink,
        SchedulerServiceConfig::default(),
    );

    service.scheduler().connect_controller("a".into());
    service.scheduler().connect_controller("b".into());
    assert!(service.scheduler().is_master("a"));

    service.scheduler().disconnect("a");
    assert!(service.scheduler().is_master("b"));
}
