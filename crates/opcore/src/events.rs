use crate::{NodeId, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

pub type ExecutionId = Uuid;

/// One entry on the event bus: what happened, in which run, and when
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionEvent {
    pub execution_id: ExecutionId,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl ExecutionEvent {
    /// Node the event concerns, if any
    pub fn node_id(&self) -> Option<NodeId> {
        match &self.kind {
            EventKind::NodeStarted { node_id, .. }
            | EventKind::NodeCompleted { node_id, .. }
            | EventKind::NodeFailed { node_id, .. }
            | EventKind::Report { node_id, .. } => Some(*node_id),
            EventKind::WorkflowStarted { .. } | EventKind::WorkflowCompleted { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    WorkflowStarted {
        workflow_id: Option<String>,
        total_nodes: usize,
    },
    /// `inputs` lists the names left after filtering, sorted
    NodeStarted {
        node_id: NodeId,
        kind: String,
        inputs: Vec<String>,
    },
    /// `outputs` is empty when the operation returned nothing
    NodeCompleted {
        node_id: NodeId,
        outputs: HashMap<String, Value>,
        duration_ms: u64,
    },
    NodeFailed {
        node_id: NodeId,
        error: String,
    },
    Report {
        node_id: NodeId,
        report: NodeReport,
    },
    WorkflowCompleted {
        success: bool,
        duration_ms: u64,
    },
}

/// Something a running operation reports about itself
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "level", rename_all = "snake_case")]
pub enum NodeReport {
    Info { message: String },
    Warning { message: String },
    Progress { percent: f64, message: Option<String> },
    Data { port: String, value: Value },
}

/// Broadcast channel shared by the executor and the operations it runs
pub struct EventBus {
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }

    /// Stamp and send. Events sent while nobody listens are dropped.
    pub fn publish(&self, execution_id: ExecutionId, kind: EventKind) {
        let _ = self.sender.send(ExecutionEvent {
            execution_id,
            timestamp: Utc::now(),
            kind,
        });
    }

    pub fn create_emitter(&self, execution_id: ExecutionId, node_id: NodeId) -> EventEmitter {
        EventEmitter {
            execution_id,
            node_id,
            sender: Some(self.sender.clone()),
        }
    }
}

/// Per-node handle an operation uses to report progress while it runs
#[derive(Clone)]
pub struct EventEmitter {
    execution_id: ExecutionId,
    node_id: NodeId,
    sender: Option<broadcast::Sender<ExecutionEvent>>,
}

impl EventEmitter {
    /// An emitter with no bus behind it; reports are discarded
    pub fn detached(execution_id: ExecutionId, node_id: NodeId) -> Self {
        Self {
            execution_id,
            node_id,
            sender: None,
        }
    }

    pub fn report(&self, report: NodeReport) {
        let Some(sender) = &self.sender else {
            return;
        };
        let _ = sender.send(ExecutionEvent {
            execution_id: self.execution_id,
            timestamp: Utc::now(),
            kind: EventKind::Report {
                node_id: self.node_id,
                report,
            },
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.report(NodeReport::Info {
            message: message.into(),
        });
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.report(NodeReport::Warning {
            message: message.into(),
        });
    }

    pub fn progress(&self, percent: f64, message: Option<String>) {
        self.report(NodeReport::Progress { percent, message });
    }

    /// Publish a value on a named port before the operation returns
    pub fn data(&self, port: impl Into<String>, value: Value) {
        self.report(NodeReport::Data {
            port: port.into(),
            value,
        });
    }
}
