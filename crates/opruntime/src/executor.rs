use crate::results::{NodeOutputs, ResultStore};
use crate::schedule::Schedule;
use crate::workflow::Workflow;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use opcore::{
    EventBus, EventEmitter, EventKind, ExecutionId, FlowError, NodeId, Operation,
    OperationContext, Result, Returned, Signature, Value,
};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// How independent nodes are scheduled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One node at a time, in topological order
    #[default]
    Sequential,
    /// Nodes whose predecessors have all completed run concurrently
    Parallel,
}

/// Executes workflows in dependency order
#[derive(Debug, Clone)]
pub struct WorkflowExecutor {
    mode: ExecutionMode,
    max_parallel: usize,
}

impl WorkflowExecutor {
    pub fn new(mode: ExecutionMode, max_parallel: usize) -> Self {
        Self {
            mode,
            max_parallel: max_parallel.max(1),
        }
    }

    pub fn sequential() -> Self {
        Self::new(ExecutionMode::Sequential, 1)
    }

    pub fn parallel(max_parallel: usize) -> Self {
        Self::new(ExecutionMode::Parallel, max_parallel)
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Execute a workflow and return its results
    ///
    /// Every run gets a fresh [`ResultStore`]; on error the store is dropped
    /// along with whatever completed nodes recorded. Without an `event_bus`
    /// no events are published and operation reports are discarded.
    ///
    /// An operation that panics fails its node with [`FlowError::Execution`]
    /// in both modes.
    pub async fn execute(
        &self,
        workflow: &Workflow,
        event_bus: Option<&EventBus>,
        inputs: HashMap<String, Value>,
    ) -> Result<ExecutionResult> {
        let execution_id = ExecutionId::new_v4();
        let start_time = Instant::now();

        let run = Run {
            workflow,
            event_bus,
            execution_id,
            inputs,
        };
        run.publish(EventKind::WorkflowStarted {
            workflow_id: workflow.id().map(str::to_string),
            total_nodes: workflow.len(),
        });

        tracing::info!(
            "Starting workflow execution {} ({} nodes, {:?})",
            workflow.id().unwrap_or("<anonymous>"),
            workflow.len(),
            self.mode
        );

        let result = match self.mode {
            ExecutionMode::Sequential => run.sequential().await,
            ExecutionMode::Parallel => run.parallel(self.max_parallel).await,
        };

        let duration_ms = start_time.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => tracing::info!("Workflow execution finished in {}ms", duration_ms),
            Err(e) => tracing::error!("Workflow execution failed after {}ms: {}", duration_ms, e),
        }

        if let Some(bus) = event_bus {
            bus.publish(
                execution_id,
                EventKind::WorkflowCompleted {
                    success: result.is_ok(),
                    duration_ms,
                },
            );
        }

        result
    }
}

impl Default for WorkflowExecutor {
    fn default() -> Self {
        Self::sequential()
    }
}

/// Result of workflow execution
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub execution_id: ExecutionId,
    /// Outputs of the last node in topological order
    pub result: Returned,
    /// Everything each node recorded during this run
    pub outputs: ResultStore,
    /// Topological order the run followed
    pub order: Vec<NodeId>,
    pub completed_nodes: usize,
    pub total_nodes: usize,
}

/// State of a single `execute` call
struct Run<'a> {
    workflow: &'a Workflow,
    event_bus: Option<&'a EventBus>,
    execution_id: ExecutionId,
    inputs: HashMap<String, Value>,
}

/// Outcome of one node, as reported back to the coordinating loop
struct NodeRun {
    node: NodeId,
    outcome: Result<Option<NodeOutputs>>,
    duration_ms: u64,
}

impl<'a> Run<'a> {
    fn publish(&self, kind: EventKind) {
        if let Some(bus) = self.event_bus {
            bus.publish(self.execution_id, kind);
        }
    }

    fn emitter(&self, node: NodeId) -> EventEmitter {
        match self.event_bus {
            Some(bus) => bus.create_emitter(self.execution_id, node),
            None => EventEmitter::detached(self.execution_id, node),
        }
    }

    async fn sequential(self) -> Result<ExecutionResult> {
        let schedule = Schedule::build(self.workflow.graph())?;
        let mut results = ResultStore::new();
        let cancellation = CancellationToken::new();

        for node in &schedule.order {
            let (operation, signature, ctx) =
                self.prepare(*node, schedule.parents(*node), &results, &cancellation)?;
            let run = invoke(*node, operation, signature, ctx).await;
            self.settle(run, &mut results)?;
        }

        Ok(self.finish(schedule, results))
    }

    /// Same resolution rules as `sequential`, with independent nodes on their
    /// own tasks. The loop here is the only writer of the result store, and a
    /// node is only started once all of its parents have been recorded.
    async fn parallel(self, max_parallel: usize) -> Result<ExecutionResult> {
        let schedule = Schedule::build(self.workflow.graph())?;
        let mut results = ResultStore::new();
        let cancellation = CancellationToken::new();
        let mut started: HashSet<NodeId> = HashSet::new();
        let mut completed: HashSet<NodeId> = HashSet::new();
        let mut running = FuturesUnordered::new();
        let mut failure: Option<FlowError> = None;

        loop {
            if failure.is_none() {
                let ready: Vec<NodeId> = schedule
                    .order
                    .iter()
                    .copied()
                    .filter(|node| !started.contains(node))
                    .filter(|node| {
                        schedule
                            .parents(*node)
                            .iter()
                            .all(|parent| completed.contains(parent))
                    })
                    .collect();

                for node in ready {
                    if running.len() >= max_parallel {
                        break;
                    }
                    match self.prepare(node, schedule.parents(node), &results, &cancellation) {
                        Ok((operation, signature, ctx)) => {
                            started.insert(node);
                            running.push(tokio::spawn(invoke(node, operation, signature, ctx)));
                        }
                        Err(e) => {
                            cancellation.cancel();
                            failure = Some(e);
                            break;
                        }
                    }
                }
            }

            // Nothing running and nothing startable: done, or draining after a failure.
            let Some(joined) = running.next().await else {
                break;
            };

            let settled = joined
                .map_err(|e| FlowError::Execution(format!("Task join error: {}", e)))
                .and_then(|run| {
                    let node = run.node;
                    self.settle(run, &mut results).map(|_| node)
                });

            match settled {
                Ok(node) => {
                    completed.insert(node);
                }
                Err(e) => {
                    // Stop starting new work; let running nodes finish.
                    cancellation.cancel();
                    if failure.is_none() {
                        failure = Some(e);
                    }
                }
            }
        }

        if let Some(e) = failure {
            return Err(e);
        }
        Ok(self.finish(schedule, results))
    }

    /// Resolve a node's inputs and build its context.
    fn prepare(
        &self,
        node: NodeId,
        parents: &[NodeId],
        results: &ResultStore,
        cancellation: &CancellationToken,
    ) -> Result<(Arc<dyn Operation>, Signature, OperationContext)> {
        let operation = Arc::clone(self.workflow.operation(node)?);
        let signature = operation.signature();

        let candidates = if parents.is_empty() {
            self.inputs.clone()
        } else {
            results.merged(parents)
        };
        let inputs = filter_inputs(node, candidates, &signature);

        let mut names: Vec<String> = inputs.keys().cloned().collect();
        names.sort();
        tracing::debug!("Node {} ({}) resolved inputs {:?}", node, operation.kind(), names);
        self.publish(EventKind::NodeStarted {
            node_id: node,
            kind: operation.kind().to_string(),
            inputs: names,
        });

        let ctx = OperationContext {
            node_id: node,
            inputs,
            events: self.emitter(node),
            cancellation: cancellation.clone(),
        };
        Ok((operation, signature, ctx))
    }

    /// Record a finished node, or turn its failure into the run's error.
    fn settle(&self, run: NodeRun, results: &mut ResultStore) -> Result<()> {
        let NodeRun {
            node,
            outcome,
            duration_ms,
        } = run;

        match outcome {
            Ok(outputs) => {
                tracing::info!("Node {} completed in {}ms", node, duration_ms);
                self.publish(EventKind::NodeCompleted {
                    node_id: node,
                    outputs: outputs.as_ref().map(NodeOutputs::to_map).unwrap_or_default(),
                    duration_ms,
                });
                if let Some(outputs) = outputs {
                    results.record(node, outputs);
                }
                Ok(())
            }
            Err(e) => {
                tracing::error!("Node {} failed: {}", node, e);
                self.publish(EventKind::NodeFailed {
                    node_id: node,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn finish(self, schedule: Schedule, results: ResultStore) -> ExecutionResult {
        let result = results.terminal_result(schedule.terminal());
        let total_nodes = self.workflow.len();
        ExecutionResult {
            execution_id: self.execution_id,
            result,
            outputs: results,
            completed_nodes: schedule.order.len(),
            order: schedule.order,
            total_nodes,
        }
    }
}

/// Drop every candidate the operation does not declare as an input.
fn filter_inputs(
    node: NodeId,
    candidates: HashMap<String, Value>,
    signature: &Signature,
) -> HashMap<String, Value> {
    let (kept, dropped): (HashMap<_, _>, HashMap<_, _>) = candidates
        .into_iter()
        .partition(|(name, _)| signature.declares_input(name));

    if !dropped.is_empty() {
        let mut names: Vec<&String> = dropped.keys().collect();
        names.sort();
        tracing::debug!("Node {} ignores undeclared inputs {:?}", node, names);
    }
    kept
}

async fn invoke(
    node: NodeId,
    operation: Arc<dyn Operation>,
    signature: Signature,
    ctx: OperationContext,
) -> NodeRun {
    let start = Instant::now();
    let outcome = match AssertUnwindSafe(operation.run(ctx)).catch_unwind().await {
        Ok(Ok(returned)) => NodeOutputs::from_returned(node, operation.kind(), &signature, returned),
        Ok(Err(e)) => Err(e.into()),
        Err(panic) => Err(FlowError::Execution(format!(
            "Operation '{}' panicked: {}",
            operation.kind(),
            panic_message(panic.as_ref())
        ))),
    };
    NodeRun {
        node,
        outcome,
        duration_ms: start.elapsed().as_millis() as u64,
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
