mod common;

use common::{call_log, init_tracing, inputs, inputs_of, labels, Gauge, Recorder};
use opcore::{
    DataType, EventKind, FlowError, GraphError, NodeId, Operation, OperationError, Returned,
    Value,
};
use opruntime::{ExecutionMode, FlowRuntime, RuntimeConfig, Workflow, WorkflowExecutor};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn number(n: f64) -> Value {
    Value::Number(n)
}

#[tokio::test]
async fn test_linear_chain_edges_and_order() {
    init_tracing();
    let log = call_log();
    let ops: Vec<Arc<dyn Operation>> = vec![
        Recorder::new("A", &log).shared(),
        Recorder::new("B", &log).shared(),
        Recorder::new("C", &log).shared(),
    ];
    let workflow = Workflow::new(ops);

    let a = NodeId::new(0);
    let b = NodeId::new(1);
    let c = NodeId::new(2);
    assert_eq!(workflow.graph().edges(), vec![(a, b), (b, c)]);
    assert_eq!(workflow.operation(b).unwrap().kind(), "B");

    workflow.run(HashMap::new()).await.unwrap();
    assert_eq!(labels(&log), vec!["A", "B", "C"]);
}

#[tokio::test]
async fn test_source_node_receives_filtered_top_level_inputs() {
    let log = call_log();
    let workflow = Workflow::single(
        Recorder::new("source", &log)
            .input("x", DataType::Number)
            .shared(),
    );

    workflow
        .run(inputs(&[("x", number(1.0)), ("unused", number(9.0))]))
        .await
        .unwrap();

    assert_eq!(inputs_of(&log, "source"), inputs(&[("x", number(1.0))]));
}

#[tokio::test]
async fn test_consumer_only_sees_declared_inputs() {
    let log = call_log();
    let ops: Vec<Arc<dyn Operation>> = vec![
        Recorder::new("producer", &log)
            .output("x", DataType::Number)
            .output("y", DataType::Number)
            .returning(Returned::tuple([1.0, 2.0]))
            .shared(),
        Recorder::new("consumer", &log)
            .input("x", DataType::Number)
            .shared(),
    ];

    Workflow::new(ops).run(HashMap::new()).await.unwrap();

    assert_eq!(inputs_of(&log, "consumer"), inputs(&[("x", number(1.0))]));
}

#[tokio::test]
async fn test_later_predecessor_wins_on_shared_name() {
    let log = call_log();
    let mut workflow = Workflow::empty();
    let left = workflow.add_operation(
        Recorder::new("left", &log)
            .output("x", DataType::Number)
            .returning(Returned::Single(number(1.0)))
            .shared(),
    );
    let right = workflow.add_operation(
        Recorder::new("right", &log)
            .output("x", DataType::Number)
            .returning(Returned::Single(number(2.0)))
            .shared(),
    );
    let sink = workflow.add_operation(
        Recorder::new("sink", &log)
            .input("x", DataType::Number)
            .shared(),
    );
    workflow.connect(left, sink).unwrap();
    workflow.connect(right, sink).unwrap();

    let order = workflow.graph().topological_order();
    let position = |id: NodeId| order.iter().position(|n| *n == id).unwrap();
    let expected = if position(left) > position(right) {
        number(1.0)
    } else {
        number(2.0)
    };

    workflow.run(HashMap::new()).await.unwrap();

    assert_eq!(inputs_of(&log, "sink"), inputs(&[("x", expected)]));
}

#[tokio::test]
async fn test_single_output_is_unwrapped() {
    let log = call_log();
    let workflow = Workflow::single(
        Recorder::new("only", &log)
            .output("answer", DataType::Number)
            .returning(Returned::Single(number(42.0)))
            .shared(),
    );

    let result = workflow.run(HashMap::new()).await.unwrap();
    assert_eq!(result, Returned::Single(number(42.0)));

    let execution = FlowRuntime::new()
        .execute(&workflow, HashMap::new())
        .await
        .unwrap();
    let node = execution.order[0];
    let recorded = execution.outputs.get(node).unwrap();
    assert_eq!(recorded.get("answer"), Some(&number(42.0)));
    assert_eq!(recorded.len(), 1);
}

#[tokio::test]
async fn test_multiple_outputs_map_by_position() {
    let log = call_log();
    let workflow = Workflow::single(
        Recorder::new("pair", &log)
            .output("a", DataType::String)
            .output("b", DataType::Number)
            .returning(Returned::Tuple(vec![Value::from("v1"), number(2.0)]))
            .shared(),
    );

    let execution = FlowRuntime::new()
        .execute(&workflow, HashMap::new())
        .await
        .unwrap();

    let recorded = execution.outputs.get(execution.order[0]).unwrap();
    assert_eq!(recorded.get("a"), Some(&Value::from("v1")));
    assert_eq!(recorded.get("b"), Some(&number(2.0)));
    assert_eq!(recorded.names().collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(
        execution.result,
        Returned::Tuple(vec![Value::from("v1"), number(2.0)])
    );
}

#[tokio::test]
async fn test_empty_workflow_runs_to_nothing() {
    let workflow = Workflow::new(Vec::<Arc<dyn Operation>>::new());
    assert!(workflow.is_empty());

    let result = workflow.run(HashMap::new()).await.unwrap();
    assert_eq!(result, Returned::Nothing);
}

#[tokio::test]
async fn test_terminal_node_without_outputs_yields_empty_tuple() {
    let log = call_log();
    let ops: Vec<Arc<dyn Operation>> = vec![
        Recorder::new("first", &log)
            .output("x", DataType::Number)
            .returning(Returned::Single(number(1.0)))
            .shared(),
        Recorder::new("last", &log).input("x", DataType::Number).shared(),
    ];

    let result = Workflow::new(ops).run(HashMap::new()).await.unwrap();
    assert_eq!(result, Returned::Tuple(Vec::new()));
}

#[tokio::test]
async fn test_output_arity_violation_aborts_run() {
    let log = call_log();
    let ops: Vec<Arc<dyn Operation>> = vec![
        Recorder::new("short", &log)
            .output("a", DataType::Number)
            .output("b", DataType::Number)
            .returning(Returned::Single(number(1.0)))
            .shared(),
        Recorder::new("never", &log).input("a", DataType::Number).shared(),
    ];

    let err = Workflow::new(ops).run(HashMap::new()).await.unwrap_err();
    match err {
        FlowError::OutputArity {
            kind,
            expected,
            actual,
            ..
        } => {
            assert_eq!(kind, "short");
            assert_eq!(expected, 2);
            assert_eq!(actual, 1);
        }
        other => panic!("expected OutputArity, got {:?}", other),
    }
    assert_eq!(labels(&log), vec!["short"]);
}

#[tokio::test]
async fn test_operation_error_propagates_unchanged() {
    let log = call_log();
    let ops: Vec<Arc<dyn Operation>> = vec![
        Recorder::new("broken", &log)
            .failing(OperationError::ExecutionFailed("boom".to_string()))
            .shared(),
        Recorder::new("after", &log).shared(),
    ];

    let err = Workflow::new(ops).run(HashMap::new()).await.unwrap_err();
    assert!(matches!(
        err,
        FlowError::Operation(OperationError::ExecutionFailed(ref msg)) if msg == "boom"
    ));
    assert_eq!(err.to_string(), "Execution failed: boom");
    assert_eq!(labels(&log), vec!["broken"]);
}

#[tokio::test]
async fn test_rerun_starts_from_clean_result_store() {
    let log = call_log();
    let workflow = Workflow::single(
        Recorder::new("tick", &log)
            .output("t", DataType::Number)
            .returning(Returned::Single(number(1.0)))
            .shared(),
    );
    let runtime = FlowRuntime::new();

    let first = runtime.execute(&workflow, HashMap::new()).await.unwrap();
    let second = runtime.execute(&workflow, HashMap::new()).await.unwrap();

    assert_ne!(first.execution_id, second.execution_id);
    assert_eq!(first.outputs.len(), 1);
    assert_eq!(second.outputs.len(), 1);
    assert_eq!(labels(&log), vec!["tick", "tick"]);
}

#[test]
fn test_general_construction_rejects_bad_edges() {
    let log = call_log();
    let mut workflow = Workflow::single(Recorder::new("root", &log).shared());
    let root = workflow.graph().node_ids().next().unwrap();
    let child = workflow
        .add_child(root, Recorder::new("child", &log).shared())
        .unwrap();

    let missing = NodeId::new(7);
    assert!(matches!(
        workflow.add_child(missing, Recorder::new("orphan", &log).shared()),
        Err(FlowError::NotFound(id)) if id == missing
    ));
    assert_eq!(workflow.len(), 2);

    assert!(matches!(
        workflow.connect(child, root),
        Err(FlowError::Graph(GraphError::WouldCycle { .. }))
    ));
    assert!(matches!(
        workflow.connect(root, child),
        Err(FlowError::Graph(GraphError::DuplicateEdge { .. }))
    ));
}

#[test]
fn test_metadata_and_id_are_carried() {
    let log = call_log();
    let workflow = Workflow::from(Recorder::new("solo", &log).shared())
        .with_id("wf-1")
        .with_metadata("owner", "chemistry");

    assert_eq!(workflow.id(), Some("wf-1"));
    assert_eq!(workflow.metadata().get("owner"), Some(&Value::from("chemistry")));
    assert_eq!(workflow.len(), 1);
}

fn diamond(log: &common::CallLog) -> Workflow {
    let mut workflow = Workflow::empty();
    let root = workflow.add_operation(
        Recorder::new("root", log)
            .input("seed", DataType::Number)
            .output("seed", DataType::Number)
            .returning(Returned::Single(number(3.0)))
            .shared(),
    );
    let left = workflow
        .add_child(
            root,
            Recorder::new("left", log)
                .input("seed", DataType::Number)
                .output("l", DataType::Number)
                .returning(Returned::Single(number(10.0)))
                .sleeping(Duration::from_millis(20))
                .shared(),
        )
        .unwrap();
    let right = workflow
        .add_child(
            root,
            Recorder::new("right", log)
                .input("seed", DataType::Number)
                .output("r", DataType::Number)
                .returning(Returned::Single(number(20.0)))
                .shared(),
        )
        .unwrap();
    let join = workflow
        .add_operation(
            Recorder::new("join", log)
                .input("l", DataType::Number)
                .input("r", DataType::Number)
                .output("total", DataType::Number)
                .returning(Returned::Single(number(30.0)))
                .shared(),
        );
    workflow.connect(left, join).unwrap();
    workflow.connect(right, join).unwrap();
    workflow
}

#[tokio::test]
async fn test_parallel_mode_matches_sequential() {
    init_tracing();
    for mode in [ExecutionMode::Sequential, ExecutionMode::Parallel] {
        let log = call_log();
        let workflow = diamond(&log);
        let runtime = FlowRuntime::with_config(RuntimeConfig {
            mode,
            ..RuntimeConfig::default()
        });

        let execution = runtime
            .execute(&workflow, inputs(&[("seed", number(1.0))]))
            .await
            .unwrap();

        assert_eq!(execution.result, Returned::Single(number(30.0)), "{:?}", mode);
        assert_eq!(execution.completed_nodes, 4);
        assert_eq!(
            inputs_of(&log, "join"),
            inputs(&[("l", number(10.0)), ("r", number(20.0))])
        );
        let called = labels(&log);
        assert_eq!(called.first().map(String::as_str), Some("root"));
        assert_eq!(called.last().map(String::as_str), Some("join"));
    }
}

#[tokio::test]
async fn test_parallel_failure_cancels_pending_work() {
    let log = call_log();
    let mut workflow = Workflow::empty();
    workflow.add_operation(
        Recorder::new("broken", &log)
            .failing(OperationError::ExecutionFailed("boom".to_string()))
            .shared(),
    );
    let slow = workflow.add_operation(
        Recorder::new("slow", &log)
            .sleeping(Duration::from_secs(5))
            .shared(),
    );
    workflow
        .add_child(slow, Recorder::new("after", &log).shared())
        .unwrap();

    let executor = WorkflowExecutor::parallel(4);
    let bus = opcore::EventBus::new(64);
    let err = executor
        .execute(&workflow, Some(&bus), HashMap::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FlowError::Operation(OperationError::ExecutionFailed(_))
    ));
    assert!(!labels(&log).contains(&"after".to_string()));
}

#[tokio::test]
async fn test_events_follow_execution_order() {
    let log = call_log();
    let ops: Vec<Arc<dyn Operation>> = vec![
        Recorder::new("A", &log).shared(),
        Recorder::new("B", &log).shared(),
    ];
    let workflow = Workflow::new(ops).with_id("evented");
    let runtime = FlowRuntime::new();
    let mut events = runtime.subscribe_events();

    runtime.execute(&workflow, HashMap::new()).await.unwrap();

    let mut started = Vec::new();
    let mut finished = None;
    let mut run_ids = Vec::new();
    let mut started_nodes = Vec::new();
    while let Ok(event) = events.try_recv() {
        run_ids.push(event.execution_id);
        if let EventKind::NodeStarted { .. } = event.kind {
            started_nodes.extend(event.node_id());
        }
        match event.kind {
            EventKind::WorkflowStarted {
                workflow_id,
                total_nodes,
            } => {
                assert_eq!(workflow_id.as_deref(), Some("evented"));
                assert_eq!(total_nodes, 2);
            }
            EventKind::NodeStarted { kind, .. } => started.push(kind),
            EventKind::WorkflowCompleted { success, .. } => finished = Some(success),
            _ => {}
        }
    }
    assert_eq!(started, vec!["A", "B"]);
    assert_eq!(started_nodes, vec![NodeId::new(0), NodeId::new(1)]);
    assert_eq!(finished, Some(true));
    run_ids.dedup();
    assert_eq!(run_ids.len(), 1);
}

#[tokio::test]
async fn test_parallel_mode_respects_node_limit() {
    for (limit, expected_peak) in [(1, 1), (3, 3)] {
        let log = call_log();
        let gauge = Gauge::default();
        let mut workflow = Workflow::empty();
        for label in ["one", "two", "three"] {
            workflow.add_operation(
                Recorder::new(label, &log)
                    .sleeping(Duration::from_millis(20))
                    .gauged(&gauge)
                    .shared(),
            );
        }
        let runtime = FlowRuntime::with_config(RuntimeConfig {
            mode: ExecutionMode::Parallel,
            max_parallel_nodes: limit,
            ..RuntimeConfig::default()
        });

        let execution = runtime.execute(&workflow, HashMap::new()).await.unwrap();

        assert_eq!(gauge.peak(), expected_peak, "limit {}", limit);
        assert_eq!(execution.completed_nodes, 3);
        assert_eq!(labels(&log).len(), 3);
    }
}

#[tokio::test]
async fn test_panicking_operation_fails_the_run_in_both_modes() {
    for executor in [WorkflowExecutor::sequential(), WorkflowExecutor::parallel(4)] {
        let log = call_log();
        let ops: Vec<Arc<dyn Operation>> = vec![
            Recorder::new("fragile", &log).panicking().shared(),
            Recorder::new("after", &log).shared(),
        ];
        let workflow = Workflow::new(ops);
        let bus = opcore::EventBus::new(64);
        let mut events = bus.subscribe();

        let err = executor
            .execute(&workflow, Some(&bus), HashMap::new())
            .await
            .unwrap_err();

        match err {
            FlowError::Execution(message) => {
                assert!(message.contains("fragile blew up"), "{}", message)
            }
            other => panic!("{:?}: expected Execution, got {:?}", executor.mode(), other),
        }
        assert!(labels(&log).is_empty());

        let mut failed = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let EventKind::NodeFailed { node_id, .. } = event.kind {
                failed.push(node_id);
            }
        }
        assert_eq!(failed, vec![NodeId::new(0)]);
    }
}
