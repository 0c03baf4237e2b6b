//! Structural checks for automation flows.

use std::collections::{HashMap, HashSet};

use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
};
use serde::{Deserialize, Serialize};

use crate::model::{FlowConnection, FlowModel, FlowNode};

/// Outcome of [`validate_flow`]. The error strings are shown to users as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl FlowValidation {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

/// Checks trigger presence, orphaned nodes, dangling connections and cycles.
///
/// Errors come out in that order: the trigger message, orphans in node order,
/// dangling endpoints in connection order, then cycles in traversal order.
pub fn validate_flow(flow: &FlowModel) -> FlowValidation {
    let mut errors = Vec::new();

    if !flow.nodes.iter().any(FlowNode::is_trigger) {
        errors.push("Flow must have at least one trigger node".to_string());
    }

    let connected: HashSet<&str> = flow.connections.iter().flat_map(|c| [c.source.as_str(), c.target.as_str()]).collect();
    for node in flow.nodes.iter().filter(|n| !n.is_trigger()) {
        if !connected.contains(node.id.as_str()) {
            errors.push(format!("Node \"{}\" is not connected to the flow", node.title));
        }
    }

    let (graph, dangling) = build_graph(flow);
    for (connection, node_id) in dangling {
        errors.push(format!("Connection \"{}\" references unknown node \"{}\"", connection.id, node_id));
    }

    let mut visited = HashSet::new();
    let mut on_stack = HashSet::new();
    let mut cycles = Vec::new();
    for idx in graph.node_indices() {
        if !visited.contains(&idx) {
            visit(&graph, idx, &mut visited, &mut on_stack, &mut cycles);
        }
    }
    for idx in cycles {
        errors.push(format!("Flow contains a cycle at node \"{}\"", graph[idx].title));
    }

    FlowValidation::from_errors(errors)
}

/// Graph of the flow's nodes. Connections with an unknown endpoint are left
/// out of the graph and returned alongside the missing id.
fn build_graph(flow: &FlowModel) -> (DiGraph<&FlowNode, &FlowConnection>, Vec<(&FlowConnection, &str)>) {
    let mut graph = DiGraph::new();
    let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();
    for node in flow.nodes.iter() {
        let idx = graph.add_node(node);
        nodes.entry(node.id.as_str()).or_insert(idx);
    }

    let mut dangling = Vec::new();
    for connection in flow.connections.iter() {
        match (nodes.get(connection.source.as_str()), nodes.get(connection.target.as_str())) {
            (Some(source), Some(target)) => {
                graph.add_edge(*source, *target, connection);
            }
            (source, target) => {
                if source.is_none() {
                    dangling.push((connection, connection.source.as_str()));
                }
                if target.is_none() {
                    dangling.push((connection, connection.target.as_str()));
                }
            }
        }
    }
    (graph, dangling)
}

/// Depth-first walk following outgoing connections in declaration order.
/// Every on-stack node reached again is recorded once in `cycles`.
fn visit(
    graph: &DiGraph<&FlowNode, &FlowConnection>,
    idx: NodeIndex,
    visited: &mut HashSet<NodeIndex>,
    on_stack: &mut HashSet<NodeIndex>,
    cycles: &mut Vec<NodeIndex>,
) {
    visited.insert(idx);
    on_stack.insert(idx);

    let mut edges: Vec<_> = graph.edges_directed(idx, Direction::Outgoing).map(|e| (e.id(), e.target())).collect();
    edges.sort_by_key(|(id, _)| *id);

    for (_, target) in edges {
        if on_stack.contains(&target) {
            if !cycles.contains(&target) {
                cycles.push(target);
            }
        } else if !visited.contains(&target) {
            visit(graph, target, visited, on_stack, cycles);
        }
    }

    on_stack.remove(&idx);
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::NodeType;

    fn flow(
        nodes: Vec<FlowNode>,
        connections: Vec<FlowConnection>,
    ) -> FlowModel {
        FlowModel {
            id: "f1".to_string(),
            name: "Lead follow-up".to_string(),
            nodes,
            connections,
            ..Default::default()
        }
    }

    fn ring(close: bool) -> FlowModel {
        let mut connections = vec![FlowConnection::new("c1", "a", "b"), FlowConnection::new("c2", "b", "c")];
        if close {
            connections.push(FlowConnection::new("c3", "c", "a"));
        }
        flow(
            vec![FlowNode::new("a", NodeType::Trigger, "A"), FlowNode::new("b", NodeType::Action, "B"), FlowNode::new("c", NodeType::Email, "C")],
            connections,
        )
    }

    #[test]
    fn test_trigger_and_action_connected() {
        let result = validate_flow(&flow(
            vec![FlowNode::new("n1", NodeType::Trigger, "New lead"), FlowNode::new("n2", NodeType::Action, "Reply")],
            vec![FlowConnection::new("c1", "n1", "n2")],
        ));
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_orphan_named_by_title() {
        let result = validate_flow(&flow(vec![FlowNode::new("n1", NodeType::Trigger, "New lead"), FlowNode::new("n2", NodeType::Action, "Reply")], vec![]));
        assert!(!result.is_valid);
        assert_eq!(result.errors, ["Node \"Reply\" is not connected to the flow"]);
    }

    #[test]
    fn test_missing_trigger() {
        let result = validate_flow(&flow(
            vec![FlowNode::new("n1", NodeType::Action, "Reply"), FlowNode::new("n2", NodeType::Email, "Mail")],
            vec![FlowConnection::new("c1", "n1", "n2")],
        ));
        assert!(!result.is_valid);
        assert_eq!(result.errors, ["Flow must have at least one trigger node"]);
    }

    #[test]
    fn test_empty_flow_has_only_trigger_error() {
        let result = validate_flow(&FlowModel::default());
        assert_eq!(result.errors, ["Flow must have at least one trigger node"]);
    }

    #[test]
    fn test_trigger_is_never_orphan() {
        let result = validate_flow(&flow(vec![FlowNode::new("n1", NodeType::Trigger, "New lead")], vec![]));
        assert!(result.is_valid);
    }

    #[test]
    fn test_ring_is_a_cycle() {
        let result = validate_flow(&ring(true));
        assert!(!result.is_valid);
        assert_eq!(result.errors, ["Flow contains a cycle at node \"A\""]);
    }

    #[test]
    fn test_open_ring_is_valid() {
        let result = validate_flow(&ring(false));
        assert!(result.is_valid, "{:?}", result.errors);
    }

    #[test]
    fn test_self_loop() {
        let result = validate_flow(&flow(
            vec![FlowNode::new("t", NodeType::Trigger, "Start"), FlowNode::new("d", NodeType::Delay, "Wait")],
            vec![FlowConnection::new("c1", "t", "d"), FlowConnection::new("c2", "d", "d")],
        ));
        assert_eq!(result.errors, ["Flow contains a cycle at node \"Wait\""]);
    }

    #[test]
    fn test_each_cycle_node_reported_once() {
        let mut model = ring(true);
        model.connections.push(FlowConnection::new("c4", "b", "a"));
        let result = validate_flow(&model);
        assert_eq!(result.errors, ["Flow contains a cycle at node \"A\""]);
    }

    #[test]
    fn test_dangling_connection() {
        let result = validate_flow(&flow(
            vec![FlowNode::new("t", NodeType::Trigger, "Start"), FlowNode::new("s", NodeType::Sms, "Text")],
            vec![FlowConnection::new("c1", "t", "s"), FlowConnection::new("c2", "s", "ghost")],
        ));
        assert_eq!(result.errors, ["Connection \"c2\" references unknown node \"ghost\""]);
    }

    #[test]
    fn test_validation_is_pure() {
        let model = ring(true);
        let before = model.clone();
        let first = validate_flow(&model);
        let second = validate_flow(&model);
        assert_eq!(first, second);
        assert_eq!(model, before);
    }

    #[test]
    fn test_errors_accumulate() {
        let result = validate_flow(&flow(
            vec![FlowNode::new("a", NodeType::Action, "A"), FlowNode::new("b", NodeType::Action, "B"), FlowNode::new("lost", NodeType::Webhook, "Lost")],
            vec![FlowConnection::new("c1", "a", "b"), FlowConnection::new("c2", "b", "a")],
        ));
        assert_eq!(
            result.errors,
            [
                "Flow must have at least one trigger node",
                "Node \"Lost\" is not connected to the flow",
                "Flow contains a cycle at node \"A\"",
            ]
        );
    }

    #[test]
    fn test_serialized_shape() {
        let result = validate_flow(&ring(false));
        assert_eq!(serde_json::to_value(&result).unwrap(), json!({"isValid": true, "errors": []}));
    }
}
