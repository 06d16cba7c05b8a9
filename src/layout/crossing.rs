use crate::config::LayoutConfig;

use super::types::{FlowGraph, NodeId, SessionId};
use super::util::mean;

/// Reorders nodes inside each session to reduce entity path crossings.
/// Session geometry is left untouched; only the stacking order changes.
pub fn minimize_crossings(graph: &mut FlowGraph, config: &LayoutConfig) {
    let mut layers = graph.layers();
    initialize_node_order(graph, config);

    for _ in 0..config.crossing_rounds {
        reorder_right_to_left(graph, &mut layers, config);
        reorder_left_to_right(graph, &mut layers, config);
    }
    tracing::trace!(rounds = config.crossing_rounds, "reordered session nodes");
}

/// Heaviest band on top.
fn initialize_node_order(graph: &mut FlowGraph, config: &LayoutConfig) {
    for idx in 0..graph.sessions.len() {
        let mut nodes = std::mem::take(&mut graph.sessions[idx].nodes);
        nodes.sort_by(|a, b| graph.node(*b).value.total_cmp(&graph.node(*a).value));
        graph.sessions[idx].nodes = nodes;
    }
    graph.reposition_nodes(config.entity_padding);
}

fn reorder_right_to_left(graph: &mut FlowGraph, layers: &mut [Vec<SessionId>], config: &LayoutConfig) {
    for layer in layers.iter_mut().rev() {
        graph.sort_by_y(layer);
        layer.reverse();
        for &id in layer.iter() {
            sort_session_nodes(graph, id, upstream_depth);
        }
    }
    graph.reposition_nodes(config.entity_padding);
}

fn reorder_left_to_right(graph: &mut FlowGraph, layers: &mut [Vec<SessionId>], config: &LayoutConfig) {
    for layer in layers.iter_mut() {
        graph.sort_by_y(layer);
        for &id in layer.iter() {
            sort_session_nodes(graph, id, downstream_depth);
        }
    }
    graph.reposition_nodes(config.entity_padding);
}

fn sort_session_nodes(graph: &mut FlowGraph, id: SessionId, depth: fn(&FlowGraph, NodeId) -> f32) {
    let mut keyed: Vec<(f32, NodeId)> = graph
        .session(id)
        .nodes
        .iter()
        .map(|&n| (depth(graph, n), n))
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    graph.session_mut(id).nodes = keyed.into_iter().map(|(_, n)| n).collect();
}

/// Mean center of the entity's nodes before this one, or the node's own center.
pub(crate) fn upstream_depth(graph: &FlowGraph, node_id: NodeId) -> f32 {
    let stream = &graph.entity(graph.node(node_id).entity).nodes;
    let own = graph.node_center(node_id);
    match stream.iter().position(|&n| n == node_id) {
        Some(i) if i > 0 => mean(stream[..i].iter().map(|&n| graph.node_center(n))).unwrap_or(own),
        _ => own,
    }
}

/// Mean center of the entity's nodes after this one, or the node's own center.
pub(crate) fn downstream_depth(graph: &FlowGraph, node_id: NodeId) -> f32 {
    let stream = &graph.entity(graph.node(node_id).entity).nodes;
    let own = graph.node_center(node_id);
    match stream.iter().position(|&n| n == node_id) {
        Some(i) if i + 1 < stream.len() => {
            mean(stream[i + 1..].iter().map(|&n| graph.node_center(n))).unwrap_or(own)
        }
        _ => own,
    }
}
