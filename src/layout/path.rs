use serde::Serialize;

use super::types::{EntityId, FlowGraph, NodeId};
use super::util::fmt_num;

/// Pixel rectangle of one visible band segment, denormalized for renderers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NodeRect {
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
    pub value: f32,
    pub entity: EntityId,
}

fn rect(graph: &FlowGraph, id: NodeId) -> NodeRect {
    let node = graph.node(id);
    NodeRect {
        x: graph.node_x(id),
        y: node.y,
        dx: graph.node_dx(id),
        dy: node.dy,
        value: node.value,
        entity: node.entity,
    }
}

/// First real node of the entity, used for labels and start markers.
pub fn head(graph: &FlowGraph, entity: EntityId) -> Option<NodeRect> {
    graph
        .entity(entity)
        .nodes
        .iter()
        .find(|&&n| !graph.node(n).is_detour())
        .map(|&n| rect(graph, n))
}

/// Every non-detour node of the entity, in path order.
pub fn visible_nodes(graph: &FlowGraph, entity: EntityId) -> Vec<NodeRect> {
    graph
        .entity(entity)
        .nodes
        .iter()
        .filter(|&&n| !graph.node(n).is_detour())
        .map(|&n| rect(graph, n))
        .collect()
}

/// Control point x-offsets (as fractions of the span) for a connector.
fn easing(descending: bool) -> (f32, f32) {
    if descending { (0.6, 0.5) } else { (0.5, 0.4) }
}

fn push_curve(d: &mut String, (c0, c1): (f32, f32), dx: f32, dy: f32) {
    d.push('c');
    d.push_str(
        &[dx * c0, 0.0, dx * c1, dy, dx, dy]
            .iter()
            .map(|v| fmt_num(*v))
            .collect::<Vec<_>>()
            .join(","),
    );
}

/// Closed outline of an entity's band: along the top edges left to right,
/// down the last node, back along the bottom edges and closed.
pub fn entity_path(graph: &FlowGraph, entity: EntityId, session_width: f32) -> String {
    let mut nodes: Vec<NodeRect> = graph
        .entity(entity)
        .nodes
        .iter()
        .map(|&n| rect(graph, n))
        .collect();
    nodes.sort_by(|a, b| a.x.total_cmp(&b.x));
    let (Some(first), Some(last)) = (nodes.first().copied(), nodes.last().copied()) else {
        return String::new();
    };

    let mut d = format!("M{},{}", fmt_num(first.x), fmt_num(first.y));
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            let prev = &nodes[i - 1];
            let dx = node.x - (prev.x + session_width);
            let dy = node.y - prev.y;
            push_curve(&mut d, easing(dy > 0.0), dx, dy);
        }
        d.push('h');
        d.push_str(&fmt_num(session_width));
    }

    d.push('v');
    d.push_str(&fmt_num(last.dy));

    let reversed: Vec<&NodeRect> = nodes.iter().rev().collect();
    for (i, node) in reversed.iter().enumerate() {
        if i > 0 {
            let prev = reversed[i - 1];
            let dx = (node.x + session_width) - prev.x;
            let dy = (node.y + node.dy) - (prev.y + prev.dy);
            push_curve(&mut d, easing(dy <= 0.0), dx, dy);
        }
        d.push('h');
        d.push_str(&fmt_num(-session_width));
    }

    d.push('Z');
    d
}
