use std::collections::HashMap;

use crate::config::LayoutConfig;

use super::types::{Band, DetourGeometry, EntityId, FlowGraph, Node, NodeId, NodeKind};

/// Vertical interval a detour node must keep clear of.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Obstacle {
    pub y: f32,
    pub dy: f32,
}

impl Band for Obstacle {
    fn top(&self) -> f32 {
        self.y
    }

    fn height(&self) -> f32 {
        self.dy
    }
}

/// True when the padded gap between the two intervals is too small.
pub(crate) fn overlaps(a: &Obstacle, b: &Obstacle, padding: f32) -> bool {
    let (upper, lower) = if a.y <= b.y { (a, b) } else { (b, a) };
    let gap = (lower.y - upper.bottom()).ceil();
    gap < padding
}

fn first_overlap(node: &Obstacle, obstacles: &[Obstacle], padding: f32) -> Option<usize> {
    obstacles.iter().position(|o| overlaps(node, o, padding))
}

/// Snaps `node` above (or below) whichever obstacle it overlaps until it is
/// clear of all of them. The direction is fixed by the first overlap.
pub(crate) fn avoid(node: &mut Obstacle, obstacles: &[Obstacle], padding: f32) {
    let Some(mut idx) = first_overlap(node, obstacles, padding) else {
        return;
    };
    let upward = node.center() < obstacles[idx].center();
    for _ in 0..=obstacles.len() {
        let obstacle = obstacles[idx];
        node.y = if upward {
            obstacle.y - node.dy - padding
        } else {
            obstacle.bottom() + padding
        };
        match first_overlap(node, obstacles, padding) {
            Some(next) => idx = next,
            None => return,
        }
    }
    tracing::warn!(y = node.y, "detour node could not clear every obstacle");
}

/// Inserts a detour node at every layer an entity skips between its first and
/// last visit, routed around the sessions (and earlier detours) in that layer.
/// Returns the number of detour nodes created.
pub fn route_detours(graph: &mut FlowGraph, config: &LayoutConfig, value_scale: f32) -> usize {
    let columns = graph.layers();
    let mut breadths: Vec<(usize, f32)> = Vec::with_capacity(columns.len());
    let mut obstacles: HashMap<usize, Vec<Obstacle>> = HashMap::new();
    for column in &columns {
        let first = graph.session(column[0]);
        breadths.push((first.layer, first.x));
        obstacles.insert(
            first.layer,
            column
                .iter()
                .map(|&id| {
                    let s = graph.session(id);
                    Obstacle { y: s.y, dy: s.dy }
                })
                .collect(),
        );
    }

    let mut order: Vec<EntityId> = graph
        .entity_order
        .iter()
        .copied()
        .filter(|&e| !graph.entity(e).nodes.is_empty())
        .collect();
    order.sort_by(|&a, &b| {
        let head_a = graph.entity(a).nodes[0];
        let head_b = graph.entity(b).nodes[0];
        graph
            .node_x(head_a)
            .total_cmp(&graph.node_x(head_b))
            .then_with(|| graph.node(head_a).y.total_cmp(&graph.node(head_b).y))
    });

    let detour_dy = (value_scale - config.entity_padding).max(0.0);
    let mut created = 0usize;
    for entity_id in order {
        let stream = std::mem::take(&mut graph.entities[entity_id.0].nodes);
        let (Some(&head), Some(&tail)) = (stream.first(), stream.last()) else {
            continue;
        };
        let first_layer = graph.node_layer(head);
        let last_layer = graph.node_layer(tail);

        let mut pending = stream.into_iter().peekable();
        let mut routed: Vec<NodeId> = Vec::new();
        for &(layer, x) in breadths
            .iter()
            .filter(|(layer, _)| (first_layer..=last_layer).contains(layer))
        {
            if let Some(&next) = pending.peek() {
                if graph.node_layer(next) <= layer {
                    routed.push(next);
                    pending.next();
                    continue;
                }
            }
            let Some(&previous) = routed.last() else {
                continue;
            };
            let mut placed = Obstacle {
                y: graph.node_center(previous) - detour_dy / 2.0,
                dy: detour_dy,
            };
            let column = obstacles.entry(layer).or_default();
            column.sort_by(|a, b| a.y.total_cmp(&b.y));
            avoid(&mut placed, column, config.entity_padding);
            column.push(placed);

            let node_id = NodeId(graph.nodes.len());
            graph.nodes.push(Node {
                entity: entity_id,
                kind: NodeKind::Detour(DetourGeometry {
                    layer,
                    x,
                    dx: config.session_width,
                }),
                value: 0.0,
                scaled_value: 0.0,
                y: placed.y,
                dy: placed.dy,
            });
            routed.push(node_id);
            created += 1;
        }
        routed.extend(pending);
        graph.entities[entity_id.0].nodes = routed;
    }

    tracing::debug!(created, detour_dy, "routed entity detours");
    created
}
