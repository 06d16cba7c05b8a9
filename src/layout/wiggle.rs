use crate::config::LayoutConfig;

use super::types::{Band, EntityId, FlowGraph, SessionId};

/// Slides each session up or down, one pixel at a time, to the position that
/// minimizes the curvature of the entity paths passing through it.
pub fn minimize_wiggle(graph: &mut FlowGraph, config: &LayoutConfig) {
    let mut layers = graph.layers();
    let mut moved = 0usize;
    for layer in layers.iter_mut() {
        moved += straighten_layer(graph, layer, config);
    }
    for layer in layers.iter_mut().rev() {
        moved += straighten_layer(graph, layer, config);
    }
    tracing::trace!(moved, "straightened sessions");
}

fn straighten_layer(graph: &mut FlowGraph, layer: &mut [SessionId], config: &LayoutConfig) -> usize {
    graph.sort_by_y(layer);
    let mut moved = 0;
    for i in 0..layer.len() {
        let above = i.checked_sub(1).map(|j| layer[j]);
        let below = layer.get(i + 1).copied();
        if straighten(graph, layer[i], above, below, config) {
            moved += 1;
        }
    }
    moved
}

#[derive(Debug, Clone, Copy)]
struct Probe {
    wiggle: f32,
    y: f32,
}

fn straighten(
    graph: &mut FlowGraph,
    id: SessionId,
    above: Option<SessionId>,
    below: Option<SessionId>,
    config: &LayoutConfig,
) -> bool {
    let start_y = graph.session(id).y;
    if !start_y.is_finite() {
        return false;
    }
    let dy = graph.session(id).dy;
    let mut best = Probe {
        wiggle: total_wiggle(graph, id),
        y: start_y,
    };

    let upper_limit = above
        .map(|a| graph.session(a).bottom() + config.session_padding)
        .unwrap_or(0.0);
    let mut y = start_y - 1.0;
    while y >= upper_limit {
        best = probe(graph, id, y, best, config);
        y -= 1.0;
    }
    move_session(graph, id, start_y, config);

    let lower_limit = below
        .map(|b| graph.session(b).y - dy - config.session_padding)
        .unwrap_or(config.height - dy);
    let mut y = start_y + 1.0;
    while y <= lower_limit {
        best = probe(graph, id, y, best, config);
        y += 1.0;
    }

    move_session(graph, id, best.y, config);
    best.y != start_y
}

fn probe(graph: &mut FlowGraph, id: SessionId, y: f32, best: Probe, config: &LayoutConfig) -> Probe {
    move_session(graph, id, y, config);
    let wiggle = total_wiggle(graph, id);
    if wiggle < best.wiggle {
        Probe { wiggle, y }
    } else {
        best
    }
}

fn move_session(graph: &mut FlowGraph, id: SessionId, y: f32, config: &LayoutConfig) {
    graph.session_mut(id).y = y;
    graph.reposition_session(id, config.entity_padding);
}

/// Sum of the wiggle of every entity with a node in the session.
pub(crate) fn total_wiggle(graph: &FlowGraph, id: SessionId) -> f32 {
    graph
        .session(id)
        .nodes
        .iter()
        .map(|&n| entity_wiggle(graph, graph.node(n).entity))
        .sum()
}

/// Total vertical travel of an entity's path between consecutive nodes.
pub(crate) fn entity_wiggle(graph: &FlowGraph, entity: EntityId) -> f32 {
    graph
        .entity(entity)
        .nodes
        .windows(2)
        .map(|pair| (graph.node_center(pair[0]) - graph.node_center(pair[1])).abs())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{EntityRecord, SessionRecord};
    use crate::layout::breadth::assign_breadths;
    use crate::layout::depth::assign_depths;
    use crate::layout::graph::build_graph;

    fn config() -> LayoutConfig {
        LayoutConfig {
            width: 500.0,
            height: 300.0,
            session_width: 50.0,
            session_padding: 20.0,
            entity_padding: 4.0,
            ..Default::default()
        }
    }

    fn build(sessions: Vec<SessionRecord>, entities: usize) -> FlowGraph {
        let entities: Vec<EntityRecord> =
            (0..entities).map(|i| EntityRecord::new(format!("e{i}"))).collect();
        let mut graph = build_graph(&entities, &sessions).unwrap();
        assign_breadths(&mut graph, &config()).unwrap();
        assign_depths(&mut graph, &config(), 0).unwrap();
        graph
    }

    #[test]
    fn straightens_a_lone_band() {
        let mut graph = build(
            vec![
                SessionRecord::new([(0, 10.0), (1, 10.0)]),
                SessionRecord::new([(0, 10.0)]),
            ],
            2,
        );
        graph.session_mut(SessionId(1)).y = 200.0;
        graph.reposition_nodes(config().entity_padding);
        let before = entity_wiggle(&graph, EntityId(0));
        minimize_wiggle(&mut graph, &config());
        let after = entity_wiggle(&graph, EntityId(0));
        assert!(after < before);
        assert!(after <= 1.0, "residual wiggle {after}");
    }

    #[test]
    fn wiggle_never_increases() {
        let mut graph = build(
            vec![
                SessionRecord::new([(0, 4.0), (1, 6.0), (2, 2.0)]),
                SessionRecord::new([(1, 3.0)]),
                SessionRecord::new([(0, 5.0), (2, 2.0)]),
                SessionRecord::new([(0, 1.0), (1, 1.0), (2, 1.0)]),
            ],
            3,
        );
        let total = |g: &FlowGraph| -> f32 {
            (0..3).map(|e| entity_wiggle(g, EntityId(e))).sum()
        };
        let before = total(&graph);
        minimize_wiggle(&mut graph, &config());
        assert!(total(&graph) <= before + 1e-3);
    }

    #[test]
    fn sessions_stay_within_layer_bounds() {
        let mut graph = build(
            vec![
                SessionRecord::new([(0, 4.0)]),
                SessionRecord::new([(1, 4.0)]),
                SessionRecord::new([(0, 4.0), (1, 4.0)]),
            ],
            2,
        );
        minimize_wiggle(&mut graph, &config());
        for mut layer in graph.layers() {
            graph.sort_by_y(&mut layer);
            for pair in layer.windows(2) {
                let gap = graph.session(pair[1]).y - graph.session(pair[0]).bottom();
                assert!(gap >= config().session_padding - 1e-3);
            }
            for &id in &layer {
                let s = graph.session(id);
                assert!(s.y >= -1e-3 && s.bottom() <= 300.0 + 1e-3);
            }
        }
    }
}
