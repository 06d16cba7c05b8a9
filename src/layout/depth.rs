use crate::config::LayoutConfig;
use crate::error::{LayoutError, Result};

use super::types::{Band, FlowGraph, SessionId};
use super::util::{sum, weighted_mean};

const ALPHA_DECAY: f32 = 0.99;

/// Sizes sessions proportionally to value, relaxes them toward their linked
/// neighbours for `iterations` rounds and keeps every layer collision free.
///
/// Returns the global value scale (pixels per unit of scaled value), or
/// [`LayoutError::HeightTooSmall`] when a layer's padding alone exceeds the height.
pub fn assign_depths(graph: &mut FlowGraph, config: &LayoutConfig, iterations: usize) -> Result<f32> {
    let mut layers = graph.layers();
    let value_scale = initialize_depths(graph, &layers, config)?;

    resolve_collisions(graph, &mut layers, config);
    let mut alpha = 1.0f32;
    for _ in 0..iterations {
        alpha *= ALPHA_DECAY;
        relax_right_to_left(graph, &layers, alpha);
        resolve_collisions(graph, &mut layers, config);
        relax_left_to_right(graph, &layers, alpha);
        resolve_collisions(graph, &mut layers, config);
    }
    graph.reposition_nodes(config.entity_padding);

    tracing::debug!(value_scale, iterations, "assigned session depths");
    Ok(value_scale)
}

/// Largest scale at which the most crowded layer still fits the height.
pub fn global_value_scale(graph: &FlowGraph, layers: &[Vec<SessionId>], config: &LayoutConfig) -> Result<f32> {
    let mut scale = f32::INFINITY;
    for layer in layers {
        let Some(&first) = layer.first() else {
            continue;
        };
        let required = (layer.len() + 1) as f32 * config.session_padding;
        if required > config.height {
            return Err(LayoutError::HeightTooSmall {
                layer: graph.session(first).layer,
                required,
                height: config.height,
            });
        }
        let total = sum(layer.iter().map(|&id| graph.session(id).value));
        if total > 0.0 {
            scale = scale.min((config.height - required) / total);
        }
    }

    if !scale.is_finite() {
        tracing::warn!("no layer carries any value; sessions collapse to zero height");
        return Ok(0.0);
    }
    Ok(scale)
}

fn initialize_depths(graph: &mut FlowGraph, layers: &[Vec<SessionId>], config: &LayoutConfig) -> Result<f32> {
    let value_scale = global_value_scale(graph, layers, config)?;

    for layer in layers {
        let mut y = config.session_padding;
        for &id in layer {
            let session = graph.session_mut(id);
            session.y = y;
            session.dy = session.value * value_scale;
            y += session.dy + config.session_padding;

            let session = graph.session(id);
            let node_total = sum(session.nodes.iter().map(|&n| graph.node(n).scaled_value));
            let gaps = session.nodes.len().saturating_sub(1) as f32 * config.entity_padding;
            let ky = if node_total > 0.0 {
                ((session.dy - gaps) / node_total).max(0.0)
            } else {
                0.0
            };
            for node_idx in 0..graph.session(id).nodes.len() {
                let node_id = graph.session(id).nodes[node_idx];
                let node = graph.node_mut(node_id);
                node.dy = node.scaled_value * ky;
            }
        }
    }
    Ok(value_scale)
}

/// Pushes overlapping sessions apart within each layer and pulls the stack
/// back inside `[0, height]` when it overflows. Re-running it on a resolved
/// layout changes nothing.
pub fn resolve_collisions(graph: &mut FlowGraph, layers: &mut [Vec<SessionId>], config: &LayoutConfig) {
    let padding = config.session_padding;
    for layer in layers.iter_mut() {
        graph.sort_by_y(layer);
        let Some(&bottom) = layer.last() else {
            continue;
        };

        let mut y0 = 0.0f32;
        for &id in layer.iter() {
            let session = graph.session_mut(id);
            let dy = y0 - session.y;
            if dy > 0.0 {
                session.y += dy;
            }
            y0 = session.y + session.dy + padding;
        }

        let overflow = y0 - config.height;
        if overflow > 0.0 {
            let session = graph.session_mut(bottom);
            session.y -= overflow;
            let mut y0 = session.y;
            for &id in layer.iter().rev().skip(1) {
                let session = graph.session_mut(id);
                let dy = session.y + session.dy + padding - y0;
                if dy > 0.0 {
                    session.y -= dy;
                }
                y0 = session.y;
            }
        }
    }
}

fn relax_right_to_left(graph: &mut FlowGraph, layers: &[Vec<SessionId>], alpha: f32) {
    for layer in layers.iter().rev() {
        for &id in layer {
            let session = graph.session(id);
            let target = weighted_mean(session.source_links.iter().map(|&l| {
                let link = graph.link(l);
                (
                    graph.session(link.target).center(),
                    graph.node(link.target_node).scaled_value,
                )
            }));
            if let Some(target) = target {
                let shift = (target - session.center()) * alpha;
                graph.session_mut(id).y += shift;
            }
        }
    }
}

fn relax_left_to_right(graph: &mut FlowGraph, layers: &[Vec<SessionId>], alpha: f32) {
    for layer in layers {
        for &id in layer {
            let session = graph.session(id);
            let source = weighted_mean(session.target_links.iter().map(|&l| {
                let link = graph.link(l);
                (
                    graph.session(link.source).center(),
                    graph.node(link.source_node).scaled_value,
                )
            }));
            if let Some(source) = source {
                let shift = (source - session.center()) * alpha;
                graph.session_mut(id).y += shift;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{EntityRecord, SessionRecord};
    use crate::layout::breadth::assign_breadths;
    use crate::layout::graph::build_graph;

    fn config() -> LayoutConfig {
        LayoutConfig {
            width: 800.0,
            height: 400.0,
            session_width: 100.0,
            session_padding: 20.0,
            entity_padding: 5.0,
            ..Default::default()
        }
    }

    fn laid_out(sessions: Vec<SessionRecord>, entities: usize, iterations: usize) -> (FlowGraph, f32) {
        let entities: Vec<EntityRecord> =
            (0..entities).map(|i| EntityRecord::new(format!("e{i}"))).collect();
        let mut graph = build_graph(&entities, &sessions).unwrap();
        assign_breadths(&mut graph, &config()).unwrap();
        let scale = assign_depths(&mut graph, &config(), iterations).unwrap();
        (graph, scale)
    }

    fn crowded() -> Vec<SessionRecord> {
        vec![
            SessionRecord::new([(0, 10.0), (1, 20.0)]),
            SessionRecord::new([(2, 30.0)]),
            SessionRecord::new([(0, 10.0), (2, 5.0)]),
            SessionRecord::new([(1, 20.0)]),
            SessionRecord::new([(2, 5.0), (0, 10.0), (1, 20.0)]),
        ]
    }

    #[test]
    fn value_scale_fits_most_crowded_layer() {
        let (graph, scale) = laid_out(crowded(), 3, 0);
        // layer 0 holds 60 units in two sessions: (400 - 3 * 20) / 60
        assert!((scale - 340.0 / 60.0).abs() < 1e-4);
        for session in &graph.sessions {
            assert!((session.dy - session.value * scale).abs() < 1e-3);
        }
    }

    #[test]
    fn node_heights_fill_session_minus_padding() {
        let (graph, _) = laid_out(crowded(), 3, 3);
        for session in &graph.sessions {
            let nodes: f32 = session.nodes.iter().map(|&n| graph.node(n).dy).sum();
            let gaps = (session.nodes.len() - 1) as f32 * 5.0;
            assert!((nodes + gaps - session.dy).abs() < 1e-3);
            let mut expected_y = session.y;
            for &n in &session.nodes {
                assert!((graph.node(n).y - expected_y).abs() < 1e-3);
                expected_y += graph.node(n).dy + 5.0;
            }
        }
    }

    #[test]
    fn layers_stay_separated_and_in_bounds() {
        for iterations in [0, 1, 8] {
            let (graph, _) = laid_out(crowded(), 3, iterations);
            for mut layer in graph.layers() {
                graph.sort_by_y(&mut layer);
                for pair in layer.windows(2) {
                    let upper = graph.session(pair[0]);
                    let lower = graph.session(pair[1]);
                    assert!(lower.y - upper.bottom() >= 20.0 - 1e-3);
                }
                let top = graph.session(layer[0]);
                let bottom = graph.session(layer[layer.len() - 1]);
                assert!(top.y >= -1e-3);
                assert!(bottom.bottom() <= 400.0 + 1e-3);
            }
        }
    }

    #[test]
    fn collision_resolution_is_idempotent() {
        let (mut graph, _) = laid_out(crowded(), 3, 4);
        let mut layers = graph.layers();
        resolve_collisions(&mut graph, &mut layers, &config());
        let before: Vec<f32> = graph.sessions.iter().map(|s| s.y).collect();
        resolve_collisions(&mut graph, &mut layers, &config());
        let after: Vec<f32> = graph.sessions.iter().map(|s| s.y).collect();
        for (b, a) in before.iter().zip(&after) {
            assert!((b - a).abs() < 1e-3, "{b} moved to {a}");
        }
    }

    #[test]
    fn overflowing_layer_is_pulled_back_up() {
        let (mut graph, _) = laid_out(crowded(), 3, 0);
        let mut layers = graph.layers();
        for id in graph.session_ids() {
            graph.session_mut(id).y = 390.0;
        }
        resolve_collisions(&mut graph, &mut layers, &config());
        for session in &graph.sessions {
            assert!(session.bottom() <= 400.0 + 1e-3);
        }
    }

    #[test]
    fn padding_taller_than_height_is_rejected() {
        let config = LayoutConfig {
            width: 600.0,
            height: 100.0,
            session_padding: 80.0,
            ..config()
        };
        let entities = vec![EntityRecord::new("a"), EntityRecord::new("b")];
        let sessions = vec![
            SessionRecord::new([(0, 4.0)]),
            SessionRecord::new([(1, 4.0)]),
            SessionRecord::new([(0, 4.0), (1, 4.0)]),
        ];
        let mut graph = build_graph(&entities, &sessions).unwrap();
        assign_breadths(&mut graph, &config).unwrap();
        assert_eq!(
            assign_depths(&mut graph, &config, 0),
            Err(LayoutError::HeightTooSmall {
                layer: 0,
                required: 240.0,
                height: 100.0,
            })
        );
    }

    #[test]
    fn relaxation_aligns_a_simple_chain() {
        let sessions = vec![
            SessionRecord::new([(0, 10.0), (1, 10.0)]),
            SessionRecord::new([(0, 10.0)]),
            SessionRecord::new([(1, 10.0)]),
            SessionRecord::new([(0, 10.0), (1, 10.0)]),
        ];
        let (graph, _) = laid_out(sessions, 2, 16);
        let first = graph.session(SessionId(0)).center();
        let last = graph.session(SessionId(3)).center();
        assert!((first - last).abs() < 1.0);
    }
}
