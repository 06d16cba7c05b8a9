use crate::config::LayoutConfig;
use crate::error::{LayoutError, Result};

use super::types::{FlowGraph, SessionId};

/// Assigns every session a layer by forward propagation, pulls sinks to the
/// last layer, then scales layers onto `[0, width - session_width]`.
/// Returns the number of layers.
///
/// Graphs from [`build_graph`](super::build_graph) only link earlier sessions to
/// later ones; a hand-assembled [`FlowGraph`] may not, so propagation is capped
/// at one round per session and a cyclic graph yields [`LayoutError::Cycle`].
pub fn assign_breadths(graph: &mut FlowGraph, config: &LayoutConfig) -> Result<usize> {
    let session_count = graph.sessions.len();
    let mut frontier: Vec<SessionId> = graph.session_ids().collect();
    let mut queued = vec![false; session_count];
    let mut layer = 0usize;

    while !frontier.is_empty() {
        if layer > session_count {
            return Err(LayoutError::Cycle { rounds: layer });
        }
        queued.fill(false);
        let mut next = Vec::new();
        for &id in &frontier {
            let session = graph.session_mut(id);
            session.layer = layer;
            session.dx = config.session_width;
            for link_idx in 0..graph.session(id).source_links.len() {
                let link_id = graph.session(id).source_links[link_idx];
                let target = graph.link(link_id).target;
                if !queued[target.index()] {
                    queued[target.index()] = true;
                    next.push(target);
                }
            }
        }
        frontier = next;
        layer += 1;
    }

    let max_layer = layer.saturating_sub(1);
    for session in &mut graph.sessions {
        if session.source_links.is_empty() {
            session.layer = max_layer;
        }
    }

    if max_layer == 0 {
        return Err(LayoutError::SingleLayer);
    }
    let kx = (config.width - config.session_width) / max_layer as f32;
    for session in &mut graph.sessions {
        session.x = session.layer as f32 * kx;
    }

    tracing::debug!(layers = max_layer + 1, kx, "assigned session breadths");
    Ok(max_layer + 1)
}
