use std::collections::HashSet;

use crate::error::{LayoutError, Result};
use crate::ir::{EntityRecord, SessionRecord};

use super::types::{Entity, EntityId, FlowGraph, Link, LinkId, Node, NodeId, NodeKind, Session, SessionId};
use super::util::{extent, sum};

/// Raw value domain `[min, max]` handed to a [`ValueScale`] factory.
pub type Domain = [f32; 2];
pub type ScaleFn = Box<dyn Fn(f32) -> f32>;
/// Builds the function that remaps raw node values, given their domain.
pub type ValueScale = Box<dyn Fn(Domain) -> ScaleFn>;
pub type EntityFilter = Box<dyn Fn(&EntityProfile<'_>) -> bool>;

/// What an [`EntityFilter`] sees of an entity: its name and the raw value at
/// each session it visits, in visitation order.
#[derive(Debug, Clone, Copy)]
pub struct EntityProfile<'a> {
    pub name: &'a str,
    pub values: &'a [f32],
}

/// Builds the node/link graph from input records. Every `(index, value)` pair
/// becomes a node; consecutive visits by one entity become a link.
pub fn build_graph(entities: &[EntityRecord], sessions: &[SessionRecord]) -> Result<FlowGraph> {
    if sessions.is_empty() {
        return Err(LayoutError::EmptyFlow);
    }

    let mut graph = FlowGraph {
        sessions: Vec::with_capacity(sessions.len()),
        entities: entities
            .iter()
            .map(|record| Entity {
                name: record.name.clone(),
                nodes: Vec::new(),
            })
            .collect(),
        nodes: Vec::new(),
        links: Vec::new(),
        entity_order: (0..entities.len()).map(EntityId).collect(),
    };

    for (session_idx, record) in sessions.iter().enumerate() {
        let session_id = SessionId(session_idx);
        graph.sessions.push(Session {
            name: record.name.clone(),
            ..Default::default()
        });

        let mut seen = HashSet::new();
        for entry in &record.entities {
            if entry.index >= entities.len() {
                return Err(LayoutError::EntityIndexOutOfRange {
                    session: session_idx,
                    index: entry.index,
                    len: entities.len(),
                });
            }
            if !seen.insert(entry.index) {
                return Err(LayoutError::DuplicateEntity {
                    session: session_idx,
                    index: entry.index,
                });
            }

            let entity_id = EntityId(entry.index);
            let node_id = NodeId(graph.nodes.len());
            graph.nodes.push(Node {
                entity: entity_id,
                kind: NodeKind::Real(session_id),
                value: entry.value,
                scaled_value: entry.value,
                y: 0.0,
                dy: 0.0,
            });

            let prev = graph.entities[entity_id.0]
                .nodes
                .last()
                .and_then(|&prev_id| graph.node(prev_id).session().map(|s| (prev_id, s)));
            if let Some((prev_id, prev_session)) = prev {
                let link_id = LinkId(graph.links.len());
                graph.links.push(Link {
                    source: prev_session,
                    target: session_id,
                    entity: entity_id,
                    source_node: prev_id,
                    target_node: node_id,
                });
                graph.session_mut(prev_session).source_links.push(link_id);
                graph.session_mut(session_id).target_links.push(link_id);
            }

            graph.entities[entity_id.0].nodes.push(node_id);
            let session = graph.session_mut(session_id);
            session.nodes.push(node_id);
            session.value += entry.value;
        }
    }

    tracing::debug!(
        sessions = graph.sessions.len(),
        entities = graph.entities.len(),
        nodes = graph.nodes.len(),
        links = graph.links.len(),
        "built session graph"
    );
    Ok(graph)
}

/// Drops every entity the filter rejects, together with its nodes and links.
/// Returns the number of entities removed.
pub fn filter_entities(graph: &mut FlowGraph, filter: &EntityFilter) -> usize {
    let mut rejected: HashSet<EntityId> = HashSet::new();
    for &entity_id in &graph.entity_order {
        let entity = graph.entity(entity_id);
        let values: Vec<f32> = entity.nodes.iter().map(|&n| graph.node(n).value).collect();
        let profile = EntityProfile {
            name: &entity.name,
            values: &values,
        };
        if !filter(&profile) {
            rejected.insert(entity_id);
        }
    }
    if rejected.is_empty() {
        return 0;
    }

    graph.entity_order.retain(|id| !rejected.contains(id));
    for entity_id in &rejected {
        let node_ids = graph.entities[entity_id.0].nodes.clone();
        for node_id in node_ids {
            let node = graph.node(node_id);
            let scaled = node.scaled_value;
            let Some(session_id) = node.session() else {
                continue;
            };
            let session = graph.session_mut(session_id);
            session.nodes.retain(|&n| n != node_id);
            session.value -= scaled;
        }
    }

    let links = &graph.links;
    for session in &mut graph.sessions {
        session
            .source_links
            .retain(|&l| !rejected.contains(&links[l.0].entity));
        session
            .target_links
            .retain(|&l| !rejected.contains(&links[l.0].entity));
    }

    tracing::debug!(removed = rejected.len(), kept = graph.entity_order.len(), "filtered entities");
    rejected.len()
}

/// Remaps every surviving node's scaled value through the scale built for the
/// raw value domain, then recomputes session totals.
pub fn scale_values(graph: &mut FlowGraph, value_scale: &ValueScale) {
    let live_nodes: Vec<NodeId> = graph
        .entity_order
        .iter()
        .flat_map(|&e| graph.entity(e).nodes.iter().copied())
        .collect();
    let Some(domain) = extent(live_nodes.iter().map(|&n| graph.node(n).value)) else {
        return;
    };
    let scale = value_scale(domain);
    for &node_id in &live_nodes {
        let node = graph.node_mut(node_id);
        node.scaled_value = scale(node.value);
    }

    for idx in 0..graph.sessions.len() {
        let total = sum(
            graph.sessions[idx]
                .nodes
                .iter()
                .map(|&n| graph.nodes[n.0].scaled_value),
        );
        graph.sessions[idx].value = total;
    }
    tracing::debug!(min = domain[0], max = domain[1], "rescaled node values");
}

fn normalize(value: f32, [d0, d1]: Domain) -> f32 {
    let span = d1 - d0;
    if span == 0.0 { 0.5 } else { (value - d0) / span }
}

fn interpolate(t: f32, [r0, r1]: [f32; 2]) -> f32 {
    r0 + (r1 - r0) * t
}

/// Linear map from the value domain onto `range`.
pub fn linear_scale(range: [f32; 2]) -> ValueScale {
    Box::new(move |domain: Domain| -> ScaleFn {
        Box::new(move |value| interpolate(normalize(value, domain), range))
    })
}

/// Square-root map; compresses large values. Negative values are treated as zero.
pub fn sqrt_scale(range: [f32; 2]) -> ValueScale {
    Box::new(move |[d0, d1]: Domain| -> ScaleFn {
        let domain = [d0.max(0.0).sqrt(), d1.max(0.0).sqrt()];
        Box::new(move |value| interpolate(normalize(value.max(0.0).sqrt(), domain), range))
    })
}

/// Logarithmic map over `ln(1 + v)`, so zero values stay finite.
pub fn log_scale(range: [f32; 2]) -> ValueScale {
    Box::new(move |[d0, d1]: Domain| -> ScaleFn {
        let domain = [d0.max(0.0).ln_1p(), d1.max(0.0).ln_1p()];
        Box::new(move |value| interpolate(normalize(value.max(0.0).ln_1p(), domain), range))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(names: &[&str]) -> Vec<EntityRecord> {
        names.iter().map(|n| EntityRecord::new(*n)).collect()
    }

    #[test]
    fn builds_nodes_and_links_in_visit_order() {
        let entities = records(&["a", "b"]);
        let sessions = vec![
            SessionRecord::new([(0, 3.0), (1, 2.0)]),
            SessionRecord::new([(0, 4.0)]),
            SessionRecord::new([(1, 1.0), (0, 5.0)]),
        ];
        let graph = build_graph(&entities, &sessions).unwrap();
        assert_eq!(graph.nodes.len(), 5);
        assert_eq!(graph.links.len(), 3);
        assert_eq!(graph.entity(EntityId(0)).nodes.len(), 3);
        assert_eq!(graph.session(SessionId(0)).value, 5.0);
        assert_eq!(graph.session(SessionId(0)).source_links.len(), 2);
        assert_eq!(graph.session(SessionId(2)).target_links.len(), 2);
        let b_link = graph
            .links
            .iter()
            .find(|l| l.entity == EntityId(1))
            .unwrap();
        assert_eq!((b_link.source, b_link.target), (SessionId(0), SessionId(2)));
    }

    #[test]
    fn rejects_out_of_range_and_duplicate_entities() {
        let entities = records(&["a"]);
        let err = build_graph(&entities, &[SessionRecord::new([(2, 1.0)])]).unwrap_err();
        assert_eq!(
            err,
            LayoutError::EntityIndexOutOfRange {
                session: 0,
                index: 2,
                len: 1
            }
        );
        let err = build_graph(&entities, &[SessionRecord::new([(0, 1.0), (0, 2.0)])]).unwrap_err();
        assert_eq!(err, LayoutError::DuplicateEntity { session: 0, index: 0 });
        assert_eq!(build_graph(&entities, &[]).unwrap_err(), LayoutError::EmptyFlow);
    }

    #[test]
    fn filter_removes_nodes_values_and_links() {
        let entities = records(&["keep", "drop"]);
        let sessions = vec![
            SessionRecord::new([(0, 15.0), (1, 5.0)]),
            SessionRecord::new([(0, 1.0), (1, 1.0)]),
        ];
        let mut graph = build_graph(&entities, &sessions).unwrap();
        let filter: EntityFilter = Box::new(|e: &EntityProfile<'_>| e.name != "drop");
        assert_eq!(filter_entities(&mut graph, &filter), 1);
        assert_eq!(graph.entity_order, vec![EntityId(0)]);
        let first = graph.session(SessionId(0));
        assert_eq!(first.value, 15.0);
        assert_eq!(first.nodes.len(), 1);
        assert_eq!(first.source_links.len(), 1);
        assert_eq!(graph.session(SessionId(1)).target_links.len(), 1);
    }

    #[test]
    fn filter_sees_raw_values() {
        let entities = records(&["big", "small"]);
        let sessions = vec![SessionRecord::new([(0, 50.0), (1, 2.0)])];
        let mut graph = build_graph(&entities, &sessions).unwrap();
        let filter: EntityFilter =
            Box::new(|e: &EntityProfile<'_>| e.values.iter().sum::<f32>() > 10.0);
        filter_entities(&mut graph, &filter);
        assert_eq!(graph.entity_order, vec![EntityId(0)]);
    }

    #[test]
    fn scale_values_recomputes_session_totals() {
        let entities = records(&["a", "b"]);
        let sessions = vec![
            SessionRecord::new([(0, 0.0), (1, 100.0)]),
            SessionRecord::new([(0, 50.0)]),
        ];
        let mut graph = build_graph(&entities, &sessions).unwrap();
        scale_values(&mut graph, &linear_scale([0.0, 1.0]));
        assert_eq!(graph.node(NodeId(1)).scaled_value, 1.0);
        assert_eq!(graph.node(NodeId(2)).scaled_value, 0.5);
        assert_eq!(graph.node(NodeId(2)).value, 50.0);
        assert_eq!(graph.session(SessionId(0)).value, 1.0);
        assert_eq!(graph.session(SessionId(1)).value, 0.5);
    }

    #[test]
    fn builtin_scales_map_domain_ends_to_range() {
        for scale in [
            linear_scale([2.0, 8.0]),
            sqrt_scale([2.0, 8.0]),
            log_scale([2.0, 8.0]),
        ] {
            let f = scale([1.0, 100.0]);
            assert!((f(1.0) - 2.0).abs() < 1e-4);
            assert!((f(100.0) - 8.0).abs() < 1e-4);
            let mid = f(30.0);
            assert!(mid > 2.0 && mid < 8.0);
        }
        let flat = linear_scale([0.0, 10.0])([4.0, 4.0]);
        assert_eq!(flat(4.0), 5.0);
    }
}
