//! Entity-flow layout engine.
//!
//! An [`EntityFlow`] holds the input records and configuration; [`EntityFlow::layout`]
//! runs the stages in order (graph, breadth, depth, crossing/wiggle rounds,
//! detours, draw order) over a fresh [`FlowGraph`] and keeps the result as a
//! [`FlowLayout`].

mod breadth;
mod crossing;
mod depth;
mod detour;
mod graph;
mod path;
pub(crate) mod types;
mod util;
mod wiggle;

pub use breadth::assign_breadths;
pub use crossing::minimize_crossings;
pub use depth::{assign_depths, global_value_scale, resolve_collisions};
pub use detour::route_detours;
pub use graph::{
    Domain, EntityFilter, EntityProfile, ScaleFn, ValueScale, build_graph, filter_entities,
    linear_scale, log_scale, scale_values, sqrt_scale,
};
pub use path::{NodeRect, entity_path, head, visible_nodes};
pub use types::*;
pub use wiggle::minimize_wiggle;

use std::fmt;

use crate::config::{Config, LayoutConfig};
use crate::error::{LayoutError, Result};
use crate::ir::{EntityRecord, FlowInput, SessionRecord};
use util::median;

/// Configured layout engine. Setters return `&mut Self` so calls can be chained.
pub struct EntityFlow {
    config: LayoutConfig,
    entity_filter: Option<EntityFilter>,
    value_scale: Option<ValueScale>,
    entities: Vec<EntityRecord>,
    sessions: Vec<SessionRecord>,
    generation: u64,
    result: Option<(u64, FlowLayout)>,
}

impl fmt::Debug for EntityFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityFlow")
            .field("config", &self.config)
            .field("entity_filter", &self.entity_filter.is_some())
            .field("value_scale", &self.value_scale.is_some())
            .field("entities", &self.entities.len())
            .field("sessions", &self.sessions.len())
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl Default for EntityFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityFlow {
    pub fn new() -> Self {
        Self::with_config(LayoutConfig::default())
    }

    pub fn with_config(config: LayoutConfig) -> Self {
        Self {
            config,
            entity_filter: None,
            value_scale: None,
            entities: Vec::new(),
            sessions: Vec::new(),
            generation: 0,
            result: None,
        }
    }

    /// Engine configured from a loaded [`Config`], including its declarative
    /// filter and value scale.
    pub fn from_config(config: &Config) -> Self {
        let mut flow = Self::with_config(config.layout.clone());
        flow.entity_filter = config.filter.as_ref().map(|f| f.build());
        flow.value_scale = config.value_scale.as_ref().map(|s| s.build());
        flow
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn size(&self) -> [f32; 2] {
        self.config.size()
    }

    pub fn set_size(&mut self, [width, height]: [f32; 2]) -> &mut Self {
        self.config.width = width;
        self.config.height = height;
        self
    }

    pub fn session_width(&self) -> f32 {
        self.config.session_width
    }

    pub fn set_session_width(&mut self, width: f32) -> &mut Self {
        self.config.session_width = width;
        self
    }

    pub fn session_padding(&self) -> f32 {
        self.config.session_padding
    }

    pub fn set_session_padding(&mut self, padding: f32) -> &mut Self {
        self.config.session_padding = padding;
        self
    }

    pub fn entity_padding(&self) -> f32 {
        self.config.entity_padding
    }

    pub fn set_entity_padding(&mut self, padding: f32) -> &mut Self {
        self.config.entity_padding = padding;
        self
    }

    pub fn crossing_rounds(&self) -> usize {
        self.config.crossing_rounds
    }

    pub fn set_crossing_rounds(&mut self, rounds: usize) -> &mut Self {
        self.config.crossing_rounds = rounds;
        self
    }

    pub fn entity_filter(&self) -> Option<&EntityFilter> {
        self.entity_filter.as_ref()
    }

    /// Keeps only entities for which `filter` returns true.
    pub fn set_entity_filter<F>(&mut self, filter: F) -> &mut Self
    where
        F: Fn(&EntityProfile<'_>) -> bool + 'static,
    {
        self.entity_filter = Some(Box::new(filter));
        self
    }

    /// Disables entity filtering.
    pub fn clear_entity_filter(&mut self) -> &mut Self {
        self.entity_filter = None;
        self
    }

    pub fn value_scale(&self) -> Option<&ValueScale> {
        self.value_scale.as_ref()
    }

    pub fn set_value_scale(&mut self, scale: Option<ValueScale>) -> &mut Self {
        self.value_scale = scale;
        self
    }

    pub fn entities(&self) -> &[EntityRecord] {
        &self.entities
    }

    pub fn set_entities(&mut self, entities: Vec<EntityRecord>) -> &mut Self {
        self.entities = entities;
        self.generation += 1;
        self
    }

    /// Mutable access to the entity records; invalidates any computed layout.
    pub fn entities_mut(&mut self) -> &mut Vec<EntityRecord> {
        self.generation += 1;
        &mut self.entities
    }

    pub fn sessions(&self) -> &[SessionRecord] {
        &self.sessions
    }

    pub fn set_sessions(&mut self, sessions: Vec<SessionRecord>) -> &mut Self {
        self.sessions = sessions;
        self.generation += 1;
        self
    }

    /// Mutable access to the session records; invalidates any computed layout.
    pub fn sessions_mut(&mut self) -> &mut Vec<SessionRecord> {
        self.generation += 1;
        &mut self.sessions
    }

    pub fn set_input(&mut self, input: FlowInput) -> &mut Self {
        self.entities = input.entities;
        self.sessions = input.sessions;
        self.generation += 1;
        self
    }

    /// Runs every layout stage. `iterations` drives both depth relaxation and
    /// the crossing/wiggle rounds; zero skips them but still produces a layout.
    pub fn layout(&mut self, iterations: usize) -> Result<&FlowLayout> {
        self.config.validate()?;
        let config = &self.config;

        let mut graph = build_graph(&self.entities, &self.sessions)?;
        if let Some(filter) = &self.entity_filter {
            filter_entities(&mut graph, filter);
        }
        if let Some(scale) = &self.value_scale {
            scale_values(&mut graph, scale);
        }

        assign_breadths(&mut graph, config)?;
        let value_scale = assign_depths(&mut graph, config, iterations)?;
        for _ in 0..iterations {
            minimize_crossings(&mut graph, config);
            minimize_wiggle(&mut graph, config);
        }
        let detours = route_detours(&mut graph, config, value_scale);
        sort_by_median_depth(&mut graph);

        tracing::debug!(
            iterations,
            entities = graph.entity_order.len(),
            detours,
            "layout complete"
        );
        let layout = FlowLayout {
            graph,
            config: config.clone(),
            value_scale,
        };
        let (_, layout) = self.result.insert((self.generation, layout));
        Ok(layout)
    }

    /// The most recent layout, provided the inputs have not changed since.
    pub fn current(&self) -> Result<&FlowLayout> {
        match &self.result {
            None => Err(LayoutError::NotLaidOut),
            Some((generation, _)) if *generation != self.generation => Err(LayoutError::StaleLayout),
            Some((_, layout)) => Ok(layout),
        }
    }
}

/// Draw order: ascending median `y` of each entity's real nodes.
fn sort_by_median_depth(graph: &mut FlowGraph) {
    let mut keyed: Vec<(f32, EntityId)> = graph
        .entity_order
        .iter()
        .map(|&e| {
            let depth = median(
                graph
                    .entity(e)
                    .nodes
                    .iter()
                    .map(|&n| graph.node(n))
                    .filter(|n| !n.is_detour())
                    .map(|n| n.y),
            )
            .unwrap_or(f32::INFINITY);
            (depth, e)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    graph.entity_order = keyed.into_iter().map(|(_, e)| e).collect();
}

/// Finished geometry for one layout pass.
#[derive(Debug, Clone)]
pub struct FlowLayout {
    graph: FlowGraph,
    config: LayoutConfig,
    value_scale: f32,
}

impl FlowLayout {
    pub fn graph(&self) -> &FlowGraph {
        &self.graph
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Pixels per unit of scaled value chosen by the depth stage.
    pub fn value_scale(&self) -> f32 {
        self.value_scale
    }

    pub fn width(&self) -> f32 {
        self.config.width
    }

    pub fn height(&self) -> f32 {
        self.config.height
    }

    /// Live entities in draw order.
    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.graph
            .entity_order
            .iter()
            .map(|&id| (id, self.graph.entity(id)))
    }

    pub fn sessions(&self) -> impl Iterator<Item = (SessionId, &Session)> {
        self.graph
            .sessions
            .iter()
            .enumerate()
            .map(|(idx, s)| (SessionId(idx), s))
    }

    pub fn entity_id(&self, name: &str) -> Option<EntityId> {
        self.graph
            .entity_order
            .iter()
            .copied()
            .find(|&id| self.graph.entity(id).name == name)
    }

    fn check(&self, entity: EntityId) -> Result<()> {
        if self.graph.contains_entity(entity) {
            Ok(())
        } else {
            Err(LayoutError::UnknownEntity { id: entity })
        }
    }

    pub fn entity_path(&self, entity: EntityId) -> Result<String> {
        self.check(entity)?;
        Ok(entity_path(&self.graph, entity, self.config.session_width))
    }

    pub fn head(&self, entity: EntityId) -> Result<Option<NodeRect>> {
        self.check(entity)?;
        Ok(head(&self.graph, entity))
    }

    pub fn visible_nodes(&self, entity: EntityId) -> Result<Vec<NodeRect>> {
        self.check(entity)?;
        Ok(visible_nodes(&self.graph, entity))
    }

    pub fn detour_count(&self, entity: EntityId) -> Result<usize> {
        self.check(entity)?;
        Ok(self
            .graph
            .entity(entity)
            .nodes
            .iter()
            .filter(|&&n| self.graph.node(n).is_detour())
            .count())
    }
}
