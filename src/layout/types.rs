use serde::Serialize;

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub(crate) usize);

        impl $name {
            pub fn index(self) -> usize {
                self.0
            }
        }
    };
}

arena_id!(
    /// Index of a session in [`FlowGraph::sessions`].
    SessionId
);
arena_id!(
    /// Index of an entity in [`FlowGraph::entities`]; equals the entity's input index.
    EntityId
);
arena_id!(NodeId);
arena_id!(LinkId);

/// Anything occupying a vertical interval: sessions, nodes, detour obstacles.
pub trait Band {
    fn top(&self) -> f32;
    fn height(&self) -> f32;

    fn bottom(&self) -> f32 {
        self.top() + self.height()
    }

    fn center(&self) -> f32 {
        self.top() + self.height() / 2.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    pub name: Option<String>,
    pub nodes: Vec<NodeId>,
    pub value: f32,
    pub source_links: Vec<LinkId>,
    pub target_links: Vec<LinkId>,
    pub layer: usize,
    pub x: f32,
    pub dx: f32,
    pub y: f32,
    pub dy: f32,
}

impl Band for Session {
    fn top(&self) -> f32 {
        self.y
    }

    fn height(&self) -> f32 {
        self.dy
    }
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub name: String,
    /// Visitation order; after detour routing also holds detour nodes.
    pub nodes: Vec<NodeId>,
}

/// Geometry a detour node carries itself, since it belongs to no session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetourGeometry {
    pub layer: usize,
    pub x: f32,
    pub dx: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    Real(SessionId),
    Detour(DetourGeometry),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub entity: EntityId,
    pub kind: NodeKind,
    pub value: f32,
    pub scaled_value: f32,
    pub y: f32,
    pub dy: f32,
}

impl Node {
    pub fn session(&self) -> Option<SessionId> {
        match self.kind {
            NodeKind::Real(session) => Some(session),
            NodeKind::Detour(_) => None,
        }
    }

    pub fn is_detour(&self) -> bool {
        matches!(self.kind, NodeKind::Detour(_))
    }
}

impl Band for Node {
    fn top(&self) -> f32 {
        self.y
    }

    fn height(&self) -> f32 {
        self.dy
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Link {
    pub source: SessionId,
    pub target: SessionId,
    pub entity: EntityId,
    pub source_node: NodeId,
    pub target_node: NodeId,
}

/// Arena holding the whole session/entity/node graph. Stages mutate it in place
/// and refer to its members by id only.
#[derive(Debug, Clone, Default)]
pub struct FlowGraph {
    pub sessions: Vec<Session>,
    pub entities: Vec<Entity>,
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
    /// Live entities, in draw order once layout finishes.
    pub entity_order: Vec<EntityId>,
}

impl FlowGraph {
    pub fn session(&self, id: SessionId) -> &Session {
        &self.sessions[id.0]
    }

    pub fn session_mut(&mut self, id: SessionId) -> &mut Session {
        &mut self.sessions[id.0]
    }

    pub fn entity(&self, id: EntityId) -> &Entity {
        &self.entities[id.0]
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn link(&self, id: LinkId) -> &Link {
        &self.links[id.0]
    }

    pub fn session_ids(&self) -> impl Iterator<Item = SessionId> + use<> {
        (0..self.sessions.len()).map(SessionId)
    }

    pub fn contains_entity(&self, id: EntityId) -> bool {
        self.entity_order.contains(&id)
    }

    /// Horizontal position of a node; detour nodes carry their own.
    pub fn node_x(&self, id: NodeId) -> f32 {
        match self.node(id).kind {
            NodeKind::Real(session) => self.session(session).x,
            NodeKind::Detour(geom) => geom.x,
        }
    }

    pub fn node_dx(&self, id: NodeId) -> f32 {
        match self.node(id).kind {
            NodeKind::Real(session) => self.session(session).dx,
            NodeKind::Detour(geom) => geom.dx,
        }
    }

    pub fn node_layer(&self, id: NodeId) -> usize {
        match self.node(id).kind {
            NodeKind::Real(session) => self.session(session).layer,
            NodeKind::Detour(geom) => geom.layer,
        }
    }

    pub fn node_center(&self, id: NodeId) -> f32 {
        self.node(id).center()
    }

    /// Sessions grouped by layer, layers ascending, sessions in input order.
    pub fn layers(&self) -> Vec<Vec<SessionId>> {
        let layer_count = self
            .sessions
            .iter()
            .map(|session| session.layer + 1)
            .max()
            .unwrap_or(0);
        let mut layers: Vec<Vec<SessionId>> = vec![Vec::new(); layer_count];
        for id in self.session_ids() {
            layers[self.session(id).layer].push(id);
        }
        layers.retain(|layer| !layer.is_empty());
        layers
    }

    /// Stacks a session's nodes top to bottom starting at the session's `y`.
    pub fn reposition_session(&mut self, id: SessionId, entity_padding: f32) {
        let session = &self.sessions[id.0];
        let mut y = session.y;
        for &node_id in &session.nodes {
            let node = &mut self.nodes[node_id.0];
            node.y = y;
            y += node.dy + entity_padding;
        }
    }

    pub fn reposition_nodes(&mut self, entity_padding: f32) {
        for id in 0..self.sessions.len() {
            self.reposition_session(SessionId(id), entity_padding);
        }
    }

    pub fn sort_by_y(&self, sessions: &mut [SessionId]) {
        sessions.sort_by(|a, b| self.session(*a).y.total_cmp(&self.session(*b).y));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(layer: usize, y: f32) -> Session {
        Session {
            layer,
            y,
            dy: 10.0,
            ..Default::default()
        }
    }

    #[test]
    fn layers_skip_empty_indices() {
        let graph = FlowGraph {
            sessions: vec![session(0, 0.0), session(3, 0.0), session(0, 50.0)],
            ..Default::default()
        };
        let layers = graph.layers();
        assert_eq!(layers, vec![vec![SessionId(0), SessionId(2)], vec![SessionId(1)]]);
    }

    #[test]
    fn band_center_and_bottom() {
        let s = session(0, 20.0);
        assert_eq!(s.center(), 25.0);
        assert_eq!(s.bottom(), 30.0);
    }

    #[test]
    fn reposition_stacks_nodes_with_padding() {
        let mut graph = FlowGraph {
            sessions: vec![Session {
                y: 100.0,
                nodes: vec![NodeId(0), NodeId(1)],
                ..Default::default()
            }],
            nodes: vec![
                Node {
                    entity: EntityId(0),
                    kind: NodeKind::Real(SessionId(0)),
                    value: 1.0,
                    scaled_value: 1.0,
                    y: 0.0,
                    dy: 30.0,
                },
                Node {
                    entity: EntityId(1),
                    kind: NodeKind::Real(SessionId(0)),
                    value: 1.0,
                    scaled_value: 1.0,
                    y: 0.0,
                    dy: 20.0,
                },
            ],
            ..Default::default()
        };
        graph.reposition_nodes(5.0);
        assert_eq!(graph.node(NodeId(0)).y, 100.0);
        assert_eq!(graph.node(NodeId(1)).y, 135.0);
    }
}
