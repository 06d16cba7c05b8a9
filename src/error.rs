use crate::layout::EntityId;

/// Everything that can stop a layout pass before it produces geometry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayoutError {
    #[error("session {session} references entity index {index}, but only {len} entities exist")]
    EntityIndexOutOfRange {
        session: usize,
        index: usize,
        len: usize,
    },
    #[error("session {session} lists entity index {index} more than once")]
    DuplicateEntity { session: usize, index: usize },
    #[error("flow has no sessions")]
    EmptyFlow,
    #[error("all sessions fall into a single layer; breadths cannot be scaled")]
    SingleLayer,
    #[error("layer {layer} needs {required}px of session padding but the layout is only {height}px tall")]
    HeightTooSmall { layer: usize, required: f32, height: f32 },
    #[error("breadth propagation did not settle after {rounds} rounds; session order contains a cycle")]
    Cycle { rounds: usize },
    #[error("entities or sessions changed since the last layout pass")]
    StaleLayout,
    #[error("layout has not been computed yet")]
    NotLaidOut,
    #[error("unknown entity id {}", .id.index())]
    UnknownEntity { id: EntityId },
    #[error("invalid layout configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, LayoutError>;
