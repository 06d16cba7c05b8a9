#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod render;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use error::{LayoutError, Result};
pub use ir::{EntityRecord, FlowInput, SessionEntry, SessionRecord, parse_flow};
pub use layout::{EntityFlow, EntityId, FlowLayout, NodeRect, SessionId};
