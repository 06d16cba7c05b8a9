use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub name: String,
}

impl EntityRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One `(entity index, value)` pair inside a session record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub index: usize,
    pub value: f32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub entities: Vec<SessionEntry>,
}

impl SessionRecord {
    pub fn new(entries: impl IntoIterator<Item = (usize, f32)>) -> Self {
        Self {
            name: None,
            entities: entries
                .into_iter()
                .map(|(index, value)| SessionEntry { index, value })
                .collect(),
        }
    }

    pub fn named(name: impl Into<String>, entries: impl IntoIterator<Item = (usize, f32)>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(entries)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FlowInput {
    #[serde(default)]
    pub entities: Vec<EntityRecord>,
    #[serde(default)]
    pub sessions: Vec<SessionRecord>,
}

impl FlowInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entity and returns the index sessions use to reference it.
    pub fn add_entity(&mut self, name: impl Into<String>) -> usize {
        self.entities.push(EntityRecord::new(name));
        self.entities.len() - 1
    }

    pub fn add_session(&mut self, entries: impl IntoIterator<Item = (usize, f32)>) -> usize {
        self.sessions.push(SessionRecord::new(entries));
        self.sessions.len() - 1
    }
}

/// Parses a flow from JSON. JSON5 (comments, trailing commas) is accepted as a fallback.
pub fn parse_flow(input: &str) -> anyhow::Result<FlowInput> {
    match serde_json::from_str::<FlowInput>(input) {
        Ok(flow) => Ok(flow),
        Err(json_err) => json5::from_str::<FlowInput>(input)
            .map_err(|_| anyhow::anyhow!("invalid flow input: {json_err}")),
    }
}
