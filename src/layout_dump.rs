use crate::layout::{FlowLayout, NodeRect};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub width: f32,
    pub height: f32,
    pub value_scale: f32,
    pub sessions: Vec<SessionDump>,
    pub entities: Vec<EntityDump>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDump {
    pub index: usize,
    pub name: Option<String>,
    pub layer: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub value: f32,
    pub entities: Vec<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDump {
    pub index: usize,
    pub name: String,
    pub path: String,
    pub head: Option<NodeRect>,
    pub nodes: Vec<NodeRect>,
    pub detours: usize,
}

impl LayoutDump {
    pub fn from_layout(layout: &FlowLayout) -> anyhow::Result<Self> {
        let graph = layout.graph();
        let sessions = layout
            .sessions()
            .map(|(id, session)| SessionDump {
                index: id.index(),
                name: session.name.clone(),
                layer: session.layer,
                x: session.x,
                y: session.y,
                width: session.dx,
                height: session.dy,
                value: session.value,
                entities: session
                    .nodes
                    .iter()
                    .map(|&n| graph.node(n).entity.index())
                    .collect(),
            })
            .collect();

        let mut entities = Vec::new();
        for (id, entity) in layout.entities() {
            entities.push(EntityDump {
                index: id.index(),
                name: entity.name.clone(),
                path: layout.entity_path(id)?,
                head: layout.head(id)?,
                nodes: layout.visible_nodes(id)?,
                detours: layout.detour_count(id)?,
            });
        }

        Ok(LayoutDump {
            width: layout.width(),
            height: layout.height(),
            value_scale: layout.value_scale(),
            sessions,
            entities,
        })
    }
}

/// Writes the dump as pretty JSON to `path`, or to stdout when no path is given.
pub fn write_layout_dump(path: Option<&Path>, layout: &FlowLayout) -> anyhow::Result<()> {
    let dump = LayoutDump::from_layout(layout)?;
    match path {
        Some(path) => {
            let file = File::create(path)?;
            let writer = BufWriter::new(file);
            serde_json::to_writer_pretty(writer, &dump)?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &dump)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}
