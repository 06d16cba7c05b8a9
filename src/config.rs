use crate::error::LayoutError;
use crate::layout::{EntityFilter, EntityProfile, ValueScale, linear_scale, log_scale, sqrt_scale};
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    pub width: f32,
    pub height: f32,
    pub session_width: f32,
    pub session_padding: f32,
    pub entity_padding: f32,
    pub crossing_rounds: usize,
    /// Round count the CLI passes to `EntityFlow::layout` when `-n` is absent.
    /// The engine itself takes its round count as the `layout` argument and
    /// never reads this field.
    pub iterations: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 1.0,
            session_width: 140.0,
            session_padding: 80.0,
            entity_padding: 10.0,
            crossing_rounds: 4,
            iterations: 32,
        }
    }
}

impl LayoutConfig {
    pub fn size(&self) -> [f32; 2] {
        [self.width, self.height]
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(LayoutError::InvalidConfig(format!(
                "size must be positive, got [{}, {}]",
                self.width, self.height
            )));
        }
        if !(self.session_width >= 0.0 && self.session_width < self.width) {
            return Err(LayoutError::InvalidConfig(format!(
                "session width {} must be non-negative and narrower than the layout width {}",
                self.session_width, self.width
            )));
        }
        if self.session_padding < 0.0 || self.entity_padding < 0.0 {
            return Err(LayoutError::InvalidConfig(
                "paddings must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleKind {
    Linear,
    Sqrt,
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValueScaleConfig {
    pub kind: ScaleKind,
    pub range: [f32; 2],
}

impl Default for ValueScaleConfig {
    fn default() -> Self {
        Self {
            kind: ScaleKind::Linear,
            range: [1.0, 10.0],
        }
    }
}

impl ValueScaleConfig {
    pub fn build(&self) -> ValueScale {
        match self.kind {
            ScaleKind::Linear => linear_scale(self.range),
            ScaleKind::Sqrt => sqrt_scale(self.range),
            ScaleKind::Log => log_scale(self.range),
        }
    }
}

/// Declarative entity filter. An entity must pass every populated rule to be kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterConfig {
    pub exclude: Vec<String>,
    pub min_total_value: Option<f32>,
    pub min_sessions: Option<usize>,
}

impl FilterConfig {
    pub fn build(&self) -> EntityFilter {
        let exclude: HashSet<String> = self.exclude.iter().cloned().collect();
        let min_total = self.min_total_value;
        let min_sessions = self.min_sessions;
        Box::new(move |entity: &EntityProfile<'_>| {
            if exclude.contains(entity.name) {
                return false;
            }
            if let Some(min) = min_total {
                if entity.values.iter().sum::<f32>() < min {
                    return false;
                }
            }
            if let Some(min) = min_sessions {
                if entity.values.len() < min {
                    return false;
                }
            }
            true
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderConfig {
    pub background: String,
    pub band_opacity: f32,
    pub show_sessions: bool,
    pub show_labels: bool,
    /// Margin added around the layout in the rendered document.
    pub margin: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            background: "#FFFFFF".to_string(),
            band_opacity: 0.85,
            show_sessions: true,
            show_labels: true,
            margin: 20.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub filter: Option<FilterConfig>,
    pub value_scale: Option<ValueScaleConfig>,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::default_palette();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            layout: LayoutConfig {
                width: 1200.0,
                height: 800.0,
                ..Default::default()
            },
            filter: None,
            value_scale: None,
            render,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    palette: Option<Vec<String>>,
    font_family: Option<String>,
    font_size: Option<f32>,
    layout: Option<LayoutConfig>,
    filter: Option<FilterConfig>,
    value_scale: Option<ValueScaleConfig>,
    render: Option<RenderConfig>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = match serde_json::from_str(contents) {
        Ok(parsed) => parsed,
        Err(json_err) => json5::from_str(contents)
            .map_err(|_| anyhow::anyhow!("invalid config file: {json_err}"))?,
    };

    if let Some(theme_name) = parsed.theme.as_deref() {
        match theme_name {
            "muted" => config.theme = Theme::muted(),
            "default" | "base" => config.theme = Theme::default_palette(),
            other => tracing::warn!(theme = other, "unknown theme name, keeping default"),
        }
        config.render.background = config.theme.background.clone();
    }
    if let Some(palette) = parsed.palette {
        if palette.is_empty() {
            tracing::warn!("empty palette in config, keeping theme palette");
        } else {
            config.theme.palette = palette;
        }
    }
    if let Some(v) = parsed.font_family {
        config.theme.font_family = v;
    }
    if let Some(v) = parsed.font_size {
        config.theme.font_size = v;
    }
    if let Some(layout) = parsed.layout {
        config.layout = layout;
    }
    if let Some(render) = parsed.render {
        config.render = render;
    }
    config.filter = parsed.filter;
    config.value_scale = parsed.value_scale;
    Ok(config)
}
