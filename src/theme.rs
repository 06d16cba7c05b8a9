use serde::{Deserialize, Serialize};

const DEFAULT_PALETTE: [&str; 10] = [
    "#4e79a7", "#f28e2c", "#e15759", "#76b7b2", "#59a14f", "#edc949", "#af7aa1", "#ff9da7",
    "#9c755f", "#bab0ab",
];

const MUTED_PALETTE: [&str; 8] = [
    "#8da0cb", "#fc8d62", "#66c2a5", "#e78ac3", "#a6d854", "#ffd92f", "#e5c494", "#b3b3b3",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub text_color: String,
    pub background: String,
    pub session_fill: String,
    pub session_border: String,
    pub palette: Vec<String>,
}

impl Theme {
    pub fn default_palette() -> Self {
        Self {
            font_family: "\"trebuchet ms\", verdana, arial, sans-serif".to_string(),
            font_size: 12.0,
            text_color: "#333333".to_string(),
            background: "#FFFFFF".to_string(),
            session_fill: "#F4F4F8".to_string(),
            session_border: "#C7D2E5".to_string(),
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn muted() -> Self {
        Self {
            font_family: "Inter, ui-sans-serif, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 12.0,
            text_color: "#1C2430".to_string(),
            background: "#FAFAFA".to_string(),
            session_fill: "#EEF1F5".to_string(),
            session_border: "#D5DBE3".to_string(),
            palette: MUTED_PALETTE.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Color for the `idx`-th entity in draw order, cycling through the palette.
    pub fn entity_color(&self, idx: usize) -> &str {
        if self.palette.is_empty() {
            return "#4e79a7";
        }
        &self.palette[idx % self.palette.len()]
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::default_palette()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_colors_cycle() {
        let theme = Theme::muted();
        let n = theme.palette.len();
        assert_eq!(theme.entity_color(0), theme.entity_color(n));
        assert_ne!(theme.entity_color(0), theme.entity_color(1));
    }

    #[test]
    fn empty_palette_falls_back() {
        let theme = Theme {
            palette: Vec::new(),
            ..Theme::default()
        };
        assert_eq!(theme.entity_color(3), "#4e79a7");
    }
}
