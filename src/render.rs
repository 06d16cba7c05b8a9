use crate::config::RenderConfig;
use crate::layout::{Band, FlowLayout};
use crate::theme::Theme;
use anyhow::Result;
use std::path::Path;

/// Renders a finished layout as a standalone SVG document: session columns
/// underneath, one closed band per entity in draw order, labels at each head.
pub fn render_svg(layout: &FlowLayout, theme: &Theme, config: &RenderConfig) -> String {
    let margin = config.margin.max(0.0);
    let width = layout.width() + margin * 2.0;
    let height = layout.height() + margin * 2.0;
    let mut svg = String::new();

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        config.background
    ));
    svg.push_str(&format!("<g transform=\"translate({margin},{margin})\">"));

    if config.show_sessions {
        svg.push_str("<g class=\"sessions\">");
        for (_, session) in layout.sessions() {
            if session.nodes.is_empty() {
                continue;
            }
            svg.push_str(&format!(
                "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"4\" ry=\"4\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1\"/>",
                session.x,
                session.top(),
                session.dx,
                session.height(),
                theme.session_fill,
                theme.session_border
            ));
        }
        svg.push_str("</g>");
    }

    svg.push_str("<g class=\"entities\">");
    for (idx, (id, entity)) in layout.entities().enumerate() {
        let Ok(d) = layout.entity_path(id) else {
            continue;
        };
        if d.is_empty() {
            continue;
        }
        svg.push_str(&format!(
            "<path d=\"{}\" fill=\"{}\" fill-opacity=\"{}\" stroke=\"none\"><title>{}</title></path>",
            d,
            theme.entity_color(idx),
            config.band_opacity,
            escape_xml(&entity.name)
        ));
    }
    svg.push_str("</g>");

    if config.show_labels {
        svg.push_str("<g class=\"labels\">");
        for (id, entity) in layout.entities() {
            let Ok(Some(head)) = layout.head(id) else {
                continue;
            };
            let x = head.x - 4.0;
            let y = head.y + head.dy / 2.0;
            svg.push_str(&format!(
                "<text x=\"{x:.2}\" y=\"{y:.2}\" text-anchor=\"end\" dominant-baseline=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
                escape_xml(&theme.font_family),
                theme.font_size,
                theme.text_color,
                escape_xml(&entity.name)
            ));
        }
        svg.push_str("</g>");
    }

    svg.push_str("</g></svg>");
    svg
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, theme: &Theme) -> Result<()> {
    let mut opt = usvg::Options::default();
    if let Some(family) = theme.font_family.split(',').next() {
        opt.font_family = family.trim().trim_matches('"').to_string();
    }

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(not(feature = "png"))]
pub fn write_output_png(_svg: &str, _output: &Path, _theme: &Theme) -> Result<()> {
    Err(anyhow::anyhow!(
        "PNG output requires building with the `png` feature"
    ))
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{EntityRecord, SessionRecord};
    use crate::layout::EntityFlow;

    fn sample() -> EntityFlow {
        let mut flow = EntityFlow::new();
        flow.set_size([600.0, 300.0]).set_session_width(60.0);
        flow.set_entities(vec![
            EntityRecord::new("Alice & Bob"),
            EntityRecord::new("Carol"),
        ])
        .set_sessions(vec![
            SessionRecord::new([(0, 3.0), (1, 2.0)]),
            SessionRecord::new([(0, 3.0), (1, 2.0)]),
        ]);
        flow
    }

    #[test]
    fn render_svg_basic() {
        let mut flow = sample();
        let layout = flow.layout(4).unwrap();
        let svg = render_svg(layout, &Theme::default(), &RenderConfig::default());
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert_eq!(svg.matches("<path ").count(), 2);
        assert!(svg.contains("Alice &amp; Bob"));
        assert!(svg.contains("Carol"));
    }

    #[test]
    fn render_flags_hide_sessions_and_labels() {
        let mut flow = sample();
        let layout = flow.layout(1).unwrap();
        let config = RenderConfig {
            show_sessions: false,
            show_labels: false,
            ..Default::default()
        };
        let svg = render_svg(layout, &Theme::default(), &config);
        assert!(!svg.contains("class=\"sessions\""));
        assert!(!svg.contains("<text"));
        assert_eq!(svg.matches("<path ").count(), 2);
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_xml("<a href='x'>"), "&lt;a href=&apos;x&apos;&gt;");
    }
}
