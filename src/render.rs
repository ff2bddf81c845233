use crate::config::{Config, LayoutConfig, RenderConfig};
use crate::connection::{ConnectionTypeStyle, Routing};
use crate::convert::{PositionedEdge, PositionedNode};
use crate::ir::Direction;
use crate::session::CanvasView;
use crate::text_metrics::TextMeasurer;
use crate::theme::Theme;
use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;

const LABEL_INSET: f32 = 10.0;

/// Static SVG preview of one canvas frame.
pub fn render_svg(view: &CanvasView, config: &Config, measurer: &mut TextMeasurer) -> String {
    let theme = &config.theme;
    let layout = &config.layout;
    let padding = config.render.padding;

    let (width, height) = canvas_extent(&view.graph.nodes, layout, padding);
    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.0}\" height=\"{height:.0}\" viewBox=\"0 0 {width:.2} {height:.2}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));

    svg.push_str("<defs>");
    svg.push_str(
        "<style>.animated{stroke-dashoffset:0;animation:flow 0.6s linear infinite}@keyframes flow{to{stroke-dashoffset:-10}}</style>",
    );
    for (token, style) in &view.styles {
        svg.push_str(&format!(
            "<marker id=\"{}\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"6\" markerHeight=\"6\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{}\"/></marker>",
            marker_id(token),
            style.color
        ));
    }
    svg.push_str("</defs>");

    let boxes: HashMap<&str, &PositionedNode> = view
        .graph
        .nodes
        .iter()
        .map(|node| (node.id.as_str(), node))
        .collect();

    for edge in &view.graph.edges {
        let (Some(source), Some(target)) = (
            boxes.get(edge.source.as_str()),
            boxes.get(edge.target.as_str()),
        ) else {
            continue;
        };
        let token = edge.connection_type.as_str();
        let Some(style) = view.styles.get(token) else {
            continue;
        };
        let selected = view.selection.edge.as_deref() == Some(edge.id.as_str());
        svg.push_str(&edge_svg(edge, source, target, style, view.direction, layout, selected));
    }

    if let Some(pending) = &view.pending
        && let (Some(source), Some(target)) = (
            boxes.get(pending.source.as_str()),
            boxes.get(pending.target.as_str()),
        )
    {
        let (from, to) = attach_points(source, target, view.direction, layout);
        svg.push_str(&format!(
            "<path d=\"M {:.2} {:.2} L {:.2} {:.2}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1.4\" stroke-dasharray=\"4,4\"/>",
            from.0, from.1, to.0, to.1, theme.selection_color
        ));
    }

    for node in &view.graph.nodes {
        let selected = view.selection.node.as_deref() == Some(node.id.as_str());
        svg.push_str(&node_svg(node, theme, layout, selected, measurer));
    }

    svg.push_str("</svg>");
    svg
}

fn canvas_extent(nodes: &[PositionedNode], layout: &LayoutConfig, padding: f32) -> (f32, f32) {
    let right = nodes
        .iter()
        .map(|node| node.position.x + layout.node_width)
        .fold(0.0f32, f32::max);
    let bottom = nodes
        .iter()
        .map(|node| node.position.y + layout.node_height)
        .fold(0.0f32, f32::max);
    ((right + padding).max(200.0), (bottom + padding).max(200.0))
}

fn node_svg(
    node: &PositionedNode,
    theme: &Theme,
    layout: &LayoutConfig,
    selected: bool,
    measurer: &mut TextMeasurer,
) -> String {
    let (x, y) = (node.position.x, node.position.y);
    let (stroke, stroke_width) = if selected {
        (theme.selection_color.as_str(), 2.4)
    } else {
        (theme.node_border.as_str(), 1.2)
    };

    let mut svg = format!("<g data-id=\"{}\">", escape_xml(&node.id));
    if let Some(description) = &node.description {
        svg.push_str(&format!("<title>{}</title>", escape_xml(description)));
    }
    svg.push_str(&format!(
        "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"8\" ry=\"8\" fill=\"{}\" stroke=\"{stroke}\" stroke-width=\"{stroke_width}\"/>",
        layout.node_width, layout.node_height, theme.node_fill
    ));

    let badge = node.member_count.map(|count| count.to_string());
    let badge_width = badge
        .as_deref()
        .map(|text| measurer.width(text, theme.font_size * 0.85, &theme.font_family) + LABEL_INSET)
        .unwrap_or(0.0);
    let label_room = layout.node_width - 2.0 * LABEL_INSET - badge_width;
    let label = measurer.ellipsize(&node.label, label_room, theme.font_size, &theme.font_family);
    let baseline = y + layout.node_height / 2.0 + theme.font_size * 0.35;
    svg.push_str(&format!(
        "<text x=\"{:.2}\" y=\"{baseline:.2}\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
        x + LABEL_INSET,
        theme.font_family,
        theme.font_size,
        theme.node_text,
        escape_xml(&label)
    ));
    if let Some(badge) = badge {
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{baseline:.2}\" text-anchor=\"end\" font-family=\"{}\" font-size=\"{:.1}\" fill=\"{}\">{badge}</text>",
            x + layout.node_width - LABEL_INSET,
            theme.font_family,
            theme.font_size * 0.85,
            theme.secondary_text
        ));
    }
    svg.push_str("</g>");
    svg
}

fn edge_svg(
    edge: &PositionedEdge,
    source: &PositionedNode,
    target: &PositionedNode,
    style: &ConnectionTypeStyle,
    direction: Direction,
    layout: &LayoutConfig,
    selected: bool,
) -> String {
    let (from, to) = attach_points(source, target, direction, layout);
    let d = match style.routing {
        Routing::Straight => format!("M {:.2} {:.2} L {:.2} {:.2}", from.0, from.1, to.0, to.1),
        Routing::Bezier => bezier_path(from, to, direction),
        Routing::Step | Routing::Smoothstep => step_path(from, to, direction),
    };
    let dash = style
        .dash
        .as_deref()
        .map(|dash| format!(" stroke-dasharray=\"{dash}\""))
        .unwrap_or_default();
    let class = if style.animated { " class=\"animated\"" } else { "" };
    let stroke_width = if selected { 2.6 } else { 1.4 };
    format!(
        "<path data-id=\"{}\" d=\"{d}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{stroke_width}\"{dash}{class} marker-end=\"url(#{})\"/>",
        escape_xml(&edge.id),
        style.color,
        marker_id(edge.connection_type.as_str())
    )
}

/// Source leaves from its downstream side, target is entered from its upstream side.
fn attach_points(
    source: &PositionedNode,
    target: &PositionedNode,
    direction: Direction,
    layout: &LayoutConfig,
) -> ((f32, f32), (f32, f32)) {
    let (w, h) = (layout.node_width, layout.node_height);
    match direction {
        Direction::TopBottom => (
            (source.position.x + w / 2.0, source.position.y + h),
            (target.position.x + w / 2.0, target.position.y),
        ),
        Direction::LeftRight => (
            (source.position.x + w, source.position.y + h / 2.0),
            (target.position.x, target.position.y + h / 2.0),
        ),
    }
}

fn step_path(from: (f32, f32), to: (f32, f32), direction: Direction) -> String {
    match direction {
        Direction::TopBottom => {
            let mid = (from.1 + to.1) / 2.0;
            format!(
                "M {:.2} {:.2} L {:.2} {mid:.2} L {:.2} {mid:.2} L {:.2} {:.2}",
                from.0, from.1, from.0, to.0, to.0, to.1
            )
        }
        Direction::LeftRight => {
            let mid = (from.0 + to.0) / 2.0;
            format!(
                "M {:.2} {:.2} L {mid:.2} {:.2} L {mid:.2} {:.2} L {:.2} {:.2}",
                from.0, from.1, from.1, to.1, to.0, to.1
            )
        }
    }
}

fn bezier_path(from: (f32, f32), to: (f32, f32), direction: Direction) -> String {
    let (c1, c2) = match direction {
        Direction::TopBottom => {
            let mid = (from.1 + to.1) / 2.0;
            ((from.0, mid), (to.0, mid))
        }
        Direction::LeftRight => {
            let mid = (from.0 + to.0) / 2.0;
            ((mid, from.1), (mid, to.1))
        }
    };
    format!(
        "M {:.2} {:.2} C {:.2} {:.2}, {:.2} {:.2}, {:.2} {:.2}",
        from.0, from.1, c1.0, c1.1, c2.0, c2.1, to.0, to.1
    )
}

fn marker_id(token: &str) -> String {
    let slug: String = token
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' { ch } else { '_' })
        .collect();
    format!("arrow-{slug}")
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
pub fn write_output_png(
    svg: &str,
    output: &Path,
    render_cfg: &RenderConfig,
    theme: &Theme,
) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = theme
        .font_family
        .split(',')
        .next()
        .map(|family| family.trim().to_string())
        .unwrap_or_else(|| "Inter".to_string());
    let (width, height) = (render_cfg.width, render_cfg.height);
    opt.default_size = usvg::Size::from_wh(width, height)
        .ok_or_else(|| anyhow::anyhow!("invalid render size {width}x{height}"))?;
    opt.fontdb_mut().load_system_fonts();

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
pub fn write_output_png(
    _svg: &str,
    _output: &Path,
    _render_cfg: &RenderConfig,
    _theme: &Theme,
) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
