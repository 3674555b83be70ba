//! Intrinsic element types and prop application

use crate::element::Props;
use canvas_compositor::{
    BoxState, Color, LineCap, LineJoin, Mesh, NodeKind, Overflow, SceneNode, Shadow, Shape,
    TextAlign,
};
use glam::Vec2;
use serde_json::Value;

pub(crate) const DEFAULT_FONT: &str = "16px sans-serif";

pub(crate) fn is_intrinsic(tag: &str) -> bool {
    matches!(
        tag,
        "group" | "object" | "rect" | "circle" | "ellipse" | "line" | "polygon" | "text" | "box" | "view"
    )
}

/// Build a node for an intrinsic tag with every prop applied
pub(crate) fn create_node(tag: &str, props: &Props) -> Option<SceneNode> {
    let kind = match tag {
        "group" => NodeKind::Group,
        "object" => NodeKind::Object,
        "rect" => NodeKind::Mesh(Mesh::new(Shape::Rect {
            size: Vec2::ZERO,
            radius: 0.0,
        })),
        "circle" => NodeKind::Mesh(Mesh::new(Shape::Circle { radius: 0.0 })),
        "ellipse" => NodeKind::Mesh(Mesh::new(Shape::Ellipse { radii: Vec2::ZERO })),
        "line" => NodeKind::Mesh(Mesh::new(Shape::Line {
            from: Vec2::ZERO,
            to: Vec2::ZERO,
        })),
        "polygon" => NodeKind::Mesh(Mesh::new(Shape::Polygon {
            points: Vec::new(),
            closed: true,
        })),
        "text" => NodeKind::Mesh(Mesh::new(Shape::Text {
            content: String::new(),
            font: DEFAULT_FONT.to_string(),
            align: TextAlign::Left,
        })),
        "box" | "view" => NodeKind::Mesh(Mesh::new(Shape::Empty).with_box(BoxState::default())),
        _ => return None,
    };

    let mut node = SceneNode::new(kind);
    for (name, value) in props {
        apply_prop(&mut node, name, Some(value));
    }
    sync_content_size(&mut node, props);
    Some(node)
}

/// Re-apply props that differ from `previous`; removed props reset
///
/// Returns how many props were applied.
pub(crate) fn apply_changes(node: &mut SceneNode, previous: &Props, next: &Props) -> usize {
    let mut applied = 0;
    for (name, value) in next {
        if previous.get(name) != Some(value) {
            apply_prop(node, name, Some(value));
            applied += 1;
        }
    }
    for name in previous.keys() {
        if !next.contains_key(name) {
            apply_prop(node, name, None);
            applied += 1;
        }
    }
    if applied > 0 {
        sync_content_size(node, next);
    }
    applied
}

/// Apply the background of a root `scene` element
pub(crate) fn apply_scene_props(node: &mut SceneNode, props: &Props) {
    if let NodeKind::Scene { background } = &mut node.kind {
        *background = props.get("background").and_then(color);
    }
}

/// Boxes without an explicit content size scroll nothing
fn sync_content_size(node: &mut SceneNode, props: &Props) {
    let Some(layout_box) = node.layout_box_mut() else {
        return;
    };
    if !props.contains_key("contentWidth") {
        layout_box.content_width = layout_box.width;
    }
    if !props.contains_key("contentHeight") {
        layout_box.content_height = layout_box.height;
    }
}

fn number(value: Option<&Value>, default: f32) -> f32 {
    value
        .and_then(Value::as_f64)
        .map(|v| v as f32)
        .unwrap_or(default)
}

fn string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `null`, `"none"` and unparseable strings mean no paint
fn color(value: &Value) -> Option<Color> {
    let text = value.as_str()?;
    if text.eq_ignore_ascii_case("none") {
        return None;
    }
    let parsed = Color::parse(text);
    if parsed.is_none() {
        log::debug!("ignoring unparseable colour {text:?}");
    }
    parsed
}

fn paint(value: Option<&Value>, default: Option<Color>) -> Option<Color> {
    match value {
        Some(value) => color(value),
        None => default,
    }
}

fn point(value: &Value) -> Option<Vec2> {
    match value {
        Value::Array(pair) if pair.len() == 2 => Some(Vec2::new(
            pair[0].as_f64()? as f32,
            pair[1].as_f64()? as f32,
        )),
        Value::Object(map) => Some(Vec2::new(
            map.get("x")?.as_f64()? as f32,
            map.get("y")?.as_f64()? as f32,
        )),
        _ => None,
    }
}

/// `[[x, y], ..]`, `[{x, y}, ..]` or a flat `[x0, y0, x1, y1, ..]`
fn points(value: Option<&Value>) -> Vec<Vec2> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    if items.iter().all(Value::is_number) {
        return items
            .chunks_exact(2)
            .filter_map(|pair| Some(Vec2::new(pair[0].as_f64()? as f32, pair[1].as_f64()? as f32)))
            .collect();
    }
    items.iter().filter_map(point).collect()
}

fn line_cap(value: Option<&Value>) -> LineCap {
    match value.and_then(Value::as_str) {
        Some("round") => LineCap::Round,
        Some("square") => LineCap::Square,
        _ => LineCap::Butt,
    }
}

fn line_join(value: Option<&Value>) -> LineJoin {
    match value.and_then(Value::as_str) {
        Some("round") => LineJoin::Round,
        Some("bevel") => LineJoin::Bevel,
        _ => LineJoin::Miter,
    }
}

fn text_align(value: Option<&Value>) -> TextAlign {
    match value.and_then(Value::as_str) {
        Some("center") => TextAlign::Center,
        Some("right" | "end") => TextAlign::Right,
        _ => TextAlign::Left,
    }
}

/// Apply one prop; `None` resets it to its default
fn apply_prop(node: &mut SceneNode, name: &str, value: Option<&Value>) {
    match name {
        "key" | "children" => {}
        "id" => node.id = string(value),
        "name" => node.name = string(value),
        "x" => node.set_position(number(value, 0.0), node.position.y),
        "y" => node.set_position(node.position.x, number(value, 0.0)),
        "rotation" => node.set_rotation(number(value, 0.0)),
        "scale" => {
            let s = number(value, 1.0);
            node.set_scale(s, s);
        }
        "scaleX" => node.set_scale(number(value, 1.0), node.scale.y),
        "scaleY" => node.set_scale(node.scale.x, number(value, 1.0)),
        "visible" => node.set_visible(value.and_then(Value::as_bool).unwrap_or(true)),
        _ => {
            if let Some(mesh) = node.as_mesh_mut() {
                apply_mesh_prop(mesh, name, value);
            }
        }
    }
}

fn apply_mesh_prop(mesh: &mut Mesh, name: &str, value: Option<&Value>) {
    let style = &mut mesh.style;
    match name {
        "fill" => style.fill = paint(value, Some(Color::BLACK)),
        "stroke" => style.stroke = paint(value, None),
        "lineWidth" => style.line_width = number(value, 1.0),
        "lineCap" => style.line_cap = line_cap(value),
        "lineJoin" => style.line_join = line_join(value),
        "lineDash" => {
            style.line_dash = match value {
                Some(Value::Array(items)) => items
                    .iter()
                    .filter_map(Value::as_f64)
                    .map(|v| v as f32)
                    .collect(),
                _ => Vec::new(),
            }
        }
        "opacity" => style.opacity = number(value, 1.0),
        "shadowBlur" | "shadowColor" | "shadowOffsetX" | "shadowOffsetY" => {
            let mut shadow = style.shadow.unwrap_or(Shadow {
                blur: 0.0,
                color: Color::TRANSPARENT,
                offset: Vec2::ZERO,
            });
            match name {
                "shadowBlur" => shadow.blur = number(value, 0.0),
                "shadowColor" => shadow.color = paint(value, None).unwrap_or(Color::TRANSPARENT),
                "shadowOffsetX" => shadow.offset.x = number(value, 0.0),
                _ => shadow.offset.y = number(value, 0.0),
            }
            let inert = shadow.blur == 0.0 && shadow.offset == Vec2::ZERO;
            style.shadow = if inert { None } else { Some(shadow) };
        }
        _ => apply_geometry_prop(mesh, name, value),
    }
}

fn apply_geometry_prop(mesh: &mut Mesh, name: &str, value: Option<&Value>) {
    match (&mut mesh.shape, name) {
        (Shape::Rect { size, .. }, "width") => size.x = number(value, 0.0),
        (Shape::Rect { size, .. }, "height") => size.y = number(value, 0.0),
        (Shape::Rect { radius, .. }, "radius") => *radius = number(value, 0.0),
        (Shape::Circle { radius }, "radius") => *radius = number(value, 0.0),
        (Shape::Ellipse { radii }, "radiusX") => radii.x = number(value, 0.0),
        (Shape::Ellipse { radii }, "radiusY") => radii.y = number(value, 0.0),
        (Shape::Line { from, .. }, "x1") => from.x = number(value, 0.0),
        (Shape::Line { from, .. }, "y1") => from.y = number(value, 0.0),
        (Shape::Line { to, .. }, "x2") => to.x = number(value, 0.0),
        (Shape::Line { to, .. }, "y2") => to.y = number(value, 0.0),
        (Shape::Polygon { points: pts, .. }, "points") => *pts = points(value),
        (Shape::Polygon { closed, .. }, "closed") => {
            *closed = value.and_then(Value::as_bool).unwrap_or(true)
        }
        (Shape::Text { content, .. }, "text") => *content = string(value).unwrap_or_default(),
        (Shape::Text { font, .. }, "font") => {
            *font = string(value).unwrap_or_else(|| DEFAULT_FONT.to_string())
        }
        (Shape::Text { align, .. }, "align") => *align = text_align(value),
        _ => {
            if let Some(layout_box) = mesh.layout_box.as_mut() {
                apply_box_prop(layout_box, name, value);
            }
        }
    }
}

fn apply_box_prop(layout_box: &mut BoxState, name: &str, value: Option<&Value>) {
    match name {
        "width" => layout_box.width = number(value, 0.0),
        "height" => layout_box.height = number(value, 0.0),
        "contentWidth" => layout_box.content_width = number(value, layout_box.width),
        "contentHeight" => layout_box.content_height = number(value, layout_box.height),
        "overflow" => {
            layout_box.styles.overflow = value
                .and_then(Value::as_str)
                .and_then(Overflow::parse)
                .unwrap_or_default()
        }
        "background" => layout_box.styles.background = paint(value, None),
        "borderColor" => layout_box.styles.border_color = paint(value, None),
        "borderWidth" => layout_box.styles.border_width = number(value, 0.0),
        _ => {}
    }
}
