//! Per-variant paint routines
//!
//! Only drawables paint. Containers, groups and scene roots resolve to a
//! no-op in the same match, so the pipeline never inspects node types itself.

use crate::surface::Surface;
use crate::types::{BoxState, Color, Mesh, NodeKind, Rect, Shape, Style};
use glam::{Affine2, Vec2};
use std::f32::consts::TAU;

impl NodeKind {
    /// Paint this node's own content with `transform` as the surface matrix
    ///
    /// Returns whether anything was issued to the surface.
    pub fn paint<S: Surface + ?Sized>(&self, surface: &mut S, transform: Affine2) -> bool {
        match self {
            NodeKind::Mesh(mesh) => {
                mesh.paint(surface, transform);
                true
            }
            NodeKind::Object | NodeKind::Group | NodeKind::Scene { .. } => false,
        }
    }
}

impl Mesh {
    /// Paint the box decoration (if any) and the shape
    ///
    /// State changes stay inside a save/restore pair.
    pub fn paint<S: Surface + ?Sized>(&self, surface: &mut S, transform: Affine2) {
        surface.save();
        surface.set_transform(transform);
        apply_style(surface, &self.style);

        if let Some(layout_box) = &self.layout_box {
            paint_box(surface, layout_box);
        }
        paint_shape(surface, &self.shape, &self.style);

        surface.restore();
    }
}

fn apply_style<S: Surface + ?Sized>(surface: &mut S, style: &Style) {
    surface.set_global_alpha(style.opacity.clamp(0.0, 1.0));
    surface.set_composite_operation(style.composite);
    surface.set_line_width(style.line_width);
    surface.set_line_cap(style.line_cap);
    surface.set_line_join(style.line_join);
    if !style.line_dash.is_empty() {
        surface.set_line_dash(&style.line_dash);
    }
    if let Some(shadow) = style.shadow {
        surface.set_shadow_blur(shadow.blur);
        surface.set_shadow_color(shadow.color);
        surface.set_shadow_offset(shadow.offset);
    }
}

fn paint_box<S: Surface + ?Sized>(surface: &mut S, layout_box: &BoxState) {
    let bounds = Rect::from_size(layout_box.size());
    if let Some(background) = layout_box.styles.background {
        surface.set_fill_style(background);
        surface.fill_rect(bounds);
    }
    if let Some(border) = layout_box.styles.border_color {
        if layout_box.styles.border_width > 0.0 {
            surface.set_stroke_style(border);
            surface.set_line_width(layout_box.styles.border_width);
            surface.begin_path();
            surface.rect(bounds);
            surface.stroke();
        }
    }
}

fn finish_path<S: Surface + ?Sized>(surface: &mut S, style: &Style, fillable: bool) {
    if fillable {
        if let Some(fill) = style.fill {
            surface.set_fill_style(fill);
            surface.fill();
        }
    }
    if let Some(stroke) = style.stroke {
        surface.set_stroke_style(stroke);
        surface.stroke();
    }
}

fn paint_shape<S: Surface + ?Sized>(surface: &mut S, shape: &Shape, style: &Style) {
    match shape {
        Shape::Empty => {}
        Shape::Rect { size, radius } => {
            surface.begin_path();
            if *radius > 0.0 {
                surface.round_rect(Rect::from_size(*size), *radius);
            } else {
                surface.rect(Rect::from_size(*size));
            }
            finish_path(surface, style, true);
        }
        Shape::Circle { radius } => {
            surface.begin_path();
            surface.arc(Vec2::ZERO, *radius, 0.0, TAU);
            finish_path(surface, style, true);
        }
        Shape::Ellipse { radii } => {
            surface.begin_path();
            surface.ellipse(Vec2::ZERO, *radii, 0.0, TAU);
            finish_path(surface, style, true);
        }
        Shape::Line { from, to } => {
            surface.begin_path();
            surface.move_to(*from);
            surface.line_to(*to);
            finish_path(surface, style, false);
        }
        Shape::Polygon { points, closed } => {
            let Some((first, rest)) = points.split_first() else {
                return;
            };
            surface.begin_path();
            surface.move_to(*first);
            for point in rest {
                surface.line_to(*point);
            }
            if *closed {
                surface.close_path();
            }
            finish_path(surface, style, *closed);
        }
        Shape::Text {
            content,
            font,
            align,
        } => {
            surface.set_font(font);
            surface.set_text_align(*align);
            // Unstyled text falls back to a black fill
            let fill = style
                .fill
                .or(if style.stroke.is_none() { Some(Color::BLACK) } else { None });
            if let Some(fill) = fill {
                surface.set_fill_style(fill);
                surface.fill_text(content, Vec2::ZERO);
            }
            if let Some(stroke) = style.stroke {
                surface.set_stroke_style(stroke);
                surface.stroke_text(content, Vec2::ZERO);
            }
        }
    }
}
