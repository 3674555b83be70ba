//! Drawing surface interface
//!
//! The compositor never rasterizes anything itself. Every paint operation is
//! issued against a [`Surface`], an immediate-mode 2D context with
//! canvas-style path, fill, stroke, text and transform calls.
//!
//! [`RecordingSurface`] keeps every call as a [`DrawCommand`]; it serves as
//! the headless surface for tests, benches and offscreen hosts.

use crate::types::{Color, CompositeOperation, LineCap, LineJoin, Rect, TextAlign};
use glam::{Affine2, Vec2};

/// Immediate-mode 2D drawing context
pub trait Surface {
    /// Backing size in surface pixels
    fn size(&self) -> Vec2;

    fn save(&mut self);
    fn restore(&mut self);

    fn set_transform(&mut self, transform: Affine2);
    fn set_global_alpha(&mut self, alpha: f32);
    fn set_composite_operation(&mut self, op: CompositeOperation);

    fn set_line_dash(&mut self, segments: &[f32]);
    fn set_line_dash_offset(&mut self, offset: f32);

    fn set_shadow_blur(&mut self, blur: f32);
    fn set_shadow_color(&mut self, color: Color);
    fn set_shadow_offset(&mut self, offset: Vec2);

    fn set_fill_style(&mut self, color: Color);
    fn set_stroke_style(&mut self, color: Color);
    fn set_line_width(&mut self, width: f32);
    fn set_line_cap(&mut self, cap: LineCap);
    fn set_line_join(&mut self, join: LineJoin);

    fn set_font(&mut self, font: &str);
    fn set_text_align(&mut self, align: TextAlign);

    fn begin_path(&mut self);
    fn move_to(&mut self, point: Vec2);
    fn line_to(&mut self, point: Vec2);
    fn rect(&mut self, rect: Rect);
    fn round_rect(&mut self, rect: Rect, radius: f32);
    fn arc(&mut self, center: Vec2, radius: f32, start_angle: f32, end_angle: f32);
    fn ellipse(&mut self, center: Vec2, radii: Vec2, start_angle: f32, end_angle: f32);
    fn close_path(&mut self);
    fn fill(&mut self);
    fn stroke(&mut self);
    fn clip(&mut self);

    fn clear_rect(&mut self, rect: Rect);
    fn fill_rect(&mut self, rect: Rect);
    fn fill_text(&mut self, text: &str, at: Vec2);
    fn stroke_text(&mut self, text: &str, at: Vec2);

    /// Advance width of `text` in the current font
    fn measure_text(&self, text: &str) -> f32;
}

/// One recorded surface call
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Save,
    Restore,
    SetTransform(Affine2),
    SetGlobalAlpha(f32),
    SetCompositeOperation(CompositeOperation),
    SetLineDash(Vec<f32>),
    SetLineDashOffset(f32),
    SetShadowBlur(f32),
    SetShadowColor(Color),
    SetShadowOffset(Vec2),
    SetFillStyle(Color),
    SetStrokeStyle(Color),
    SetLineWidth(f32),
    SetLineCap(LineCap),
    SetLineJoin(LineJoin),
    SetFont(String),
    SetTextAlign(TextAlign),
    BeginPath,
    MoveTo(Vec2),
    LineTo(Vec2),
    Rect(Rect),
    RoundRect(Rect, f32),
    Arc {
        center: Vec2,
        radius: f32,
        start_angle: f32,
        end_angle: f32,
    },
    Ellipse {
        center: Vec2,
        radii: Vec2,
        start_angle: f32,
        end_angle: f32,
    },
    ClosePath,
    Fill,
    Stroke,
    Clip,
    ClearRect(Rect),
    FillRect(Rect),
    FillText(String, Vec2),
    StrokeText(String, Vec2),
}

/// Surface that records calls instead of painting
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    size: Vec2,
    /// Approximate advance per character, used by `measure_text`
    char_width: f32,
    commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            size: Vec2::new(width, height),
            char_width: 8.0,
            commands: Vec::with_capacity(256),
        }
    }

    pub fn with_char_width(mut self, char_width: f32) -> Self {
        self.char_width = char_width;
        self
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Drain the recorded commands, e.g. between frames
    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    pub fn count<P>(&self, predicate: P) -> usize
    where
        P: Fn(&DrawCommand) -> bool,
    {
        self.commands.iter().filter(|c| predicate(*c)).count()
    }

    pub fn position<P>(&self, predicate: P) -> Option<usize>
    where
        P: Fn(&DrawCommand) -> bool,
    {
        self.commands.iter().position(predicate)
    }

    fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> Vec2 {
        self.size
    }

    fn save(&mut self) {
        self.push(DrawCommand::Save);
    }

    fn restore(&mut self) {
        self.push(DrawCommand::Restore);
    }

    fn set_transform(&mut self, transform: Affine2) {
        self.push(DrawCommand::SetTransform(transform));
    }

    fn set_global_alpha(&mut self, alpha: f32) {
        self.push(DrawCommand::SetGlobalAlpha(alpha));
    }

    fn set_composite_operation(&mut self, op: CompositeOperation) {
        self.push(DrawCommand::SetCompositeOperation(op));
    }

    fn set_line_dash(&mut self, segments: &[f32]) {
        self.push(DrawCommand::SetLineDash(segments.to_vec()));
    }

    fn set_line_dash_offset(&mut self, offset: f32) {
        self.push(DrawCommand::SetLineDashOffset(offset));
    }

    fn set_shadow_blur(&mut self, blur: f32) {
        self.push(DrawCommand::SetShadowBlur(blur));
    }

    fn set_shadow_color(&mut self, color: Color) {
        self.push(DrawCommand::SetShadowColor(color));
    }

    fn set_shadow_offset(&mut self, offset: Vec2) {
        self.push(DrawCommand::SetShadowOffset(offset));
    }

    fn set_fill_style(&mut self, color: Color) {
        self.push(DrawCommand::SetFillStyle(color));
    }

    fn set_stroke_style(&mut self, color: Color) {
        self.push(DrawCommand::SetStrokeStyle(color));
    }

    fn set_line_width(&mut self, width: f32) {
        self.push(DrawCommand::SetLineWidth(width));
    }

    fn set_line_cap(&mut self, cap: LineCap) {
        self.push(DrawCommand::SetLineCap(cap));
    }

    fn set_line_join(&mut self, join: LineJoin) {
        self.push(DrawCommand::SetLineJoin(join));
    }

    fn set_font(&mut self, font: &str) {
        self.push(DrawCommand::SetFont(font.to_string()));
    }

    fn set_text_align(&mut self, align: TextAlign) {
        self.push(DrawCommand::SetTextAlign(align));
    }

    fn begin_path(&mut self) {
        self.push(DrawCommand::BeginPath);
    }

    fn move_to(&mut self, point: Vec2) {
        self.push(DrawCommand::MoveTo(point));
    }

    fn line_to(&mut self, point: Vec2) {
        self.push(DrawCommand::LineTo(point));
    }

    fn rect(&mut self, rect: Rect) {
        self.push(DrawCommand::Rect(rect));
    }

    fn round_rect(&mut self, rect: Rect, radius: f32) {
        self.push(DrawCommand::RoundRect(rect, radius));
    }

    fn arc(&mut self, center: Vec2, radius: f32, start_angle: f32, end_angle: f32) {
        self.push(DrawCommand::Arc {
            center,
            radius,
            start_angle,
            end_angle,
        });
    }

    fn ellipse(&mut self, center: Vec2, radii: Vec2, start_angle: f32, end_angle: f32) {
        self.push(DrawCommand::Ellipse {
            center,
            radii,
            start_angle,
            end_angle,
        });
    }

    fn close_path(&mut self) {
        self.push(DrawCommand::ClosePath);
    }

    fn fill(&mut self) {
        self.push(DrawCommand::Fill);
    }

    fn stroke(&mut self) {
        self.push(DrawCommand::Stroke);
    }

    fn clip(&mut self) {
        self.push(DrawCommand::Clip);
    }

    fn clear_rect(&mut self, rect: Rect) {
        self.push(DrawCommand::ClearRect(rect));
    }

    fn fill_rect(&mut self, rect: Rect) {
        self.push(DrawCommand::FillRect(rect));
    }

    fn fill_text(&mut self, text: &str, at: Vec2) {
        self.push(DrawCommand::FillText(text.to_string(), at));
    }

    fn stroke_text(&mut self, text: &str, at: Vec2) {
        self.push(DrawCommand::StrokeText(text.to_string(), at));
    }

    fn measure_text(&self, text: &str) -> f32 {
        text.chars().count() as f32 * self.char_width
    }
}
