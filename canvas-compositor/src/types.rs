//! Core type definitions for the canvas scene compositor
//!
//! This module defines scene nodes, their variant payloads and the small
//! value types (colours, rectangles, styles) shared with the drawing surface.

use glam::{Affine2, Vec2};
use slotmap::new_key_type;

new_key_type! {
    /// Generational handle to a node stored in a [`SceneGraph`](crate::scene::SceneGraph)
    pub struct NodeId;
}

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle anchored at the origin
    pub fn from_size(size: Vec2) -> Self {
        Self::new(0.0, 0.0, size.x, size.y)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Inclusive on all edges
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }
}

/// RGBA colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::new(0, 0, 0, 0);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xFF) as u8,
            g: ((hex >> 8) & 0xFF) as u8,
            b: (hex & 0xFF) as u8,
            a: 255,
        }
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Parse a CSS-like colour: `#rgb`, `#rrggbb`, `#rrggbbaa`,
    /// `rgb(..)`, `rgba(..)` or a handful of keywords.
    pub fn parse(input: &str) -> Option<Self> {
        let s = input.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return Self::parse_hex(hex);
        }

        let lower = s.to_ascii_lowercase();
        if let Some(body) = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let parts: Vec<&str> = body.split(',').map(str::trim).collect();
            if parts.len() != 3 && parts.len() != 4 {
                return None;
            }
            let channel = |p: &str| p.parse::<f32>().ok().map(|v| v.clamp(0.0, 255.0) as u8);
            let alpha = match parts.get(3) {
                Some(p) => (p.parse::<f32>().ok()?.clamp(0.0, 1.0) * 255.0).round() as u8,
                None => 255,
            };
            return Some(Self::new(
                channel(parts[0])?,
                channel(parts[1])?,
                channel(parts[2])?,
                alpha,
            ));
        }

        match lower.as_str() {
            "transparent" => Some(Self::TRANSPARENT),
            "black" => Some(Self::BLACK),
            "white" => Some(Self::WHITE),
            "red" => Some(Self::rgb(255, 0, 0)),
            "green" => Some(Self::rgb(0, 128, 0)),
            "blue" => Some(Self::rgb(0, 0, 255)),
            "gray" | "grey" => Some(Self::rgb(128, 128, 128)),
            _ => None,
        }
    }

    fn parse_hex(hex: &str) -> Option<Self> {
        let nibble = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok();
        let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            3 => Some(Self::rgb(nibble(0)? * 17, nibble(1)? * 17, nibble(2)? * 17)),
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self::new(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }
}

/// Compositing operation for the drawing surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositeOperation {
    #[default]
    SourceOver,
    SourceAtop,
    DestinationOver,
    Lighter,
    Multiply,
    Screen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shadow {
    pub blur: f32,
    pub color: Color,
    pub offset: Vec2,
}

/// Paint style of a drawable
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub line_width: f32,
    pub line_cap: LineCap,
    pub line_join: LineJoin,
    pub line_dash: Vec<f32>,
    pub opacity: f32,
    pub composite: CompositeOperation,
    pub shadow: Option<Shadow>,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            fill: Some(Color::BLACK),
            stroke: None,
            line_width: 1.0,
            line_cap: LineCap::Butt,
            line_join: LineJoin::Miter,
            line_dash: Vec::new(),
            opacity: 1.0,
            composite: CompositeOperation::SourceOver,
            shadow: None,
        }
    }
}

/// Geometry painted by a [`Mesh`], in node-local coordinates
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Shape {
    #[default]
    Empty,
    Rect {
        size: Vec2,
        radius: f32,
    },
    Circle {
        radius: f32,
    },
    Ellipse {
        radii: Vec2,
    },
    Line {
        from: Vec2,
        to: Vec2,
    },
    Polygon {
        points: Vec<Vec2>,
        closed: bool,
    },
    Text {
        content: String,
        font: String,
        align: TextAlign,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overflow {
    #[default]
    Visible,
    Hidden,
    Auto,
    Scroll,
}

impl Overflow {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "visible" => Some(Self::Visible),
            "hidden" => Some(Self::Hidden),
            "auto" => Some(Self::Auto),
            "scroll" => Some(Self::Scroll),
            _ => None,
        }
    }

    pub fn is_scrollable(self) -> bool {
        matches!(self, Self::Auto | Self::Scroll)
    }
}

/// Box decoration of an overflow container
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoxStyles {
    pub overflow: Overflow,
    pub background: Option<Color>,
    pub border_color: Option<Color>,
    pub border_width: f32,
}

/// Overflow-container state: box size, content extent and scroll offsets
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoxState {
    pub styles: BoxStyles,
    pub width: f32,
    pub height: f32,
    pub content_width: f32,
    pub content_height: f32,
    pub scroll_x: f32,
    pub scroll_y: f32,
}

impl BoxState {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            content_width: width,
            content_height: height,
            ..Self::default()
        }
    }

    pub fn is_scrollable(&self) -> bool {
        self.styles.overflow.is_scrollable()
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    pub fn max_scroll_x(&self) -> f32 {
        (self.content_width - self.width).max(0.0)
    }

    pub fn max_scroll_y(&self) -> f32 {
        (self.content_height - self.height).max(0.0)
    }

    /// Vertical offset as the renderer sees it, within `[0, max_scroll_y]`
    pub fn clamped_scroll_y(&self) -> f32 {
        self.scroll_y.clamp(0.0, self.max_scroll_y())
    }

    pub fn clamped_scroll_x(&self) -> f32 {
        self.scroll_x.clamp(0.0, self.max_scroll_x())
    }

    pub fn clamped_scroll(&self) -> Vec2 {
        Vec2::new(self.clamped_scroll_x(), self.clamped_scroll_y())
    }

    pub fn set_scroll_y(&mut self, value: f32) {
        self.scroll_y = value.clamp(0.0, self.max_scroll_y());
    }

    pub fn set_scroll_x(&mut self, value: f32) {
        self.scroll_x = value.clamp(0.0, self.max_scroll_x());
    }

    /// Re-clamp stored offsets, e.g. after the content shrank
    pub fn clamp_scroll(&mut self) {
        self.scroll_x = self.clamped_scroll_x();
        self.scroll_y = self.clamped_scroll_y();
    }

    pub fn overflows_vertically(&self) -> bool {
        self.content_height > self.height
    }
}

/// Drawable node payload
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    pub shape: Shape,
    pub style: Style,
    /// Present when the mesh acts as a box (possibly scrollable)
    pub layout_box: Option<BoxState>,
}

impl Mesh {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            ..Self::default()
        }
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn with_box(mut self, layout_box: BoxState) -> Self {
        self.layout_box = Some(layout_box);
        self
    }

    /// The box state when this mesh is a scroll container
    pub fn scroll_box(&self) -> Option<&BoxState> {
        self.layout_box.as_ref().filter(|b| b.is_scrollable())
    }
}

/// Closed set of node variants
#[derive(Debug, Clone, PartialEq, Default)]
pub enum NodeKind {
    /// Plain container
    #[default]
    Object,
    /// Container whose clone copies the whole subtree
    Group,
    /// Drawable
    Mesh(Mesh),
    /// Root of a renderable tree
    Scene { background: Option<Color> },
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Object => "object",
            NodeKind::Group => "group",
            NodeKind::Mesh(_) => "mesh",
            NodeKind::Scene { .. } => "scene",
        }
    }
}

/// A single node of the scene graph
///
/// Parent and children are handles into the owning graph; structure is only
/// mutated through [`SceneGraph`](crate::scene::SceneGraph).
#[derive(Debug)]
pub struct SceneNode {
    /// Optional user identifier
    pub id: Option<String>,
    /// Optional, non-unique name
    pub name: Option<String>,

    // Transform properties
    /// Position in parent coordinates
    pub position: Vec2,
    /// Rotation in radians
    pub rotation: f32,
    /// Scale factors (x, y)
    pub scale: Vec2,

    // Cached transforms (dirty flag system)
    /// Local matrix composed from position, rotation and scale
    pub matrix: Affine2,
    /// Product of every ancestor's local matrix and this one
    pub matrix_world: Affine2,
    /// When false the local matrix is frozen
    pub matrix_auto_update: bool,
    /// World matrix needs recalculation
    pub matrix_world_needs_update: bool,

    /// Node and its subtree are painted
    pub visible: bool,

    pub kind: NodeKind,

    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl SceneNode {
    /// Create a detached node with identity transform
    pub fn new(kind: NodeKind) -> Self {
        Self {
            id: None,
            name: None,
            position: Vec2::ZERO,
            rotation: 0.0,
            scale: Vec2::ONE,
            matrix: Affine2::IDENTITY,
            matrix_world: Affine2::IDENTITY,
            matrix_auto_update: true,
            matrix_world_needs_update: false,
            visible: true,
            kind,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn object() -> Self {
        Self::new(NodeKind::Object)
    }

    pub fn group() -> Self {
        Self::new(NodeKind::Group)
    }

    pub fn mesh(mesh: Mesh) -> Self {
        Self::new(NodeKind::Mesh(mesh))
    }

    pub fn scene(background: Option<Color>) -> Self {
        Self::new(NodeKind::Scene { background })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.set_position(x, y);
        self
    }

    pub fn set_position(&mut self, x: f32, y: f32) {
        self.position = Vec2::new(x, y);
        self.mark_transform_dirty();
    }

    pub fn set_rotation(&mut self, rotation: f32) {
        self.rotation = rotation;
        self.mark_transform_dirty();
    }

    pub fn set_scale(&mut self, x: f32, y: f32) {
        self.scale = Vec2::new(x, y);
        self.mark_transform_dirty();
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Mark world transform as dirty (needs recalculation)
    pub fn mark_transform_dirty(&mut self) {
        self.matrix_world_needs_update = true;
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_drawable(&self) -> bool {
        matches!(self.kind, NodeKind::Mesh(_))
    }

    pub fn as_mesh(&self) -> Option<&Mesh> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn as_mesh_mut(&mut self) -> Option<&mut Mesh> {
        match &mut self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn layout_box(&self) -> Option<&BoxState> {
        self.as_mesh().and_then(|m| m.layout_box.as_ref())
    }

    pub fn layout_box_mut(&mut self) -> Option<&mut BoxState> {
        self.as_mesh_mut().and_then(|m| m.layout_box.as_mut())
    }

    /// Box state when this node is a scroll container
    pub fn scroll_box(&self) -> Option<&BoxState> {
        self.as_mesh().and_then(Mesh::scroll_box)
    }

    /// Detached copy of identity, transform, visibility and variant data
    pub fn copy_detached(&self) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            position: self.position,
            rotation: self.rotation,
            scale: self.scale,
            matrix: self.matrix,
            matrix_world: self.matrix_world,
            matrix_auto_update: self.matrix_auto_update,
            matrix_world_needs_update: true,
            visible: self.visible,
            kind: self.kind.clone(),
            parent: None,
            children: Vec::new(),
        }
    }
}

impl Default for SceneNode {
    fn default() -> Self {
        Self::object()
    }
}
