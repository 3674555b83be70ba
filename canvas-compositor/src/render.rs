//! Rendering pipeline for the scene compositor
//!
//! One call paints one frame: clear, reset surface state, background, world
//! matrix refresh, then a pre-order walk issuing paint calls in z-order.

use crate::error::{CompositorError, Result};
use crate::scene::SceneGraph;
use crate::scroll::{content_view, scrollbar_geometry, ScrollbarStyle};
use crate::surface::Surface;
use crate::types::{BoxState, Color, CompositeOperation, NodeId, NodeKind, Rect};
use glam::{Affine2, Vec2};

/// Render pipeline settings
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderConfig {
    pub scrollbar: ScrollbarStyle,
}

/// Counters for the most recent frame plus a running frame total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats {
    pub frames: u64,
    pub painted: usize,
    pub skipped: usize,
    pub scrollbars: usize,
}

/// Paints a scene graph onto a surface
#[derive(Debug, Clone, Default)]
pub struct RenderPipeline {
    config: RenderConfig,
    stats: RenderStats,
}

impl RenderPipeline {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            stats: RenderStats::default(),
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    /// Paint one frame of the tree rooted at `scene`
    ///
    /// Fails before touching the surface if `scene` is not in the graph.
    pub fn render<S: Surface + ?Sized>(
        &mut self,
        graph: &mut SceneGraph,
        scene: NodeId,
        surface: &mut S,
    ) -> Result<()> {
        let background = match graph.get(scene) {
            Some(node) => match node.kind {
                NodeKind::Scene { background } => background,
                _ => None,
            },
            None => return Err(CompositorError::NodeNotFound(scene)),
        };

        let size = surface.size();
        surface.clear_rect(Rect::from_size(size));
        reset_surface_state(surface);

        if let Some(background) = background {
            surface.set_fill_style(background);
            surface.fill_rect(Rect::from_size(size));
        }

        graph.update_matrix_world(scene, false)?;

        self.stats.frames += 1;
        self.stats.painted = 0;
        self.stats.skipped = 0;
        self.stats.scrollbars = 0;

        self.draw_subtree(graph, scene, Affine2::IDENTITY, surface);

        log::trace!(
            "frame {}: painted {} nodes, skipped {}",
            self.stats.frames,
            self.stats.painted,
            self.stats.skipped
        );
        Ok(())
    }

    /// `view` maps scene space to the screen past enclosing scroll containers
    fn draw_subtree<S: Surface + ?Sized>(
        &mut self,
        graph: &SceneGraph,
        id: NodeId,
        view: Affine2,
        surface: &mut S,
    ) {
        let Some(node) = graph.get(id) else {
            return;
        };
        if !node.visible {
            self.stats.skipped += 1;
            return;
        }

        let world = node.matrix_world;
        if node.kind.paint(surface, view * world) {
            self.stats.painted += 1;
        }

        let Some(layout_box) = node.scroll_box() else {
            for &child in node.children() {
                self.draw_subtree(graph, child, view, surface);
            }
            return;
        };

        surface.save();
        surface.set_transform(view * world);
        surface.begin_path();
        surface.rect(Rect::from_size(layout_box.size()));
        surface.clip();

        let child_view = content_view(view, world, layout_box.clamped_scroll());
        for &child in node.children() {
            self.draw_subtree(graph, child, child_view, surface);
        }
        surface.restore();

        self.draw_scrollbar(world.translation, layout_box, view, surface);
    }

    fn draw_scrollbar<S: Surface + ?Sized>(
        &mut self,
        origin: Vec2,
        layout_box: &BoxState,
        view: Affine2,
        surface: &mut S,
    ) {
        let style = &self.config.scrollbar;
        let Some(geometry) = scrollbar_geometry(origin, layout_box, style) else {
            return;
        };

        surface.save();
        surface.set_transform(view);
        if let Some(track) = style.track {
            surface.set_fill_style(track);
            surface.fill_rect(geometry.track);
        }
        surface.set_fill_style(style.thumb);
        surface.begin_path();
        surface.round_rect(geometry.thumb, style.width / 2.0);
        surface.fill();
        surface.restore();

        self.stats.scrollbars += 1;
    }
}

/// Put every surface-global setting back to its default
fn reset_surface_state<S: Surface + ?Sized>(surface: &mut S) {
    surface.set_transform(Affine2::IDENTITY);
    surface.set_global_alpha(1.0);
    surface.set_composite_operation(CompositeOperation::SourceOver);
    surface.set_line_dash(&[]);
    surface.set_line_dash_offset(0.0);
    surface.set_shadow_blur(0.0);
    surface.set_shadow_color(Color::TRANSPARENT);
    surface.set_shadow_offset(Vec2::ZERO);
}
