//! Scroll and scrollbar-drag handling for overflow containers
//!
//! The controller holds only drag state. Scroll offsets live on the nodes'
//! [`BoxState`] so the render pipeline reads them back on the next frame.

use crate::scene::SceneGraph;
use crate::types::{BoxState, Color, NodeId, Rect};
use glam::{Affine2, Vec2};

/// Scrollbar appearance and sizing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollbarStyle {
    /// Track and thumb width
    pub width: f32,
    /// Gap between the track and the box edges
    pub inset: f32,
    /// Lower bound for the thumb height
    pub min_thumb: f32,
    pub thumb: Color,
    pub track: Option<Color>,
}

impl Default for ScrollbarStyle {
    fn default() -> Self {
        Self {
            width: 6.0,
            inset: 2.0,
            min_thumb: 30.0,
            thumb: Color::new(0, 0, 0, 128),
            track: None,
        }
    }
}

/// Track and thumb rectangles in world coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollbarGeometry {
    pub track: Rect,
    pub thumb: Rect,
}

impl ScrollbarGeometry {
    /// Distance the thumb can travel along the track
    pub fn travel(&self) -> f32 {
        (self.track.height - self.thumb.height).max(0.0)
    }
}

/// Compute the vertical scrollbar of a box whose top-left sits at `origin`
///
/// Returns `None` when the content fits and there is nothing to scroll.
pub fn scrollbar_geometry(
    origin: Vec2,
    layout_box: &BoxState,
    style: &ScrollbarStyle,
) -> Option<ScrollbarGeometry> {
    if layout_box.content_height <= layout_box.height {
        return None;
    }

    let track_height = (layout_box.height - style.inset * 2.0).max(0.0);
    let track = Rect::new(
        origin.x + layout_box.width - style.width - style.inset,
        origin.y + style.inset,
        style.width,
        track_height,
    );

    let visible_fraction = layout_box.height / layout_box.content_height;
    let thumb_height = (visible_fraction * track_height)
        .max(style.min_thumb)
        .min(track_height);

    let max_scroll = layout_box.max_scroll_y();
    let progress = if max_scroll > 0.0 {
        layout_box.clamped_scroll_y() / max_scroll
    } else {
        0.0
    };
    let thumb_y = track.y + progress * (track_height - thumb_height);

    Some(ScrollbarGeometry {
        track,
        thumb: Rect::new(track.x, thumb_y, style.width, thumb_height),
    })
}

/// Turns wheel and pointer input into scroll offsets
#[derive(Debug, Clone)]
pub struct ScrollController {
    style: ScrollbarStyle,
    wheel_multiplier: f32,
    is_dragging: bool,
    drag_target: Option<NodeId>,
    drag_start_y: f32,
    drag_start_scroll: f32,
}

impl Default for ScrollController {
    fn default() -> Self {
        Self::new(ScrollbarStyle::default())
    }
}

impl ScrollController {
    pub fn new(style: ScrollbarStyle) -> Self {
        Self {
            style,
            wheel_multiplier: 1.0,
            is_dragging: false,
            drag_target: None,
            drag_start_y: 0.0,
            drag_start_scroll: 0.0,
        }
    }

    /// Scale applied to wheel deltas
    pub fn with_wheel_multiplier(mut self, multiplier: f32) -> Self {
        self.wheel_multiplier = multiplier;
        self
    }

    pub fn style(&self) -> &ScrollbarStyle {
        &self.style
    }

    pub fn is_dragging(&self) -> bool {
        self.is_dragging
    }

    pub fn dragged_node(&self) -> Option<NodeId> {
        self.drag_target
    }

    /// Deepest visible scroll container under `point`
    pub fn hit_test(&self, graph: &SceneGraph, root: NodeId, point: Vec2) -> Option<NodeId> {
        find_scroll_box(graph, root, point, Affine2::IDENTITY, &|graph, id, layout_box, p| {
            graph
                .world_to_local(id, p)
                .is_some_and(|local| Rect::from_size(layout_box.size()).contains(local))
        })
    }

    /// Scroll container whose scrollbar thumb is under `point`
    pub fn hit_test_thumb(&self, graph: &SceneGraph, root: NodeId, point: Vec2) -> Option<NodeId> {
        let style = self.style;
        find_scroll_box(graph, root, point, Affine2::IDENTITY, &|graph, id, layout_box, p| {
            graph
                .world_position(id)
                .and_then(|origin| scrollbar_geometry(origin, layout_box, &style))
                .is_some_and(|geometry| geometry.thumb.contains(p))
        })
    }

    /// Apply a wheel delta to the box under the pointer
    ///
    /// Returns whether a scroll container consumed the event.
    pub fn handle_wheel(
        &mut self,
        graph: &mut SceneGraph,
        root: NodeId,
        point: Vec2,
        delta: Vec2,
    ) -> bool {
        let Some(target) = self.hit_test(graph, root, point) else {
            return false;
        };
        let Some(layout_box) = graph.get_mut(target).and_then(|n| n.layout_box_mut()) else {
            return false;
        };

        let delta = delta * self.wheel_multiplier;
        let before = layout_box.clamped_scroll();
        layout_box.set_scroll_y(layout_box.clamped_scroll_y() + delta.y);
        layout_box.set_scroll_x(layout_box.clamped_scroll_x() + delta.x);
        log::trace!(
            "wheel scrolled {:?} from {:?} to {:?}",
            target,
            before,
            layout_box.clamped_scroll()
        );
        true
    }

    /// Start a drag if the pointer went down on a scrollbar thumb
    pub fn handle_pointer_down(&mut self, graph: &SceneGraph, root: NodeId, point: Vec2) -> bool {
        let Some(target) = self.hit_test_thumb(graph, root, point) else {
            return false;
        };
        let Some(layout_box) = graph.get(target).and_then(|n| n.layout_box()) else {
            return false;
        };

        self.is_dragging = true;
        self.drag_target = Some(target);
        self.drag_start_y = point.y;
        self.drag_start_scroll = layout_box.clamped_scroll_y();
        true
    }

    /// Move the dragged thumb, scrolling proportionally to its travel
    pub fn handle_pointer_move(&mut self, graph: &mut SceneGraph, point: Vec2) -> bool {
        if !self.is_dragging {
            return false;
        }
        let Some(target) = self.drag_target else {
            return false;
        };
        let origin = graph.world_position(target);
        let Some(layout_box) = graph.get_mut(target).and_then(|n| n.layout_box_mut()) else {
            // Dragged node vanished mid-drag
            self.handle_pointer_up();
            return false;
        };
        let Some(geometry) = origin.and_then(|o| scrollbar_geometry(o, layout_box, &self.style))
        else {
            return false;
        };

        let travel = geometry.travel();
        if travel <= 0.0 {
            return false;
        }
        let delta = point.y - self.drag_start_y;
        let scroll = self.drag_start_scroll + delta / travel * layout_box.max_scroll_y();
        layout_box.set_scroll_y(scroll);
        true
    }

    /// End any drag; no-op when not dragging
    pub fn handle_pointer_up(&mut self) {
        self.is_dragging = false;
        self.drag_target = None;
        self.drag_start_y = 0.0;
        self.drag_start_scroll = 0.0;
    }
}

type BoxPredicate<'a> = dyn Fn(&SceneGraph, NodeId, &BoxState, Vec2) -> bool + 'a;

/// Back-to-front search for the deepest scroll container matching `hit`
///
/// `view` maps scene space to the screen the way the render pipeline does,
/// so scrolled content is hit where it was painted. `hit` gets the point in
/// unscrolled scene space.
fn find_scroll_box(
    graph: &SceneGraph,
    id: NodeId,
    point: Vec2,
    view: Affine2,
    hit: &BoxPredicate<'_>,
) -> Option<NodeId> {
    let node = graph.get(id)?;
    if !node.visible {
        return None;
    }

    let scroll_box = node.scroll_box();
    let child_view = match scroll_box {
        Some(layout_box) => {
            let world = graph.world_transform(id)?;
            content_view(view, world, layout_box.clamped_scroll())
        }
        None => view,
    };

    for &child in node.children().iter().rev() {
        if let Some(found) = find_scroll_box(graph, child, point, child_view, hit) {
            return Some(found);
        }
    }

    let scene_point = view.inverse().transform_point2(point);
    match scroll_box {
        Some(layout_box) if hit(graph, id, layout_box, scene_point) => Some(id),
        _ => None,
    }
}

/// View for the children of a scroll container at `world`
///
/// The scroll translation applies in the container's local frame, so scaled
/// or rotated containers scroll in their own units.
pub fn content_view(view: Affine2, world: Affine2, scroll: Vec2) -> Affine2 {
    view * world * Affine2::from_translation(-scroll) * world.inverse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Mesh, Overflow, SceneNode, Shape};
    use approx::assert_relative_eq;

    fn scroll_box(width: f32, height: f32, content_height: f32) -> SceneNode {
        let mut layout_box = BoxState::new(width, height);
        layout_box.content_height = content_height;
        layout_box.styles.overflow = Overflow::Auto;
        SceneNode::mesh(Mesh::new(Shape::Empty).with_box(layout_box))
    }

    fn scene_with_box(graph: &mut SceneGraph) -> (NodeId, NodeId) {
        let root = graph.insert(SceneNode::scene(None));
        let bx = graph.insert(scroll_box(100.0, 200.0, 500.0).with_position(10.0, 20.0));
        graph.add(root, bx).unwrap();
        (root, bx)
    }

    #[test]
    fn test_geometry_none_when_content_fits() {
        let layout_box = {
            let mut b = BoxState::new(100.0, 200.0);
            b.content_height = 200.0;
            b
        };
        assert!(scrollbar_geometry(Vec2::ZERO, &layout_box, &ScrollbarStyle::default()).is_none());
    }

    #[test]
    fn test_geometry_thumb_size_and_position() {
        let style = ScrollbarStyle {
            inset: 0.0,
            ..ScrollbarStyle::default()
        };
        let mut layout_box = BoxState::new(100.0, 200.0);
        layout_box.content_height = 400.0;

        let top = scrollbar_geometry(Vec2::new(10.0, 20.0), &layout_box, &style).unwrap();
        assert_relative_eq!(top.thumb.height, 100.0);
        assert_relative_eq!(top.thumb.y, 20.0);
        assert_relative_eq!(top.track.x, 10.0 + 100.0 - 6.0);

        layout_box.scroll_y = 200.0;
        let bottom = scrollbar_geometry(Vec2::new(10.0, 20.0), &layout_box, &style).unwrap();
        assert_relative_eq!(bottom.thumb.y, 20.0 + 100.0);
        assert_relative_eq!(bottom.thumb.bottom(), bottom.track.bottom());
    }

    #[test]
    fn test_geometry_min_thumb() {
        let style = ScrollbarStyle {
            inset: 0.0,
            ..ScrollbarStyle::default()
        };
        let mut layout_box = BoxState::new(100.0, 100.0);
        layout_box.content_height = 10_000.0;

        let geometry = scrollbar_geometry(Vec2::ZERO, &layout_box, &style).unwrap();
        assert_relative_eq!(geometry.thumb.height, 30.0);
        assert_relative_eq!(geometry.travel(), 70.0);
    }

    #[test]
    fn test_hit_test_box_body() {
        let mut graph = SceneGraph::new();
        let (root, bx) = scene_with_box(&mut graph);
        let controller = ScrollController::default();

        assert_eq!(controller.hit_test(&graph, root, Vec2::new(50.0, 50.0)), Some(bx));
        assert_eq!(controller.hit_test(&graph, root, Vec2::new(5.0, 50.0)), None);
        assert_eq!(controller.hit_test(&graph, root, Vec2::new(50.0, 230.0)), None);
    }

    #[test]
    fn test_hit_test_prefers_deepest_box() {
        let mut graph = SceneGraph::new();
        let (root, outer) = scene_with_box(&mut graph);
        let inner = graph.insert(scroll_box(50.0, 50.0, 100.0).with_position(10.0, 10.0));
        graph.add(outer, inner).unwrap();

        let controller = ScrollController::default();
        assert_eq!(controller.hit_test(&graph, root, Vec2::new(30.0, 40.0)), Some(inner));
        assert_eq!(controller.hit_test(&graph, root, Vec2::new(90.0, 150.0)), Some(outer));
    }

    #[test]
    fn test_hit_test_accounts_for_parent_scroll() {
        let mut graph = SceneGraph::new();
        let (root, outer) = scene_with_box(&mut graph);
        let inner = graph.insert(scroll_box(50.0, 50.0, 100.0).with_position(10.0, 10.0));
        graph.add(outer, inner).unwrap();
        graph.get_mut(outer).unwrap().layout_box_mut().unwrap().scroll_y = 100.0;

        let controller = ScrollController::default();
        // inner now paints at world y 30 - 100 = -70, so (30, 40) lands on outer
        assert_eq!(controller.hit_test(&graph, root, Vec2::new(30.0, 40.0)), Some(outer));
    }

    #[test]
    fn test_hit_test_in_scaled_container() {
        let mut graph = SceneGraph::new();
        let root = graph.insert(SceneNode::scene(None));
        let outer = graph.insert(scroll_box(100.0, 200.0, 500.0));
        graph.get_mut(outer).unwrap().set_scale(2.0, 2.0);
        let inner = graph.insert(scroll_box(50.0, 40.0, 100.0).with_position(0.0, 450.0));
        graph.add(root, outer).unwrap();
        graph.add(outer, inner).unwrap();
        graph.get_mut(outer).unwrap().layout_box_mut().unwrap().scroll_y = 300.0;

        // inner paints at (450 - 300) * 2 = 300 on screen, spanning 80 px
        let controller = ScrollController::default();
        assert_eq!(controller.hit_test(&graph, root, Vec2::new(20.0, 320.0)), Some(inner));
        assert_eq!(controller.hit_test(&graph, root, Vec2::new(20.0, 390.0)), Some(outer));
    }

    #[test]
    fn test_content_view_scrolls_in_local_units() {
        let world = Affine2::from_scale_angle_translation(Vec2::splat(2.0), 0.0, Vec2::new(10.0, 0.0));
        let view = content_view(Affine2::IDENTITY, world, Vec2::new(0.0, 300.0));
        let child_world = world * Affine2::from_translation(Vec2::new(0.0, 450.0));

        let painted = (view * child_world).translation;
        assert_relative_eq!(painted.x, 10.0);
        assert_relative_eq!(painted.y, 300.0);
    }

    #[test]
    fn test_hit_test_skips_hidden() {
        let mut graph = SceneGraph::new();
        let (root, bx) = scene_with_box(&mut graph);
        graph.get_mut(bx).unwrap().set_visible(false);

        let controller = ScrollController::default();
        assert_eq!(controller.hit_test(&graph, root, Vec2::new(50.0, 50.0)), None);
    }

    #[test]
    fn test_wheel_scrolls_and_clamps() {
        let mut graph = SceneGraph::new();
        let (root, bx) = scene_with_box(&mut graph);
        let mut controller = ScrollController::default();

        assert!(controller.handle_wheel(&mut graph, root, Vec2::new(50.0, 50.0), Vec2::new(0.0, 120.0)));
        assert_eq!(graph.get(bx).unwrap().layout_box().unwrap().scroll_y, 120.0);

        controller.handle_wheel(&mut graph, root, Vec2::new(50.0, 50.0), Vec2::new(0.0, 1000.0));
        assert_eq!(graph.get(bx).unwrap().layout_box().unwrap().scroll_y, 300.0);

        controller.handle_wheel(&mut graph, root, Vec2::new(50.0, 50.0), Vec2::new(0.0, -5000.0));
        assert_eq!(graph.get(bx).unwrap().layout_box().unwrap().scroll_y, 0.0);
    }

    #[test]
    fn test_wheel_outside_any_box() {
        let mut graph = SceneGraph::new();
        let (root, _) = scene_with_box(&mut graph);
        let mut controller = ScrollController::default();

        assert!(!controller.handle_wheel(&mut graph, root, Vec2::new(500.0, 500.0), Vec2::new(0.0, 10.0)));
    }

    #[test]
    fn test_drag_thumb() {
        let mut graph = SceneGraph::new();
        let (root, bx) = scene_with_box(&mut graph);
        let mut controller = ScrollController::default();

        let origin = graph.world_position(bx).unwrap();
        let layout_box = graph.get(bx).unwrap().layout_box().unwrap().clone();
        let geometry = scrollbar_geometry(origin, &layout_box, controller.style()).unwrap();
        let grab = Vec2::new(geometry.thumb.x + 1.0, geometry.thumb.y + 1.0);

        // Box body is not a drag handle
        assert!(!controller.handle_pointer_down(&graph, root, Vec2::new(20.0, 30.0)));
        assert!(!controller.is_dragging());

        assert!(controller.handle_pointer_down(&graph, root, grab));
        assert_eq!(controller.dragged_node(), Some(bx));

        let half = geometry.travel() / 2.0;
        assert!(controller.handle_pointer_move(&mut graph, grab + Vec2::new(0.0, half)));
        let scroll = graph.get(bx).unwrap().layout_box().unwrap().scroll_y;
        assert_relative_eq!(scroll, 150.0, epsilon = 1e-3);

        controller.handle_pointer_move(&mut graph, grab + Vec2::new(0.0, 10_000.0));
        assert_eq!(graph.get(bx).unwrap().layout_box().unwrap().scroll_y, 300.0);

        controller.handle_pointer_up();
        assert!(!controller.is_dragging());
        assert!(!controller.handle_pointer_move(&mut graph, grab));
    }

    #[test]
    fn test_pointer_up_without_drag_is_noop() {
        let mut controller = ScrollController::default();
        controller.handle_pointer_up();
        assert!(!controller.is_dragging());
        assert!(controller.dragged_node().is_none());
    }
}
