//! Reconciler facade
//!
//! Owns the scene graph, the drawing surface and every per-session cache.
//! `render` maps a declarative tree onto retained nodes and paints once;
//! `start`/`frame`/`run` drive the animation loop on the host's clock.

use crate::config::RuntimeConfig;
use crate::element::{self, Element, ElementType, Props};
use crate::error::{Result, RuntimeError};
use crate::host::Host;
use crate::object_manager::ObjectManager;
use crate::props;
use crate::scheduler::{AnimationScheduler, FrameCallback, FrameTime, UpdateCallback, UpdateRegistry};
use canvas_compositor::{
    NodeId, RenderPipeline, RenderStats, SceneGraph, SceneNode, ScrollController,
};
use glam::Vec2;
use std::collections::HashMap;

/// Nested component expansions allowed before giving up
const MAX_COMPONENT_DEPTH: usize = 64;

/// Counters for one reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PassStats {
    pub created: usize,
    pub reused: usize,
    pub disposed: usize,
    /// Elements with an unknown type
    pub skipped: usize,
}

/// What the previous pass rendered under a key
struct Entry {
    tag: String,
    props: Props,
}

/// An element with its components expanded
struct Resolved {
    tag: String,
    props: Props,
    children: Vec<Element>,
    on_update: Option<UpdateCallback>,
}

struct Pass {
    order: u64,
    parents: Vec<NodeId>,
    stats: PassStats,
}

pub struct Reconciler<H: Host> {
    host: H,
    surface: H::Surface,
    graph: SceneGraph,
    scene: NodeId,
    objects: ObjectManager,
    updates: UpdateRegistry,
    scheduler: AnimationScheduler,
    pipeline: RenderPipeline,
    scroll: ScrollController,
    entries: HashMap<String, Entry>,
    last_pass: PassStats,
    disposed: bool,
}

impl<H: Host> Reconciler<H> {
    /// Fails with `SurfaceUnavailable` when the host has no surface to give
    pub fn new(mut host: H, config: RuntimeConfig) -> Result<Self> {
        let surface = host
            .acquire_surface()
            .ok_or(RuntimeError::SurfaceUnavailable)?;

        let mut graph = SceneGraph::new();
        let scene = graph.insert(SceneNode::scene(None));

        Ok(Self {
            host,
            surface,
            graph,
            scene,
            objects: ObjectManager::new(),
            updates: UpdateRegistry::new(),
            scheduler: AnimationScheduler::new(),
            pipeline: RenderPipeline::new(config.render),
            scroll: ScrollController::new(config.render.scrollbar)
                .with_wheel_multiplier(config.wheel_multiplier),
            entries: HashMap::new(),
            last_pass: PassStats::default(),
            disposed: false,
        })
    }

    /// Reconcile `tree` into the scene and paint one frame
    pub fn render(&mut self, tree: Element) -> Result<PassStats> {
        self.ensure_live()?;

        self.objects.clear_used_keys();
        let mut pass = Pass {
            order: 0,
            parents: vec![self.scene],
            stats: PassStats::default(),
        };
        self.reconcile_root(tree, &mut pass)?;

        let disposed = self
            .objects
            .cleanup_unused_objects(&mut self.graph, &mut self.updates);
        for key in &disposed {
            self.entries.remove(key);
        }
        pass.stats.disposed = disposed.len();

        self.objects.sort_children(&mut self.graph, &pass.parents);

        log::debug!(
            "reconciled: {} created, {} reused, {} disposed, {} skipped",
            pass.stats.created,
            pass.stats.reused,
            pass.stats.disposed,
            pass.stats.skipped
        );
        self.last_pass = pass.stats;

        self.paint()?;
        Ok(pass.stats)
    }

    /// Parse `value` as an element tree and render it
    pub fn render_json(&mut self, value: &serde_json::Value) -> Result<PassStats> {
        self.ensure_live()?;
        let tree = Element::from_json(value)?;
        self.render(tree)
    }

    /// Paint the current scene without reconciling
    pub fn paint(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.pipeline
            .render(&mut self.graph, self.scene, &mut self.surface)?;
        Ok(())
    }

    pub fn start(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.scheduler.start(&mut self.host);
        Ok(())
    }

    pub fn stop(&mut self) {
        self.scheduler.stop(&mut self.host);
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Run one tick: frame callback, update callbacks, paint
    ///
    /// Returns `Ok(None)` when the loop is not running.
    pub fn frame(&mut self) -> Result<Option<FrameTime>> {
        self.ensure_live()?;
        let Self {
            host,
            surface,
            graph,
            scene,
            objects,
            updates,
            scheduler,
            pipeline,
            ..
        } = self;

        scheduler.tick(host, graph, |graph, time| {
            updates.run_batch(graph, |key| objects.get_cached(key), time)?;
            pipeline.render(graph, *scene, surface)?;
            Ok(())
        })
    }

    /// Start the loop and tick on the host's frame clock
    ///
    /// Returns after `max_frames` ticks, when the loop is stopped, or with
    /// the first tick error.
    pub fn run(&mut self, max_frames: u64) -> Result<u64> {
        self.start()?;
        let mut frames = 0;
        while frames < max_frames && self.scheduler.is_running() && self.host.wait_for_frame() {
            if self.frame()?.is_some() {
                frames += 1;
            }
        }
        Ok(frames)
    }

    pub fn set_frame_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&mut SceneGraph, FrameTime) -> anyhow::Result<()> + 'static,
    {
        let callback: FrameCallback = Box::new(callback);
        self.scheduler.set_frame_callback(Some(callback));
    }

    pub fn clear_frame_callback(&mut self) {
        self.scheduler.set_frame_callback(None);
    }

    /// Scroll the box under `point`; returns whether one consumed the wheel
    pub fn handle_wheel(&mut self, point: Vec2, delta: Vec2) -> bool {
        if self.disposed {
            return false;
        }
        self.scroll
            .handle_wheel(&mut self.graph, self.scene, point, delta)
    }

    /// Begin a scrollbar drag if `point` is on a thumb
    pub fn handle_pointer_down(&mut self, point: Vec2) -> bool {
        if self.disposed {
            return false;
        }
        self.scroll
            .handle_pointer_down(&self.graph, self.scene, point)
    }

    pub fn handle_pointer_move(&mut self, point: Vec2) -> bool {
        if self.disposed {
            return false;
        }
        self.scroll.handle_pointer_move(&mut self.graph, point)
    }

    pub fn handle_pointer_up(&mut self) {
        self.scroll.handle_pointer_up();
    }

    /// Tear everything down; safe to call any number of times
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        self.scheduler.stop(&mut self.host);
        self.scheduler.set_frame_callback(None);
        self.scroll.handle_pointer_up();

        for child in self.graph.children(self.scene).to_vec() {
            self.graph.prune(child);
        }
        self.objects.clear();
        self.updates.clear();
        self.entries.clear();
        log::debug!("reconciler disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Node currently cached under a reconciliation key
    pub fn node(&self, key: &str) -> Option<NodeId> {
        self.objects.get_cached(key)
    }

    pub fn scene(&self) -> NodeId {
        self.scene
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    pub fn surface(&self) -> &H::Surface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut H::Surface {
        &mut self.surface
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn objects(&self) -> &ObjectManager {
        &self.objects
    }

    pub fn updates(&self) -> &UpdateRegistry {
        &self.updates
    }

    pub fn scroll(&self) -> &ScrollController {
        &self.scroll
    }

    pub fn render_stats(&self) -> RenderStats {
        self.pipeline.stats()
    }

    pub fn last_pass(&self) -> PassStats {
        self.last_pass
    }

    pub fn ticks(&self) -> u64 {
        self.scheduler.ticks()
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed {
            return Err(RuntimeError::Disposed);
        }
        Ok(())
    }

    /// A root `scene` element styles the Scene itself; anything else
    /// becomes its only child. Root components are expanded first.
    fn reconcile_root(&mut self, tree: Element, pass: &mut Pass) -> Result<()> {
        let slot = slot_key(&tree, 0);
        let resolved = expand(tree)?;
        if resolved.tag != "scene" {
            return self.reconcile_resolved(resolved, self.scene, slot, pass);
        }

        if let Some(node) = self.graph.get_mut(self.scene) {
            props::apply_scene_props(node, &resolved.props);
        }
        for (index, child) in resolved.children.into_iter().enumerate() {
            self.reconcile_child(child, self.scene, "", index, pass)?;
        }
        Ok(())
    }

    fn reconcile_child(
        &mut self,
        element: Element,
        parent: NodeId,
        parent_key: &str,
        index: usize,
        pass: &mut Pass,
    ) -> Result<()> {
        let slot = slot_key(&element, index);
        let mut key = if parent_key.is_empty() {
            slot
        } else {
            format!("{parent_key}/{slot}")
        };
        while self.objects.is_used(&key) {
            log::debug!("duplicate key {key} for {}", element.describe());
            key = format!("{key}#{index}");
        }

        let resolved = expand(element)?;
        self.reconcile_resolved(resolved, parent, key, pass)
    }

    fn reconcile_resolved(
        &mut self,
        resolved: Resolved,
        parent: NodeId,
        key: String,
        pass: &mut Pass,
    ) -> Result<()> {
        let Resolved {
            tag,
            props,
            children,
            on_update,
        } = resolved;

        if !props::is_intrinsic(&tag) {
            log::debug!(
                "unknown element {} at {key}, skipped",
                element::describe(&tag, &props, children.len())
            );
            pass.stats.skipped += 1;
            return Ok(());
        }

        pass.order += 1;
        self.objects.mark_key_used(&key, pass.order as f64);

        let id = match self.reusable(&key, &tag, &props) {
            Some(id) => {
                if let (Some(node), Some(entry)) =
                    (self.graph.get_mut(id), self.entries.get_mut(&key))
                {
                    props::apply_changes(node, &entry.props, &props);
                    entry.props = props;
                }
                pass.stats.reused += 1;
                id
            }
            None => {
                let Some(node) = props::create_node(&tag, &props) else {
                    pass.stats.skipped += 1;
                    return Ok(());
                };
                let id = self.graph.insert(node);
                self.objects.cache(&key, id);
                self.entries.insert(key.clone(), Entry { tag, props });
                pass.stats.created += 1;
                id
            }
        };

        if self.graph.parent(id) != Some(parent) {
            self.graph.add(parent, id)?;
        }

        match on_update {
            Some(callback) => self.updates.register(key.clone(), callback),
            None => {
                self.updates.unregister(&key);
            }
        }

        if !children.is_empty() || !self.graph.children(id).is_empty() {
            pass.parents.push(id);
        }
        for (index, child) in children.into_iter().enumerate() {
            self.reconcile_child(child, id, &key, index, pass)?;
        }
        Ok(())
    }

    /// The cached node for `key` if it is still alive and of type `tag`
    ///
    /// A cached node of another type is discarded with its subtree.
    fn reusable(&mut self, key: &str, tag: &str, props: &Props) -> Option<NodeId> {
        let id = self.objects.get_cached(key)?;
        let same_type = self.entries.get(key).is_some_and(|entry| entry.tag == tag);
        if same_type && self.graph.contains(id) {
            return Some(id);
        }

        log::debug!(
            "replacing node at {key} with {}",
            element::describe(tag, props, 0)
        );
        self.objects.uncache(key);
        self.updates.unregister(key);
        self.entries.remove(key);
        self.graph.prune(id);
        None
    }
}

impl<H: Host> Drop for Reconciler<H> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Explicit `key` prop, or `type#index`
fn slot_key(element: &Element, index: usize) -> String {
    element
        .explicit_key()
        .unwrap_or_else(|| format!("{}#{}", element.type_name(), index))
}

/// Invoke components until an intrinsic element remains
///
/// The outermost `on_update` applies when the rendered element has none.
fn expand(mut element: Element) -> Result<Resolved> {
    let mut on_update = element.on_update.take();

    for _ in 0..MAX_COMPONENT_DEPTH {
        match element.kind {
            ElementType::Intrinsic(tag) => {
                return Ok(Resolved {
                    tag,
                    props: element.props,
                    children: element.children,
                    on_update: element.on_update.or(on_update),
                });
            }
            ElementType::Component { name, render } => {
                let mut rendered = render(&element.props, element.children)
                    .map_err(|source| RuntimeError::Component { name, source })?;
                if let Some(inner) = rendered.on_update.take() {
                    on_update = Some(inner);
                }
                element = rendered;
            }
        }
    }

    Err(RuntimeError::InvalidArgument(format!(
        "component nesting deeper than {MAX_COMPONENT_DEPTH}"
    )))
}
