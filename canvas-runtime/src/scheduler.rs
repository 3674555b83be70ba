//! Animation scheduling
//!
//! [`AnimationScheduler`] owns the recurring frame request and the clock.
//! [`UpdateRegistry`] holds per-object update callbacks keyed by
//! reconciliation key; nodes are looked up when the batch runs, not when the
//! callback is registered.

use crate::error::{Result, RuntimeError};
use crate::host::{FrameHandle, FrameHost};
use canvas_compositor::{NodeId, SceneGraph, SceneNode};
use std::time::Duration;

/// Timing passed to frame and update callbacks, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameTime {
    /// Since `start`
    pub time: f64,
    /// Since the previous tick
    pub delta: f64,
}

pub type UpdateCallback = Box<dyn FnMut(&mut SceneNode, FrameTime) -> anyhow::Result<()>>;
pub type FrameCallback = Box<dyn FnMut(&mut SceneGraph, FrameTime) -> anyhow::Result<()>>;

/// Ordered key → callback registry
#[derive(Default)]
pub struct UpdateRegistry {
    entries: Vec<(String, UpdateCallback)>,
}

impl UpdateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` under `key`
    ///
    /// An existing entry keeps its position and gets the new callback.
    pub fn register(&mut self, key: impl Into<String>, callback: UpdateCallback) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = callback,
            None => self.entries.push((key, callback)),
        }
    }

    pub fn unregister(&mut self, key: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(k, _)| k != key);
        self.entries.len() != before
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Run every callback against its node, resolved through `resolve`
    ///
    /// Keys that no longer resolve to a live node are skipped. Nodes the
    /// batch touched have their transforms marked dirty once, after the
    /// batch, including when a callback fails. The first failure stops the
    /// batch and is returned.
    pub fn run_batch<F>(&mut self, graph: &mut SceneGraph, resolve: F, time: FrameTime) -> Result<usize>
    where
        F: Fn(&str) -> Option<NodeId>,
    {
        let mut touched = Vec::with_capacity(self.entries.len());
        let mut failure = None;

        for (key, callback) in &mut self.entries {
            let Some(id) = resolve(key.as_str()) else {
                continue;
            };
            let Some(node) = graph.get_mut(id) else {
                continue;
            };
            touched.push(id);
            if let Err(source) = callback(node, time) {
                failure = Some(RuntimeError::UpdateCallback {
                    key: key.clone(),
                    source,
                });
                break;
            }
        }

        for &id in &touched {
            if let Some(node) = graph.get_mut(id) {
                node.mark_transform_dirty();
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(touched.len()),
        }
    }
}

impl std::fmt::Debug for UpdateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.keys()).finish()
    }
}

/// Drives the recurring frame tick
#[derive(Default)]
pub struct AnimationScheduler {
    handle: Option<FrameHandle>,
    start: Option<Duration>,
    last: Option<Duration>,
    frame_callback: Option<FrameCallback>,
    ticks: u64,
}

impl AnimationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// A frame request is live
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Successful ticks since creation
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Callback run at the start of every tick, before update callbacks
    pub fn set_frame_callback(&mut self, callback: Option<FrameCallback>) {
        self.frame_callback = callback;
    }

    /// Request the first frame and reset the clock; no-op while running
    pub fn start<H: FrameHost + ?Sized>(&mut self, host: &mut H) {
        if self.is_running() {
            return;
        }
        let now = host.now();
        self.start = Some(now);
        self.last = Some(now);
        self.handle = Some(host.request_frame());
        log::debug!("animation loop started");
    }

    /// Cancel the pending frame request; idempotent
    pub fn stop<H: FrameHost + ?Sized>(&mut self, host: &mut H) {
        if let Some(handle) = self.handle.take() {
            host.cancel_frame(handle);
            log::debug!("animation loop stopped after {} ticks", self.ticks);
        }
    }

    /// Run one frame
    ///
    /// Does nothing and returns `Ok(None)` when not running. Otherwise runs
    /// the frame callback, then `run_frame` (update callbacks and paint),
    /// then requests the next frame. A failure is returned without
    /// requesting another frame, which leaves the loop stopped.
    pub fn tick<H, F>(
        &mut self,
        host: &mut H,
        graph: &mut SceneGraph,
        run_frame: F,
    ) -> Result<Option<FrameTime>>
    where
        H: FrameHost + ?Sized,
        F: FnOnce(&mut SceneGraph, FrameTime) -> Result<()>,
    {
        if self.handle.take().is_none() {
            return Ok(None);
        }

        let now = host.now();
        let start = *self.start.get_or_insert(now);
        let last = self.last.replace(now).unwrap_or(now);
        let time = FrameTime {
            time: now.saturating_sub(start).as_secs_f64(),
            delta: now.saturating_sub(last).as_secs_f64(),
        };

        let result = match self.frame_callback.as_mut() {
            Some(callback) => callback(graph, time).map_err(RuntimeError::FrameCallback),
            None => Ok(()),
        }
        .and_then(|()| run_frame(graph, time));

        match result {
            Ok(()) => {
                self.ticks += 1;
                self.handle = Some(host.request_frame());
                Ok(Some(time))
            }
            Err(err) => {
                log::warn!("animation loop stopped by failed frame {}: {err}", self.ticks + 1);
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for AnimationScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationScheduler")
            .field("handle", &self.handle)
            .field("start", &self.start)
            .field("ticks", &self.ticks)
            .field("frame_callback", &self.frame_callback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HeadlessHost;
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    fn graph_with(keys: &[&str]) -> (SceneGraph, HashMap<String, NodeId>) {
        let mut graph = SceneGraph::new();
        let ids = keys
            .iter()
            .map(|k| (k.to_string(), graph.insert(SceneNode::object())))
            .collect();
        (graph, ids)
    }

    fn noop() -> UpdateCallback {
        Box::new(|_: &mut SceneNode, _: FrameTime| Ok(()))
    }

    #[test]
    fn test_register_replaces_in_place() {
        let mut registry = UpdateRegistry::new();
        registry.register("a", noop());
        registry.register("b", noop());
        registry.register("a", noop());

        assert_eq!(registry.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(registry.unregister("a"));
        assert!(!registry.unregister("a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_batch_uses_live_lookup() {
        let (mut graph, mut ids) = graph_with(&["a", "b"]);
        let mut registry = UpdateRegistry::new();
        for key in ["a", "b"] {
            registry.register(
                key,
                Box::new(|node: &mut SceneNode, t: FrameTime| {
                    node.position.x += t.delta as f32;
                    Ok(())
                }),
            );
        }

        // "b" disappears after registration
        let b = ids.remove("b").unwrap();
        graph.prune(b);

        let time = FrameTime {
            time: 1.0,
            delta: 0.5,
        };
        let ran = registry
            .run_batch(&mut graph, |k| ids.get(k).copied(), time)
            .unwrap();
        assert_eq!(ran, 1);
        assert_eq!(graph.get(ids["a"]).unwrap().position.x, 0.5);
    }

    #[test]
    fn test_batch_marks_touched_nodes_dirty() {
        let (mut graph, ids) = graph_with(&["a"]);
        graph.update_matrix_world(ids["a"], true).unwrap();
        let mut registry = UpdateRegistry::new();
        registry.register("a", noop());

        registry
            .run_batch(&mut graph, |k| ids.get(k).copied(), FrameTime::default())
            .unwrap();
        assert!(graph.get(ids["a"]).unwrap().matrix_world_needs_update);
    }

    #[test]
    fn test_batch_error_propagates_and_stops() {
        let (mut graph, ids) = graph_with(&["a", "b"]);
        let ran_b = Rc::new(RefCell::new(false));
        let mut registry = UpdateRegistry::new();
        registry.register(
            "a",
            Box::new(|_: &mut SceneNode, _: FrameTime| Err(anyhow::anyhow!("boom"))),
        );
        let flag = ran_b.clone();
        registry.register(
            "b",
            Box::new(move |_: &mut SceneNode, _: FrameTime| {
                *flag.borrow_mut() = true;
                Ok(())
            }),
        );

        let err = registry
            .run_batch(&mut graph, |k| ids.get(k).copied(), FrameTime::default())
            .unwrap_err();
        assert!(matches!(err, RuntimeError::UpdateCallback { ref key, .. } if key == "a"));
        assert!(!*ran_b.borrow());
        assert!(graph.get(ids["a"]).unwrap().matrix_world_needs_update);
    }

    #[test]
    fn test_start_stop_idempotent() {
        let mut host = HeadlessHost::new(1.0, 1.0);
        let mut scheduler = AnimationScheduler::new();

        scheduler.start(&mut host);
        scheduler.start(&mut host);
        assert!(scheduler.is_running());
        assert_eq!(host.frames_requested(), 1);

        scheduler.stop(&mut host);
        scheduler.stop(&mut host);
        assert!(!scheduler.is_running());
        assert!(host.pending().is_none());
    }

    #[test]
    fn test_tick_times() {
        let mut host = HeadlessHost::new(1.0, 1.0).with_frame_rate(10, 1);
        let mut graph = SceneGraph::new();
        let mut scheduler = AnimationScheduler::new();

        assert_eq!(scheduler.tick(&mut host, &mut graph, |_, _| Ok(())).unwrap(), None);

        scheduler.start(&mut host);
        host.wait_for_frame();
        let first = scheduler.tick(&mut host, &mut graph, |_, _| Ok(())).unwrap().unwrap();
        assert_relative_eq!(first.time, 0.1, epsilon = 1e-9);
        assert_relative_eq!(first.delta, 0.1, epsilon = 1e-9);

        host.advance(Duration::from_millis(150));
        let second = scheduler.tick(&mut host, &mut graph, |_, _| Ok(())).unwrap().unwrap();
        assert_relative_eq!(second.time, 0.25, epsilon = 1e-9);
        assert_relative_eq!(second.delta, 0.15, epsilon = 1e-9);
        assert_eq!(scheduler.ticks(), 2);
        assert!(scheduler.is_running());
    }

    #[test]
    fn test_frame_callback_runs_first() {
        let mut host = HeadlessHost::new(1.0, 1.0);
        let mut graph = SceneGraph::new();
        let mut scheduler = AnimationScheduler::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let log = order.clone();
        scheduler.set_frame_callback(Some(Box::new(move |_: &mut SceneGraph, _: FrameTime| {
            log.borrow_mut().push("frame");
            Ok(())
        })));
        scheduler.start(&mut host);

        let log = order.clone();
        scheduler
            .tick(&mut host, &mut graph, move |_, _| {
                log.borrow_mut().push("updates");
                Ok(())
            })
            .unwrap();
        assert_eq!(*order.borrow(), vec!["frame", "updates"]);
    }

    #[test]
    fn test_failed_tick_stops_loop() {
        let mut host = HeadlessHost::new(1.0, 1.0);
        let mut graph = SceneGraph::new();
        let mut scheduler = AnimationScheduler::new();
        scheduler.set_frame_callback(Some(Box::new(|_: &mut SceneGraph, _: FrameTime| {
            Err(anyhow::anyhow!("bad frame"))
        })));
        scheduler.start(&mut host);

        let err = scheduler.tick(&mut host, &mut graph, |_, _| Ok(())).unwrap_err();
        assert!(matches!(err, RuntimeError::FrameCallback(_)));
        assert!(!scheduler.is_running());
        assert_eq!(host.frames_requested(), 1);
        assert_eq!(scheduler.ticks(), 0);
    }
}
