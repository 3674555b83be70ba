//! Frame scheduling hosts
//!
//! A host owns the clock, hands out frame requests and provides the drawing
//! surface. The animation loop only ever suspends inside
//! [`FrameHost::wait_for_frame`].

use canvas_compositor::{RecordingSurface, Surface};
use glam::Vec2;
use std::thread;
use std::time::{Duration, Instant};

/// Handle of a pending frame request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Source of frame timing
pub trait FrameHost {
    /// Monotonic time since the host was created
    fn now(&self) -> Duration;

    /// Ask for one frame; replaces any request still pending
    fn request_frame(&mut self) -> FrameHandle;

    /// Drop a pending request; stale handles are ignored
    fn cancel_frame(&mut self, handle: FrameHandle);

    /// Block until the pending frame is due
    ///
    /// Returns false when no frame is pending.
    fn wait_for_frame(&mut self) -> bool;
}

/// Frame host that can also provide a drawing surface
pub trait Host: FrameHost {
    type Surface: Surface;

    fn acquire_surface(&mut self) -> Option<Self::Surface>;
}

/// Frame interval for a rational frame rate
pub fn frame_interval(fps_num: u32, fps_den: u32) -> Duration {
    if fps_num == 0 {
        return Duration::ZERO;
    }
    let frame_interval_ns = (fps_den as u64 * 1_000_000_000) / fps_num as u64;
    Duration::from_nanos(frame_interval_ns)
}

/// Host with a virtual clock and a recording surface
///
/// Waiting for a frame advances the clock by one frame interval instead of
/// sleeping.
#[derive(Debug, Clone)]
pub struct HeadlessHost {
    clock: Duration,
    frame_interval: Duration,
    next_handle: u64,
    pending: Option<FrameHandle>,
    surface_size: Option<Vec2>,
    frames_requested: u64,
}

impl HeadlessHost {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            clock: Duration::ZERO,
            frame_interval: frame_interval(60, 1),
            next_handle: 0,
            pending: None,
            surface_size: Some(Vec2::new(width, height)),
            frames_requested: 0,
        }
    }

    /// Host whose surface can never be acquired
    pub fn without_surface() -> Self {
        Self {
            surface_size: None,
            ..Self::new(0.0, 0.0)
        }
    }

    pub fn with_frame_rate(mut self, fps_num: u32, fps_den: u32) -> Self {
        self.frame_interval = frame_interval(fps_num, fps_den);
        self
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    /// Move the virtual clock forward
    pub fn advance(&mut self, by: Duration) {
        self.clock += by;
    }

    pub fn pending(&self) -> Option<FrameHandle> {
        self.pending
    }

    pub fn frames_requested(&self) -> u64 {
        self.frames_requested
    }
}

impl FrameHost for HeadlessHost {
    fn now(&self) -> Duration {
        self.clock
    }

    fn request_frame(&mut self) -> FrameHandle {
        self.next_handle += 1;
        self.frames_requested += 1;
        let handle = FrameHandle(self.next_handle);
        self.pending = Some(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
        }
    }

    fn wait_for_frame(&mut self) -> bool {
        if self.pending.take().is_none() {
            return false;
        }
        self.clock += self.frame_interval;
        true
    }
}

impl Host for HeadlessHost {
    type Surface = RecordingSurface;

    fn acquire_surface(&mut self) -> Option<RecordingSurface> {
        self.surface_size
            .map(|size| RecordingSurface::new(size.x, size.y))
    }
}

/// Wall-clock host paced to a fixed frame rate
///
/// The surface is handed out once.
#[derive(Debug)]
pub struct FramePacer<S> {
    epoch: Instant,
    frame_interval: Duration,
    last_frame: Option<Instant>,
    next_handle: u64,
    pending: Option<FrameHandle>,
    surface: Option<S>,
}

impl<S: Surface> FramePacer<S> {
    pub fn new(surface: S, fps_num: u32, fps_den: u32) -> Self {
        Self {
            epoch: Instant::now(),
            frame_interval: frame_interval(fps_num, fps_den),
            last_frame: None,
            next_handle: 0,
            pending: None,
            surface: Some(surface),
        }
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }
}

impl<S: Surface> FrameHost for FramePacer<S> {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    fn request_frame(&mut self) -> FrameHandle {
        self.next_handle += 1;
        let handle = FrameHandle(self.next_handle);
        self.pending = Some(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
        }
    }

    fn wait_for_frame(&mut self) -> bool {
        if self.pending.take().is_none() {
            return false;
        }

        let now = Instant::now();
        let deadline = match self.last_frame {
            Some(last) => last + self.frame_interval,
            None => now,
        };
        if deadline > now {
            thread::sleep(deadline - now);
        }
        // Late frames re-anchor instead of bursting to catch up
        self.last_frame = Some(deadline.max(now));
        true
    }
}

impl<S: Surface> Host for FramePacer<S> {
    type Surface = S;

    fn acquire_surface(&mut self) -> Option<S> {
        self.surface.take()
    }
}
