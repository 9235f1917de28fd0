use tracing::{debug, warn};

use crate::gl::Gl;
use crate::renderer::{FrameOutcome, Renderer};

/// The host's once-per-refresh callback primitive
/// (`requestAnimationFrame` in the browser).
pub trait FrameScheduler {
    type Handle;

    /// Asks for one more frame callback. `None` if the host refused.
    fn request_frame(&mut self) -> Option<Self::Handle>;
    fn cancel_frame(&mut self, handle: Self::Handle);
}

/// Cooperative render loop: every tick draws (or skips) one frame and asks
/// for the next; stopping cancels the outstanding request.
pub struct RenderLoop<G: Gl, S: FrameScheduler> {
    renderer: Renderer<G>,
    scheduler: S,
    pending: Option<S::Handle>,
    running: bool,
}

impl<G: Gl, S: FrameScheduler> RenderLoop<G, S> {
    pub fn new(renderer: Renderer<G>, scheduler: S) -> Self {
        Self {
            renderer,
            scheduler,
            pending: None,
            running: false,
        }
    }

    /// Schedules the first frame. An inert renderer never starts.
    pub fn start(&mut self) -> bool {
        if self.running {
            return true;
        }
        if self.renderer.is_inert() {
            debug!("inert renderer, render loop not started");
            return false;
        }
        self.running = true;
        self.schedule();
        self.running
    }

    /// Frame callback body. Returns `None` when the loop is no longer live.
    pub fn tick(&mut self, now_ms: f64) -> Option<FrameOutcome> {
        self.pending = None;
        if !self.running {
            return None;
        }
        let outcome = self.renderer.render_frame(now_ms);
        self.schedule();
        Some(outcome)
    }

    fn schedule(&mut self) {
        self.pending = self.scheduler.request_frame();
        if self.pending.is_none() {
            warn!("frame request refused, render loop stopped");
            self.running = false;
        }
    }

    /// Stops scheduling and releases the renderer's GPU resources.
    pub fn stop(&mut self) {
        self.running = false;
        if let Some(handle) = self.pending.take() {
            self.scheduler.cancel_frame(handle);
        }
        self.renderer.release();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn renderer(&self) -> &Renderer<G> {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer<G> {
        &mut self.renderer
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }
}

impl<G: Gl, S: FrameScheduler> Drop for RenderLoop<G, S> {
    fn drop(&mut self) {
        self.stop();
    }
}
