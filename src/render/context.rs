use std::thread::{self, ThreadId};

use crate::foundation::error::{FramestepError, FramestepResult};

/// Graphics context that can be current on at most one thread at a time.
///
/// A session creates the context on the control thread, moves it to the render thread for the
/// lifetime of the render loop, and gets it back once teardown finishes.
pub trait GraphicsContext: Send + std::fmt::Debug {
    /// Make the context current on the calling thread. Idempotent on the owning thread.
    fn make_current(&mut self) -> FramestepResult<()>;

    /// Release the context from the calling thread.
    fn done_current(&mut self);

    /// Return `true` when current on the calling thread.
    fn is_current(&self) -> bool;

    /// Submit outstanding work. Requires the context to be current.
    fn flush(&mut self) -> FramestepResult<()>;
}

/// Context for the CPU rasterizer.
///
/// Tracks currency and flushes so thread-affinity mistakes surface as errors.
#[derive(Debug, Default)]
pub struct CpuContext {
    current_on: Option<ThreadId>,
    flushes: u64,
}

impl CpuContext {
    /// Context that is not current anywhere.
    pub fn new() -> Self {
        Self::default()
    }

    /// Flushes submitted so far.
    pub fn flushes(&self) -> u64 {
        self.flushes
    }
}

impl GraphicsContext for CpuContext {
    fn make_current(&mut self) -> FramestepResult<()> {
        let me = thread::current().id();
        match self.current_on {
            Some(owner) if owner != me => Err(FramestepError::graphics(
                "graphics context is current on another thread",
            )),
            _ => {
                self.current_on = Some(me);
                Ok(())
            }
        }
    }

    fn done_current(&mut self) {
        self.current_on = None;
    }

    fn is_current(&self) -> bool {
        self.current_on == Some(thread::current().id())
    }

    fn flush(&mut self) -> FramestepResult<()> {
        if !self.is_current() {
            return Err(FramestepError::graphics(
                "flush on a graphics context that is not current",
            ));
        }
        self.flushes += 1;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/context.rs"]
mod tests;
