use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Debug, Default)]
struct ClockShared {
    installed: AtomicBool,
    elapsed_ms: AtomicU64,
}

/// Controllable time source that drives scene animations in fixed ticks.
///
/// While installed, the clock is the only time source of every animation bound to it through a
/// [`ClockHandle`]; nothing reads wall-clock time. The clock itself lives on the control thread.
/// Handles are cheap to clone and may be read (and released) from the render thread.
#[derive(Debug)]
pub struct VirtualClock {
    tick_ms: u64,
    shared: Arc<ClockShared>,
}

impl VirtualClock {
    /// Create an uninstalled clock advancing `tick_ms` per [`VirtualClock::advance`].
    pub fn new(tick_ms: u64) -> Self {
        Self {
            tick_ms,
            shared: Arc::new(ClockShared::default()),
        }
    }

    /// Clock for a frame rate: one tick is `1000 / fps` ms, truncated.
    pub fn for_fps(fps: u32) -> Self {
        Self::new(1000 / u64::from(fps.max(1)))
    }

    /// Fixed increment applied by [`VirtualClock::advance`].
    pub fn tick_ms(&self) -> u64 {
        self.tick_ms
    }

    /// Activate the clock and reset elapsed time to zero.
    pub fn install(&mut self) {
        self.shared.elapsed_ms.store(0, Ordering::Release);
        self.shared.installed.store(true, Ordering::Release);
        tracing::debug!(tick_ms = self.tick_ms, "virtual clock installed");
    }

    /// Deactivate the clock. Elapsed time is kept for inspection.
    pub fn uninstall(&mut self) {
        if self.shared.installed.swap(false, Ordering::AcqRel) {
            tracing::debug!(elapsed_ms = self.elapsed_ms(), "virtual clock uninstalled");
        }
    }

    /// Return `true` while installed.
    pub fn is_installed(&self) -> bool {
        self.shared.installed.load(Ordering::Acquire)
    }

    /// Move time forward by exactly one tick.
    ///
    /// Must only be called while installed: debug builds panic, release builds ignore the call.
    pub fn advance(&mut self) {
        self.advance_by(self.tick_ms);
    }

    /// Move time forward by `ms` in a single step.
    ///
    /// Same installation requirement as [`VirtualClock::advance`].
    pub fn advance_by(&mut self, ms: u64) {
        let installed = self.is_installed();
        debug_assert!(installed, "virtual clock advanced while not installed");
        if !installed {
            return;
        }
        self.shared.elapsed_ms.fetch_add(ms, Ordering::AcqRel);
    }

    /// Current virtual time in milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        self.shared.elapsed_ms.load(Ordering::Acquire)
    }

    /// Bind a new consumer to this clock.
    pub fn handle(&self) -> ClockHandle {
        ClockHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Read side of a [`VirtualClock`], held by animation consumers.
///
/// Every handle observes an advance as soon as [`VirtualClock::advance`] returns.
#[derive(Debug, Clone)]
pub struct ClockHandle {
    shared: Arc<ClockShared>,
}

impl ClockHandle {
    /// Current virtual time in milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        self.shared.elapsed_ms.load(Ordering::Acquire)
    }

    /// Return `true` while the owning clock is installed.
    pub fn is_installed(&self) -> bool {
        self.shared.installed.load(Ordering::Acquire)
    }

    /// Uninstall the owning clock if it is still installed.
    ///
    /// Used by the render thread during teardown. Returns `true` if this call uninstalled it.
    pub fn release(&self) -> bool {
        self.shared.installed.swap(false, Ordering::AcqRel)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/clock/driver.rs"]
mod tests;
