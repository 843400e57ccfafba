use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::clock::driver::VirtualClock;
use crate::encode::frame_sink::{FrameSink, PendingSave, SaveState};
use crate::encode::sink::{ImageFileSink, ImageSink};
use crate::foundation::core::Tick;
use crate::foundation::error::{FramestepError, FramestepResult};
use crate::render::context::{CpuContext, GraphicsContext};
use crate::render::coordinator::{FrameOutcome, RenderCoordinator, TargetState};
use crate::scene::host::SceneGraphHost;
use crate::scene::loader::{ComponentLoader, JsonSceneLoader, SceneSource};
use crate::session::config::{RenderConfig, SeekMode};

const SAVE_POLL: Duration = Duration::from_millis(50);

/// Session lifecycle. `NotRunning` is both the initial and the terminal state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionStatus {
    /// Not initialised yet, or finished.
    #[default]
    NotRunning,
    /// Scene loaded, target bound, clock installed.
    Initialised,
    /// Frame loop active.
    Running,
}

/// Requests a stop from outside the frame loop.
///
/// The loop checks the flag before every control event, so a stop never interrupts a frame.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Ask the session to stop before its next cycle.
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Return `true` once a stop was requested.
    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Summary handed to the finished callback and returned by [`RenderSession::run`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderReport {
    /// Frames a full render produces.
    pub calculated_frames: u64,
    /// Frames rendered and extracted.
    pub actual_frames: u64,
    /// Selected frame in single-frame mode.
    pub select_frame: Option<u64>,
    /// Frames handed to the saver.
    pub submitted: usize,
    /// Saves finished (including failed ones).
    pub completed: usize,
    /// Saves that failed.
    pub failed: usize,
    /// Successfully written outputs in tick order.
    pub outputs: Vec<PathBuf>,
    /// The loop was stopped before it ran out of frames.
    pub stopped_early: bool,
}

/// What one [`RenderSession::step`] did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Progress {
    /// A cycle rendered `tick`; `submitted` tells whether the frame went to the saver.
    Rendered {
        /// Rendered tick.
        tick: Tick,
        /// The frame was submitted for saving.
        submitted: bool,
    },
    /// A cycle produced no image.
    Unavailable {
        /// Abandoned tick.
        tick: Tick,
        /// Failure reported by the render thread.
        reason: String,
    },
    /// Scheduling is over and saves are still in flight.
    Waiting {
        /// Saves not completed yet.
        outstanding: usize,
    },
    /// The session finished.
    Finished(RenderReport),
}

/// Pluggable collaborators of a session.
pub struct SessionCollaborators {
    /// Scene loader.
    pub loader: Box<dyn ComponentLoader>,
    /// Destination of saved frames.
    pub sink: Arc<dyn ImageSink>,
    /// Graphics context handed to the render thread.
    pub context: Box<dyn GraphicsContext>,
}

impl Default for SessionCollaborators {
    fn default() -> Self {
        Self {
            loader: Box::new(JsonSceneLoader),
            sink: Arc::new(ImageFileSink),
            context: Box::new(CpuContext::new()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ControlEvent {
    RenderNext,
}

type FinishedCallback = Box<dyn FnOnce(&RenderReport) + Send>;

/// Drives a scene through the frame-stepped pipeline.
///
/// All methods run on the control thread. The render thread is owned through a
/// [`RenderCoordinator`]; saves run on the [`FrameSink`] pool.
pub struct RenderSession {
    config: RenderConfig,
    status: SessionStatus,
    loader: Box<dyn ComponentLoader>,
    context: Option<Box<dyn GraphicsContext>>,
    host: SceneGraphHost,
    clock: VirtualClock,
    coordinator: Option<RenderCoordinator>,
    frames: FrameSink,
    posted: VecDeque<ControlEvent>,
    next_tick: u64,
    actual_frames: u64,
    stop: StopHandle,
    stopped_early: bool,
    on_finished: Option<FinishedCallback>,
    report: Option<RenderReport>,
}

impl std::fmt::Debug for RenderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSession")
            .field("config", &self.config)
            .field("status", &self.status)
            .field("next_tick", &self.next_tick)
            .field("actual_frames", &self.actual_frames)
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}

impl RenderSession {
    /// Session with the JSON loader, file output, and the CPU graphics context.
    pub fn new(config: RenderConfig) -> FramestepResult<Self> {
        Self::with_collaborators(config, SessionCollaborators::default())
    }

    /// Session with explicit collaborators. Fails on invalid configuration.
    pub fn with_collaborators(
        config: RenderConfig,
        collaborators: SessionCollaborators,
    ) -> FramestepResult<Self> {
        config.validate()?;
        let frames = FrameSink::new(collaborators.sink, config.save_threads)?;
        Ok(Self {
            status: SessionStatus::NotRunning,
            loader: collaborators.loader,
            context: Some(collaborators.context),
            host: SceneGraphHost::new(config.size()),
            clock: VirtualClock::for_fps(config.fps),
            coordinator: None,
            frames,
            posted: VecDeque::new(),
            next_tick: 0,
            actual_frames: 0,
            stop: StopHandle::default(),
            stopped_early: false,
            on_finished: None,
            report: None,
            config,
        })
    }

    /// Load the scene, start the render thread, create the target, and install the clock.
    ///
    /// A no-op while already initialised or running. On failure no render work happens and the
    /// session stays `NotRunning`.
    #[tracing::instrument(level = "info", skip(self, source), fields(source = %source))]
    pub fn initialise(&mut self, source: &SceneSource) -> FramestepResult<()> {
        if self.status != SessionStatus::NotRunning {
            tracing::debug!(status = ?self.status, "initialise ignored");
            return Ok(());
        }
        if self.report.is_some() {
            return Err(FramestepError::state("session already finished"));
        }

        if let Err(e) = self.host.load(self.loader.as_ref(), source) {
            if let FramestepError::SceneLoad(errors) = &e {
                for err in errors {
                    tracing::error!(error = %err, "scene error");
                }
            }
            return Err(e);
        }
        self.host.bind_clock(self.clock.handle());

        let context = self
            .context
            .take()
            .ok_or_else(|| FramestepError::state("graphics context is not available"))?;
        let mut coordinator = RenderCoordinator::spawn(context, self.clock.handle())?;
        if let Err(e) = coordinator.init(self.config.target_spec()) {
            match coordinator.stop() {
                Ok(context) => self.context = Some(context),
                Err(stop_err) => tracing::warn!(error = %stop_err, "teardown after failed init"),
            }
            return Err(e);
        }
        self.coordinator = Some(coordinator);

        self.clock.install();
        self.status = SessionStatus::Initialised;
        tracing::info!(
            calculated_frames = self.calculated_frames(),
            single_frame = self.config.single_frame,
            "session initialised"
        );
        Ok(())
    }

    /// Arm the frame loop. A no-op while running.
    ///
    /// The first render cycle is posted here and runs on the very next [`RenderSession::step`],
    /// which never waits before producing it. A full render with zero calculated frames finishes
    /// immediately without any cycle.
    #[tracing::instrument(level = "info", skip(self))]
    pub fn start(&mut self) -> FramestepResult<()> {
        match self.status {
            SessionStatus::Running => {
                tracing::debug!("start ignored: already running");
                return Ok(());
            }
            SessionStatus::NotRunning => {
                return Err(FramestepError::state(
                    "start requires an initialised session",
                ));
            }
            SessionStatus::Initialised => {}
        }
        self.status = SessionStatus::Running;

        if !self.config.single_frame && self.calculated_frames() == 0 {
            tracing::info!(
                duration_ms = self.config.duration_ms,
                fps = self.config.fps,
                "no frames to render"
            );
            self.finish()?;
            return Ok(());
        }

        if self.config.single_frame && self.config.seek == SeekMode::Jump {
            let skip = self.target_frame() - 1;
            self.clock.advance_by(skip * self.clock.tick_ms());
            self.next_tick = skip;
            tracing::debug!(ticks = skip, "clock jumped to selected frame");
        }

        self.posted.push_back(ControlEvent::RenderNext);
        Ok(())
    }

    /// Process one control event: a stop request, a render cycle, or a save completion.
    pub fn step(&mut self) -> FramestepResult<Progress> {
        match self.status {
            SessionStatus::Running => {}
            SessionStatus::Initialised => {
                return Err(FramestepError::state("start the session before stepping"));
            }
            SessionStatus::NotRunning => {
                return self
                    .report
                    .clone()
                    .map(Progress::Finished)
                    .ok_or_else(|| FramestepError::state("session is not running"));
            }
        }

        if self.stop.is_stop_requested() {
            return self.stop().map(Progress::Finished);
        }
        self.frames.drain_completions();

        if let Some(ControlEvent::RenderNext) = self.posted.pop_front() {
            return self.render_cycle();
        }

        if self.frames.outstanding() > 0 {
            self.frames.wait_completion(SAVE_POLL);
            self.frames.drain_completions();
        }
        let outstanding = self.frames.outstanding();
        if outstanding == 0 {
            return self.finish().map(Progress::Finished);
        }
        Ok(Progress::Waiting { outstanding })
    }

    /// Step until finished, starting the loop first if needed.
    ///
    /// The session must have been initialised.
    pub fn run(&mut self) -> FramestepResult<RenderReport> {
        if self.status == SessionStatus::Initialised {
            self.start()?;
        }
        loop {
            if let Progress::Finished(report) = self.step()? {
                return Ok(report);
            }
        }
    }

    /// Stop now: tear the render thread down, drop scheduled cycles, wait for in-flight saves.
    #[tracing::instrument(level = "info", skip(self))]
    pub fn stop(&mut self) -> FramestepResult<RenderReport> {
        if self.status == SessionStatus::NotRunning {
            return self
                .report
                .clone()
                .ok_or_else(|| FramestepError::state("session was never initialised"));
        }
        let dropped = self.posted.len();
        self.posted.clear();
        self.stopped_early = true;
        tracing::info!(next_tick = self.next_tick, dropped, "stopping render loop");

        self.release_render_thread();
        self.frames.wait_idle();
        self.finish()
    }

    /// Change the target size. The render thread recreates the target before the next cycle.
    pub fn resize(&mut self, width: u32, height: u32, dpr: f64) -> FramestepResult<()> {
        let mut next = self.config.clone();
        next.width = width;
        next.height = height;
        next.device_pixel_ratio = dpr;
        next.target_spec().validate()?;

        self.host.resize(next.size());
        if let Some(coordinator) = self.coordinator.as_mut() {
            coordinator.resize(next.target_spec())?;
        }
        tracing::info!(width, height, dpr, "resize requested");
        self.config = next;
        Ok(())
    }

    /// Register a callback fired once when the session finishes.
    ///
    /// Fires immediately if the session already finished.
    pub fn on_finished(&mut self, callback: impl FnOnce(&RenderReport) + Send + 'static) {
        match &self.report {
            Some(report) => callback(report),
            None => self.on_finished = Some(Box::new(callback)),
        }
    }

    /// Handle for stopping the loop from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Current configuration.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Lifecycle state.
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Return `true` once the session finished.
    pub fn is_finished(&self) -> bool {
        self.report.is_some()
    }

    /// Frames a full render produces.
    pub fn calculated_frames(&self) -> u64 {
        self.config.calculated_frames()
    }

    /// Frames rendered and extracted so far.
    pub fn actual_frames(&self) -> u64 {
        self.actual_frames
    }

    /// Frame selected for single-frame mode.
    pub fn select_frame(&self) -> u64 {
        self.config.select_frame()
    }

    /// The scene graph is initialised on the render thread.
    pub fn scene_graph_initialised(&self) -> bool {
        self.target_state().scene_graph_initialised
    }

    /// The render target exists and is bound.
    pub fn target_bound(&self) -> bool {
        self.target_state().target_bound
    }

    /// The virtual clock is installed.
    pub fn clock_running(&self) -> bool {
        self.clock.is_installed()
    }

    /// Virtual time in milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        self.clock.elapsed_ms()
    }

    /// Every submitted save in submission order.
    pub fn pending_saves(&self) -> &[PendingSave] {
        self.frames.pending()
    }

    /// Final report, once finished.
    pub fn report(&self) -> Option<&RenderReport> {
        self.report.as_ref()
    }

    fn target_state(&self) -> TargetState {
        self.coordinator
            .as_ref()
            .map(RenderCoordinator::target_state)
            .unwrap_or_default()
    }

    fn target_frame(&self) -> u64 {
        self.select_frame().max(1)
    }

    fn render_cycle(&mut self) -> FramestepResult<Progress> {
        let tick = Tick::new(self.next_tick, self.clock.tick_ms());
        debug_assert_eq!(tick.elapsed_ms(), self.clock.elapsed_ms());

        let scene = self.host.polish()?;
        let coordinator = self
            .coordinator
            .as_mut()
            .ok_or_else(|| FramestepError::state("render thread is not running"))?;
        let outcome = coordinator.render_frame(tick, scene)?;
        self.next_tick += 1;

        let wanted = !self.config.single_frame || tick.frame_number() == self.target_frame();
        let progress = match outcome {
            FrameOutcome::Rendered(frame) => {
                self.actual_frames += 1;
                if wanted {
                    let path = self.config.output_path(tick.frame_number());
                    self.frames.submit(frame, path);
                }
                tracing::debug!(tick = tick.index(), submitted = wanted, "cycle complete");
                Progress::Rendered {
                    tick,
                    submitted: wanted,
                }
            }
            FrameOutcome::Unavailable { tick, reason } => Progress::Unavailable { tick, reason },
        };

        self.clock.advance();

        let more = if self.config.single_frame {
            tick.frame_number() < self.target_frame()
        } else {
            self.next_tick < self.calculated_frames()
        };
        if more {
            self.posted.push_back(ControlEvent::RenderNext);
        } else {
            tracing::debug!(ticks = self.next_tick, "scheduling complete");
        }
        Ok(progress)
    }

    fn release_render_thread(&mut self) {
        if let Some(mut coordinator) = self.coordinator.take() {
            match coordinator.stop() {
                Ok(context) => self.context = Some(context),
                Err(e) => tracing::warn!(error = %e, "render thread teardown failed"),
            }
        }
        self.clock.uninstall();
    }

    fn finish(&mut self) -> FramestepResult<RenderReport> {
        self.release_render_thread();
        self.status = SessionStatus::NotRunning;

        let mut saved: Vec<&PendingSave> = self
            .frames
            .pending()
            .iter()
            .filter(|p| p.state == SaveState::Saved)
            .collect();
        saved.sort_by_key(|p| p.tick);
        let report = RenderReport {
            calculated_frames: self.calculated_frames(),
            actual_frames: self.actual_frames,
            select_frame: self.config.single_frame.then(|| self.select_frame()),
            submitted: self.frames.submitted(),
            completed: self.frames.completed(),
            failed: self.frames.failed(),
            outputs: saved.into_iter().map(|p| p.path.clone()).collect(),
            stopped_early: self.stopped_early,
        };

        let c = &self.config;
        tracing::info!(
            width = c.width,
            height = c.height,
            device_pixel_ratio = c.device_pixel_ratio,
            pixel_format = ?c.pixel_format,
            fps = c.fps,
            duration_ms = c.duration_ms,
            single_frame = c.single_frame,
            frame_time_ms = c.frame_time_ms,
            seek = ?c.seek,
            output_dir = %c.output_dir.display(),
            output_name = %c.output_name,
            output_format = %c.output_format,
            calculated_frames = report.calculated_frames,
            actual_frames = report.actual_frames,
            select_frame = ?report.select_frame,
            saved = report.outputs.len(),
            failed = report.failed,
            stopped_early = report.stopped_early,
            "render session finished"
        );

        self.report = Some(report.clone());
        if let Some(callback) = self.on_finished.take() {
            callback(&report);
        }
        Ok(report)
    }
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        if self.coordinator.is_some() {
            self.release_render_thread();
        }
        self.frames.wait_idle();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/render_session.rs"]
mod tests;
