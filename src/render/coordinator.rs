use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, mpsc};
use std::thread::{self, JoinHandle};

use crate::clock::driver::ClockHandle;
use crate::foundation::core::{TargetSpec, Tick};
use crate::foundation::error::{FramestepError, FramestepResult};
use crate::render::context::GraphicsContext;
use crate::render::target::{FrameBuffer, OffscreenTarget};
use crate::scene::host::DisplayList;
use crate::scene::renderer::SceneRenderer;

/// Request posted from the control thread to the render thread.
#[derive(Debug)]
pub(crate) enum Request {
    /// Initialise the scene graph and create and bind the target.
    Init { spec: TargetSpec },
    /// Sync `scene`, render it, and extract the frame for `tick`.
    RenderOneFrame { tick: Tick, scene: DisplayList },
    /// Recreate the target for a new size. No reply.
    Resize { spec: TargetSpec },
    /// Tear down and hand the graphics context back.
    Stop,
}

impl Request {
    fn name(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::RenderOneFrame { .. } => "render",
            Self::Resize { .. } => "resize",
            Self::Stop => "stop",
        }
    }
}

#[derive(Debug)]
struct Envelope {
    seq: u64,
    request: Request,
}

#[derive(Debug)]
enum Reply {
    Initialised(FramestepResult<TargetState>),
    Frame(FrameOutcome),
    Stopped(Box<dyn GraphicsContext>),
}

/// Render-thread state visible from the control thread.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TargetState {
    /// The scene graph has been initialised on the render thread.
    pub scene_graph_initialised: bool,
    /// A render target exists and is bound as the scene graph's destination.
    pub target_bound: bool,
}

/// Result of one render round trip.
#[derive(Debug)]
pub enum FrameOutcome {
    /// The frame was rendered and extracted.
    Rendered(FrameBuffer),
    /// No image is available for this tick; the render thread logged why.
    Unavailable {
        /// Tick that failed.
        tick: Tick,
        /// Failure description.
        reason: String,
    },
}

#[derive(Debug)]
struct Slot {
    alive: bool,
    reply: Option<(u64, Reply)>,
    state: TargetState,
    frames_rendered: u64,
}

#[derive(Debug)]
struct Handoff {
    slot: Mutex<Slot>,
    cond: Condvar,
}

impl Handoff {
    fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                alive: true,
                reply: None,
                state: TargetState::default(),
                frames_rendered: 0,
            }),
            cond: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks the render thread as gone however it exits, so a waiting control thread wakes up.
struct AliveGuard(Arc<Handoff>);

impl Drop for AliveGuard {
    fn drop(&mut self) {
        let mut slot = self.0.lock();
        slot.alive = false;
        self.0.cond.notify_all();
    }
}

/// Control-thread handle of the dedicated render thread.
///
/// Requests travel over a FIFO queue. For synchronous requests the control thread holds the
/// handoff lock while posting and waits on the condition variable until the reply for that exact
/// request is stored. The render thread takes the same lock before doing the work, stores the
/// reply, signals, then unlocks; the wake-up cannot be lost.
#[derive(Debug)]
pub struct RenderCoordinator {
    tx: Option<mpsc::Sender<Envelope>>,
    handoff: Arc<Handoff>,
    worker: Option<JoinHandle<()>>,
    next_seq: u64,
}

impl RenderCoordinator {
    /// Start the render thread, moving `context` and a clock handle to it.
    pub fn spawn(context: Box<dyn GraphicsContext>, clock: ClockHandle) -> FramestepResult<Self> {
        let (tx, rx) = mpsc::channel::<Envelope>();
        let handoff = Arc::new(Handoff::new());
        let worker_handoff = Arc::clone(&handoff);

        let worker = thread::Builder::new()
            .name("framestep-render".to_owned())
            .spawn(move || RenderWorker::new(context, clock, worker_handoff).run(rx))
            .map_err(|e| FramestepError::graphics(format!("failed to spawn render thread: {e}")))?;

        tracing::debug!("render thread started");
        Ok(Self {
            tx: Some(tx),
            handoff,
            worker: Some(worker),
            next_seq: 0,
        })
    }

    /// Synchronously initialise the scene graph and target.
    pub fn init(&mut self, spec: TargetSpec) -> FramestepResult<TargetState> {
        match self.round_trip(Request::Init { spec })? {
            Reply::Initialised(result) => result,
            other => Err(unexpected(&other)),
        }
    }

    /// Synchronously render one frame.
    pub fn render_frame(&mut self, tick: Tick, scene: DisplayList) -> FramestepResult<FrameOutcome> {
        match self.round_trip(Request::RenderOneFrame { tick, scene })? {
            Reply::Frame(outcome) => Ok(outcome),
            other => Err(unexpected(&other)),
        }
    }

    /// Post a resize without waiting. Ordered before every later request.
    pub fn resize(&mut self, spec: TargetSpec) -> FramestepResult<()> {
        let seq = self.take_seq();
        self.sender()?
            .send(Envelope {
                seq,
                request: Request::Resize { spec },
            })
            .map_err(|_| render_thread_gone())
    }

    /// Run the teardown handshake, join the render thread, and return the graphics context.
    pub fn stop(&mut self) -> FramestepResult<Box<dyn GraphicsContext>> {
        let reply = self.round_trip(Request::Stop);
        self.tx = None;
        let joined = self.worker.take().map(JoinHandle::join);
        if let Some(Err(_)) = joined {
            tracing::error!("render thread panicked");
        }

        match reply? {
            Reply::Stopped(context) => {
                tracing::debug!("render thread stopped");
                Ok(context)
            }
            other => Err(unexpected(&other)),
        }
    }

    /// Return `true` once [`RenderCoordinator::stop`] has run.
    pub fn is_stopped(&self) -> bool {
        self.tx.is_none()
    }

    /// Last state reported by the render thread.
    pub fn target_state(&self) -> TargetState {
        self.handoff.lock().state
    }

    /// Frames successfully rendered and extracted so far.
    pub fn frames_rendered(&self) -> u64 {
        self.handoff.lock().frames_rendered
    }

    fn take_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn sender(&self) -> FramestepResult<&mpsc::Sender<Envelope>> {
        self.tx
            .as_ref()
            .ok_or_else(|| FramestepError::state("render thread already stopped"))
    }

    fn round_trip(&mut self, request: Request) -> FramestepResult<Reply> {
        let seq = self.take_seq();
        let name = request.name();
        let tx = self.sender()?;

        let mut slot = self.handoff.lock();
        if !slot.alive {
            return Err(render_thread_gone());
        }
        tx.send(Envelope { seq, request })
            .map_err(|_| render_thread_gone())?;

        slot = self
            .handoff
            .cond
            .wait_while(slot, |s| {
                s.alive && !matches!(&s.reply, Some((done, _)) if *done == seq)
            })
            .unwrap_or_else(PoisonError::into_inner);

        match slot.reply.take() {
            Some((done, reply)) if done == seq => Ok(reply),
            _ => Err(FramestepError::graphics(format!(
                "render thread exited before answering {name}"
            ))),
        }
    }
}

impl Drop for RenderCoordinator {
    fn drop(&mut self) {
        if self.is_stopped() {
            return;
        }
        if let Err(e) = self.stop() {
            tracing::warn!(error = %e, "render thread teardown on drop failed");
        }
    }
}

fn render_thread_gone() -> FramestepError {
    FramestepError::graphics("render thread is gone")
}

fn unexpected(reply: &Reply) -> FramestepError {
    FramestepError::state(format!("unexpected render thread reply: {reply:?}"))
}

struct RenderWorker {
    context: Option<Box<dyn GraphicsContext>>,
    clock: ClockHandle,
    renderer: SceneRenderer,
    target: OffscreenTarget,
    spec: Option<TargetSpec>,
    handoff: Arc<Handoff>,
}

impl RenderWorker {
    fn new(context: Box<dyn GraphicsContext>, clock: ClockHandle, handoff: Arc<Handoff>) -> Self {
        Self {
            context: Some(context),
            clock,
            renderer: SceneRenderer::new(),
            target: OffscreenTarget::new(),
            spec: None,
            handoff,
        }
    }

    fn run(mut self, rx: mpsc::Receiver<Envelope>) {
        let _alive = AliveGuard(Arc::clone(&self.handoff));
        let handoff = Arc::clone(&self.handoff);

        while let Ok(Envelope { seq, request }) = rx.recv() {
            let mut slot = handoff.lock();
            match request {
                Request::Init { spec } => {
                    let result = self.init(spec);
                    slot.state = self.state();
                    slot.reply = Some((seq, Reply::Initialised(result)));
                }
                Request::RenderOneFrame { tick, scene } => {
                    let outcome = self.render(tick, scene);
                    if matches!(outcome, FrameOutcome::Rendered(_)) {
                        slot.frames_rendered += 1;
                    }
                    slot.reply = Some((seq, Reply::Frame(outcome)));
                }
                Request::Resize { spec } => {
                    self.resize(spec);
                    slot.state = self.state();
                }
                Request::Stop => {
                    let context = self.cleanup();
                    slot.state = TargetState::default();
                    match context {
                        Some(context) => slot.reply = Some((seq, Reply::Stopped(context))),
                        None => tracing::error!("graphics context missing at teardown"),
                    }
                    handoff.cond.notify_one();
                    return;
                }
            }
            handoff.cond.notify_one();
            drop(slot);
        }

        // Control side went away without a stop request.
        let _ = self.cleanup();
    }

    fn context(&mut self) -> FramestepResult<&mut Box<dyn GraphicsContext>> {
        self.context
            .as_mut()
            .ok_or_else(|| FramestepError::state("graphics context already handed back"))
    }

    fn state(&self) -> TargetState {
        TargetState {
            scene_graph_initialised: self.renderer.is_initialised(),
            target_bound: self.target.is_bound(),
        }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    fn init(&mut self, spec: TargetSpec) -> FramestepResult<TargetState> {
        self.spec = Some(spec);
        self.context()?.make_current()?;
        self.renderer.initialise();
        self.ensure_target()?;
        Ok(self.state())
    }

    fn ensure_target(&mut self) -> FramestepResult<()> {
        if self.target.is_created() && self.target.is_bound() {
            return Ok(());
        }
        let spec = self
            .spec
            .ok_or_else(|| FramestepError::state("no target spec received"))?;
        self.target.create(spec)?;
        self.target.bind_as_render_destination(&mut self.renderer)
    }

    fn render(&mut self, tick: Tick, scene: DisplayList) -> FrameOutcome {
        match self.try_render(tick, scene) {
            Ok(frame) => FrameOutcome::Rendered(frame),
            Err(e) => {
                tracing::warn!(tick = tick.index(), error = %e, "frame unavailable");
                FrameOutcome::Unavailable {
                    tick,
                    reason: e.to_string(),
                }
            }
        }
    }

    fn try_render(&mut self, tick: Tick, scene: DisplayList) -> FramestepResult<FrameBuffer> {
        self.context()?.make_current()?;
        self.ensure_target()?;
        self.renderer.sync(scene)?;
        self.renderer.render(&mut self.target)?;
        self.target.flush()?;
        self.context()?.flush()?;
        self.target.extract_image(tick)
    }

    fn resize(&mut self, spec: TargetSpec) {
        self.spec = Some(spec);
        if !self.target.is_created() {
            return;
        }
        let result = self
            .context()
            .and_then(|ctx| ctx.make_current())
            .and_then(|()| self.target.create(spec))
            .and_then(|_| self.target.bind_as_render_destination(&mut self.renderer));
        if let Err(e) = result {
            tracing::warn!(error = %e, "resize failed; target will be recreated on next frame");
            self.target.destroy();
        }
    }

    fn cleanup(&mut self) -> Option<Box<dyn GraphicsContext>> {
        let mut context = self.context.take()?;
        if let Err(e) = context.make_current() {
            tracing::warn!(error = %e, "make current failed during teardown");
        }
        self.renderer.invalidate();
        self.target.destroy();
        context.done_current();
        if self.clock.release() {
            tracing::debug!("virtual clock uninstalled by render thread");
        }
        Some(context)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/coordinator.rs"]
mod tests;
