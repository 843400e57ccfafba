use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::{Arc, mpsc};
use std::time::Duration;

use crate::encode::sink::ImageSink;
use crate::foundation::core::Tick;
use crate::foundation::error::{FramestepError, FramestepResult};
use crate::render::target::FrameBuffer;

/// Lifecycle of one submitted save.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaveState {
    /// Submitted, no completion seen yet.
    InFlight,
    /// Written successfully.
    Saved,
    /// Writing failed with this message.
    Failed(String),
}

/// One submitted save and its state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingSave {
    /// Tick of the frame.
    pub tick: Tick,
    /// Destination path.
    pub path: PathBuf,
    /// Current state.
    pub state: SaveState,
}

/// Completion notification posted by a pool worker.
#[derive(Debug)]
pub struct SaveCompletion {
    /// Tick of the frame.
    pub tick: Tick,
    /// Destination path.
    pub path: PathBuf,
    /// Outcome of [`ImageSink::save`].
    pub result: Result<(), String>,
}

/// Saves frames asynchronously on a worker pool.
///
/// Each submitted frame becomes a pending entry. Completions arrive over a channel and are
/// applied on the control thread through [`FrameSink::on_completion`]; entries are never removed,
/// so the list doubles as a save log.
pub struct FrameSink {
    pool: rayon::ThreadPool,
    sink: Arc<dyn ImageSink>,
    tx: mpsc::Sender<SaveCompletion>,
    rx: mpsc::Receiver<SaveCompletion>,
    pending: Vec<PendingSave>,
}

impl std::fmt::Debug for FrameSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSink")
            .field("threads", &self.pool.current_num_threads())
            .field("pending", &self.pending)
            .finish()
    }
}

impl FrameSink {
    /// Create a saver writing through `sink` with `threads` workers (`None` uses rayon's default).
    pub fn new(sink: Arc<dyn ImageSink>, threads: Option<usize>) -> FramestepResult<Self> {
        let pool = build_thread_pool(threads)?;
        let (tx, rx) = mpsc::channel();
        Ok(Self {
            pool,
            sink,
            tx,
            rx,
            pending: Vec::new(),
        })
    }

    /// Hand `frame` to the pool for writing to `path`. Returns immediately.
    pub fn submit(&mut self, frame: FrameBuffer, path: PathBuf) {
        let tick = frame.tick;
        self.pending.push(PendingSave {
            tick,
            path: path.clone(),
            state: SaveState::InFlight,
        });
        tracing::debug!(tick = tick.index(), path = %path.display(), "frame save submitted");

        let sink = Arc::clone(&self.sink);
        let tx = self.tx.clone();
        self.pool.spawn(move || {
            let result = catch_unwind(AssertUnwindSafe(|| sink.save(&frame, &path)))
                .unwrap_or_else(|_| Err(FramestepError::save("image sink panicked")))
                .map_err(|e| e.to_string());
            // The receiver only disappears when the saver itself was dropped.
            let _ = tx.send(SaveCompletion { tick, path, result });
        });
    }

    /// Apply a completion. Returns `false` when it matches no in-flight entry.
    pub fn on_completion(&mut self, completion: SaveCompletion) -> bool {
        let Some(entry) = self.pending.iter_mut().find(|p| {
            p.tick == completion.tick
                && p.path == completion.path
                && p.state == SaveState::InFlight
        }) else {
            tracing::warn!(
                tick = completion.tick.index(),
                "completion for an unknown or already completed save"
            );
            return false;
        };

        match completion.result {
            Ok(()) => {
                tracing::debug!(tick = entry.tick.index(), "frame saved");
                entry.state = SaveState::Saved;
            }
            Err(reason) => {
                tracing::warn!(
                    tick = entry.tick.index(),
                    path = %entry.path.display(),
                    error = %reason,
                    "frame save failed"
                );
                entry.state = SaveState::Failed(reason);
            }
        }
        true
    }

    /// Apply every completion that has already arrived. Returns how many were applied.
    pub fn drain_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.rx.try_recv() {
            if self.on_completion(completion) {
                applied += 1;
            }
        }
        applied
    }

    /// Block until one completion arrives (or `timeout` passes) and apply it.
    pub fn wait_completion(&mut self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(completion) => self.on_completion(completion),
            Err(_) => false,
        }
    }

    /// Block until nothing is in flight.
    pub fn wait_idle(&mut self) {
        while self.outstanding() > 0 {
            // The saver holds a sender, so this only returns on a real completion.
            if let Ok(completion) = self.rx.recv() {
                self.on_completion(completion);
            }
        }
    }

    /// All entries in submission order.
    pub fn pending(&self) -> &[PendingSave] {
        &self.pending
    }

    /// Saves submitted so far.
    pub fn submitted(&self) -> usize {
        self.pending.len()
    }

    /// Saves that finished, successfully or not.
    pub fn completed(&self) -> usize {
        self.pending
            .iter()
            .filter(|p| p.state != SaveState::InFlight)
            .count()
    }

    /// Saves that failed.
    pub fn failed(&self) -> usize {
        self.pending
            .iter()
            .filter(|p| matches!(p.state, SaveState::Failed(_)))
            .count()
    }

    /// Saves still in flight.
    pub fn outstanding(&self) -> usize {
        self.submitted() - self.completed()
    }
}

fn build_thread_pool(threads: Option<usize>) -> FramestepResult<rayon::ThreadPool> {
    if threads == Some(0) {
        return Err(FramestepError::config("save_threads must be >= 1 when set"));
    }
    let mut builder =
        rayon::ThreadPoolBuilder::new().thread_name(|i| format!("framestep-save-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| FramestepError::config(format!("failed to build frame saver pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/encode/frame_sink.rs"]
mod tests;
