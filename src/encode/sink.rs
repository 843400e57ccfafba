use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::foundation::error::{FramestepError, FramestepResult};
use crate::render::target::FrameBuffer;

/// Sink contract for persisting one extracted frame.
///
/// Called from frame-saver pool threads, possibly for several frames at once; implementations
/// must not assume any ordering between calls.
pub trait ImageSink: Send + Sync {
    /// Persist `frame` under `path`.
    fn save(&self, frame: &FrameBuffer, path: &Path) -> FramestepResult<()>;
}

/// Writes frames as image files; the format follows the path extension.
///
/// Formats without alpha (JPEG) get the frame flattened over black.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageFileSink;

impl ImageFileSink {
    /// Create a file sink.
    pub fn new() -> Self {
        Self
    }
}

impl ImageSink for ImageFileSink {
    fn save(&self, frame: &FrameBuffer, path: &Path) -> FramestepResult<()> {
        let format = image::ImageFormat::from_path(path).map_err(|e| {
            FramestepError::save(format!("unsupported output '{}': {e}", path.display()))
        })?;
        ensure_parent_dir(path)?;

        let keep_alpha = frame.format.has_alpha() && format != image::ImageFormat::Jpeg;
        let (buf, color) = if keep_alpha {
            (frame.to_rgba8(), image::ColorType::Rgba8)
        } else {
            (frame.to_rgb8(), image::ColorType::Rgb8)
        };

        image::save_buffer_with_format(path, &buf, frame.width, frame.height, color, format)
            .map_err(|e| FramestepError::save(format!("write '{}': {e}", path.display())))
    }
}

/// In-memory sink for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemorySink {
    frames: Mutex<Vec<(PathBuf, FrameBuffer)>>,
}

impl InMemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Captured frames ordered by tick.
    pub fn frames(&self) -> Vec<(PathBuf, FrameBuffer)> {
        let mut frames = self
            .frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        frames.sort_by_key(|(_, frame)| frame.tick);
        frames
    }

    /// Number of captured frames.
    pub fn len(&self) -> usize {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Return `true` when nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ImageSink for InMemorySink {
    fn save(&self, frame: &FrameBuffer, path: &Path) -> FramestepResult<()> {
        let expected =
            frame.width as usize * frame.height as usize * frame.format.bytes_per_pixel();
        if frame.data.len() != expected {
            return Err(FramestepError::save(format!(
                "frame data size mismatch for {}x{} {:?}",
                frame.width, frame.height, frame.format
            )));
        }
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((path.to_path_buf(), frame.clone()));
        Ok(())
    }
}

/// Create `path`'s parent directory if needed.
pub fn ensure_parent_dir(path: &Path) -> FramestepResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
