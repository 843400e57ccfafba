use std::io::Read;
use std::path::{Path, PathBuf};

use crate::foundation::core::{LogicalSize, PixelFormat, TargetSpec};
use crate::foundation::error::{FramestepError, FramestepResult};

/// How single-frame mode reaches the selected frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeekMode {
    /// Render every tick up to the selected one, saving only the last.
    #[default]
    Step,
    /// Advance the clock straight to the selected tick and render once.
    Jump,
}

/// Render session configuration.
///
/// Every field has a default; JSON configs only need the fields they change.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Logical width.
    pub width: u32,
    /// Logical height.
    pub height: u32,
    /// Device-pixel-ratio; the target is `size * dpr` physical pixels.
    pub device_pixel_ratio: f64,
    /// Layout of extracted frames.
    pub pixel_format: PixelFormat,
    /// Frames per second.
    pub fps: u32,
    /// Total duration in milliseconds.
    pub duration_ms: u64,
    /// Render one selected frame instead of the whole duration.
    pub single_frame: bool,
    /// Time of the selected frame in single-frame mode.
    pub frame_time_ms: u64,
    /// Seek strategy in single-frame mode.
    pub seek: SeekMode,
    /// Output directory.
    pub output_dir: PathBuf,
    /// Output base name.
    pub output_name: String,
    /// Output extension; also selects the image format.
    pub output_format: String,
    /// Frame saver threads; `None` uses rayon's default.
    pub save_threads: Option<usize>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            device_pixel_ratio: 1.0,
            pixel_format: PixelFormat::default(),
            fps: 25,
            duration_ms: 1000,
            single_frame: false,
            frame_time_ms: 1000,
            seek: SeekMode::default(),
            output_dir: PathBuf::from("."),
            output_name: "output_frame".to_owned(),
            output_format: "jpg".to_owned(),
            save_threads: None,
        }
    }
}

impl RenderConfig {
    /// Read a JSON config file.
    pub fn from_path(path: &Path) -> FramestepResult<Self> {
        let file = std::fs::File::open(path).map_err(|e| {
            FramestepError::config(format!("open config '{}': {e}", path.display()))
        })?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Parse a JSON config.
    pub fn from_reader(reader: impl Read) -> FramestepResult<Self> {
        serde_json::from_reader(reader)
            .map_err(|e| FramestepError::config(format!("invalid config json: {e}")))
    }

    /// Check everything a session needs before any resource is created.
    pub fn validate(&self) -> FramestepResult<()> {
        if self.fps == 0 || self.fps > 1000 {
            return Err(FramestepError::config(format!(
                "fps must be in 1..=1000, got {}",
                self.fps
            )));
        }
        self.target_spec().validate()?;
        if let Some(0) = self.save_threads {
            return Err(FramestepError::config("save_threads must be >= 1 when set"));
        }
        for (field, value) in [
            ("output_name", &self.output_name),
            ("output_format", &self.output_format),
        ] {
            if value.is_empty() {
                return Err(FramestepError::config(format!("{field} must not be empty")));
            }
            if value.contains(['/', '\\']) {
                return Err(FramestepError::config(format!(
                    "{field} must not contain path separators, got \"{value}\""
                )));
            }
        }
        Ok(())
    }

    /// Logical size.
    pub fn size(&self) -> LogicalSize {
        LogicalSize::new(self.width, self.height)
    }

    /// Allocation spec of the render target.
    pub fn target_spec(&self) -> TargetSpec {
        TargetSpec {
            size: self.size(),
            dpr: self.device_pixel_ratio,
            format: self.pixel_format,
        }
    }

    /// Length of one tick: `1000 / fps` ms, truncated.
    pub fn tick_ms(&self) -> u64 {
        1000 / u64::from(self.fps.max(1))
    }

    /// Frames of a full render: `duration_ms / 1000 * fps`, truncating the division.
    pub fn calculated_frames(&self) -> u64 {
        self.duration_ms / 1000 * u64::from(self.fps)
    }

    /// Frame selected in single-frame mode: `frame_time_ms / tick_ms`, truncated.
    pub fn select_frame(&self) -> u64 {
        self.frame_time_ms / self.tick_ms().max(1)
    }

    /// Output path of 1-based frame `frame_number`.
    pub fn output_path(&self, frame_number: u64) -> PathBuf {
        self.output_dir.join(format!(
            "{}_{frame_number}.{}",
            self.output_name, self.output_format
        ))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/config.rs"]
mod tests;
