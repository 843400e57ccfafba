use crate::foundation::error::{FramestepError, FramestepResult};

/// One discrete advance of the virtual clock.
///
/// `index` is 0-based and drives the clock; output naming uses the 1-based
/// [`Tick::frame_number`].
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Tick {
    index: u64,
    elapsed_ms: u64,
}

impl Tick {
    /// Tick number `index` of a clock advancing `tick_ms` per step.
    pub fn new(index: u64, tick_ms: u64) -> Self {
        Self {
            index,
            elapsed_ms: index.saturating_mul(tick_ms),
        }
    }

    /// 0-based tick index.
    pub fn index(self) -> u64 {
        self.index
    }

    /// Virtual time of this tick in milliseconds.
    pub fn elapsed_ms(self) -> u64 {
        self.elapsed_ms
    }

    /// 1-based frame number used for output naming.
    pub fn frame_number(self) -> u64 {
        self.index + 1
    }
}

/// Logical (device-independent) size of the scene and render target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LogicalSize {
    /// Width in logical pixels.
    pub width: u32,
    /// Height in logical pixels.
    pub height: u32,
}

impl LogicalSize {
    /// Create a size.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Return `true` when either side is zero.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Physical pixel size for a device-pixel-ratio, rounded to the nearest pixel.
    pub fn scaled(self, dpr: f64) -> (u32, u32) {
        let scale = |v: u32| (f64::from(v) * dpr).round().max(0.0) as u32;
        (scale(self.width), scale(self.height))
    }
}

/// Pixel layout of extracted frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// RGBA8 with color channels premultiplied by alpha (the render target's native layout).
    #[default]
    Rgba8Premultiplied,
    /// RGBA8 with straight alpha.
    Rgba8,
    /// RGB8, alpha dropped after flattening over black.
    Rgb8,
}

impl PixelFormat {
    /// Bytes per pixel in this layout.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgba8Premultiplied | Self::Rgba8 => 4,
            Self::Rgb8 => 3,
        }
    }

    /// Return `true` when the layout carries an alpha channel.
    pub fn has_alpha(self) -> bool {
        !matches!(self, Self::Rgb8)
    }
}

/// Everything needed to allocate an off-screen render target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetSpec {
    /// Logical size.
    pub size: LogicalSize,
    /// Device-pixel-ratio applied on top of `size`.
    pub dpr: f64,
    /// Layout of extracted frames.
    pub format: PixelFormat,
}

impl TargetSpec {
    /// Validate the allocation preconditions (non-empty size, finite non-zero dpr).
    pub fn validate(&self) -> FramestepResult<()> {
        if self.size.is_empty() {
            return Err(FramestepError::config(format!(
                "target size must be non-empty, got {}x{}",
                self.size.width, self.size.height
            )));
        }
        if !self.dpr.is_finite() || self.dpr <= 0.0 {
            return Err(FramestepError::config(format!(
                "device pixel ratio must be finite and > 0, got {}",
                self.dpr
            )));
        }
        Ok(())
    }

    /// Physical pixel size of the target.
    pub fn pixel_size(&self) -> (u32, u32) {
        self.size.scaled(self.dpr)
    }
}

/// Premultiplied RGBA8 (r,g,b already multiplied by a).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8Premul {
    /// Red channel premultiplied by alpha.
    pub r: u8,
    /// Green channel premultiplied by alpha.
    pub g: u8,
    /// Blue channel premultiplied by alpha.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8Premul {
    /// Fully transparent black.
    pub fn transparent() -> Self {
        Self {
            r: 0,
            g: 0,
            b: 0,
            a: 0,
        }
    }

    /// Convert straight-alpha RGBA8 into premultiplied RGBA8.
    pub fn from_straight_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        fn premul(c: u8, a: u8) -> u8 {
            let c = u16::from(c);
            let a = u16::from(a);
            (((c * a) + 127) / 255) as u8
        }

        Self {
            r: premul(r, a),
            g: premul(g, a),
            b: premul(b, a),
            a,
        }
    }

    /// Convert back to straight-alpha RGBA8.
    pub fn to_straight_rgba(self) -> [u8; 4] {
        unpremultiply([self.r, self.g, self.b, self.a])
    }
}

/// Undo alpha premultiplication of one RGBA8 pixel.
pub fn unpremultiply(px: [u8; 4]) -> [u8; 4] {
    let a = px[3];
    if a == 0 {
        return [0, 0, 0, 0];
    }
    if a == 255 {
        return px;
    }
    let a16 = u16::from(a);
    let un = |c: u8| -> u8 { ((u16::from(c) * 255 + a16 / 2) / a16).min(255) as u8 };
    [un(px[0]), un(px[1]), un(px[2]), a]
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
