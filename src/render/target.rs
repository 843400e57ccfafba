use crate::foundation::core::{PixelFormat, TargetSpec, Tick, unpremultiply};
use crate::foundation::error::{FramestepError, FramestepResult};
use crate::scene::renderer::SceneRenderer;

/// One extracted frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    /// Tick the frame was rendered for.
    pub tick: Tick,
    /// Width in physical pixels.
    pub width: u32,
    /// Height in physical pixels.
    pub height: u32,
    /// Layout of `data`.
    pub format: PixelFormat,
    /// Row-major pixel bytes, `width * height * format.bytes_per_pixel()` long.
    pub data: Vec<u8>,
}

impl FrameBuffer {
    /// Bytes of the pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bpp = self.format.bytes_per_pixel();
        let i = (y as usize * self.width as usize + x as usize) * bpp;
        self.data.get(i..i + bpp)
    }

    /// Straight-alpha RGBA8 copy of the frame.
    pub fn to_rgba8(&self) -> Vec<u8> {
        match self.format {
            PixelFormat::Rgba8 => self.data.clone(),
            PixelFormat::Rgba8Premultiplied => self
                .data
                .chunks_exact(4)
                .flat_map(|px| unpremultiply([px[0], px[1], px[2], px[3]]))
                .collect(),
            PixelFormat::Rgb8 => self
                .data
                .chunks_exact(3)
                .flat_map(|px| [px[0], px[1], px[2], 255])
                .collect(),
        }
    }

    /// RGB8 copy of the frame flattened over black.
    pub fn to_rgb8(&self) -> Vec<u8> {
        match self.format {
            PixelFormat::Rgb8 => self.data.clone(),
            // Premultiplied color is already the color over black.
            PixelFormat::Rgba8Premultiplied => self
                .data
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect(),
            PixelFormat::Rgba8 => self
                .data
                .chunks_exact(4)
                .flat_map(|px| {
                    let over_black = |c: u8| ((u16::from(c) * u16::from(px[3]) + 127) / 255) as u8;
                    [over_black(px[0]), over_black(px[1]), over_black(px[2])]
                })
                .collect(),
        }
    }
}

/// Off-screen CPU render target.
///
/// Lives on the render thread. A render pass is opened with [`OffscreenTarget::begin_pass`] and
/// resolved into the pixel store by [`OffscreenTarget::flush`]; extraction is only allowed after
/// the flush.
#[derive(Default)]
pub struct OffscreenTarget {
    spec: Option<TargetSpec>,
    pixmap: Option<vello_cpu::Pixmap>,
    pass: Option<vello_cpu::RenderContext>,
    bound: bool,
    allocations: u64,
}

impl std::fmt::Debug for OffscreenTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OffscreenTarget")
            .field("spec", &self.spec)
            .field("created", &self.pixmap.is_some())
            .field("pass_open", &self.pass.is_some())
            .field("bound", &self.bound)
            .field("allocations", &self.allocations)
            .finish()
    }
}

impl OffscreenTarget {
    /// Empty target; nothing is allocated until [`OffscreenTarget::create`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate storage for `spec`.
    ///
    /// An existing target with the same pixel size is kept (only the spec is updated) and `false`
    /// is returned. Otherwise the old storage is destroyed first and `true` is returned.
    pub fn create(&mut self, spec: TargetSpec) -> FramestepResult<bool> {
        spec.validate()?;
        let (w, h) = spec.pixel_size();
        if w == 0 || h == 0 {
            return Err(FramestepError::graphics(format!(
                "target {}x{} @ {} rounds to an empty pixel size",
                spec.size.width, spec.size.height, spec.dpr
            )));
        }
        let too_large = || {
            FramestepError::graphics(format!(
                "target allocation failed: {w}x{h} exceeds {}x{}",
                u16::MAX,
                u16::MAX
            ))
        };
        let w16 = u16::try_from(w).map_err(|_| too_large())?;
        let h16 = u16::try_from(h).map_err(|_| too_large())?;

        if self.pixmap.is_some() && self.pixel_size() == Some((w, h)) {
            self.spec = Some(spec);
            return Ok(false);
        }

        self.destroy();
        self.pixmap = Some(vello_cpu::Pixmap::new(w16, h16));
        self.spec = Some(spec);
        self.allocations += 1;
        tracing::debug!(width = w, height = h, dpr = spec.dpr, "render target allocated");
        Ok(true)
    }

    /// Return `true` when storage is allocated.
    pub fn is_created(&self) -> bool {
        self.pixmap.is_some()
    }

    /// Spec of the current storage.
    pub fn spec(&self) -> Option<TargetSpec> {
        self.spec.filter(|_| self.pixmap.is_some())
    }

    /// Physical pixel size of the current storage.
    pub fn pixel_size(&self) -> Option<(u32, u32)> {
        self.pixmap
            .as_ref()
            .map(|p| (u32::from(p.width()), u32::from(p.height())))
    }

    /// How many times storage has been (re)allocated.
    pub fn allocations(&self) -> u64 {
        self.allocations
    }

    /// Return `true` once bound as a renderer's destination.
    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// Make this target the destination of `renderer`.
    pub fn bind_as_render_destination(
        &mut self,
        renderer: &mut SceneRenderer,
    ) -> FramestepResult<()> {
        let size = self
            .pixel_size()
            .ok_or_else(|| FramestepError::graphics("cannot bind a target that was not created"))?;
        renderer.set_destination(size);
        self.bound = true;
        Ok(())
    }

    /// Open a render pass covering the whole target.
    pub(crate) fn begin_pass(&mut self) -> FramestepResult<&mut vello_cpu::RenderContext> {
        if !self.bound {
            return Err(FramestepError::graphics(
                "target is not bound as a render destination",
            ));
        }
        let pixmap = self
            .pixmap
            .as_ref()
            .ok_or_else(|| FramestepError::graphics("render pass on a destroyed target"))?;
        let ctx = vello_cpu::RenderContext::new(pixmap.width(), pixmap.height());
        Ok(self.pass.insert(ctx))
    }

    /// Resolve the open pass (if any) into the pixel store.
    pub fn flush(&mut self) -> FramestepResult<()> {
        let Some(mut ctx) = self.pass.take() else {
            return Ok(());
        };
        let pixmap = self
            .pixmap
            .as_mut()
            .ok_or_else(|| FramestepError::graphics("flush on a destroyed target"))?;
        pixmap.data_as_u8_slice_mut().fill(0);
        ctx.flush();
        ctx.render_to_pixmap(pixmap);
        Ok(())
    }

    /// Copy the flushed contents into a [`FrameBuffer`] in the spec's pixel format.
    pub fn extract_image(&self, tick: Tick) -> FramestepResult<FrameBuffer> {
        if self.pass.is_some() {
            return Err(FramestepError::graphics(
                "extract requested before the render pass was flushed",
            ));
        }
        let (pixmap, spec) = match (&self.pixmap, self.spec) {
            (Some(p), Some(s)) => (p, s),
            _ => return Err(FramestepError::graphics("extract from a destroyed target")),
        };

        let premul = pixmap.data_as_u8_slice();
        let data = match spec.format {
            PixelFormat::Rgba8Premultiplied => premul.to_vec(),
            PixelFormat::Rgba8 => premul
                .chunks_exact(4)
                .flat_map(|px| unpremultiply([px[0], px[1], px[2], px[3]]))
                .collect(),
            PixelFormat::Rgb8 => premul
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect(),
        };

        Ok(FrameBuffer {
            tick,
            width: u32::from(pixmap.width()),
            height: u32::from(pixmap.height()),
            format: spec.format,
            data,
        })
    }

    /// Release storage and any open pass.
    pub fn destroy(&mut self) {
        self.pass = None;
        if self.pixmap.take().is_some() {
            tracing::debug!("render target destroyed");
        }
        self.spec = None;
        self.bound = false;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/target.rs"]
mod tests;
