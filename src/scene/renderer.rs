use std::thread::{self, ThreadId};

use vello_cpu::kurbo::{Ellipse, Rect, RoundedRect, Shape as _};

use crate::foundation::error::{FramestepError, FramestepResult};
use crate::render::target::OffscreenTarget;
use crate::scene::host::{DisplayList, DrawShape};

const PATH_TOLERANCE: f64 = 0.1;

/// Render-thread side of the scene graph host.
///
/// Holds the committed copy of the last synced [`DisplayList`] and draws it into the bound
/// [`OffscreenTarget`]. Every call after [`SceneRenderer::initialise`] must come from the same
/// thread.
#[derive(Debug, Default)]
pub struct SceneRenderer {
    owner: Option<ThreadId>,
    committed: Option<DisplayList>,
    destination: Option<(u32, u32)>,
    frames_drawn: u64,
}

impl SceneRenderer {
    /// Uninitialised renderer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialise the scene graph on the calling thread.
    pub fn initialise(&mut self) {
        self.owner = Some(thread::current().id());
        tracing::debug!("scene graph initialised");
    }

    /// Return `true` between [`SceneRenderer::initialise`] and [`SceneRenderer::invalidate`].
    pub fn is_initialised(&self) -> bool {
        self.owner.is_some()
    }

    /// Return `true` while a target is bound as destination.
    pub fn has_destination(&self) -> bool {
        self.destination.is_some()
    }

    /// Frames drawn since initialisation.
    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    pub(crate) fn set_destination(&mut self, pixel_size: (u32, u32)) {
        self.destination = Some(pixel_size);
    }

    /// Commit a control-thread snapshot into the render copy.
    pub fn sync(&mut self, scene: DisplayList) -> FramestepResult<()> {
        self.check_thread("sync")?;
        self.committed = Some(scene);
        Ok(())
    }

    /// Draw the committed snapshot into `target`. The target still has to be flushed.
    pub fn render(&mut self, target: &mut OffscreenTarget) -> FramestepResult<()> {
        self.check_thread("render")?;
        let scene = self
            .committed
            .as_ref()
            .ok_or_else(|| FramestepError::state("render requested before the first sync"))?;
        if self.destination.is_none() || self.destination != target.pixel_size() {
            return Err(FramestepError::graphics(
                "render target is not bound as this renderer's destination",
            ));
        }
        let dpr = target
            .spec()
            .map(|s| s.dpr)
            .ok_or_else(|| FramestepError::graphics("render target has no spec"))?;

        let ctx = target.begin_pass()?;
        let device = vello_cpu::kurbo::Affine::scale(dpr);
        for cmd in &scene.commands {
            let [r, g, b, a] = cmd.color.to_straight_rgba();
            ctx.set_transform(device * cmd.transform);
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
            let layered = cmd.opacity < 1.0;
            if layered {
                ctx.push_opacity_layer(cmd.opacity);
            }
            match cmd.shape {
                DrawShape::Rect { width, height } => {
                    ctx.fill_rect(&Rect::new(0.0, 0.0, width, height));
                }
                DrawShape::RoundedRect {
                    width,
                    height,
                    radius,
                } => {
                    let shape = RoundedRect::new(0.0, 0.0, width, height, radius);
                    ctx.fill_path(&shape.to_path(PATH_TOLERANCE));
                }
                DrawShape::Ellipse { width, height } => {
                    let shape = Ellipse::from_rect(Rect::new(0.0, 0.0, width, height));
                    ctx.fill_path(&shape.to_path(PATH_TOLERANCE));
                }
            }
            if layered {
                ctx.pop_layer();
            }
        }

        self.frames_drawn += 1;
        Ok(())
    }

    /// Tear down the scene graph: drop the render copy and forget the destination.
    pub fn invalidate(&mut self) {
        if self.owner.take().is_some() {
            tracing::debug!(frames = self.frames_drawn, "scene graph invalidated");
        }
        self.committed = None;
        self.destination = None;
        self.frames_drawn = 0;
    }

    fn check_thread(&self, op: &str) -> FramestepResult<()> {
        let Some(owner) = self.owner else {
            return Err(FramestepError::state(format!(
                "{op} requested before the scene graph was initialised"
            )));
        };
        debug_assert_eq!(
            owner,
            thread::current().id(),
            "scene graph {op} called off the render thread"
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/renderer.rs"]
mod tests;
