use std::thread::{self, ThreadId};

use vello_cpu::kurbo::{Affine, Vec2};

use crate::clock::driver::ClockHandle;
use crate::foundation::core::{LogicalSize, Rgba8Premul};
use crate::foundation::error::{FramestepError, FramestepResult};
use crate::scene::item::{ItemKind, SceneItem};
use crate::scene::loader::{ComponentLoader, SceneSource};

/// Geometry of one draw command, in the item's local coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DrawShape {
    /// Axis-aligned rectangle at the local origin.
    Rect {
        /// Width.
        width: f64,
        /// Height.
        height: f64,
    },
    /// Rectangle with rounded corners.
    RoundedRect {
        /// Width.
        width: f64,
        /// Height.
        height: f64,
        /// Corner radius, already clamped to half the shorter side.
        radius: f64,
    },
    /// Ellipse inscribed in `width` x `height`.
    Ellipse {
        /// Width.
        width: f64,
        /// Height.
        height: f64,
    },
}

/// Fill of one shape with a fully resolved transform and opacity.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawCommand {
    /// Geometry.
    pub shape: DrawShape,
    /// Local-to-scene transform (logical pixels).
    pub transform: Affine,
    /// Fill color.
    pub color: Rgba8Premul,
    /// Accumulated opacity in `[0, 1]`.
    pub opacity: f32,
}

/// Immutable snapshot of the scene at one instant, produced by polishing on the control thread
/// and committed into the render copy during sync.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayList {
    /// Logical scene size.
    pub size: LogicalSize,
    /// Virtual time the snapshot was taken at.
    pub elapsed_ms: u64,
    /// Commands in paint order.
    pub commands: Vec<DrawCommand>,
}

/// Control-thread side of the scene graph host.
///
/// Owns the loaded item tree and produces [`DisplayList`] snapshots. Its render-thread
/// counterpart is [`crate::scene::renderer::SceneRenderer`].
#[derive(Debug)]
pub struct SceneGraphHost {
    owner: Option<ThreadId>,
    size: LogicalSize,
    root: Option<SceneItem>,
    clock: Option<ClockHandle>,
}

impl SceneGraphHost {
    /// Host with no scene for a logical size.
    pub fn new(size: LogicalSize) -> Self {
        Self {
            owner: None,
            size,
            root: None,
            clock: None,
        }
    }

    /// Load a scene, check that its root is visual, and fit the root to the logical size.
    ///
    /// Binds the host to the calling thread.
    pub fn load(
        &mut self,
        loader: &dyn ComponentLoader,
        source: &SceneSource,
    ) -> FramestepResult<()> {
        self.owner = Some(thread::current().id());

        let mut root = loader.load(source).map_err(FramestepError::SceneLoad)?;
        if !root.is_visual() {
            return Err(FramestepError::scene(format!(
                "root item of type '{}' is not a visual item",
                root.kind.name()
            )));
        }
        fit_root(&mut root, self.size);

        tracing::info!(
            source = %source,
            items = root.item_count(),
            width = self.size.width,
            height = self.size.height,
            "scene loaded"
        );
        self.root = Some(root);
        Ok(())
    }

    /// Bind the scene's animations to a virtual clock.
    pub fn bind_clock(&mut self, clock: ClockHandle) {
        self.clock = Some(clock);
    }

    /// Change the logical size; the root item follows.
    pub fn resize(&mut self, size: LogicalSize) {
        self.size = size;
        if let Some(root) = self.root.as_mut() {
            fit_root(root, size);
        }
    }

    /// Current logical size.
    pub fn size(&self) -> LogicalSize {
        self.size
    }

    /// Loaded root item, if any.
    pub fn root(&self) -> Option<&SceneItem> {
        self.root.as_ref()
    }

    /// Resolve animations at the bound clock's current time and flatten the tree.
    ///
    /// Must run on the thread that loaded the scene. Without a bound clock the scene is sampled
    /// at time zero.
    pub fn polish(&self) -> FramestepResult<DisplayList> {
        debug_assert!(
            self.owner.is_none_or(|owner| owner == thread::current().id()),
            "scene polished off its control thread"
        );
        let root = self
            .root
            .as_ref()
            .ok_or_else(|| FramestepError::state("polish requested before a scene was loaded"))?;

        let elapsed_ms = self.clock.as_ref().map_or(0, ClockHandle::elapsed_ms);
        let mut commands = Vec::new();
        polish_item(root, Affine::IDENTITY, 1.0, elapsed_ms, &mut commands);

        Ok(DisplayList {
            size: self.size,
            elapsed_ms,
            commands,
        })
    }
}

fn fit_root(root: &mut SceneItem, size: LogicalSize) {
    root.props.width = f64::from(size.width);
    root.props.height = f64::from(size.height);
}

fn polish_item(
    item: &SceneItem,
    parent: Affine,
    parent_opacity: f64,
    elapsed_ms: u64,
    out: &mut Vec<DrawCommand>,
) {
    if !item.is_visual() {
        return;
    }
    let props = item.props_at(elapsed_ms);
    if !props.visible {
        return;
    }
    let opacity = parent_opacity * props.opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 {
        return;
    }

    let width = props.width.max(0.0);
    let height = props.height.max(0.0);
    let center = Vec2::new(width / 2.0, height / 2.0);
    let local = Affine::translate((props.x, props.y))
        * Affine::translate(center)
        * Affine::rotate(props.rotation.to_radians())
        * Affine::scale(props.scale)
        * Affine::translate(-center);
    let transform = parent * local;

    let shape = match item.kind {
        ItemKind::Rectangle if props.radius > 0.0 => Some(DrawShape::RoundedRect {
            width,
            height,
            radius: props.radius.min(width.min(height) / 2.0),
        }),
        ItemKind::Rectangle => Some(DrawShape::Rect { width, height }),
        ItemKind::Ellipse => Some(DrawShape::Ellipse { width, height }),
        ItemKind::Item | ItemKind::Object | ItemKind::Timer => None,
    };
    if let Some(shape) = shape
        && width > 0.0
        && height > 0.0
        && props.color.a > 0
    {
        out.push(DrawCommand {
            shape,
            transform,
            color: props.color,
            opacity: opacity as f32,
        });
    }

    for child in &item.children {
        polish_item(child, transform, opacity, elapsed_ms, out);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/host.rs"]
mod tests;
