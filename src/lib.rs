//! framestep renders a declarative scene off-screen, one deterministic frame at a time.
//!
//! - Describe a scene (JSON, see [`JsonSceneLoader`]) or plug in your own [`ComponentLoader`]
//! - Configure a [`RenderSession`] with a [`RenderConfig`]
//! - Initialise, then [`RenderSession::run`] (or [`RenderSession::step`]) until finished
//!
//! Animations are driven by a [`VirtualClock`] that advances exactly `1000 / fps` ms per frame, so
//! frame N is identical across runs. Rendering happens on a dedicated render thread; frames are
//! saved asynchronously through an [`ImageSink`].
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod animation;
pub(crate) mod clock;
/// Frame persistence.
pub(crate) mod encode;
/// Render thread, graphics context, and off-screen target.
pub(crate) mod render;
/// Scene loading and the scene graph host.
pub(crate) mod scene;
/// Session-oriented rendering API.
pub(crate) mod session;

pub use crate::animation::anim::{Lerp, Loops, PropertyAnimation, Timing};
pub use crate::animation::ease::Ease;
pub use crate::clock::driver::{ClockHandle, VirtualClock};
pub use crate::foundation::core::{LogicalSize, PixelFormat, Rgba8Premul, TargetSpec, Tick};
pub use crate::foundation::error::{FramestepError, FramestepResult};

pub use crate::encode::frame_sink::{FrameSink, PendingSave, SaveCompletion, SaveState};
pub use crate::encode::sink::{ImageFileSink, ImageSink, InMemorySink, ensure_parent_dir};
pub use crate::render::context::{CpuContext, GraphicsContext};
pub use crate::render::coordinator::{FrameOutcome, RenderCoordinator, TargetState};
pub use crate::render::target::{FrameBuffer, OffscreenTarget};
pub use crate::scene::host::{DisplayList, DrawCommand, DrawShape, SceneGraphHost};
pub use crate::scene::item::{ItemAnimation, ItemKind, ItemProps, NumericProperty, SceneItem};
pub use crate::scene::loader::{ComponentLoader, JsonSceneLoader, LoadError, SceneSource};
pub use crate::scene::renderer::SceneRenderer;
pub use crate::session::config::{RenderConfig, SeekMode};
pub use crate::session::render_session::{
    Progress, RenderReport, RenderSession, SessionCollaborators, SessionStatus, StopHandle,
};
