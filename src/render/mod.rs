//! Render-thread machinery: graphics context, off-screen target, and the coordinator that
//! drives them from the control thread.

/// Graphics context abstraction.
pub(crate) mod context;
/// Control/render thread coordination.
pub(crate) mod coordinator;
/// Off-screen render target and extracted frames.
pub(crate) mod target;
