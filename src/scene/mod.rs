//! Scene graph: loading, control-side polish, and render-side drawing.

/// Color parsing for scene files.
pub(crate) mod color;
/// Control-thread host and display-list snapshots.
pub(crate) mod host;
/// Runtime item tree.
pub(crate) mod item;
/// Scene sources and component loaders.
pub(crate) mod loader;
/// Serde model of the JSON scene format.
pub(crate) mod model;
/// Render-thread scene renderer.
pub(crate) mod renderer;
