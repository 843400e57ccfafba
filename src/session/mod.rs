//! Session-oriented rendering API.

/// Session configuration.
pub(crate) mod config;
/// Render orchestrator.
pub(crate) mod render_session;
