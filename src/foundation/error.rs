use crate::scene::loader::LoadError;

/// Crate-wide result alias.
pub type FramestepResult<T> = Result<T, FramestepError>;

/// Errors surfaced by a render session and its collaborators.
///
/// Display prefixes are stable so callers (and the CLI) can classify failures from text alone.
#[derive(thiserror::Error, Debug)]
pub enum FramestepError {
    /// Invalid configuration (zero fps, empty size, zero device-pixel-ratio, ...).
    #[error("configuration error: {0}")]
    Config(String),

    /// The scene source could not be turned into a visual root item.
    #[error("scene load error: {}", join_load_errors(.0))]
    SceneLoad(Vec<LoadError>),

    /// Graphics context or render target failure.
    #[error("graphics error: {0}")]
    Graphics(String),

    /// Encoding or writing a frame failed.
    #[error("save error: {0}")]
    Save(String),

    /// An operation was requested in a session state that does not allow it.
    #[error("session state error: {0}")]
    State(String),

    /// Anything else, with the original source preserved.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FramestepError {
    /// Build a [`FramestepError::Config`].
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`FramestepError::SceneLoad`] holding a single error without a location.
    pub fn scene(msg: impl Into<String>) -> Self {
        Self::SceneLoad(vec![LoadError::new(msg)])
    }

    /// Build a [`FramestepError::Graphics`].
    pub fn graphics(msg: impl Into<String>) -> Self {
        Self::Graphics(msg.into())
    }

    /// Build a [`FramestepError::Save`].
    pub fn save(msg: impl Into<String>) -> Self {
        Self::Save(msg.into())
    }

    /// Build a [`FramestepError::State`].
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }
}

fn join_load_errors(errors: &[LoadError]) -> String {
    if errors.is_empty() {
        return "unknown error".to_owned();
    }
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
