//! Frame persistence.

/// Asynchronous frame saver.
pub(crate) mod frame_sink;
/// Image sink contract and implementations.
pub(crate) mod sink;
