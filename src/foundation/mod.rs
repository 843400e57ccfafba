//! Value types and the error type shared by every other module.

pub(crate) mod core;
pub(crate) mod error;
