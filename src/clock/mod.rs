//! Deterministic virtual time.

pub(crate) mod driver;
