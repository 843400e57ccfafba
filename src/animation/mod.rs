//! Property animations sampled from the virtual clock.

pub(crate) mod anim;
pub(crate) mod ease;
