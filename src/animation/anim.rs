use crate::animation::ease::Ease;
use crate::foundation::core::Rgba8Premul;

/// Interpolation contract for animated value types.
pub trait Lerp: Sized {
    /// Interpolate from `a` to `b` with normalized factor `t` in `[0, 1]`.
    fn lerp(a: &Self, b: &Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        a + (b - a) * t
    }
}

impl Lerp for Rgba8Premul {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        fn lerp_u8(a: u8, b: u8, t: f64) -> u8 {
            let a = f64::from(a);
            let b = f64::from(b);
            (a + (b - a) * t).round().clamp(0.0, 255.0) as u8
        }

        Self {
            r: lerp_u8(a.r, b.r, t),
            g: lerp_u8(a.g, b.g, t),
            b: lerp_u8(a.b, b.b, t),
            a: lerp_u8(a.a, b.a, t),
        }
    }
}

/// How many times an animation runs before holding its end value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Loops {
    /// Run this many iterations (must be >= 1).
    Count(u32),
    /// Repeat forever.
    Infinite,
}

impl Default for Loops {
    fn default() -> Self {
        Self::Count(1)
    }
}

/// Time window of one animation, in virtual-clock milliseconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Timing {
    /// Delay before the first iteration starts.
    pub start_ms: u64,
    /// Length of one iteration.
    pub duration_ms: u64,
    /// Easing applied within each iteration.
    pub ease: Ease,
    /// Iteration count.
    pub loops: Loops,
    /// Run every odd iteration backwards.
    pub alternate: bool,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            start_ms: 0,
            duration_ms: 250,
            ease: Ease::Linear,
            loops: Loops::default(),
            alternate: false,
        }
    }
}

impl Timing {
    /// Eased progress at `elapsed_ms`, or `None` while the animation has not started.
    pub fn progress(&self, elapsed_ms: u64) -> Option<f64> {
        if elapsed_ms < self.start_ms {
            return None;
        }
        if let Loops::Count(0) = self.loops {
            return None;
        }

        let local = elapsed_ms - self.start_ms;
        if self.duration_ms == 0 {
            return Some(self.final_progress());
        }

        let iteration = local / self.duration_ms;
        if let Loops::Count(n) = self.loops
            && iteration >= u64::from(n)
        {
            return Some(self.final_progress());
        }

        let phase = (local % self.duration_ms) as f64 / self.duration_ms as f64;
        let t = if self.alternate && iteration % 2 == 1 {
            1.0 - phase
        } else {
            phase
        };
        Some(self.ease.apply(t))
    }

    fn final_progress(&self) -> f64 {
        match self.loops {
            Loops::Count(n) if self.alternate && n % 2 == 0 => 0.0,
            _ => 1.0,
        }
    }
}

/// Animation of a single property from `from` (or the property's base value) to `to`.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyAnimation<T> {
    /// Start value; `None` starts from the property's base value.
    pub from: Option<T>,
    /// End value.
    pub to: T,
    /// Time window.
    pub timing: Timing,
}

impl<T> PropertyAnimation<T>
where
    T: Lerp + Clone,
{
    /// Sample the animated value at virtual time `elapsed_ms`.
    ///
    /// Before the animation starts the property keeps `base`.
    pub fn sample(&self, base: &T, elapsed_ms: u64) -> T {
        let Some(t) = self.timing.progress(elapsed_ms) else {
            return base.clone();
        };
        let from = self.from.as_ref().unwrap_or(base);
        T::lerp(from, &self.to, t)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/anim.rs"]
mod tests;
