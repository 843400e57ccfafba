use std::f64::consts::FRAC_PI_2;

/// Easing curve applied to the progress of one animation iteration.
///
/// Scene files use snake_case names (`in_out_quad`). The QML-style spelling (`InOutQuad`) is
/// accepted too.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ease {
    /// Constant speed.
    #[default]
    #[serde(alias = "Linear")]
    Linear,
    /// `t^2`, accelerating.
    #[serde(alias = "InQuad")]
    InQuad,
    /// `t^2`, decelerating.
    #[serde(alias = "OutQuad")]
    OutQuad,
    /// `t^2`, accelerating then decelerating.
    #[serde(alias = "InOutQuad")]
    InOutQuad,
    /// `t^3`, accelerating.
    #[serde(alias = "InCubic")]
    InCubic,
    /// `t^3`, decelerating.
    #[serde(alias = "OutCubic")]
    OutCubic,
    /// `t^3`, accelerating then decelerating.
    #[serde(alias = "InOutCubic")]
    InOutCubic,
    /// `t^4`, accelerating.
    #[serde(alias = "InQuart")]
    InQuart,
    /// `t^4`, decelerating.
    #[serde(alias = "OutQuart")]
    OutQuart,
    /// `t^4`, accelerating then decelerating.
    #[serde(alias = "InOutQuart")]
    InOutQuart,
    /// Quarter sine wave, accelerating.
    #[serde(alias = "InSine")]
    InSine,
    /// Quarter sine wave, decelerating.
    #[serde(alias = "OutSine")]
    OutSine,
    /// Half sine wave.
    #[serde(alias = "InOutSine")]
    InOutSine,
    /// `2^(10(t-1))`, accelerating.
    #[serde(alias = "InExpo")]
    InExpo,
    /// Exponential, decelerating.
    #[serde(alias = "OutExpo")]
    OutExpo,
    /// Exponential, accelerating then decelerating.
    #[serde(alias = "InOutExpo")]
    InOutExpo,
}

#[derive(Clone, Copy)]
enum Curve {
    Power(i32),
    Sine,
    Expo,
}

impl Curve {
    fn ease_in(self, t: f64) -> f64 {
        match self {
            Self::Power(n) => t.powi(n),
            Self::Sine => 1.0 - (t * FRAC_PI_2).cos(),
            Self::Expo if t <= 0.0 => 0.0,
            Self::Expo => 2f64.powf(10.0 * (t - 1.0)),
        }
    }
}

#[derive(Clone, Copy)]
enum Direction {
    In,
    Out,
    InOut,
}

impl Ease {
    fn parts(self) -> Option<(Curve, Direction)> {
        use Direction::{In, InOut, Out};

        let parts = match self {
            Self::Linear => return None,
            Self::InQuad => (Curve::Power(2), In),
            Self::OutQuad => (Curve::Power(2), Out),
            Self::InOutQuad => (Curve::Power(2), InOut),
            Self::InCubic => (Curve::Power(3), In),
            Self::OutCubic => (Curve::Power(3), Out),
            Self::InOutCubic => (Curve::Power(3), InOut),
            Self::InQuart => (Curve::Power(4), In),
            Self::OutQuart => (Curve::Power(4), Out),
            Self::InOutQuart => (Curve::Power(4), InOut),
            Self::InSine => (Curve::Sine, In),
            Self::OutSine => (Curve::Sine, Out),
            Self::InOutSine => (Curve::Sine, InOut),
            Self::InExpo => (Curve::Expo, In),
            Self::OutExpo => (Curve::Expo, Out),
            Self::InOutExpo => (Curve::Expo, InOut),
        };
        Some(parts)
    }

    /// Map progress `t` (clamped to `[0, 1]`) through the curve.
    ///
    /// Every curve fixes both endpoints. `Out` variants mirror their `In` curve, `InOut` variants
    /// run the `In` curve at double speed for the first half and its mirror for the second.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        let Some((curve, direction)) = self.parts() else {
            return t;
        };
        match direction {
            Direction::In => curve.ease_in(t),
            Direction::Out => 1.0 - curve.ease_in(1.0 - t),
            Direction::InOut if t < 0.5 => curve.ease_in(2.0 * t) / 2.0,
            Direction::InOut => 1.0 - curve.ease_in(2.0 - 2.0 * t) / 2.0,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/ease.rs"]
mod tests;
