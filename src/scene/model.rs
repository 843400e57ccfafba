use crate::animation::ease::Ease;
use crate::scene::color::ColorDef;
use serde::{Deserialize, Serialize};

/// Top-level scene document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SceneDef {
    #[serde(default)]
    pub(crate) version: Option<String>,
    pub(crate) root: ItemDef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ItemKindDef {
    Item,
    Rectangle,
    Ellipse,
    Object,
    Timer,
}

fn one() -> f64 {
    1.0
}

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ItemDef {
    #[serde(rename = "type")]
    pub(crate) kind: ItemKindDef,
    #[serde(default)]
    pub(crate) id: Option<String>,
    #[serde(default)]
    pub(crate) x: f64,
    #[serde(default)]
    pub(crate) y: f64,
    #[serde(default)]
    pub(crate) width: f64,
    #[serde(default)]
    pub(crate) height: f64,
    #[serde(default = "one")]
    pub(crate) opacity: f64,
    /// Degrees, clockwise.
    #[serde(default)]
    pub(crate) rotation: f64,
    #[serde(default = "one")]
    pub(crate) scale: f64,
    #[serde(default)]
    pub(crate) color: Option<ColorDef>,
    #[serde(default)]
    pub(crate) radius: f64,
    #[serde(default = "yes")]
    pub(crate) visible: bool,
    #[serde(default)]
    pub(crate) animations: Vec<AnimationDef>,
    #[serde(default)]
    pub(crate) children: Vec<ItemDef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum PropertyDef {
    X,
    Y,
    Width,
    Height,
    Opacity,
    Rotation,
    Scale,
    Radius,
    Color,
}

/// Animated value: a number for geometric properties, a color for `color`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum ValueDef {
    Number(f64),
    Color(ColorDef),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub(crate) enum LoopsDef {
    #[default]
    Once,
    Count(u32),
    Infinite,
}

impl<'de> Deserialize<'de> for LoopsDef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Count(u32),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Count(n) => Ok(Self::Count(n)),
            Repr::Text(s) if s.eq_ignore_ascii_case("infinite") => Ok(Self::Infinite),
            Repr::Text(s) => Err(serde::de::Error::custom(format!(
                "loops must be a count or \"infinite\", got \"{s}\""
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct AnimationDef {
    pub(crate) property: PropertyDef,
    #[serde(default)]
    pub(crate) from: Option<ValueDef>,
    pub(crate) to: ValueDef,
    #[serde(default)]
    pub(crate) start_ms: u64,
    pub(crate) duration_ms: u64,
    #[serde(default)]
    pub(crate) easing: Ease,
    #[serde(default)]
    pub(crate) loops: LoopsDef,
    #[serde(default)]
    pub(crate) alternate: bool,
}
