use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::animation::anim::{Loops, PropertyAnimation, Timing};
use crate::scene::item::{ItemAnimation, ItemKind, ItemProps, NumericProperty, SceneItem};
use crate::scene::model::{
    AnimationDef, ItemDef, ItemKindDef, LoopsDef, PropertyDef, SceneDef, ValueDef,
};

/// Where a scene description comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SceneSource {
    /// A scene file on disk.
    Path(PathBuf),
    /// Scene text held in memory.
    Inline(String),
}

impl SceneSource {
    /// Scene file at `path`.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// Scene given as text.
    pub fn inline(text: impl Into<String>) -> Self {
        Self::Inline(text.into())
    }
}

impl fmt::Display for SceneSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Inline(_) => f.write_str("<inline>"),
        }
    }
}

/// One problem found while loading a scene.
///
/// Syntax errors carry a 1-based `line:column`; semantic errors name the offending item path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadError {
    /// 1-based line, when known.
    pub line: Option<usize>,
    /// 1-based column, when known.
    pub column: Option<usize>,
    /// Item path such as `root.children[2]`, when known.
    pub item: Option<String>,
    /// Human-readable description.
    pub message: String,
}

impl LoadError {
    /// Error without a location.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            line: None,
            column: None,
            item: None,
            message: message.into(),
        }
    }

    /// Error at a text position.
    pub fn at(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line: Some(line),
            column: Some(column),
            ..Self::new(message)
        }
    }

    /// Error attached to an item path.
    pub fn in_item(item: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            item: Some(item.into()),
            ..Self::new(message)
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column, &self.item) {
            (Some(line), Some(column), _) => write!(f, "{line}:{column}: {}", self.message),
            (_, _, Some(item)) => write!(f, "{item}: {}", self.message),
            _ => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for LoadError {}

/// Turns a [`SceneSource`] into a root item.
///
/// Loaders report every problem they find rather than stopping at the first. Whether the returned
/// root is visual is checked by the caller.
pub trait ComponentLoader: Send + Sync {
    /// Load `source` into an item tree.
    fn load(&self, source: &SceneSource) -> Result<SceneItem, Vec<LoadError>>;
}

/// Loader for the JSON scene format.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonSceneLoader;

impl JsonSceneLoader {
    /// Parse scene text.
    pub fn parse_str(&self, text: &str) -> Result<SceneItem, Vec<LoadError>> {
        let def: SceneDef = serde_json::from_str(text).map_err(|e| vec![syntax_error(&e)])?;

        let mut errors = Vec::new();
        let root = build_item(&def.root, "root", &mut errors);
        if errors.is_empty() {
            Ok(root)
        } else {
            Err(errors)
        }
    }

    fn read(path: &Path) -> Result<String, Vec<LoadError>> {
        std::fs::read_to_string(path)
            .map_err(|e| vec![LoadError::new(format!("read '{}': {e}", path.display()))])
    }
}

impl ComponentLoader for JsonSceneLoader {
    #[tracing::instrument(level = "debug", skip(self), fields(source = %source))]
    fn load(&self, source: &SceneSource) -> Result<SceneItem, Vec<LoadError>> {
        let text = match source {
            SceneSource::Path(path) => Cow::Owned(Self::read(path)?),
            SceneSource::Inline(text) => Cow::Borrowed(text.as_str()),
        };
        self.parse_str(&text)
    }
}

fn syntax_error(e: &serde_json::Error) -> LoadError {
    let text = e.to_string();
    if e.line() == 0 {
        return LoadError::new(text);
    }
    let suffix = format!(" at line {} column {}", e.line(), e.column());
    let message = text.strip_suffix(&suffix).unwrap_or(&text);
    LoadError::at(e.line(), e.column(), message)
}

fn build_item(def: &ItemDef, path: &str, errors: &mut Vec<LoadError>) -> SceneItem {
    let kind = match def.kind {
        ItemKindDef::Item => ItemKind::Item,
        ItemKindDef::Rectangle => ItemKind::Rectangle,
        ItemKindDef::Ellipse => ItemKind::Ellipse,
        ItemKindDef::Object => ItemKind::Object,
        ItemKindDef::Timer => ItemKind::Timer,
    };

    let numbers = [
        ("x", def.x),
        ("y", def.y),
        ("width", def.width),
        ("height", def.height),
        ("opacity", def.opacity),
        ("rotation", def.rotation),
        ("scale", def.scale),
        ("radius", def.radius),
    ];
    for (name, value) in numbers {
        if !value.is_finite() {
            errors.push(LoadError::in_item(path, format!("{name} must be finite")));
        }
    }
    for (name, value) in [("width", def.width), ("height", def.height), ("radius", def.radius)] {
        if value < 0.0 {
            errors.push(LoadError::in_item(
                path,
                format!("{name} must be >= 0, got {value}"),
            ));
        }
    }

    let props = ItemProps {
        x: def.x,
        y: def.y,
        width: def.width,
        height: def.height,
        opacity: def.opacity,
        rotation: def.rotation,
        scale: def.scale,
        radius: def.radius,
        color: def
            .color
            .map(|c| c.to_rgba8_premul())
            .unwrap_or_else(crate::foundation::core::Rgba8Premul::transparent),
        visible: def.visible,
    };

    let animations = def
        .animations
        .iter()
        .enumerate()
        .filter_map(|(i, anim)| build_animation(anim, &format!("{path}.animations[{i}]"), errors))
        .collect();

    let children = def
        .children
        .iter()
        .enumerate()
        .map(|(i, child)| build_item(child, &format!("{path}.children[{i}]"), errors))
        .collect();

    SceneItem {
        kind,
        id: def.id.clone(),
        props,
        animations,
        children,
    }
}

fn build_animation(
    def: &AnimationDef,
    path: &str,
    errors: &mut Vec<LoadError>,
) -> Option<ItemAnimation> {
    let loops = match def.loops {
        LoopsDef::Once => Loops::Count(1),
        LoopsDef::Count(0) => {
            errors.push(LoadError::in_item(path, "loops must be >= 1"));
            return None;
        }
        LoopsDef::Count(n) => Loops::Count(n),
        LoopsDef::Infinite => Loops::Infinite,
    };
    if loops == Loops::Infinite && def.duration_ms == 0 {
        errors.push(LoadError::in_item(
            path,
            "infinite animation needs a non-zero duration_ms",
        ));
        return None;
    }

    let timing = Timing {
        start_ms: def.start_ms,
        duration_ms: def.duration_ms,
        ease: def.easing,
        loops,
        alternate: def.alternate,
    };

    let property = match def.property {
        PropertyDef::X => NumericProperty::X,
        PropertyDef::Y => NumericProperty::Y,
        PropertyDef::Width => NumericProperty::Width,
        PropertyDef::Height => NumericProperty::Height,
        PropertyDef::Opacity => NumericProperty::Opacity,
        PropertyDef::Rotation => NumericProperty::Rotation,
        PropertyDef::Scale => NumericProperty::Scale,
        PropertyDef::Radius => NumericProperty::Radius,
        PropertyDef::Color => {
            let to = color_value(&def.to, path, "to", errors)?;
            let from = match &def.from {
                Some(v) => Some(color_value(v, path, "from", errors)?),
                None => None,
            };
            return Some(ItemAnimation::Color(PropertyAnimation { from, to, timing }));
        }
    };
    let to = number_value(&def.to, path, "to", errors)?;
    let from = match &def.from {
        Some(v) => Some(number_value(v, path, "from", errors)?),
        None => None,
    };
    Some(ItemAnimation::Number {
        property,
        animation: PropertyAnimation { from, to, timing },
    })
}

fn number_value(
    value: &ValueDef,
    path: &str,
    field: &str,
    errors: &mut Vec<LoadError>,
) -> Option<f64> {
    match value {
        ValueDef::Number(v) if v.is_finite() => Some(*v),
        ValueDef::Number(_) => {
            errors.push(LoadError::in_item(path, format!("{field} must be finite")));
            None
        }
        ValueDef::Color(_) => {
            errors.push(LoadError::in_item(
                path,
                format!("{field} must be a number for this property"),
            ));
            None
        }
    }
}

fn color_value(
    value: &ValueDef,
    path: &str,
    field: &str,
    errors: &mut Vec<LoadError>,
) -> Option<crate::foundation::core::Rgba8Premul> {
    match value {
        ValueDef::Color(c) => Some(c.to_rgba8_premul()),
        ValueDef::Number(_) => {
            errors.push(LoadError::in_item(
                path,
                format!("{field} must be a color for property color"),
            ));
            None
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/loader.rs"]
mod tests;
