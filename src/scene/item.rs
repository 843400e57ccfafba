use crate::animation::anim::PropertyAnimation;
use crate::foundation::core::Rgba8Premul;

/// Item types understood by the scene graph host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// Invisible container; only its children draw.
    Item,
    /// Filled (optionally rounded) rectangle.
    Rectangle,
    /// Filled ellipse inscribed in the item bounds.
    Ellipse,
    /// Non-visual object. Cannot be a scene root and never draws.
    Object,
    /// Non-visual timer. Cannot be a scene root and never draws.
    Timer,
}

impl ItemKind {
    /// Return `true` for kinds that take part in the visual tree.
    pub fn is_visual(self) -> bool {
        matches!(self, Self::Item | Self::Rectangle | Self::Ellipse)
    }

    /// Lowercase name as written in scene files.
    pub fn name(self) -> &'static str {
        match self {
            Self::Item => "item",
            Self::Rectangle => "rectangle",
            Self::Ellipse => "ellipse",
            Self::Object => "object",
            Self::Timer => "timer",
        }
    }
}

/// Animatable item properties, in logical pixels and degrees.
#[derive(Clone, Debug, PartialEq)]
pub struct ItemProps {
    /// Left edge relative to the parent.
    pub x: f64,
    /// Top edge relative to the parent.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
    /// Opacity in `[0, 1]`, inherited multiplicatively by children.
    pub opacity: f64,
    /// Clockwise rotation about the item center, in degrees.
    pub rotation: f64,
    /// Uniform scale about the item center.
    pub scale: f64,
    /// Corner radius for rectangles.
    pub radius: f64,
    /// Fill color.
    pub color: Rgba8Premul,
    /// Hidden items and their children are skipped.
    pub visible: bool,
}

impl Default for ItemProps {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            opacity: 1.0,
            rotation: 0.0,
            scale: 1.0,
            radius: 0.0,
            color: Rgba8Premul::transparent(),
            visible: true,
        }
    }
}

/// Numeric property targeted by an animation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NumericProperty {
    /// [`ItemProps::x`].
    X,
    /// [`ItemProps::y`].
    Y,
    /// [`ItemProps::width`].
    Width,
    /// [`ItemProps::height`].
    Height,
    /// [`ItemProps::opacity`].
    Opacity,
    /// [`ItemProps::rotation`].
    Rotation,
    /// [`ItemProps::scale`].
    Scale,
    /// [`ItemProps::radius`].
    Radius,
}

impl NumericProperty {
    fn slot(self, props: &mut ItemProps) -> &mut f64 {
        match self {
            Self::X => &mut props.x,
            Self::Y => &mut props.y,
            Self::Width => &mut props.width,
            Self::Height => &mut props.height,
            Self::Opacity => &mut props.opacity,
            Self::Rotation => &mut props.rotation,
            Self::Scale => &mut props.scale,
            Self::Radius => &mut props.radius,
        }
    }
}

/// One animation attached to an item.
#[derive(Clone, Debug, PartialEq)]
pub enum ItemAnimation {
    /// Animates a numeric property.
    Number {
        /// Target property.
        property: NumericProperty,
        /// Value curve.
        animation: PropertyAnimation<f64>,
    },
    /// Animates the fill color.
    Color(PropertyAnimation<Rgba8Premul>),
}

/// Node of a loaded scene.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneItem {
    /// Item type.
    pub kind: ItemKind,
    /// Optional identifier from the scene file.
    pub id: Option<String>,
    /// Base (unanimated) property values.
    pub props: ItemProps,
    /// Animations applied in order on top of `props`.
    pub animations: Vec<ItemAnimation>,
    /// Child items, painted after their parent in order.
    pub children: Vec<SceneItem>,
}

impl SceneItem {
    /// Item of `kind` with default properties and no children.
    pub fn new(kind: ItemKind) -> Self {
        Self {
            kind,
            id: None,
            props: ItemProps::default(),
            animations: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Replace the base properties.
    pub fn with_props(mut self, props: ItemProps) -> Self {
        self.props = props;
        self
    }

    /// Append an animation.
    pub fn with_animation(mut self, animation: ItemAnimation) -> Self {
        self.animations.push(animation);
        self
    }

    /// Append a child item.
    pub fn with_child(mut self, child: SceneItem) -> Self {
        self.children.push(child);
        self
    }

    /// Return `true` when this item can be a scene root.
    pub fn is_visual(&self) -> bool {
        self.kind.is_visual()
    }

    /// Number of items in this subtree, including `self`.
    pub fn item_count(&self) -> usize {
        1 + self.children.iter().map(SceneItem::item_count).sum::<usize>()
    }

    /// Property values at virtual time `elapsed_ms`.
    pub fn props_at(&self, elapsed_ms: u64) -> ItemProps {
        let mut props = self.props.clone();
        for animation in &self.animations {
            match animation {
                ItemAnimation::Number {
                    property,
                    animation,
                } => {
                    let slot = property.slot(&mut props);
                    *slot = animation.sample(slot, elapsed_ms);
                }
                ItemAnimation::Color(animation) => {
                    props.color = animation.sample(&props.color, elapsed_ms);
                }
            }
        }
        props
    }
}
