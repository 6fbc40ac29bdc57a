use crate::error::ProxyError;
use crate::value::{PrimitiveValue, Value, ValueType};
use bevy_ecs::prelude::Entity;
use bitflags::bitflags;
use glam::Vec3;
use std::borrow::Cow;
use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub struct LinearKey {
    pub time: f32,
    pub value: Value,
}

impl LinearKey {
    pub fn new(time: f32, value: impl Into<Value>) -> Self {
        Self { time, value: value.into() }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CurveKey {
    pub time: f32,
    pub value: Value,
    pub left_tangent: Value,
    pub right_tangent: Value,
}

impl CurveKey {
    pub fn new(
        time: f32,
        value: impl Into<Value>,
        left: impl Into<Value>,
        right: impl Into<Value>,
    ) -> Self {
        Self { time, value: value.into(), left_tangent: left.into(), right_tangent: right.into() }
    }
}

/// Control point of a tube/spline mesh. The radius is the scalar, the position the vector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TubePoint {
    pub position: Vec3,
    pub radius: f32,
}

impl TubePoint {
    pub fn new(position: Vec3, radius: f32) -> Self {
        Self { position, radius }
    }
}

/// A single slot of a host array.
#[derive(Clone, Debug, PartialEq)]
pub enum Element {
    Value(Value),
    Linear(LinearKey),
    Curve(CurveKey),
    TubePoint(TubePoint),
    Reference(Option<Entity>),
    /// Host struct with no mirror mapping.
    Composite(Vec<Value>),
}

bitflags! {
    /// Capabilities the host reports for an array element type.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct TypeTraits: u8 {
        const ENGINE_PRIMITIVE = 1 << 0;
        const WORLD_ELEMENT = 1 << 1;
        const SPATIAL_CURVE_POINT = 1 << 2;
    }
}

/// Keyframe wrapper an array is declared with (linear or curve track).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyframeTrack {
    Linear(ValueType),
    Curve(ValueType),
}

/// Runtime description of an array's element type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementType {
    pub name: Cow<'static, str>,
    pub track: Option<KeyframeTrack>,
    pub value_type: Option<ValueType>,
    pub traits: TypeTraits,
}

impl ElementType {
    pub fn primitive(value_type: ValueType) -> Self {
        Self {
            name: Cow::Borrowed(value_type.label()),
            track: None,
            value_type: Some(value_type),
            traits: TypeTraits::ENGINE_PRIMITIVE,
        }
    }

    pub fn linear(value_type: ValueType) -> Self {
        Self {
            name: Cow::Owned(format!("LinearKey<{value_type}>")),
            track: Some(KeyframeTrack::Linear(value_type)),
            value_type: Some(value_type),
            traits: TypeTraits::empty(),
        }
    }

    pub fn curve(value_type: ValueType) -> Self {
        Self {
            name: Cow::Owned(format!("CurveKey<{value_type}>")),
            track: Some(KeyframeTrack::Curve(value_type)),
            value_type: Some(value_type),
            traits: TypeTraits::empty(),
        }
    }

    pub fn tube_point() -> Self {
        Self {
            name: Cow::Borrowed("TubePoint"),
            track: None,
            value_type: Some(ValueType::Float3),
            traits: TypeTraits::SPATIAL_CURVE_POINT,
        }
    }

    pub fn reference(name: impl Into<Cow<'static, str>>) -> Self {
        Self { name: name.into(), track: None, value_type: None, traits: TypeTraits::WORLD_ELEMENT }
    }

    pub fn opaque(name: impl Into<Cow<'static, str>>) -> Self {
        Self { name: name.into(), track: None, value_type: None, traits: TypeTraits::empty() }
    }

    pub fn with_traits(mut self, traits: TypeTraits) -> Self {
        self.traits |= traits;
        self
    }
}

/// Closed set of element shapes the proxy knows how to mirror.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    DirectValue(ValueType),
    LinearKeyframe(ValueType),
    CurveKeyframe(ValueType),
    SpatialCurvePoint,
    WorldReference,
}

impl ElementKind {
    pub fn label(self) -> &'static str {
        match self {
            ElementKind::DirectValue(_) => "direct value",
            ElementKind::LinearKeyframe(_) => "linear keyframe",
            ElementKind::CurveKeyframe(_) => "curve keyframe",
            ElementKind::SpatialCurvePoint => "spatial curve point",
            ElementKind::WorldReference => "world reference",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::DirectValue(ty)
            | ElementKind::LinearKeyframe(ty)
            | ElementKind::CurveKeyframe(ty) => write!(f, "{} ({ty})", self.label()),
            _ => f.write_str(self.label()),
        }
    }
}

/// Picks the element kind for an array type. Interpolated tracks win over every other trait.
pub fn resolve_kind(ty: &ElementType) -> Result<ElementKind, ProxyError> {
    match ty.track {
        Some(KeyframeTrack::Linear(value)) if value.supports_lerp() => {
            return Ok(ElementKind::LinearKeyframe(value));
        }
        Some(KeyframeTrack::Curve(value)) if value.supports_lerp() => {
            return Ok(ElementKind::CurveKeyframe(value));
        }
        _ => {}
    }
    if ty.traits.contains(TypeTraits::SPATIAL_CURVE_POINT) {
        return Ok(ElementKind::SpatialCurvePoint);
    }
    if ty.traits.contains(TypeTraits::ENGINE_PRIMITIVE) {
        if let Some(value) = ty.value_type {
            return Ok(ElementKind::DirectValue(value));
        }
    }
    if ty.traits.contains(TypeTraits::WORLD_ELEMENT) {
        return Ok(ElementKind::WorldReference);
    }
    Err(ProxyError::UnsupportedElementKind { type_name: ty.name.to_string() })
}

/// Rust types that can seed a host array directly.
pub trait ArrayElement: Sized {
    fn element_type() -> ElementType;
    fn into_element(self) -> Element;
    fn from_element(element: &Element) -> Option<Self>;
}

macro_rules! primitive_element {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ArrayElement for $ty {
                fn element_type() -> ElementType {
                    ElementType::primitive(<$ty as PrimitiveValue>::VALUE_TYPE)
                }

                fn into_element(self) -> Element {
                    Element::Value(self.into_value())
                }

                fn from_element(element: &Element) -> Option<Self> {
                    match element {
                        Element::Value(value) => <$ty as PrimitiveValue>::from_value(value),
                        _ => None,
                    }
                }
            }
        )*
    };
}

primitive_element!(bool, i32, f32, glam::Vec2, Vec3, glam::Vec4, glam::Quat, String);

impl ArrayElement for TubePoint {
    fn element_type() -> ElementType {
        ElementType::tube_point()
    }

    fn into_element(self) -> Element {
        Element::TubePoint(self)
    }

    fn from_element(element: &Element) -> Option<Self> {
        match element {
            Element::TubePoint(point) => Some(*point),
            _ => None,
        }
    }
}

impl ArrayElement for Entity {
    fn element_type() -> ElementType {
        ElementType::reference("Entity")
    }

    fn into_element(self) -> Element {
        Element::Reference(Some(self))
    }

    fn from_element(element: &Element) -> Option<Self> {
        match element {
            Element::Reference(target) => *target,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_each_documented_kind() {
        let cases = [
            (ElementType::linear(ValueType::Float), ElementKind::LinearKeyframe(ValueType::Float)),
            (ElementType::curve(ValueType::Float2), ElementKind::CurveKeyframe(ValueType::Float2)),
            (ElementType::tube_point(), ElementKind::SpatialCurvePoint),
            (ElementType::primitive(ValueType::Color), ElementKind::DirectValue(ValueType::Color)),
            (ElementType::reference("Slot"), ElementKind::WorldReference),
        ];
        for (ty, expected) in cases {
            assert_eq!(resolve_kind(&ty).expect("supported"), expected, "{}", ty.name);
            let again = resolve_kind(&ty).expect("supported");
            assert_eq!(again, expected, "resolution must be repeatable");
        }
    }

    #[test]
    fn interpolation_outranks_spatial_point() {
        let ty =
            ElementType::linear(ValueType::Float3).with_traits(TypeTraits::SPATIAL_CURVE_POINT);
        assert_eq!(resolve_kind(&ty), Ok(ElementKind::LinearKeyframe(ValueType::Float3)));
        let ty = ElementType::curve(ValueType::Float).with_traits(TypeTraits::SPATIAL_CURVE_POINT);
        assert_eq!(resolve_kind(&ty), Ok(ElementKind::CurveKeyframe(ValueType::Float)));
    }

    #[test]
    fn spatial_point_outranks_primitive_and_reference() {
        let ty = ElementType::tube_point()
            .with_traits(TypeTraits::ENGINE_PRIMITIVE | TypeTraits::WORLD_ELEMENT);
        assert_eq!(resolve_kind(&ty), Ok(ElementKind::SpatialCurvePoint));
    }

    #[test]
    fn primitive_outranks_reference() {
        let ty = ElementType::primitive(ValueType::Int).with_traits(TypeTraits::WORLD_ELEMENT);
        assert_eq!(resolve_kind(&ty), Ok(ElementKind::DirectValue(ValueType::Int)));
    }

    #[test]
    fn non_interpolating_tracks_are_unsupported() {
        let err = resolve_kind(&ElementType::linear(ValueType::Bool)).unwrap_err();
        assert!(matches!(err, ProxyError::UnsupportedElementKind { .. }));
        let err = resolve_kind(&ElementType::opaque("BoneBinding")).unwrap_err();
        let expected = ProxyError::UnsupportedElementKind { type_name: "BoneBinding".to_string() };
        assert_eq!(err, expected);
    }

    #[test]
    fn typed_elements_describe_themselves() {
        assert_eq!(f32::element_type(), ElementType::primitive(ValueType::Float));
        let point = TubePoint::new(Vec3::X, 0.5).into_element();
        assert_eq!(TubePoint::from_element(&point).map(|p| p.radius), Some(0.5));
    }
}
