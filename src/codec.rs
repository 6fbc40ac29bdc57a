use crate::element::{CurveKey, Element, ElementKind, LinearKey, TubePoint};
use crate::error::ProxyError;
use crate::value::{Value, ValueType};
use bevy_ecs::prelude::Entity;
use serde::{Deserialize, Serialize};

/// Editable shape of one mirror list entry.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordData {
    /// Value multiplexer slot.
    Field(Value),
    /// Reference multiplexer slot.
    Reference(Option<Entity>),
    /// Gradient driver point.
    Point { position: f32, value: Value },
}

impl RecordData {
    pub fn point(position: f32, value: impl Into<Value>) -> Self {
        RecordData::Point { position, value: value.into() }
    }
}

/// Component that owns the mirror list inside a proxy container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MirrorSource {
    ValueMultiplexer(ValueType),
    ReferenceMultiplexer,
    GradientDriver(ValueType),
}

impl MirrorSource {
    pub fn for_kind(kind: ElementKind) -> Self {
        match kind {
            ElementKind::DirectValue(value) => MirrorSource::ValueMultiplexer(value),
            ElementKind::WorldReference => MirrorSource::ReferenceMultiplexer,
            ElementKind::LinearKeyframe(value) | ElementKind::CurveKeyframe(value) => {
                MirrorSource::GradientDriver(value)
            }
            ElementKind::SpatialCurvePoint => MirrorSource::GradientDriver(ValueType::Float3),
        }
    }

    /// Name of the list member on the component.
    pub fn list_field(self) -> &'static str {
        match self {
            MirrorSource::ValueMultiplexer(_) => "Values",
            MirrorSource::ReferenceMultiplexer => "References",
            MirrorSource::GradientDriver(_) => "Points",
        }
    }
}

/// Tangents given to curve keyframes inserted from the list side, where no array element
/// exists yet at the target index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TangentPolicy {
    /// Zero of the keyframe value type.
    #[default]
    Zero,
    /// Copy from the element right before the insertion point; zero when there is none.
    InheritPreceding,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ElementCodec {
    kind: ElementKind,
    tangent_policy: TangentPolicy,
}

impl ElementCodec {
    pub fn new(kind: ElementKind, tangent_policy: TangentPolicy) -> Self {
        Self { kind, tangent_policy }
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn source(&self) -> MirrorSource {
        MirrorSource::for_kind(self.kind)
    }

    pub fn tangent_policy(&self) -> TangentPolicy {
        self.tangent_policy
    }

    /// Record appended when the list grows without a source element.
    pub fn blank_record(&self) -> RecordData {
        match self.kind {
            ElementKind::DirectValue(value) => RecordData::Field(value.default_value()),
            ElementKind::WorldReference => RecordData::Reference(None),
            ElementKind::LinearKeyframe(value) | ElementKind::CurveKeyframe(value) => {
                RecordData::Point { position: 0.0, value: value.default_value() }
            }
            ElementKind::SpatialCurvePoint => {
                RecordData::Point { position: 0.0, value: Value::Float3(glam::Vec3::ZERO) }
            }
        }
    }

    pub fn seed(&self, element: &Element) -> Result<RecordData, ProxyError> {
        let record = match (self.kind, element) {
            (ElementKind::DirectValue(ty), Element::Value(value)) if value.value_type() == ty => {
                RecordData::Field(value.clone())
            }
            (ElementKind::LinearKeyframe(_), Element::Linear(key)) => {
                RecordData::Point { position: key.time, value: key.value.clone() }
            }
            (ElementKind::CurveKeyframe(_), Element::Curve(key)) => {
                RecordData::Point { position: key.time, value: key.value.clone() }
            }
            (ElementKind::SpatialCurvePoint, Element::TubePoint(point)) => {
                RecordData::Point { position: point.radius, value: Value::Float3(point.position) }
            }
            (ElementKind::WorldReference, Element::Reference(target)) => {
                RecordData::Reference(*target)
            }
            _ => return Err(self.mismatch()),
        };
        Ok(record)
    }

    /// Writes a record back over the element currently stored at `index`.
    pub fn to_array_element(
        &self,
        record: &RecordData,
        index: usize,
        previous: Option<&Element>,
    ) -> Result<Element, ProxyError> {
        if let ElementKind::CurveKeyframe(_) = self.kind {
            let (time, value) = self.point_parts(record)?;
            return match previous {
                Some(Element::Curve(prev)) => Ok(Element::Curve(CurveKey {
                    time,
                    value,
                    left_tangent: prev.left_tangent.clone(),
                    right_tangent: prev.right_tangent.clone(),
                })),
                Some(_) => Err(self.mismatch()),
                None => Err(ProxyError::MissingPreviousElement { index }),
            };
        }
        self.plain_element(record)
    }

    /// Maps a record that was just inserted into the list. Curve keyframes take their
    /// tangents from the configured [`TangentPolicy`].
    pub fn inserted_element(
        &self,
        record: &RecordData,
        preceding: Option<&Element>,
    ) -> Result<Element, ProxyError> {
        let ElementKind::CurveKeyframe(ty) = self.kind else {
            return self.plain_element(record);
        };
        let (time, value) = self.point_parts(record)?;
        let (left_tangent, right_tangent) = match (self.tangent_policy, preceding) {
            (TangentPolicy::InheritPreceding, Some(Element::Curve(prev))) => {
                (prev.left_tangent.clone(), prev.right_tangent.clone())
            }
            _ => (ty.zero_value(), ty.zero_value()),
        };
        Ok(Element::Curve(CurveKey { time, value, left_tangent, right_tangent }))
    }

    fn plain_element(&self, record: &RecordData) -> Result<Element, ProxyError> {
        let element = match (self.kind, record) {
            (ElementKind::DirectValue(ty), RecordData::Field(value))
                if value.value_type() == ty =>
            {
                Element::Value(value.clone())
            }
            (ElementKind::LinearKeyframe(_), RecordData::Point { .. }) => {
                let (time, value) = self.point_parts(record)?;
                Element::Linear(LinearKey { time, value })
            }
            (
                ElementKind::SpatialCurvePoint,
                RecordData::Point { position, value: Value::Float3(location) },
            ) => {
                Element::TubePoint(TubePoint { position: *location, radius: *position })
            }
            (ElementKind::WorldReference, RecordData::Reference(target)) => {
                Element::Reference(*target)
            }
            _ => return Err(self.mismatch()),
        };
        Ok(element)
    }

    fn point_parts(&self, record: &RecordData) -> Result<(f32, Value), ProxyError> {
        let value_type = match self.kind {
            ElementKind::LinearKeyframe(ty) | ElementKind::CurveKeyframe(ty) => ty,
            _ => return Err(self.mismatch()),
        };
        match record {
            RecordData::Point { position, value } if value.value_type() == value_type => {
                Ok((*position, value.clone()))
            }
            _ => Err(self.mismatch()),
        }
    }

    fn mismatch(&self) -> ProxyError {
        ProxyError::ElementMismatch { kind: self.kind }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec2, Vec3};

    fn curve_codec(policy: TangentPolicy) -> ElementCodec {
        ElementCodec::new(ElementKind::CurveKeyframe(ValueType::Float), policy)
    }

    #[test]
    fn curve_write_back_keeps_tangents() {
        let codec = curve_codec(TangentPolicy::Zero);
        let previous = Element::Curve(CurveKey::new(1.0, 2.0_f32, 0.1_f32, 0.2_f32));
        let edited = RecordData::point(1.0, 5.0_f32);
        let written = codec.to_array_element(&edited, 0, Some(&previous)).expect("write back");
        assert_eq!(written, Element::Curve(CurveKey::new(1.0, 5.0_f32, 0.1_f32, 0.2_f32)));
    }

    #[test]
    fn curve_write_back_without_previous_is_refused() {
        let codec = curve_codec(TangentPolicy::Zero);
        let err = codec.to_array_element(&RecordData::point(0.0, 1.0_f32), 3, None).unwrap_err();
        assert_eq!(err, ProxyError::MissingPreviousElement { index: 3 });
    }

    #[test]
    fn inserted_curve_keys_follow_policy() {
        let preceding = Element::Curve(CurveKey::new(0.0, 0.0_f32, -1.0_f32, 1.0_f32));
        let record = RecordData::point(2.0, 3.0_f32);

        let codec = curve_codec(TangentPolicy::Zero);
        let zeroed = codec.inserted_element(&record, Some(&preceding)).expect("zero");
        assert_eq!(zeroed, Element::Curve(CurveKey::new(2.0, 3.0_f32, 0.0_f32, 0.0_f32)));

        let inherited = curve_codec(TangentPolicy::InheritPreceding)
            .inserted_element(&record, Some(&preceding))
            .expect("inherit");
        assert_eq!(inherited, Element::Curve(CurveKey::new(2.0, 3.0_f32, -1.0_f32, 1.0_f32)));

        let at_front = curve_codec(TangentPolicy::InheritPreceding)
            .inserted_element(&record, None)
            .expect("front");
        assert_eq!(at_front, Element::Curve(CurveKey::new(2.0, 3.0_f32, 0.0_f32, 0.0_f32)));
    }

    #[test]
    fn tube_point_swaps_scalar_and_vector_roles() {
        let codec = ElementCodec::new(ElementKind::SpatialCurvePoint, TangentPolicy::Zero);
        let element = Element::TubePoint(TubePoint::new(Vec3::new(1.0, 2.0, 3.0), 0.25));
        let record = codec.seed(&element).expect("seed");
        assert_eq!(record, RecordData::point(0.25, Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(codec.to_array_element(&record, 0, None).expect("back"), element);
    }

    #[test]
    fn seed_then_write_back_is_identity() {
        let cases = [
            (
                ElementKind::DirectValue(ValueType::Float2),
                Element::Value(Value::Float2(Vec2::new(4.0, 5.0))),
            ),
            (
                ElementKind::LinearKeyframe(ValueType::Float),
                Element::Linear(LinearKey::new(0.5, 9.0_f32)),
            ),
            (ElementKind::WorldReference, Element::Reference(None)),
            (
                ElementKind::CurveKeyframe(ValueType::Float),
                Element::Curve(CurveKey::new(1.0, 2.0_f32, 0.3_f32, 0.4_f32)),
            ),
        ];
        for (kind, element) in cases {
            let codec = ElementCodec::new(kind, TangentPolicy::Zero);
            let record = codec.seed(&element).expect("seed");
            let back = codec.to_array_element(&record, 0, Some(&element)).expect("write back");
            assert_eq!(back, element, "{kind} should round-trip");
        }
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let codec =
            ElementCodec::new(ElementKind::DirectValue(ValueType::Float), TangentPolicy::Zero);
        assert!(codec.seed(&Element::Value(Value::Int(3))).is_err());
        assert!(codec.to_array_element(&RecordData::Reference(None), 0, None).is_err());
    }

    #[test]
    fn sources_follow_kind() {
        assert_eq!(
            MirrorSource::for_kind(ElementKind::SpatialCurvePoint),
            MirrorSource::GradientDriver(ValueType::Float3)
        );
        assert_eq!(MirrorSource::for_kind(ElementKind::WorldReference).list_field(), "References");
    }
}
