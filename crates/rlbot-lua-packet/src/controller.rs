//! Control-output layout and record.
//!
//! The host framework owns the arity and field order of the control-output
//! record. [`ControllerLayout`] carries that contract into the sandbox and
//! [`ControllerState`] enforces it: a record is built positionally from
//! exactly `layout.len()` values, each matching its field's kind. Short or
//! long tuples are rejected rather than padded or truncated.

use std::fmt;
use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize};

use crate::ControlError;

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// The value type a control field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    /// A floating point axis, nominally in `[-1, 1]`.
    Analog,
    /// A pressed/released button.
    Button,
}

impl ControlKind {
    /// The value a field of this kind takes when a named controller object
    /// leaves it unset.
    pub fn zero(self) -> ControlValue {
        match self {
            Self::Analog => ControlValue::Analog(0.0),
            Self::Button => ControlValue::Button(false),
        }
    }
}

impl fmt::Display for ControlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Analog => f.write_str("a number"),
            Self::Button => f.write_str("a boolean"),
        }
    }
}

/// One named slot in a [`ControllerLayout`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControlField {
    pub name: String,
    pub kind: ControlKind,
}

impl ControlField {
    pub fn analog(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            kind: ControlKind::Analog,
        }
    }

    pub fn button(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            kind: ControlKind::Button,
        }
    }
}

/// A single control value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlValue {
    Analog(f32),
    Button(bool),
}

impl ControlValue {
    pub fn kind(self) -> ControlKind {
        match self {
            Self::Analog(_) => ControlKind::Analog,
            Self::Button(_) => ControlKind::Button,
        }
    }

    pub fn as_analog(self) -> Option<f32> {
        match self {
            Self::Analog(v) => Some(v),
            Self::Button(_) => None,
        }
    }

    pub fn as_button(self) -> Option<bool> {
        match self {
            Self::Button(v) => Some(v),
            Self::Analog(_) => None,
        }
    }
}

impl fmt::Display for ControlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Analog(v) => write!(f, "number {v}"),
            Self::Button(v) => write!(f, "boolean {v}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Ordered field list defining the control-output contract.
///
/// Cheap to clone: fields live behind an `Arc` so every
/// [`ControllerState`] can carry its layout without copying names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ControlField>", into = "Vec<ControlField>")]
pub struct ControllerLayout {
    fields: Arc<[ControlField]>,
}

impl ControllerLayout {
    /// Build a layout from an ordered field list.
    ///
    /// # Errors
    ///
    /// - [`ControlError::EmptyLayout`] if `fields` is empty.
    /// - [`ControlError::DuplicateField`] if two fields share a name.
    pub fn new(fields: Vec<ControlField>) -> Result<Self, ControlError> {
        if fields.is_empty() {
            return Err(ControlError::EmptyLayout);
        }
        for (i, field) in fields.iter().enumerate() {
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(ControlError::DuplicateField(field.name.clone()));
            }
        }
        Ok(Self {
            fields: fields.into(),
        })
    }

    /// Throttle-first eight-field layout:
    /// `throttle, steer, pitch, yaw, roll, jump, boost, handbrake`.
    pub fn standard() -> Self {
        Self {
            fields: vec![
                ControlField::analog("throttle"),
                ControlField::analog("steer"),
                ControlField::analog("pitch"),
                ControlField::analog("yaw"),
                ControlField::analog("roll"),
                ControlField::button("jump"),
                ControlField::button("boost"),
                ControlField::button("handbrake"),
            ]
            .into(),
        }
    }

    /// Positional order of RLBot's `SimpleControllerState` constructor:
    /// `steer, throttle, pitch, yaw, roll, jump, boost, handbrake, use_item`.
    pub fn simple_controller_state() -> Self {
        Self {
            fields: vec![
                ControlField::analog("steer"),
                ControlField::analog("throttle"),
                ControlField::analog("pitch"),
                ControlField::analog("yaw"),
                ControlField::analog("roll"),
                ControlField::button("jump"),
                ControlField::button("boost"),
                ControlField::button("handbrake"),
                ControlField::button("use_item"),
            ]
            .into(),
        }
    }

    pub fn fields(&self) -> &[ControlField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Position of the field called `name`, if any.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

impl Default for ControllerLayout {
    fn default() -> Self {
        Self::standard()
    }
}

impl TryFrom<Vec<ControlField>> for ControllerLayout {
    type Error = ControlError;

    fn try_from(fields: Vec<ControlField>) -> Result<Self, Self::Error> {
        Self::new(fields)
    }
}

impl From<ControllerLayout> for Vec<ControlField> {
    fn from(layout: ControllerLayout) -> Self {
        layout.fields.to_vec()
    }
}

// ---------------------------------------------------------------------------
// ControllerState
// ---------------------------------------------------------------------------

/// One tick's control output, built fresh every frame.
///
/// Serializes as a map from field name to value, in layout order.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerState {
    layout: ControllerLayout,
    values: Vec<ControlValue>,
}

impl ControllerState {
    /// Build a record positionally from `values`.
    ///
    /// # Errors
    ///
    /// - [`ControlError::ArityMismatch`] if `values.len() != layout.len()`.
    /// - [`ControlError::KindMismatch`] if a value's kind differs from its
    ///   field's kind.
    pub fn from_values(
        layout: &ControllerLayout,
        values: Vec<ControlValue>,
    ) -> Result<Self, ControlError> {
        if values.len() != layout.len() {
            return Err(ControlError::ArityMismatch {
                expected: layout.len(),
                got: values.len(),
            });
        }
        for (field, value) in layout.fields().iter().zip(&values) {
            if value.kind() != field.kind {
                return Err(ControlError::KindMismatch {
                    field: field.name.clone(),
                    expected: field.kind,
                    found: value.to_string(),
                });
            }
        }
        Ok(Self {
            layout: layout.clone(),
            values,
        })
    }

    /// A record with every field at its kind's zero value.
    pub fn neutral(layout: &ControllerLayout) -> Self {
        Self {
            layout: layout.clone(),
            values: layout.fields().iter().map(|f| f.kind.zero()).collect(),
        }
    }

    pub fn layout(&self) -> &ControllerLayout {
        &self.layout
    }

    /// Values in layout order.
    pub fn values(&self) -> &[ControlValue] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<ControlValue> {
        self.layout.position(name).map(|i| self.values[i])
    }

    /// Value of an analog field, or `None` if the layout has no such
    /// analog field.
    pub fn analog(&self, name: &str) -> Option<f32> {
        self.get(name).and_then(ControlValue::as_analog)
    }

    /// Value of a button field, or `None` if the layout has no such
    /// button field.
    pub fn button(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(ControlValue::as_button)
    }

    /// `(name, value)` pairs in layout order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ControlValue)> + '_ {
        self.layout
            .fields()
            .iter()
            .zip(&self.values)
            .map(|(f, v)| (f.name.as_str(), *v))
    }
}

impl Serialize for ControllerState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}
