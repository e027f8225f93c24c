//! Dynamically typed values for configuration, plan, and state data.
//!
//! Provider operations exchange data whose shape is only known at runtime,
//! driven by the schema a provider declares. [`Value`] models that data: it
//! pairs a declared [`AttributeType`] with a [`ValueKind`] that is null,
//! unknown (not yet decided by the host), or a concrete [`KnownValue`].
//! Unknownness and nullness are tracked at every nesting level, so a known
//! list can contain unknown elements and a known object can contain null
//! fields.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::FrameworkError;

/// The type of an attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// UTF-8 string value.
    String,
    /// 64-bit signed integer value.
    Int64,
    /// 64-bit floating point value.
    Float64,
    /// Boolean value.
    Bool,
    /// Ordered collection of values of the same type.
    List(Box<AttributeType>),
    /// Unordered collection of unique values of the same type.
    Set(Box<AttributeType>),
    /// String-keyed collection of values of the same type.
    Map(Box<AttributeType>),
    /// Collection of named values, each with its own type.
    Object(BTreeMap<String, AttributeType>),
    /// A value whose type is only determined at runtime.
    Dynamic,
}

impl AttributeType {
    /// Create a list type with the given element type.
    pub fn list(element: AttributeType) -> Self {
        AttributeType::List(Box::new(element))
    }

    /// Create a set type with the given element type.
    pub fn set(element: AttributeType) -> Self {
        AttributeType::Set(Box::new(element))
    }

    /// Create a map type with the given element type.
    pub fn map(element: AttributeType) -> Self {
        AttributeType::Map(Box::new(element))
    }

    /// Create an object type from attribute names and types.
    pub fn object(attributes: impl IntoIterator<Item = (String, AttributeType)>) -> Self {
        AttributeType::Object(attributes.into_iter().collect())
    }

    /// The element type of a list, set, or map type.
    pub fn element_type(&self) -> Option<&AttributeType> {
        match self {
            AttributeType::List(element)
            | AttributeType::Set(element)
            | AttributeType::Map(element) => Some(element),
            _ => None,
        }
    }

    /// A short human-readable name for this type, used in diagnostics.
    pub fn type_label(&self) -> &'static str {
        match self {
            AttributeType::String => "string",
            AttributeType::Int64 => "int64",
            AttributeType::Float64 => "float64",
            AttributeType::Bool => "bool",
            AttributeType::List(_) => "list",
            AttributeType::Set(_) => "set",
            AttributeType::Map(_) => "map",
            AttributeType::Object(_) => "object",
            AttributeType::Dynamic => "dynamic",
        }
    }
}

/// Whether a value is null, unknown, or known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// The value is explicitly absent.
    Null,
    /// The value exists but has not been decided by the host yet.
    Unknown,
    /// The value is concrete.
    Known(KnownValue),
}

/// A concrete value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnownValue {
    /// A string.
    String(String),
    /// A 64-bit signed integer.
    Int64(i64),
    /// A 64-bit floating point number.
    Float64(f64),
    /// A boolean.
    Bool(bool),
    /// List elements in order.
    List(Vec<Value>),
    /// Set elements; order is not meaningful but is preserved.
    Set(Vec<Value>),
    /// Map entries keyed by string.
    Map(BTreeMap<String, Value>),
    /// Object fields keyed by attribute name.
    Object(BTreeMap<String, Value>),
}

impl KnownValue {
    /// A short human-readable name for this value shape, used in diagnostics.
    pub fn type_label(&self) -> &'static str {
        match self {
            KnownValue::String(_) => "string",
            KnownValue::Int64(_) => "int64",
            KnownValue::Float64(_) => "float64",
            KnownValue::Bool(_) => "bool",
            KnownValue::List(_) => "list",
            KnownValue::Set(_) => "set",
            KnownValue::Map(_) => "map",
            KnownValue::Object(_) => "object",
        }
    }
}

/// A typed value exchanged between the host, the dispatch layer, and
/// provider code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
    value_type: AttributeType,
    kind: ValueKind,
}

impl Value {
    pub(crate) fn from_parts(value_type: AttributeType, kind: ValueKind) -> Self {
        Self { value_type, kind }
    }

    /// A null value of the given type.
    pub fn null(value_type: AttributeType) -> Self {
        Self {
            value_type,
            kind: ValueKind::Null,
        }
    }

    /// An unknown value of the given type.
    pub fn unknown(value_type: AttributeType) -> Self {
        Self {
            value_type,
            kind: ValueKind::Unknown,
        }
    }

    /// A known string value.
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            value_type: AttributeType::String,
            kind: ValueKind::Known(KnownValue::String(value.into())),
        }
    }

    /// A known 64-bit integer value.
    pub fn int64(value: i64) -> Self {
        Self {
            value_type: AttributeType::Int64,
            kind: ValueKind::Known(KnownValue::Int64(value)),
        }
    }

    /// A known 64-bit float value.
    pub fn float64(value: f64) -> Self {
        Self {
            value_type: AttributeType::Float64,
            kind: ValueKind::Known(KnownValue::Float64(value)),
        }
    }

    /// A known boolean value.
    pub fn bool(value: bool) -> Self {
        Self {
            value_type: AttributeType::Bool,
            kind: ValueKind::Known(KnownValue::Bool(value)),
        }
    }

    /// A known list value with the given element type.
    pub fn list(element_type: AttributeType, elements: Vec<Value>) -> Self {
        Self {
            value_type: AttributeType::list(element_type),
            kind: ValueKind::Known(KnownValue::List(elements)),
        }
    }

    /// A known set value with the given element type.
    pub fn set(element_type: AttributeType, elements: Vec<Value>) -> Self {
        Self {
            value_type: AttributeType::set(element_type),
            kind: ValueKind::Known(KnownValue::Set(elements)),
        }
    }

    /// A known map value with the given element type.
    pub fn map(element_type: AttributeType, entries: BTreeMap<String, Value>) -> Self {
        Self {
            value_type: AttributeType::map(element_type),
            kind: ValueKind::Known(KnownValue::Map(entries)),
        }
    }

    /// A known object value. The object type is derived from the field
    /// values.
    pub fn object(fields: BTreeMap<String, Value>) -> Self {
        let value_type = AttributeType::Object(
            fields
                .iter()
                .map(|(name, value)| (name.clone(), value.value_type().clone()))
                .collect(),
        );
        Self {
            value_type,
            kind: ValueKind::Known(KnownValue::Object(fields)),
        }
    }

    /// The declared type of this value.
    pub fn value_type(&self) -> &AttributeType {
        &self.value_type
    }

    /// Whether the value is null, unknown, or known.
    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    /// Whether this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self.kind, ValueKind::Null)
    }

    /// Whether this value is unknown.
    pub fn is_unknown(&self) -> bool {
        matches!(self.kind, ValueKind::Unknown)
    }

    /// Whether this value is known.
    pub fn is_known(&self) -> bool {
        matches!(self.kind, ValueKind::Known(_))
    }

    /// Whether this value contains no unknown values at any depth. Null
    /// values are fully known.
    pub fn is_fully_known(&self) -> bool {
        match &self.kind {
            ValueKind::Null => true,
            ValueKind::Unknown => false,
            ValueKind::Known(known) => match known {
                KnownValue::String(_)
                | KnownValue::Int64(_)
                | KnownValue::Float64(_)
                | KnownValue::Bool(_) => true,
                KnownValue::List(elements) | KnownValue::Set(elements) => {
                    elements.iter().all(Value::is_fully_known)
                }
                KnownValue::Map(entries) | KnownValue::Object(entries) => {
                    entries.values().all(Value::is_fully_known)
                }
            },
        }
    }

    /// The known value, if this value is known.
    pub fn as_known(&self) -> Option<&KnownValue> {
        match &self.kind {
            ValueKind::Known(known) => Some(known),
            _ => None,
        }
    }

    /// The string content, if this is a known string.
    pub fn as_string(&self) -> Option<&str> {
        match self.as_known() {
            Some(KnownValue::String(value)) => Some(value),
            _ => None,
        }
    }

    /// The integer content, if this is a known int64.
    pub fn as_int64(&self) -> Option<i64> {
        match self.as_known() {
            Some(KnownValue::Int64(value)) => Some(*value),
            _ => None,
        }
    }

    /// The float content, if this is a known float64.
    pub fn as_float64(&self) -> Option<f64> {
        match self.as_known() {
            Some(KnownValue::Float64(value)) => Some(*value),
            _ => None,
        }
    }

    /// The boolean content, if this is a known bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self.as_known() {
            Some(KnownValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    /// The elements, if this is a known list or set.
    pub fn as_elements(&self) -> Option<&[Value]> {
        match self.as_known() {
            Some(KnownValue::List(elements)) | Some(KnownValue::Set(elements)) => Some(elements),
            _ => None,
        }
    }

    /// The entries, if this is a known map or object.
    pub fn as_entries(&self) -> Option<&BTreeMap<String, Value>> {
        match self.as_known() {
            Some(KnownValue::Map(entries)) | Some(KnownValue::Object(entries)) => Some(entries),
            _ => None,
        }
    }

    /// Convert JSON data into a value of the given type.
    ///
    /// JSON `null` becomes a null value at any level. Object data must only
    /// contain attributes the object type declares; declared attributes
    /// missing from the data become null. For [`AttributeType::Dynamic`] the
    /// concrete type is inferred from the data.
    pub fn from_json(
        value_type: &AttributeType,
        data: &serde_json::Value,
    ) -> Result<Value, FrameworkError> {
        convert_json(value_type, data, false)
    }

    /// Convert JSON data into a value of the given type, silently dropping
    /// object attributes the type does not declare.
    ///
    /// This is how state written against a different schema is decoded into
    /// a partial typed view, for example when moving resource state between
    /// resource types.
    pub fn from_json_ignoring_undefined(
        value_type: &AttributeType,
        data: &serde_json::Value,
    ) -> Result<Value, FrameworkError> {
        convert_json(value_type, data, true)
    }

    /// Encode this value as plain JSON.
    ///
    /// Null values become JSON `null` at any level. Unknown values have no
    /// JSON representation and produce an error; values a host persists are
    /// always fully known.
    pub fn to_json(&self) -> Result<serde_json::Value, FrameworkError> {
        match &self.kind {
            ValueKind::Null => Ok(serde_json::Value::Null),
            ValueKind::Unknown => Err(FrameworkError::ValueConversion(format!(
                "unknown {} value cannot be encoded as JSON",
                self.value_type.type_label()
            ))),
            ValueKind::Known(known) => match known {
                KnownValue::String(value) => Ok(serde_json::Value::String(value.clone())),
                KnownValue::Int64(value) => Ok(serde_json::Value::from(*value)),
                KnownValue::Float64(value) => serde_json::Number::from_f64(*value)
                    .map(serde_json::Value::Number)
                    .ok_or_else(|| {
                        FrameworkError::ValueConversion(format!(
                            "float64 value {value} cannot be encoded as JSON"
                        ))
                    }),
                KnownValue::Bool(value) => Ok(serde_json::Value::Bool(*value)),
                KnownValue::List(elements) | KnownValue::Set(elements) => {
                    let items = elements
                        .iter()
                        .map(Value::to_json)
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(serde_json::Value::Array(items))
                }
                KnownValue::Map(entries) | KnownValue::Object(entries) => {
                    let mut object = serde_json::Map::new();
                    for (key, value) in entries {
                        object.insert(key.clone(), value.to_json()?);
                    }
                    Ok(serde_json::Value::Object(object))
                }
            },
        }
    }
}

fn convert_json(
    value_type: &AttributeType,
    data: &serde_json::Value,
    ignore_undefined: bool,
) -> Result<Value, FrameworkError> {
    if data.is_null() {
        return Ok(Value::null(value_type.clone()));
    }

    let mismatch = |found: &str| {
        FrameworkError::ValueConversion(format!(
            "expected {}, found {found}",
            value_type.type_label()
        ))
    };

    match value_type {
        AttributeType::String => match data.as_str() {
            Some(value) => Ok(Value::string(value)),
            None => Err(mismatch(json_type_label(data))),
        },
        AttributeType::Int64 => match json_as_i64(data) {
            Some(value) => Ok(Value::int64(value)),
            None => Err(mismatch(json_type_label(data))),
        },
        AttributeType::Float64 => match data.as_f64() {
            Some(value) => Ok(Value::float64(value)),
            None => Err(mismatch(json_type_label(data))),
        },
        AttributeType::Bool => match data.as_bool() {
            Some(value) => Ok(Value::bool(value)),
            None => Err(mismatch(json_type_label(data))),
        },
        AttributeType::List(element) | AttributeType::Set(element) => {
            let items = data.as_array().ok_or_else(|| mismatch(json_type_label(data)))?;
            let elements = items
                .iter()
                .map(|item| convert_json(element, item, ignore_undefined))
                .collect::<Result<Vec<_>, _>>()?;
            let kind = match value_type {
                AttributeType::List(_) => KnownValue::List(elements),
                _ => KnownValue::Set(elements),
            };
            Ok(Value::from_parts(value_type.clone(), ValueKind::Known(kind)))
        }
        AttributeType::Map(element) => {
            let object = data.as_object().ok_or_else(|| mismatch(json_type_label(data)))?;
            let mut entries = BTreeMap::new();
            for (key, item) in object {
                entries.insert(key.clone(), convert_json(element, item, ignore_undefined)?);
            }
            Ok(Value::from_parts(
                value_type.clone(),
                ValueKind::Known(KnownValue::Map(entries)),
            ))
        }
        AttributeType::Object(attribute_types) => {
            let object = data.as_object().ok_or_else(|| mismatch(json_type_label(data)))?;
            for key in object.keys() {
                if !attribute_types.contains_key(key) && !ignore_undefined {
                    return Err(FrameworkError::ValueConversion(format!(
                        "undefined object attribute {key:?}"
                    )));
                }
            }
            let mut fields = BTreeMap::new();
            for (name, attribute_type) in attribute_types {
                let field = match object.get(name) {
                    Some(item) => convert_json(attribute_type, item, ignore_undefined)?,
                    None => Value::null(attribute_type.clone()),
                };
                fields.insert(name.clone(), field);
            }
            Ok(Value::from_parts(
                value_type.clone(),
                ValueKind::Known(KnownValue::Object(fields)),
            ))
        }
        AttributeType::Dynamic => Ok(infer_json(data, ignore_undefined)?),
    }
}

fn infer_json(data: &serde_json::Value, ignore_undefined: bool) -> Result<Value, FrameworkError> {
    match data {
        serde_json::Value::Null => Ok(Value::null(AttributeType::Dynamic)),
        serde_json::Value::Bool(value) => Ok(Value::bool(*value)),
        serde_json::Value::String(value) => Ok(Value::string(value)),
        serde_json::Value::Number(_) => match json_as_i64(data) {
            Some(value) => Ok(Value::int64(value)),
            None => match data.as_f64() {
                Some(value) => Ok(Value::float64(value)),
                None => Err(FrameworkError::ValueConversion(
                    "number is out of range".to_string(),
                )),
            },
        },
        serde_json::Value::Array(items) => {
            let elements = items
                .iter()
                .map(|item| infer_json(item, ignore_undefined))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::list(AttributeType::Dynamic, elements))
        }
        serde_json::Value::Object(object) => {
            let mut fields = BTreeMap::new();
            for (key, item) in object {
                fields.insert(key.clone(), infer_json(item, ignore_undefined)?);
            }
            Ok(Value::object(fields))
        }
    }
}

fn json_as_i64(data: &serde_json::Value) -> Option<i64> {
    if let Some(value) = data.as_i64() {
        return Some(value);
    }
    match data.as_f64() {
        Some(value) if value.fract() == 0.0 && value >= i64::MIN as f64 && value <= i64::MAX as f64 => {
            Some(value as i64)
        }
        _ => None,
    }
}

fn json_type_label(data: &serde_json::Value) -> &'static str {
    match data {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ValueKind::Null => write!(f, "null"),
            ValueKind::Unknown => write!(f, "(unknown)"),
            ValueKind::Known(known) => match known {
                KnownValue::String(value) => write!(f, "{value:?}"),
                KnownValue::Int64(value) => write!(f, "{value}"),
                KnownValue::Float64(value) => write!(f, "{value}"),
                KnownValue::Bool(value) => write!(f, "{value}"),
                KnownValue::List(elements) | KnownValue::Set(elements) => {
                    write!(f, "[")?;
                    for (i, element) in elements.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{element}")?;
                    }
                    write!(f, "]")
                }
                KnownValue::Map(entries) | KnownValue::Object(entries) => {
                    write!(f, "{{")?;
                    for (i, (key, value)) in entries.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{key}: {value}")?;
                    }
                    write!(f, "}}")
                }
            },
        }
    }
}
