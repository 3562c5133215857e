//! Host values, wire values and the conversion table between them.
//!
//! [`Value`] is what callers write and what destinations receive. [`WireValue`]
//! is what the driver sends and fills in. Conversions never fail: combinations
//! without a dedicated mapping fall back to the widest compatible host value.
//!
//! - [`to_wire`]: booleans become `0`/`1`, everything else passes through.
//! - [`to_host`]: selects the host shape from a [`FieldDescriptor`].
//! - [`allocate_destination`]: the typed output slot a column is captured into.

use crate::error::{OrmError, OrmResult};
use crate::schema::{DataType, FieldDescriptor};
use bytes::Bytes;
use chrono::NaiveDateTime;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// A host-side scalar (or collection) value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Bytes),
    Time(NaiveDateTime),
    /// Raw JSON document bytes.
    Json(Bytes),
    /// Homogeneous collection, marshaled as an Oracle collection type.
    Array(Vec<Value>),
}

impl Value {
    /// Serialize any value into a raw JSON host value.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> OrmResult<Self> {
        Ok(Value::Json(Bytes::from(serde_json::to_vec(value)?)))
    }

    /// Decode a JSON host value into `T`.
    pub fn decode_json<T: DeserializeOwned>(&self) -> OrmResult<T> {
        match self {
            Value::Json(raw) | Value::Bytes(raw) => Ok(serde_json::from_slice(raw)?),
            Value::String(s) => Ok(serde_json::from_str(s)?),
            other => Err(OrmError::Serialization(format!(
                "expected a JSON value, got {other:?}"
            ))),
        }
    }

    /// Build a collection value.
    pub fn array<T: Into<Value>>(items: impl IntoIterator<Item = T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this is the zero value of its type.
    ///
    /// The result binder keeps a captured row only if at least one of its
    /// values is non-zero.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::I8(v) => *v == 0,
            Value::I16(v) => *v == 0,
            Value::I32(v) => *v == 0,
            Value::I64(v) => *v == 0,
            Value::U8(v) => *v == 0,
            Value::U16(v) => *v == 0,
            Value::U32(v) => *v == 0,
            Value::U64(v) => *v == 0,
            Value::F32(v) => *v == 0.0,
            Value::F64(v) => *v == 0.0,
            Value::String(s) => s.is_empty(),
            Value::Bytes(b) | Value::Json(b) => b.is_empty(),
            Value::Time(t) => *t == zero_time(),
            Value::Array(items) => items.is_empty(),
        }
    }

    /// Length used for the large-object widening check: characters for text,
    /// bytes for binary payloads, zero otherwise.
    pub(crate) fn lob_len(&self) -> usize {
        match self {
            Value::String(s) => s.chars().count(),
            Value::Bytes(b) | Value::Json(b) => b.len(),
            _ => 0,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

macro_rules! impl_from_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from_scalar!(
    i8 => I8, i16 => I16, i32 => I32, i64 => I64,
    u8 => U8, u16 => U16, u32 => U32, u64 => U64,
    f32 => F32, f64 => F64,
    String => String, Bytes => Bytes, NaiveDateTime => Time,
);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(Bytes::from(v))
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(Bytes::from(v.to_string()))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Driver-level value.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Null,
    Int64(i64),
    Float64(f64),
    Text(String),
    Bytes(Bytes),
    Timestamp(NaiveDateTime),
    NullInt64(Option<i64>),
    NullFloat64(Option<f64>),
    NullText(Option<String>),
    NullTimestamp(Option<NaiveDateTime>),
    /// A named Oracle collection (VARRAY / nested table) instance.
    Collection {
        type_name: String,
        elements: Vec<WireValue>,
    },
}

impl WireValue {
    /// Whether this is SQL NULL, including a nullable wrapper without a value.
    pub fn is_null(&self) -> bool {
        matches!(
            self,
            WireValue::Null
                | WireValue::NullInt64(None)
                | WireValue::NullFloat64(None)
                | WireValue::NullText(None)
                | WireValue::NullTimestamp(None)
        )
    }

    /// Unwrap a nullable wrapper into its plain counterpart.
    fn into_plain(self) -> WireValue {
        match self {
            WireValue::NullInt64(Some(v)) => WireValue::Int64(v),
            WireValue::NullFloat64(Some(v)) => WireValue::Float64(v),
            WireValue::NullText(Some(v)) => WireValue::Text(v),
            WireValue::NullTimestamp(Some(v)) => WireValue::Timestamp(v),
            WireValue::NullInt64(None)
            | WireValue::NullFloat64(None)
            | WireValue::NullText(None)
            | WireValue::NullTimestamp(None) => WireValue::Null,
            other => other,
        }
    }
}

/// The shape of an output slot the driver must populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireKind {
    Int64,
    Float64,
    Text,
    Bytes,
    Timestamp,
    NullInt64,
    NullFloat64,
    NullText,
    NullTimestamp,
}

impl WireKind {
    /// The value an output slot holds before the driver writes into it.
    pub fn zero(self) -> WireValue {
        match self {
            WireKind::Int64 => WireValue::Int64(0),
            WireKind::Float64 => WireValue::Float64(0.0),
            WireKind::Text => WireValue::Text(String::new()),
            WireKind::Bytes => WireValue::Bytes(Bytes::new()),
            WireKind::Timestamp => WireValue::Timestamp(zero_time()),
            WireKind::NullInt64 => WireValue::NullInt64(None),
            WireKind::NullFloat64 => WireValue::NullFloat64(None),
            WireKind::NullText => WireValue::NullText(None),
            WireKind::NullTimestamp => WireValue::NullTimestamp(None),
        }
    }
}

/// A typed output destination, pre-allocated before execution.
#[derive(Debug, Clone, PartialEq)]
pub struct OutSlot {
    pub kind: WireKind,
    pub value: WireValue,
}

impl OutSlot {
    pub fn new(kind: WireKind) -> Self {
        Self {
            kind,
            value: kind.zero(),
        }
    }

    /// Store the value produced by the driver.
    pub fn fill(&mut self, value: WireValue) {
        self.value = value;
    }

    /// Whether the slot still holds its initial zero value.
    pub fn is_untouched(&self) -> bool {
        self.value == self.kind.zero()
    }
}

/// Element category of a collection bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionElement {
    Number,
    Text,
    Time,
    Bytes,
}

impl CollectionElement {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Null | Value::Array(_) => None,
            Value::Bool(_)
            | Value::I8(_)
            | Value::I16(_)
            | Value::I32(_)
            | Value::I64(_)
            | Value::U8(_)
            | Value::U16(_)
            | Value::U32(_)
            | Value::U64(_)
            | Value::F32(_)
            | Value::F64(_) => Some(Self::Number),
            Value::String(_) | Value::Json(_) => Some(Self::Text),
            Value::Time(_) => Some(Self::Time),
            Value::Bytes(_) => Some(Self::Bytes),
        }
    }
}

/// Execution context threaded through conversions that need database-side
/// type names (collection marshaling).
#[derive(Debug, Clone)]
pub struct ConversionContext {
    collection_types: HashMap<CollectionElement, String>,
}

impl Default for ConversionContext {
    fn default() -> Self {
        let mut collection_types = HashMap::new();
        collection_types.insert(CollectionElement::Number, "SYS.ODCINUMBERLIST".to_string());
        collection_types.insert(CollectionElement::Text, "SYS.ODCIVARCHAR2LIST".to_string());
        collection_types.insert(CollectionElement::Time, "SYS.ODCIDATELIST".to_string());
        collection_types.insert(CollectionElement::Bytes, "SYS.ODCIRAWLIST".to_string());
        Self { collection_types }
    }
}

impl ConversionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the collection type used for arrays of `element`.
    pub fn with_collection_type(
        mut self,
        element: CollectionElement,
        type_name: impl Into<String>,
    ) -> Self {
        self.collection_types.insert(element, type_name.into());
        self
    }

    /// The collection type name used for arrays of `element`.
    pub fn collection_type(&self, element: CollectionElement) -> &str {
        self.collection_types
            .get(&element)
            .map(String::as_str)
            .unwrap_or("SYS.ODCIVARCHAR2LIST")
    }
}

/// Convert a host value into a wire value using a default context.
pub fn to_wire(value: &Value) -> WireValue {
    to_wire_with(value, &ConversionContext::default())
}

/// Convert a host value into a wire value.
pub fn to_wire_with(value: &Value, ctx: &ConversionContext) -> WireValue {
    match value {
        Value::Null => WireValue::Null,
        Value::Bool(b) => WireValue::Int64(i64::from(*b)),
        Value::I8(v) => WireValue::Int64(i64::from(*v)),
        Value::I16(v) => WireValue::Int64(i64::from(*v)),
        Value::I32(v) => WireValue::Int64(i64::from(*v)),
        Value::I64(v) => WireValue::Int64(*v),
        Value::U8(v) => WireValue::Int64(i64::from(*v)),
        Value::U16(v) => WireValue::Int64(i64::from(*v)),
        Value::U32(v) => WireValue::Int64(i64::from(*v)),
        Value::U64(v) => match i64::try_from(*v) {
            Ok(n) => WireValue::Int64(n),
            Err(_) => WireValue::Text(v.to_string()),
        },
        Value::F32(v) => WireValue::Float64(f64::from(*v)),
        Value::F64(v) => WireValue::Float64(*v),
        Value::String(s) => WireValue::Text(s.clone()),
        Value::Bytes(b) => WireValue::Bytes(b.clone()),
        Value::Time(t) => WireValue::Timestamp(*t),
        Value::Json(raw) => WireValue::Text(String::from_utf8_lossy(raw).into_owned()),
        Value::Array(items) => {
            let element = items
                .iter()
                .find_map(CollectionElement::of)
                .unwrap_or(CollectionElement::Text);
            WireValue::Collection {
                type_name: ctx.collection_type(element).to_string(),
                elements: items.iter().map(|v| to_wire_with(v, ctx)).collect(),
            }
        }
    }
}

/// Convert a host value for a specific column.
///
/// Identical to [`to_wire_with`] except that JSON stored in a binary column
/// is sent as raw bytes.
pub fn to_wire_for(value: &Value, field: &FieldDescriptor, ctx: &ConversionContext) -> WireValue {
    match value {
        Value::Json(raw) if field.json_binary => WireValue::Bytes(raw.clone()),
        _ => to_wire_with(value, ctx),
    }
}

/// Convert a wire value into the host shape described by `field`.
pub fn to_host(wire: &WireValue, field: &FieldDescriptor) -> Value {
    if wire.is_null() {
        return Value::Null;
    }
    let wire = wire.clone().into_plain();

    match field.data_type {
        DataType::Json => match wire {
            WireValue::Text(s) => Value::Json(Bytes::from(s)),
            WireValue::Bytes(b) => Value::Json(b),
            other => raw_host(other),
        },
        DataType::Time => match wire {
            WireValue::Timestamp(t) => Value::Time(t),
            WireValue::Text(s) => parse_timestamp(&s)
                .map(Value::Time)
                .unwrap_or(Value::String(s)),
            other => raw_host(other),
        },
        DataType::Bool => match wire {
            WireValue::Int64(n) => Value::Bool(n != 0),
            WireValue::Float64(f) => Value::Bool(f != 0.0),
            WireValue::Text(s) => match s.trim() {
                "1" | "Y" | "y" | "true" | "TRUE" => Value::Bool(true),
                "0" | "N" | "n" | "false" | "FALSE" => Value::Bool(false),
                _ => Value::String(s),
            },
            other => raw_host(other),
        },
        DataType::Int { bits } => match wire {
            WireValue::Int64(n) => narrow_int(n, bits),
            WireValue::Float64(f) if f.fract() == 0.0 && f.abs() < 9.2e18 => {
                narrow_int(f as i64, bits)
            }
            WireValue::Text(s) => match s.trim().parse::<i64>() {
                Ok(n) => narrow_int(n, bits),
                Err(_) => Value::String(s),
            },
            other => raw_host(other),
        },
        DataType::Uint { bits } => match wire {
            WireValue::Int64(n) => match u64::try_from(n) {
                Ok(u) => narrow_uint(u, bits),
                Err(_) => Value::I64(n),
            },
            WireValue::Text(s) => match s.trim().parse::<u64>() {
                Ok(u) => narrow_uint(u, bits),
                Err(_) => Value::String(s),
            },
            other => raw_host(other),
        },
        DataType::Float { bits } => {
            let f = match wire {
                WireValue::Float64(f) => f,
                WireValue::Int64(n) => n as f64,
                WireValue::Text(s) => match s.trim().parse::<f64>() {
                    Ok(f) => f,
                    Err(_) => return Value::String(s),
                },
                other => return raw_host(other),
            };
            if bits == 32 {
                Value::F32(f as f32)
            } else {
                Value::F64(f)
            }
        }
        DataType::String => match wire {
            WireValue::Text(s) => Value::String(s),
            other => raw_host(other),
        },
        DataType::Bytes => match wire {
            WireValue::Bytes(b) => Value::Bytes(b),
            WireValue::Text(s) => Value::Bytes(Bytes::from(s)),
            other => raw_host(other),
        },
        DataType::Unknown => raw_host(wire),
    }
}

/// Select the output slot a captured column is read into.
pub fn allocate_destination(field: &FieldDescriptor) -> OutSlot {
    let nullable = field.nullable;
    let kind = match field.data_type {
        DataType::Bool | DataType::Int { .. } | DataType::Uint { .. } if nullable => {
            WireKind::NullInt64
        }
        DataType::Bool | DataType::Int { .. } | DataType::Uint { .. } => WireKind::Int64,
        DataType::Float { .. } if nullable => WireKind::NullFloat64,
        DataType::Float { .. } => WireKind::Float64,
        DataType::String if nullable => WireKind::NullText,
        DataType::String => WireKind::Text,
        DataType::Time if nullable => WireKind::NullTimestamp,
        DataType::Time => WireKind::Timestamp,
        DataType::Bytes => WireKind::Bytes,
        DataType::Json if field.json_binary => WireKind::Bytes,
        DataType::Json => WireKind::NullText,
        DataType::Unknown => WireKind::Text,
    };
    OutSlot::new(kind)
}

fn raw_host(wire: WireValue) -> Value {
    match wire.into_plain() {
        WireValue::Null => Value::Null,
        WireValue::Int64(n) => Value::I64(n),
        WireValue::Float64(f) => Value::F64(f),
        WireValue::Text(s) => Value::String(s),
        WireValue::Bytes(b) => Value::Bytes(b),
        WireValue::Timestamp(t) => Value::Time(t),
        WireValue::Collection { elements, .. } => {
            Value::Array(elements.into_iter().map(raw_host).collect())
        }
        // into_plain() leaves no nullable wrappers behind
        WireValue::NullInt64(_)
        | WireValue::NullFloat64(_)
        | WireValue::NullText(_)
        | WireValue::NullTimestamp(_) => Value::Null,
    }
}

fn narrow_int(n: i64, bits: u8) -> Value {
    match bits {
        8 => i8::try_from(n).map_or(Value::I64(n), Value::I8),
        16 => i16::try_from(n).map_or(Value::I64(n), Value::I16),
        32 => i32::try_from(n).map_or(Value::I64(n), Value::I32),
        _ => Value::I64(n),
    }
}

fn narrow_uint(u: u64, bits: u8) -> Value {
    match bits {
        8 => u8::try_from(u).map_or(Value::U64(u), Value::U8),
        16 => u16::try_from(u).map_or(Value::U64(u), Value::U16),
        32 => u32::try_from(u).map_or(Value::U64(u), Value::U32),
        _ => Value::U64(u),
    }
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s.trim(), fmt).ok())
}

pub(crate) fn zero_time() -> NaiveDateTime {
    NaiveDateTime::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn field(data_type: DataType) -> FieldDescriptor {
        FieldDescriptor::new("f", data_type)
    }

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_milli_opt(12, 30, 5, 250)
            .unwrap()
    }

    #[test]
    fn round_trip_every_category() {
        let cases = vec![
            (Value::Bool(true), field(DataType::Bool)),
            (Value::Bool(false), field(DataType::Bool)),
            (Value::I8(-7), field(DataType::Int { bits: 8 })),
            (Value::I16(300), field(DataType::Int { bits: 16 })),
            (Value::I32(-70_000), field(DataType::I32)),
            (Value::I64(i64::MAX), field(DataType::I64)),
            (Value::U8(200), field(DataType::Uint { bits: 8 })),
            (Value::U32(4_000_000_000), field(DataType::Uint { bits: 32 })),
            (Value::U64(u64::MAX), field(DataType::Uint { bits: 64 })),
            (Value::F32(1.5), field(DataType::Float { bits: 32 })),
            (Value::F64(-2.25), field(DataType::F64)),
            (Value::from("hello"), field(DataType::String)),
            (Value::from(vec![1u8, 2, 3]), field(DataType::Bytes)),
            (Value::Time(ts()), field(DataType::Time)),
            (Value::json(&serde_json::json!({"a": 1})).unwrap(), field(DataType::Json)),
        ];
        for (value, desc) in cases {
            assert_eq!(to_host(&to_wire(&value), &desc), value, "{desc:?}");
        }
    }

    #[test]
    fn null_round_trips_to_canonical_null() {
        for dt in [DataType::I64, DataType::String, DataType::Time, DataType::Json] {
            let desc = field(dt).nullable();
            assert_eq!(to_host(&to_wire(&Value::Null), &desc), Value::Null);
        }
        let none: Option<i64> = None;
        assert_eq!(to_wire(&Value::from(none)), WireValue::Null);
    }

    #[test]
    fn bool_goes_out_as_number() {
        assert_eq!(to_wire(&Value::Bool(true)), WireValue::Int64(1));
        assert_eq!(to_wire(&Value::Bool(false)), WireValue::Int64(0));
    }

    #[test]
    fn nullable_wrappers_preserve_null_flag() {
        let desc = field(DataType::Time).nullable();
        assert_eq!(to_host(&WireValue::NullTimestamp(None), &desc), Value::Null);
        assert_eq!(
            to_host(&WireValue::NullTimestamp(Some(ts())), &desc),
            Value::Time(ts())
        );
        let desc = field(DataType::I32).nullable();
        assert_eq!(to_host(&WireValue::NullInt64(Some(9)), &desc), Value::I32(9));
    }

    #[test]
    fn json_binary_uses_bytes() {
        let desc = field(DataType::Json).json_binary();
        let value = Value::json(&serde_json::json!([1, 2])).unwrap();
        let ctx = ConversionContext::default();
        let wire = to_wire_for(&value, &desc, &ctx);
        assert!(matches!(wire, WireValue::Bytes(_)));
        assert_eq!(to_host(&wire, &desc), value);
        let decoded: Vec<i32> = to_host(&wire, &desc).decode_json().unwrap();
        assert_eq!(decoded, vec![1, 2]);
    }

    #[test]
    fn overflow_keeps_widest_value() {
        let desc = field(DataType::Int { bits: 8 });
        assert_eq!(to_host(&WireValue::Int64(1000), &desc), Value::I64(1000));
    }

    #[test]
    fn unknown_combination_is_returned_raw() {
        let desc = field(DataType::String);
        assert_eq!(to_host(&WireValue::Int64(5), &desc), Value::I64(5));
        let desc = field(DataType::Unknown);
        assert_eq!(
            to_host(&WireValue::Text("x".into()), &desc),
            Value::String("x".into())
        );
    }

    #[test]
    fn allocation_follows_descriptor() {
        assert_eq!(
            allocate_destination(&field(DataType::Time).nullable()).kind,
            WireKind::NullTimestamp
        );
        assert_eq!(allocate_destination(&field(DataType::Time)).kind, WireKind::Timestamp);
        assert_eq!(allocate_destination(&field(DataType::Bool)).kind, WireKind::Int64);
        assert_eq!(allocate_destination(&field(DataType::Unknown)).kind, WireKind::Text);
        assert_eq!(
            allocate_destination(&field(DataType::Json).json_binary()).kind,
            WireKind::Bytes
        );
        let slot = allocate_destination(&field(DataType::I64));
        assert!(slot.is_untouched());
    }

    #[test]
    fn arrays_use_context_collection_types() {
        let ctx = ConversionContext::new()
            .with_collection_type(CollectionElement::Number, "APP.NUM_LIST");
        let wire = to_wire_with(&Value::array(vec![1i64, 2, 3]), &ctx);
        match wire {
            WireValue::Collection { type_name, elements } => {
                assert_eq!(type_name, "APP.NUM_LIST");
                assert_eq!(elements.len(), 3);
            }
            other => panic!("expected collection, got {other:?}"),
        }
        let wire = to_wire(&Value::array(["a", "b"]));
        assert!(matches!(
            wire,
            WireValue::Collection { ref type_name, .. } if type_name == "SYS.ODCIVARCHAR2LIST"
        ));
    }

    #[test]
    fn zero_values() {
        assert!(Value::I64(0).is_zero());
        assert!(Value::String(String::new()).is_zero());
        assert!(Value::Null.is_zero());
        assert!(!Value::I64(3).is_zero());
        assert!(!Value::Time(ts()).is_zero());
    }
}
