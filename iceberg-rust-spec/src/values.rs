/*!
Typed values used in partition data and manifest field summaries.
*/

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// A typed, primitive value as it appears in partition tuples and
/// manifest-entry lower/upper bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    /// `true` or `false`
    Boolean(bool),
    /// 32-bit signed integer
    Int(i32),
    /// 64-bit signed integer
    LongInt(i64),
    /// 32-bit floating point
    Float(OrderedFloat<f32>),
    /// 64-bit floating point
    Double(OrderedFloat<f64>),
    /// UTF-8 string
    String(String),
    /// Raw bytes
    Binary(Vec<u8>),
    /// Days since epoch
    Date(i32),
    /// Microseconds since midnight
    Time(i64),
    /// Microseconds since epoch, no timezone
    Timestamp(i64),
    /// Microseconds since epoch, UTC
    TimestampTZ(i64),
    /// UUID value
    Uuid(uuid::Uuid),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Boolean(a), Boolean(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (LongInt(a), LongInt(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Double(a), Double(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Binary(a), Binary(b)) => a == b,
            (Date(a), Date(b)) => a == b,
            (Time(a), Time(b)) => a == b,
            (Timestamp(a), Timestamp(b)) => a == b,
            (TimestampTZ(a), TimestampTZ(b)) => a == b,
            (Uuid(a), Uuid(b)) => a == b,
            _ => false,
        }
    }
}
impl Eq for Value {}

impl PartialOrd for Value {
    /// Compares two values of the same variant. Values of different
    /// variants are incomparable - callers that need bounds across a
    /// single partition field are expected to only ever see one variant.
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        use Value::*;
        match (self, other) {
            (Boolean(a), Boolean(b)) => a.partial_cmp(b),
            (Int(a), Int(b)) => a.partial_cmp(b),
            (LongInt(a), LongInt(b)) => a.partial_cmp(b),
            (Float(a), Float(b)) => a.partial_cmp(b),
            (Double(a), Double(b)) => a.partial_cmp(b),
            (String(a), String(b)) => a.partial_cmp(b),
            (Binary(a), Binary(b)) => a.partial_cmp(b),
            (Date(a), Date(b)) => a.partial_cmp(b),
            (Time(a), Time(b)) => a.partial_cmp(b),
            (Timestamp(a), Timestamp(b)) => a.partial_cmp(b),
            (TimestampTZ(a), TimestampTZ(b)) => a.partial_cmp(b),
            (Uuid(a), Uuid(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        use Value::*;
        core::mem::discriminant(self).hash(state);
        match self {
            Boolean(x) => x.hash(state),
            Int(x) => x.hash(state),
            LongInt(x) => x.hash(state),
            Float(x) => x.hash(state),
            Double(x) => x.hash(state),
            String(x) => x.hash(state),
            Binary(x) => x.hash(state),
            Date(x) => x.hash(state),
            Time(x) => x.hash(state),
            Timestamp(x) => x.hash(state),
            TimestampTZ(x) => x.hash(state),
            Uuid(x) => x.hash(state),
        }
    }
}

/// A partition tuple - a named map from partition-field name to its value.
/// `None` represents an explicit partition null.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Struct(pub HashMap<String, Option<Value>>);

impl Struct {
    /// Look up a field by name, returning `None` if the field isn't present.
    pub fn get(&self, name: &str) -> Option<&Option<Value>> {
        self.0.get(name)
    }

    /// Insert a field, overwriting any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: Option<Value>) {
        self.0.insert(name.into(), value);
    }
}

impl FromIterator<(String, Option<Value>)> for Struct {
    fn from_iter<T: IntoIterator<Item = (String, Option<Value>)>>(iter: T) -> Self {
        Struct(HashMap::from_iter(iter))
    }
}
