//! Document model
//!
//! A document is a dynamically keyed map from field name to JSON value. Scans
//! attach the physical location of each record under the well-known
//! [`DISK_LOC_FIELD`], which the key store uses as the identity of "this exact
//! stored instance".

use crate::error::{Result, ValidateError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::cmp::Ordering;
use std::fmt;

/// Field a scan uses to carry a record's physical location
pub const DISK_LOC_FIELD: &str = "$diskLoc";

/// Physical location of a record instance: (file, offset)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DiskLoc {
    pub file: i64,
    pub offset: i64,
}

impl DiskLoc {
    pub fn new(file: i64, offset: i64) -> Self {
        Self { file, offset }
    }

    fn to_value(self) -> Value {
        let mut loc = Map::new();
        loc.insert("file".to_string(), Value::from(self.file));
        loc.insert("offset".to_string(), Value::from(self.offset));
        Value::Object(loc)
    }

    fn from_value(value: &Value) -> std::result::Result<Self, String> {
        let fields = value
            .as_object()
            .ok_or_else(|| format!("expected an object, found {}", value))?;
        let part = |name: &str| {
            fields
                .get(name)
                .ok_or_else(|| format!("missing '{}'", name))?
                .as_i64()
                .ok_or_else(|| format!("'{}' is not an integer", name))
        };
        Ok(Self {
            file: part("file")?,
            offset: part("offset")?,
        })
    }
}

impl fmt::Display for DiskLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.offset)
    }
}

/// A record produced by a scan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Value at a dotted path such as `addr.city`. A field literally named
    /// with the full path wins over walking nested objects.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        if let Some(value) = self.0.get(path) {
            return Some(value);
        }
        let mut segments = path.split('.');
        let mut current = self.0.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Whether an array appears anywhere along a dotted path
    pub fn path_holds_array(&self, path: &str) -> bool {
        if let Some(value) = self.0.get(path) {
            return value.is_array();
        }
        let mut map = &self.0;
        let mut segments = path.split('.').peekable();
        while let Some(segment) = segments.next() {
            match map.get(segment) {
                Some(Value::Array(_)) => return true,
                Some(Value::Object(inner)) if segments.peek().is_some() => map = inner,
                _ => return false,
            }
        }
        false
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    /// The record's location, or `None` if `$diskLoc` is absent or malformed
    pub fn disk_loc(&self) -> Option<DiskLoc> {
        self.try_disk_loc().ok()
    }

    /// The record's location, distinguishing an absent field from a malformed one
    pub fn try_disk_loc(&self) -> Result<DiskLoc> {
        let value = self
            .get(DISK_LOC_FIELD)
            .ok_or_else(|| ValidateError::MissingLocation {
                document: self.render(),
            })?;
        DiskLoc::from_value(value).map_err(|reason| ValidateError::LocationFieldMalformed {
            document: self.render(),
            reason,
        })
    }

    /// Overwrite `$diskLoc` with `loc`
    pub fn set_disk_loc(&mut self, loc: DiskLoc) {
        self.insert(DISK_LOC_FIELD, loc.to_value());
    }

    /// The index-key projection of this document: one entry per key path, in
    /// key order, named by the full path, with absent paths projected as null
    pub fn project<'a>(&self, fields: impl IntoIterator<Item = &'a str>) -> Document {
        let mut projection = Document::new();
        for field in fields {
            let value = self.get_path(field).cloned().unwrap_or(Value::Null);
            projection.insert(field, value);
        }
        projection
    }

    /// Pretty JSON rendering used in mismatch reports and error dumps
    pub fn render(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| format!("{:?}", self.0))
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Document {
    type Error = Value;

    fn try_from(value: Value) -> std::result::Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Object(doc.0)
    }
}

/// Canonical, hashable form of a field value used as one level of a
/// composite key.
///
/// Arrays and nested objects have no usable equality as raw keys, so they are
/// replaced by their compact JSON rendering. Number normalization does not
/// reach inside a composite, so `[5]` and `[5.0]` are different keys, while
/// any two composites rendering to the same text are the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    /// `null` or an absent field; an index stores a missing field as null
    Null,
    Bool(bool),
    /// Any integral number that fits in an `i64`, including integral floats
    Int(i64),
    /// Integers above `i64::MAX`, kept exact
    UInt(u64),
    /// Bit pattern of a non-integral (or out of range) float
    Float(u64),
    Str(String),
    /// Rendering of an array or nested object
    Composite(String),
}

impl KeyPart {
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Null,
            Some(Value::Bool(b)) => Self::Bool(*b),
            Some(Value::Number(n)) => Self::from_number(n),
            Some(Value::String(s)) => Self::Str(s.clone()),
            Some(composite @ (Value::Array(_) | Value::Object(_))) => {
                Self::Composite(composite.to_string())
            }
        }
    }

    fn from_number(n: &Number) -> Self {
        if let Some(i) = n.as_i64() {
            return Self::Int(i);
        }
        if let Some(u) = n.as_u64() {
            return Self::UInt(u);
        }
        match n.as_f64() {
            // -0.0 lands here as well and becomes Int(0)
            Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                Self::Int(f as i64)
            }
            Some(f) => Self::Float(f.to_bits()),
            None => Self::Composite(n.to_string()),
        }
    }
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Object(_)) => 4,
        Some(Value::Array(_)) => 5,
        Some(Value::Bool(_)) => 6,
    }
}

/// Total order over field values following index sort order:
/// null < numbers < strings < objects < arrays < booleans.
/// An absent value sorts as null.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => compare_numbers(x, y),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Array(x)), Some(Value::Array(y))) => {
            for (left, right) in x.iter().zip(y.iter()) {
                let ord = compare_values(Some(left), Some(right));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Some(Value::Object(x)), Some(Value::Object(y))) => {
            for ((left_name, left), (right_name, right)) in x.iter().zip(y.iter()) {
                let ord = left_name
                    .cmp(right_name)
                    .then_with(|| compare_values(Some(left), Some(right)));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => Ordering::Equal,
    }
}

fn compare_numbers(x: &Number, y: &Number) -> Ordering {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return a.cmp(&b);
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return a.cmp(&b);
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    }
}
