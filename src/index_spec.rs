//! Index key specifications
//!
//! An index key is an ordered list of fields. The order defines both the
//! composite-key projection used by the key store and the order in which an
//! index scan emits entries. Direction only matters for scan order.

use crate::error::{Result, ValidateError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Sort direction (or special index kind) of one key field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyDirection {
    Ascending,
    Descending,
    /// Special index kinds such as `text`, `2d`, `2dsphere` or `hashed`
    Special(String),
}

/// One field of an index key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexField {
    pub name: String,
    pub direction: KeyDirection,
}

impl IndexField {
    pub fn ascending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: KeyDirection::Ascending,
        }
    }

    pub fn descending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: KeyDirection::Descending,
        }
    }

    pub fn is_special(&self) -> bool {
        matches!(self.direction, KeyDirection::Special(_))
    }
}

/// Ordered key fields of an index
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexKeySpec {
    fields: Vec<IndexField>,
}

impl IndexKeySpec {
    pub fn new(fields: Vec<IndexField>) -> Self {
        Self { fields }
    }

    /// Parse a driver-style key list: `"a"` ascending, `"-a"` descending,
    /// `"$text:title"` a special `text` index on `title`
    pub fn from_key_list<S: AsRef<str>>(keys: &[S]) -> Result<Self> {
        let mut fields = Vec::with_capacity(keys.len());
        for key in keys {
            let key = key.as_ref();
            let field = if let Some(special) = key.strip_prefix('$') {
                let (kind, name) = special.split_once(':').ok_or_else(|| {
                    ValidateError::InvalidKeySpec {
                        reason: format!("special key '{}' has no field name", key),
                    }
                })?;
                IndexField {
                    name: name.to_string(),
                    direction: KeyDirection::Special(kind.to_string()),
                }
            } else if let Some(name) = key.strip_prefix('-') {
                IndexField::descending(name)
            } else {
                IndexField::ascending(key)
            };
            if field.name.is_empty() {
                return Err(ValidateError::InvalidKeySpec {
                    reason: format!("key '{}' has an empty field name", key),
                });
            }
            fields.push(field);
        }
        Ok(Self { fields })
    }

    /// Parse a key document such as `{"a": 1, "b": -1, "loc": "2dsphere"}`
    pub fn from_key_document(key: &Value) -> Result<Self> {
        let entries = key.as_object().ok_or_else(|| ValidateError::InvalidKeySpec {
            reason: format!("expected a key document, found {}", key),
        })?;
        let mut fields = Vec::with_capacity(entries.len());
        for (name, direction) in entries {
            let direction = match direction {
                Value::Number(n) if n.as_f64().is_some_and(|d| d < 0.0) => KeyDirection::Descending,
                Value::Number(_) => KeyDirection::Ascending,
                Value::String(kind) => KeyDirection::Special(kind.clone()),
                other => {
                    return Err(ValidateError::InvalidKeySpec {
                        reason: format!("field '{}' has unsupported direction {}", name, other),
                    })
                }
            };
            fields.push(IndexField {
                name: name.clone(),
                direction,
            });
        }
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[IndexField] {
        &self.fields
    }

    /// Field names in key order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn is_special(&self) -> bool {
        self.fields.iter().any(IndexField::is_special)
    }
}

impl fmt::Display for IndexKeySpec {
    /// Renders in key-list form, e.g. `[a -b $text:title]`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            match &field.direction {
                KeyDirection::Ascending => write!(f, "{}", field.name)?,
                KeyDirection::Descending => write!(f, "-{}", field.name)?,
                KeyDirection::Special(kind) => write!(f, "${}:{}", kind, field.name)?,
            }
        }
        write!(f, "]")
    }
}
