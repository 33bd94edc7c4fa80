use std::collections::BTreeMap;

use time::OffsetDateTime;

/// A single field value of a point.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    Boolean(bool),
    Text(String),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Float(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::Integer(v) => serde_json::Value::from(*v),
            Self::Boolean(v) => serde_json::Value::Bool(*v),
            Self::Text(v) => serde_json::Value::String(v.clone()),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// A measurement point as written to the store.
///
/// Tags and fields are kept in key order so two points built from the same
/// inputs compare equal regardless of insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, FieldValue>,
    /// `None` lets the store assign its own receive time.
    pub timestamp: Option<OffsetDateTime>,
}

impl Point {
    pub fn measurement(name: impl Into<String>) -> PointBuilder {
        PointBuilder {
            point: Point {
                measurement: name.into(),
                tags: BTreeMap::new(),
                fields: BTreeMap::new(),
                timestamp: None,
            },
        }
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }
}

#[derive(Debug, Clone)]
pub struct PointBuilder {
    point: Point,
}

impl PointBuilder {
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.point.tags.insert(key.into(), value.into());
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.point.fields.insert(key.into(), value.into());
        self
    }

    pub fn time(mut self, ts: OffsetDateTime) -> Self {
        self.point.timestamp = Some(ts);
        self
    }

    pub fn build(self) -> Point {
        self.point
    }
}
