use std::collections::BTreeMap;

use crate::domain::Point;

pub const DEFAULT_RETENTION_POLICY: &str = "default";

/// An ordered group of points submitted to one database in a single write.
///
/// Batch-level tags apply to every point; a tag set on the point itself
/// takes precedence.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub database: String,
    pub retention_policy: String,
    pub tags: BTreeMap<String, String>,
    pub points: Vec<Point>,
}

impl Batch {
    pub fn new(database: impl Into<String>) -> Self {
        Self::with_capacity(database, 0)
    }

    pub fn with_capacity(database: impl Into<String>, capacity: usize) -> Self {
        Self {
            database: database.into(),
            retention_policy: DEFAULT_RETENTION_POLICY.to_string(),
            tags: BTreeMap::new(),
            points: Vec::with_capacity(capacity),
        }
    }

    pub fn retention_policy(mut self, policy: impl Into<String>) -> Self {
        self.retention_policy = policy.into();
        self
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn point(mut self, point: Point) -> Self {
        self.points.push(point);
        self
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Tags of `point` with the batch-level tags folded in.
    pub fn effective_tags(&self, point: &Point) -> BTreeMap<String, String> {
        let mut tags = self.tags.clone();
        tags.extend(point.tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        tags
    }
}
