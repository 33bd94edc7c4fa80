use lastgang_client::domain::SeriesDescriptor;
use time::{macros::datetime, OffsetDateTime};

use crate::generator::grid_len;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    #[error("{field} {ts} outside of allowed window")]
    OutOfWindow {
        field: &'static str,
        ts: OffsetDateTime,
    },
}

/// Caller-side sanity checks on a descriptor before generation.
///
/// Rules:
/// - identifier, commodity and method must be non-empty.
/// - both range ends must lie within [2000-01-01, 2100-01-01].
///
/// A range ending before it starts passes; it generates nothing.
pub fn validate_descriptor(d: &SeriesDescriptor) -> Result<(), ValidationError> {
    for (name, value) in [
        ("identifier", &d.identifier),
        ("commodity", &d.commodity),
        ("method", &d.method),
    ] {
        if value.trim().is_empty() {
            return Err(ValidationError::EmptyField(name));
        }
    }

    let min_ts = datetime!(2000-01-01 00:00:00 UTC);
    let max_ts = datetime!(2100-01-01 00:00:00 UTC);

    for (field, ts) in [("range_start", d.range_start), ("range_end", d.range_end)] {
        if ts < min_ts || ts > max_ts {
            return Err(ValidationError::OutOfWindow { field, ts });
        }
    }

    Ok(())
}

/// Number of points a descriptor must produce.
///
/// A store reporting fewer rows than this after a write points to a
/// truncated write path or a mis-built descriptor, never to the generator.
pub fn expected_point_count(d: &SeriesDescriptor) -> usize {
    grid_len(d.range_start, d.range_end)
}
