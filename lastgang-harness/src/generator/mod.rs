//! Synthetic load-curve generation.
//!
//! Every descriptor is expanded onto a fixed 15-minute grid, each grid point
//! becomes one `lastgang` point tagged with the series identity and its UTC
//! month and year, and the resulting points are cut into batches.

pub mod grid;

use lastgang_client::domain::{Batch, Point, SeriesDescriptor};
use rand::Rng;
use time::OffsetDateTime;

pub use grid::{calendar_fields, grid_len, grid_timestamps, GRID_STEP_MS};

pub const MEASUREMENT: &str = "lastgang";
pub const VALUE_FIELD: &str = "value";

pub const TAG_IDENTIFIER: &str = "identifier";
pub const TAG_COMMODITY: &str = "commodity";
pub const TAG_METHOD: &str = "method";
pub const TAG_MONTH: &str = "month";
pub const TAG_YEAR: &str = "year";

/// Upper bound (exclusive) of generated values.
const VALUE_MAX: f64 = 10.0;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

fn load_curve_point(descriptor: &SeriesDescriptor, ts: OffsetDateTime, value: f64) -> Point {
    let (month, year) = calendar_fields(ts);
    Point::measurement(MEASUREMENT)
        .tag(TAG_IDENTIFIER, descriptor.identifier.as_str())
        .tag(TAG_COMMODITY, descriptor.commodity.as_str())
        .tag(TAG_METHOD, descriptor.method.as_str())
        .tag(TAG_MONTH, month.to_string())
        .tag(TAG_YEAR, year.to_string())
        .time(ts)
        .field(VALUE_FIELD, value)
        .build()
}

/// All points for `descriptors`, in descriptor order then time order.
pub fn generate_points<R>(rng: &mut R, descriptors: &[SeriesDescriptor]) -> Vec<Point>
where
    R: Rng + ?Sized,
{
    let total = descriptors
        .iter()
        .map(|d| grid_len(d.range_start, d.range_end))
        .fold(0usize, usize::saturating_add);

    let mut points = Vec::with_capacity(total);
    for d in descriptors {
        for ts in grid_timestamps(d) {
            points.push(load_curve_point(d, ts, rng.gen_range(0.0..VALUE_MAX)));
        }
    }
    points
}

/// Cut `points` into batches of at most `chunk_size`, preserving order.
///
/// No points means no batches.
fn partition(database: &str, points: Vec<Point>, chunk_size: usize) -> Vec<Batch> {
    let mut batches = Vec::with_capacity(points.len().div_ceil(chunk_size));
    let mut points = points.into_iter().peekable();
    while points.peek().is_some() {
        let mut batch = Batch::with_capacity(database, chunk_size.min(points.len()));
        batch.points.extend(points.by_ref().take(chunk_size));
        batches.push(batch);
    }
    batches
}

/// Generate load curves for `descriptors` and package them for `database`.
///
/// With `chunk_size` unset all points land in a single batch. A chunk size
/// of zero is rejected before anything is generated.
pub fn generate<R>(
    rng: &mut R,
    database: &str,
    chunk_size: Option<usize>,
    descriptors: &[SeriesDescriptor],
) -> Result<Vec<Batch>, GeneratorError>
where
    R: Rng + ?Sized,
{
    if chunk_size == Some(0) {
        return Err(GeneratorError::InvalidConfiguration(
            "chunk size must be positive".to_string(),
        ));
    }

    let points = generate_points(rng, descriptors);
    let chunk_size = chunk_size.unwrap_or(points.len()).max(1);
    Ok(partition(database, points, chunk_size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use time::macros::datetime;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn strom(start: OffsetDateTime, end: OffsetDateTime) -> SeriesDescriptor {
        SeriesDescriptor::new("DE12345678900001", "strom", "rlm", start, end)
    }

    fn first_hour() -> SeriesDescriptor {
        strom(datetime!(2016-01-01 00:00:00 UTC), datetime!(2016-01-01 00:45:00 UTC))
    }

    fn flatten(batches: &[Batch]) -> Vec<&Point> {
        batches.iter().flat_map(|b| b.points.iter()).collect()
    }

    /// Everything except the random value.
    fn skeleton(batches: &[Batch]) -> Vec<(Option<OffsetDateTime>, Vec<(String, String)>)> {
        flatten(batches)
            .into_iter()
            .map(|p| (p.timestamp, p.tags.clone().into_iter().collect()))
            .collect()
    }

    #[test]
    fn first_hour_without_chunking_is_one_batch_of_four() {
        let batches = generate(&mut rng(), "db", None, &[first_hour()]).unwrap();
        assert_eq!(batches.len(), 1);

        let b = &batches[0];
        assert_eq!(b.database, "db");
        assert_eq!(b.retention_policy, "default");
        assert_eq!(b.len(), 4);

        let minutes: Vec<u8> = b.points.iter().filter_map(|p| p.timestamp).map(|t| t.minute()).collect();
        assert_eq!(minutes, vec![0, 15, 30, 45]);

        for p in &b.points {
            assert_eq!(p.measurement, "lastgang");
            assert_eq!(p.tag(TAG_IDENTIFIER), Some("DE12345678900001"));
            assert_eq!(p.tag(TAG_COMMODITY), Some("strom"));
            assert_eq!(p.tag(TAG_METHOD), Some("rlm"));
            assert_eq!(p.tag(TAG_MONTH), Some("1"));
            assert_eq!(p.tag(TAG_YEAR), Some("2016"));
            assert_eq!(p.tags.len(), 5);
            assert_eq!(p.fields.len(), 1);
        }
    }

    #[test]
    fn values_are_in_zero_to_ten() {
        let d = strom(datetime!(2016-01-01 00:00:00 UTC), datetime!(2016-01-31 23:45:00 UTC));
        let points = generate_points(&mut rng(), &[d]);
        assert_eq!(points.len(), 31 * 96);
        for p in &points {
            let v = p.field(VALUE_FIELD).and_then(|f| f.as_f64()).unwrap();
            assert!((0.0..10.0).contains(&v), "value {v} out of range");
        }
    }

    #[test]
    fn month_and_year_tags_follow_each_timestamp() {
        let d = strom(datetime!(2016-12-31 23:30:00 UTC), datetime!(2017-01-01 00:15:00 UTC));
        let points = generate_points(&mut rng(), &[d]);
        let tags: Vec<_> = points
            .iter()
            .map(|p| (p.tag(TAG_MONTH).unwrap(), p.tag(TAG_YEAR).unwrap()))
            .collect();
        assert_eq!(
            tags,
            vec![("12", "2016"), ("12", "2016"), ("1", "2017"), ("1", "2017")]
        );
    }

    #[test]
    fn descriptors_are_emitted_in_order() {
        let gas = SeriesDescriptor::new(
            "DE00000000000002",
            "gas",
            "slp",
            datetime!(2015-06-01 00:00:00 UTC),
            datetime!(2015-06-01 00:15:00 UTC),
        );
        let points = generate_points(&mut rng(), &[first_hour(), gas]);
        let ids: Vec<_> = points.iter().map(|p| p.tag(TAG_IDENTIFIER).unwrap()).collect();
        assert_eq!(
            ids,
            vec![
                "DE12345678900001",
                "DE12345678900001",
                "DE12345678900001",
                "DE12345678900001",
                "DE00000000000002",
                "DE00000000000002",
            ]
        );
        assert_eq!(points[4].tag(TAG_MONTH), Some("6"));
    }

    #[test]
    fn chunking_preserves_the_unchunked_sequence() {
        let d = strom(datetime!(2016-01-01 00:00:00 UTC), datetime!(2016-01-02 00:00:00 UTC));
        let whole = generate(&mut rng(), "db", None, &[d.clone()]).unwrap();

        for size in [1, 2, 7, 96, 97, 1000] {
            let chunked = generate(&mut rng(), "db", Some(size), &[d.clone()]).unwrap();
            assert_eq!(flatten(&chunked), flatten(&whole), "chunk size {size}");
        }
    }

    #[test]
    fn every_batch_but_the_last_is_full() {
        let d = strom(datetime!(2016-01-01 00:00:00 UTC), datetime!(2016-01-02 00:00:00 UTC));
        let batches = generate(&mut rng(), "db", Some(10), &[d]).unwrap();

        assert_eq!(batches.len(), 10);
        assert!(batches[..9].iter().all(|b| b.len() == 10));
        assert_eq!(batches[9].len(), 7);
        assert!(batches.iter().all(|b| b.database == "db" && b.retention_policy == "default"));
    }

    #[test]
    fn chunk_larger_than_total_gives_single_batch() {
        let batches = generate(&mut rng(), "db", Some(5000), &[first_hour()]).unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 4);
    }

    #[test]
    fn unbounded_chunk_size_gives_single_batch() {
        let batches = generate(&mut rng(), "db", Some(usize::MAX), &[first_hour()]).unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 4);
        assert!(batches[0].points.capacity() < 1 << 20);
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let res = generate(&mut rng(), "db", Some(0), &[first_hour()]);
        assert!(matches!(res, Err(GeneratorError::InvalidConfiguration(_))));
    }

    #[test]
    fn structure_is_reproducible_across_runs() {
        let d = strom(datetime!(2016-03-27 00:00:00 UTC), datetime!(2016-03-27 04:00:00 UTC));
        let a = generate(&mut StdRng::seed_from_u64(1), "db", Some(3), &[d.clone()]).unwrap();
        let b = generate(&mut StdRng::seed_from_u64(2), "db", Some(3), &[d]).unwrap();

        assert_eq!(skeleton(&a), skeleton(&b));
        assert_ne!(flatten(&a), flatten(&b));
    }

    #[test]
    fn seeded_rng_reproduces_values() {
        let a = generate(&mut StdRng::seed_from_u64(42), "db", None, &[first_hour()]).unwrap();
        let b = generate(&mut StdRng::seed_from_u64(42), "db", None, &[first_hour()]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn single_instant_range_yields_one_point() {
        let at = datetime!(2016-01-01 00:00:00 UTC);
        let batches = generate(&mut rng(), "db", None, &[strom(at, at)]).unwrap();
        assert_eq!(flatten(&batches).len(), 1);
    }

    #[test]
    fn reversed_range_yields_nothing() {
        let d = strom(datetime!(2016-01-02 00:00:00 UTC), datetime!(2016-01-01 00:00:00 UTC));
        assert!(generate(&mut rng(), "db", None, &[d.clone()]).unwrap().is_empty());
        assert!(generate(&mut rng(), "db", Some(4), &[d]).unwrap().is_empty());
    }

    #[test]
    fn empty_descriptor_list_yields_no_batches() {
        assert!(generate(&mut rng(), "db", None, &[]).unwrap().is_empty());
        assert!(generate(&mut rng(), "db", Some(10), &[]).unwrap().is_empty());
    }

    #[test]
    fn full_leap_year_in_one_batch() {
        let d = strom(datetime!(2016-01-01 00:00:00 UTC), datetime!(2016-12-31 23:45:00 UTC));
        let batches = generate(&mut rng(), "db", None, &[d]).unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 35_136);
    }
}
