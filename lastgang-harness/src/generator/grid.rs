use time::{Duration, OffsetDateTime, UtcOffset};

use lastgang_client::domain::SeriesDescriptor;

/// Spacing of grid timestamps: 15 minutes.
pub const GRID_STEP_MS: i64 = 900_000;

fn unix_millis(ts: OffsetDateTime) -> i128 {
    ts.unix_timestamp_nanos().div_euclid(1_000_000)
}

/// `ts` with everything below the millisecond dropped.
fn truncate_to_millis(ts: OffsetDateTime) -> OffsetDateTime {
    ts - Duration::nanoseconds(i64::from(ts.nanosecond() % 1_000_000))
}

/// Number of grid points in `[start, end]`, zero when `end < start`.
pub fn grid_len(start: OffsetDateTime, end: OffsetDateTime) -> usize {
    let span = unix_millis(end) - unix_millis(start);
    if span < 0 {
        return 0;
    }
    usize::try_from(span / i128::from(GRID_STEP_MS) + 1).unwrap_or(usize::MAX)
}

/// Grid timestamps of a descriptor in UTC, ascending, both ends inclusive.
pub fn grid_timestamps(descriptor: &SeriesDescriptor) -> impl Iterator<Item = OffsetDateTime> {
    let start = truncate_to_millis(descriptor.range_start).to_offset(UtcOffset::UTC);
    let len = grid_len(descriptor.range_start, descriptor.range_end);
    (0..len).map(move |k| start + Duration::milliseconds(k as i64 * GRID_STEP_MS))
}

/// Calendar month (1-12) and year of `ts`, always taken in UTC.
pub fn calendar_fields(ts: OffsetDateTime) -> (u8, i32) {
    let utc = ts.to_offset(UtcOffset::UTC);
    (u8::from(utc.month()), utc.year())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{datetime, offset};

    fn descriptor(start: OffsetDateTime, end: OffsetDateTime) -> SeriesDescriptor {
        SeriesDescriptor::new("DE12345678900001", "strom", "rlm", start, end)
    }

    #[test]
    fn grid_len_follows_closed_form() {
        let start = datetime!(2016-01-01 00:00:00 UTC);
        assert_eq!(grid_len(start, start), 1);
        assert_eq!(grid_len(start, datetime!(2016-01-01 00:14:59.999 UTC)), 1);
        assert_eq!(grid_len(start, datetime!(2016-01-01 00:15:00 UTC)), 2);
        assert_eq!(grid_len(start, datetime!(2016-01-01 00:45:00 UTC)), 4);
        assert_eq!(grid_len(start, datetime!(2016-01-02 00:00:00 UTC)), 97);
    }

    #[test]
    fn reversed_range_is_empty() {
        let d = descriptor(datetime!(2016-01-02 00:00:00 UTC), datetime!(2016-01-01 00:00:00 UTC));
        assert_eq!(grid_len(d.range_start, d.range_end), 0);
        assert_eq!(grid_timestamps(&d).count(), 0);
    }

    #[test]
    fn full_leap_year_has_96_points_per_day() {
        let d = descriptor(datetime!(2016-01-01 00:00:00 UTC), datetime!(2016-12-31 23:45:00 UTC));
        assert_eq!(grid_timestamps(&d).count(), 35_136);
        assert_eq!(grid_timestamps(&d).last(), Some(d.range_end));
    }

    #[test]
    fn full_common_year_has_96_points_per_day() {
        let d = descriptor(datetime!(2015-01-01 00:00:00 UTC), datetime!(2015-12-31 23:45:00 UTC));
        assert_eq!(grid_timestamps(&d).count(), 35_040);
    }

    #[test]
    fn misaligned_end_stops_at_last_grid_point_before_it() {
        let d = descriptor(datetime!(2016-01-01 00:05:00 UTC), datetime!(2016-01-01 00:50:00 UTC));
        let ts: Vec<_> = grid_timestamps(&d).collect();
        assert_eq!(
            ts,
            vec![
                datetime!(2016-01-01 00:05:00 UTC),
                datetime!(2016-01-01 00:20:00 UTC),
                datetime!(2016-01-01 00:35:00 UTC),
                datetime!(2016-01-01 00:50:00 UTC),
            ]
        );
    }

    #[test]
    fn sub_millisecond_start_is_truncated() {
        let d = descriptor(
            datetime!(2016-01-01 00:00:00.0005 UTC),
            datetime!(2016-01-01 00:15:00 UTC),
        );
        let ts: Vec<_> = grid_timestamps(&d).collect();
        assert_eq!(ts.first(), Some(&datetime!(2016-01-01 00:00:00 UTC)));
        assert_eq!(ts.len(), 2);
    }

    #[test]
    fn offset_range_yields_utc_timestamps() {
        let d = descriptor(
            datetime!(2016-01-01 01:00:00 +01:00),
            datetime!(2016-01-01 01:15:00 +01:00),
        );
        let ts: Vec<_> = grid_timestamps(&d).collect();
        assert_eq!(ts.len(), 2);
        assert!(ts.iter().all(|t| t.offset() == UtcOffset::UTC));
        assert_eq!(ts[0].hour(), 0);
    }

    #[test]
    fn calendar_fields_use_utc() {
        assert_eq!(calendar_fields(datetime!(2016-01-01 00:00:00 UTC)), (1, 2016));
        assert_eq!(calendar_fields(datetime!(2016-12-31 23:45:00 UTC)), (12, 2016));
        // Already 2017 in Berlin, still 2016 in UTC.
        assert_eq!(calendar_fields(datetime!(2017-01-01 00:30:00 +01:00)), (12, 2016));
        assert_eq!(
            calendar_fields(datetime!(2016-02-29 12:00:00 UTC).to_offset(offset!(-10:00))),
            (2, 2016)
        );
    }
}
