pub mod batch;
pub mod point;
pub mod query_result;
pub mod series_descriptor;

pub use batch::{Batch, DEFAULT_RETENTION_POLICY};
pub use point::{FieldValue, Point, PointBuilder};
pub use query_result::{render_series, QueryResult, Series, StatementResult};
pub use series_descriptor::{parse_instant, InstantParseError, SeriesDescriptor};
