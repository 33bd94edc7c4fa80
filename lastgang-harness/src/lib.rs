pub mod config;
pub mod generator;
pub mod observability;
pub mod pipeline;
pub mod scenario;
pub mod sinks;
pub mod transform;

pub use pipeline::{Pipeline, WriteReport};
