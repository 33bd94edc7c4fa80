pub mod retrying;

pub use retrying::RetryingSink;
