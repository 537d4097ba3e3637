//! Types shared by every backend the registry can host

pub mod error;

pub use error::{DatasourceError, DatasourceResult};
