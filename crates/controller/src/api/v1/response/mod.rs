//! Response types for REST APIv1
pub mod error;

pub use error::ApiError;
