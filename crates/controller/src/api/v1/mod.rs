//! REST API v1
//!
//! Current Endpoints. See their respective function:
//! - `/parties` ([GET](parties::get_parties), [PUT](parties::put_parties))
//! - `/people` ([GET](people::get_people), [PUT](people::put_people))

pub use request::CodeWord;

pub mod middleware;
pub mod parties;
pub mod people;
mod request;
pub mod response;

pub const CODE_INVALID_EMAIL: &str = "invalid_email";
pub const CODE_INVALID_URL: &str = "invalid_url";
pub const CODE_INVALID_LENGTH: &str = "invalid_length";
pub const CODE_OUT_OF_RANGE: &str = "out_of_range";
pub const CODE_VALUE_REQUIRED: &str = "value_required";
pub const CODE_MISSING_VALUE: &str = "missing_value";
pub const CODE_INVALID_VALUE: &str = "invalid_value";
