//! Request extraction helpers for REST APIv1
use super::response::error::ApiError;
use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use std::future::{ready, Ready};

/// The code word supplied with a request, if any.
///
/// Party members identify themselves with the `Code-Word` header instead of
/// an account credential.
#[derive(Debug, Clone)]
pub struct CodeWord(Option<String>);

impl CodeWord {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl FromRequest for CodeWord {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let word = req
            .headers()
            .get("code-word")
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        ready(Ok(CodeWord(word)))
    }
}

/// Collects every occurrence of the repeatable query parameter `key` as a
/// typed id
pub fn collect_id_params<T>(
    pairs: &[(String, String)],
    key: &str,
    wrap: fn(uuid::Uuid) -> T,
) -> Result<Vec<T>, ApiError> {
    pairs
        .iter()
        .filter(|(name, _)| name == key)
        .map(|(_, value)| {
            uuid::Uuid::parse_str(value).map(wrap).map_err(|_| {
                ApiError::bad_request()
                    .with_code("invalid_id")
                    .with_message(format!("{key} must be a UUID"))
            })
        })
        .collect()
}
