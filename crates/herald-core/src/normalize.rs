use http::StatusCode;
use thiserror::Error;

use crate::carrier::{ErrorCarrier, extract};
use crate::error::DefaultError;
use crate::status::status_text;

/// Errors raised by the normalization entry point
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// No error value was supplied; this is a bug in the caller
    #[error("error was nil")]
    Nil,
}

impl ErrorCarrier for NormalizeError {}

/// Turn an arbitrary error into a [`DefaultError`]
///
/// `fallback_request_id` is used when neither the error nor its root cause
/// carries a request id; it is typically read from the inbound correlation
/// header.
///
/// # Errors
///
/// Returns [`NormalizeError::Nil`] when `err` is `None`
pub fn normalize(err: Option<&dyn ErrorCarrier>, fallback_request_id: &str) -> Result<DefaultError, NormalizeError> {
    let err = err.ok_or(NormalizeError::Nil)?;
    Ok(normalize_carrier(err, fallback_request_id))
}

/// Infallible form of [`normalize`] for a present error
///
/// Each capability is looked up on `err` first and on its root cause
/// second. The message always comes from `err` itself.
pub fn normalize_carrier(err: &dyn ErrorCarrier, fallback_request_id: &str) -> DefaultError {
    let code = extract(err, |e| e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let status = extract(err, |e| e.status().filter(|s| !s.is_empty()))
        .map_or_else(|| status_text(code).to_owned(), str::to_owned);

    let request = extract(err, |e| e.request_id().filter(|rid| !rid.is_empty()))
        .or_else(|| Some(fallback_request_id).filter(|rid| !rid.is_empty()))
        .map(str::to_owned);

    let mut message = err.to_string();
    if message.is_empty() {
        message = if status.is_empty() { "An error occurred".to_owned() } else { status.clone() };
    }

    DefaultError {
        id: extract(err, |e| e.id().filter(|id| !id.is_empty())).map(str::to_owned),
        code: Some(code),
        status,
        request,
        reason: extract(err, |e| e.reason().filter(|r| !r.is_empty())).map(str::to_owned),
        debug: extract(err, |e| e.debug().filter(|d| !d.is_empty())).map(str::to_owned),
        details: extract(err, |e| e.details()).cloned().unwrap_or_default(),
        message,
        grpc_code: extract(err, |e| e.grpc_code()),
        field_violations: extract(err, |e| e.field_violations()).map(<[_]>::to_vec).unwrap_or_default(),
        ..DefaultError::default()
    }
}
