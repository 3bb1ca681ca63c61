use std::sync::Arc;

use axum::response::Response;
use herald_core::{ErrorCarrier, ErrorEnvelope, client_closed_request, extract, normalize_carrier};
use http::header::LOCATION;
use http::request::Parts;
use http::{HeaderValue, StatusCode};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Message passed to the reporter for every rendered error
pub const REPORT_MESSAGE: &str = "An error occurred while handling a request";
/// Message passed to the reporter when the error payload could not be encoded
pub const ENCODE_FAILURE_MESSAGE: &str = "Could not write error payload to response";

/// Builds the response payload for an error
///
/// Receives the request, the error and the fallback request id read from the
/// correlation header.
pub type ErrorEnhancer = Arc<dyn Fn(&Parts, &dyn ErrorCarrier, &str) -> serde_json::Result<Value> + Send + Sync>;

/// The built-in enhancer: the normalized error inside `{"error": ...}`
pub fn default_error_enhancer() -> ErrorEnhancer {
    Arc::new(|_request: &Parts, err: &dyn ErrorCarrier, request_id: &str| {
        serde_json::to_value(ErrorEnvelope::new(normalize_carrier(err, request_id), true))
    })
}

/// Failure to encode a response payload
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("unable to encode response payload: {0}")]
    Json(#[from] serde_json::Error),
}

impl ErrorCarrier for EncodeError {}

/// Options for encoding successful payloads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Escape `<`, `>` and `&` as unicode sequences
    pub escape_html: bool,
    /// Indent the output
    pub pretty: bool,
}

impl EncodeOptions {
    #[must_use]
    pub const fn escape_html(mut self) -> Self {
        self.escape_html = true;
        self
    }

    #[must_use]
    pub const fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }
}

/// Options for writing errors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorOptions {
    skip_report: bool,
}

impl ErrorOptions {
    /// Render the error without invoking the reporter
    pub const fn without_logging() -> Self {
        Self { skip_report: true }
    }

    pub(crate) const fn reports(self) -> bool {
        !self.skip_report
    }
}

/// Renders values and errors into HTTP responses
///
/// `request` is only read: for the correlation header, the cancellation
/// token in its extensions and, in the negotiating handler, `Accept`.
pub trait Writer {
    /// Write `payload` with an explicit status; `None` means 200
    ///
    /// A request whose cancellation token already fired is answered with 499.
    fn write_code<T>(&self, request: &Parts, code: Option<StatusCode>, payload: &T, options: EncodeOptions) -> Response
    where
        T: Serialize + ?Sized;

    /// Write `err` with an explicit status; `None` means 500
    ///
    /// The reporter is called exactly once, before the response is built,
    /// unless disabled through `options`. A missing error is replaced by a
    /// placeholder.
    fn write_error_code(
        &self,
        request: &Parts,
        code: Option<StatusCode>,
        err: Option<&dyn ErrorCarrier>,
        options: ErrorOptions,
    ) -> Response;

    /// Write `payload` with status 200
    fn write<T>(&self, request: &Parts, payload: &T, options: EncodeOptions) -> Response
    where
        T: Serialize + ?Sized,
    {
        self.write_code(request, None, payload, options)
    }

    /// Write `payload` with status 201 and a `Location` header
    ///
    /// The header is left off when the payload could not be written and an
    /// error response went out instead.
    fn write_created<T>(&self, request: &Parts, location: &str, payload: &T) -> Response
    where
        T: Serialize + ?Sized,
    {
        let mut response = self.write_code(request, Some(StatusCode::CREATED), payload, EncodeOptions::default());
        if response.status() != StatusCode::CREATED && response.status() != client_closed_request() {
            return response;
        }

        match HeaderValue::try_from(location) {
            Ok(location) => {
                response.headers_mut().insert(LOCATION, location);
            }
            Err(err) => tracing::warn!(location, error = %err, "dropping invalid Location header"),
        }
        response
    }

    /// Write `err` with the status it carries, or 500
    ///
    /// The status comes from the error itself or, failing that, its root
    /// cause.
    fn write_error(&self, request: &Parts, err: Option<&dyn ErrorCarrier>, options: ErrorOptions) -> Response {
        let code = err.and_then(|err| extract(err, |e| e.status_code()));
        self.write_error_code(request, code, err, options)
    }
}

/// Serialize `payload` as JSON according to `options`
pub(crate) fn encode_json<T>(payload: &T, options: EncodeOptions) -> Result<Vec<u8>, EncodeError>
where
    T: Serialize + ?Sized,
{
    let body = if options.pretty {
        serde_json::to_vec_pretty(payload)?
    } else {
        serde_json::to_vec(payload)?
    };

    Ok(if options.escape_html { escape_html(&body) } else { body })
}

/// Replace `<`, `>` and `&` in encoded JSON with their unicode escapes
///
/// Those bytes can only occur inside JSON strings, where the escapes are
/// equivalent.
fn escape_html(json: &[u8]) -> Vec<u8> {
    let mut escaped = Vec::with_capacity(json.len());
    for &byte in json {
        match byte {
            b'<' => escaped.extend_from_slice(b"\\u003c"),
            b'>' => escaped.extend_from_slice(b"\\u003e"),
            b'&' => escaped.extend_from_slice(b"\\u0026"),
            _ => escaped.push(byte),
        }
    }
    escaped
}

/// Id of `err` for the error-id header, when it has a non-empty one
pub(crate) fn error_id(err: &dyn ErrorCarrier) -> Option<HeaderValue> {
    extract(err, |e| e.id().filter(|id| !id.is_empty())).and_then(|id| HeaderValue::try_from(id).ok())
}
