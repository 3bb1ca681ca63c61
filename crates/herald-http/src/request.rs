use herald_core::client_closed_request;
use http::request::Parts;
use http::{HeaderName, StatusCode};
use tokio_util::sync::CancellationToken;

/// Correlation id sent by the client, or `""`
pub fn request_id<'a>(request: &'a Parts, header: &HeaderName) -> &'a str {
    request
        .headers
        .get(header)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

/// Whether the cancellation token stored in the request extensions has fired
///
/// Requests without a token are never considered cancelled.
pub fn is_cancelled(request: &Parts) -> bool {
    request
        .extensions
        .get::<CancellationToken>()
        .is_some_and(CancellationToken::is_cancelled)
}

/// Status for a successful write: 200 when unset, 499 once cancelled
pub(crate) fn success_code(request: &Parts, code: Option<StatusCode>) -> StatusCode {
    if is_cancelled(request) {
        return client_closed_request();
    }
    code.unwrap_or(StatusCode::OK)
}

/// Status for an error write: 500 when unset, 499 once cancelled
pub(crate) fn error_code(request: &Parts, code: Option<StatusCode>) -> StatusCode {
    if is_cancelled(request) {
        return client_closed_request();
    }
    code.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}
