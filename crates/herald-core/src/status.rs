use http::StatusCode;

/// Non-standard "499 Client Closed Request" status, first used by nginx
///
/// The client is gone by the time this status is chosen, so it is never
/// delivered to anyone. It exists for logs and traces.
pub const STATUS_CLIENT_CLOSED_REQUEST: u16 = 499;

/// [`STATUS_CLIENT_CLOSED_REQUEST`] as a `StatusCode`
pub fn client_closed_request() -> StatusCode {
    StatusCode::from_u16(STATUS_CLIENT_CLOSED_REQUEST).unwrap_or(StatusCode::BAD_REQUEST)
}

/// Standard reason phrase for `code`, empty when none is known
pub fn status_text(code: StatusCode) -> &'static str {
    if code.as_u16() == STATUS_CLIENT_CLOSED_REQUEST {
        return "Client Closed Request";
    }

    code.canonical_reason().unwrap_or_default()
}
