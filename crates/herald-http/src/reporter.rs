use std::backtrace::BacktraceStatus;

use herald_core::{ErrorCarrier, find_stack_trace, normalize_carrier};
use http::request::Parts;
use http::{HeaderName, StatusCode};

use crate::config::{DEFAULT_REQUEST_ID_HEADER, WriterConfig};
use crate::request::request_id;

/// Sink invoked once for every error a writer renders
pub trait ErrorReporter: Send + Sync {
    fn report_error(&self, request: &Parts, code: StatusCode, err: &dyn ErrorCarrier, message: &str);
}

/// Reports errors as `tracing` events
///
/// Server errors are logged at `error`, a closed client connection (499)
/// at `info` and every other status at `warn`.
#[derive(Debug, Clone)]
pub struct TracingReporter {
    request_id_header: HeaderName,
}

impl Default for TracingReporter {
    fn default() -> Self {
        Self::new(HeaderName::from_static(DEFAULT_REQUEST_ID_HEADER))
    }
}

impl TracingReporter {
    /// Reporter reading the correlation id from `request_id_header`
    pub const fn new(request_id_header: HeaderName) -> Self {
        Self { request_id_header }
    }

    /// Reporter reading the correlation id from the configured header
    pub fn from_config(config: &WriterConfig) -> Self {
        Self::new(config.request_id_header.clone())
    }
}

macro_rules! report_event {
    ($level:expr, $request:expr, $code:expr, $error:expr, $trace:expr, $message:expr) => {
        tracing::event!(
            $level,
            http.method = %$request.method,
            http.uri = %$request.uri,
            http.status_code = $code.as_u16(),
            request_id = $error.request.as_deref(),
            error.id = $error.id.as_deref(),
            error.reason = $error.reason.as_deref(),
            error.debug = $error.debug.as_deref(),
            error.message = %$error.message,
            trace = $trace,
            "{}",
            $message
        )
    };
}

impl ErrorReporter for TracingReporter {
    fn report_error(&self, request: &Parts, code: StatusCode, err: &dyn ErrorCarrier, message: &str) {
        let error = normalize_carrier(err, request_id(request, &self.request_id_header));
        let trace = find_stack_trace(err)
            .filter(|trace| trace.status() == BacktraceStatus::Captured)
            .map(tracing::field::display);

        if code.is_server_error() {
            report_event!(tracing::Level::ERROR, request, code, error, trace, message);
        } else if code.as_u16() == herald_core::STATUS_CLIENT_CLOSED_REQUEST {
            report_event!(tracing::Level::INFO, request, code, error, trace, message);
        } else {
            report_event!(tracing::Level::WARN, request, code, error, trace, message);
        }
    }
}
