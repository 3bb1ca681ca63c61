//! Demo application exercising every writer entry point

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use herald_core::catalog::{ERR_BAD_REQUEST, ERR_NOT_FOUND};
use herald_core::{DefaultError, ErrorCarrier, Opaque};
use herald_http::{
    EncodeOptions, ErrorOptions, ErrorReporter, NegotiationHandler, TracingReporter, Writer, WriterConfig,
};
use http::StatusCode;
use http::request::Parts;
use serde_json::json;
use tokio_util::sync::CancellationToken;

/// Logs through `tracing` and remembers every reported status code
#[derive(Clone)]
pub struct RecordingReporter {
    inner: TracingReporter,
    codes: Arc<Mutex<Vec<u16>>>,
}

impl RecordingReporter {
    pub fn new(config: &WriterConfig) -> Self {
        Self {
            inner: TracingReporter::from_config(config),
            codes: Arc::default(),
        }
    }

    pub fn codes(&self) -> Vec<u16> {
        self.codes.lock().unwrap().clone()
    }
}

impl ErrorReporter for RecordingReporter {
    fn report_error(&self, request: &Parts, code: StatusCode, err: &dyn ErrorCarrier, message: &str) {
        self.inner.report_error(request, code, err, message);
        self.codes.lock().unwrap().push(code.as_u16());
    }
}

#[derive(Clone)]
struct AppState {
    writer: NegotiationHandler,
}

/// Router with one route per scenario
pub fn router(config: &WriterConfig, reporter: RecordingReporter) -> Router {
    let state = AppState {
        writer: NegotiationHandler::from_config(Arc::new(reporter), config),
    };

    Router::new()
        .route("/ok", get(ok))
        .route("/created", get(created))
        .route("/debug", get(debug))
        .route("/missing", get(missing))
        .route("/with-id", get(with_id))
        .route("/io", get(io))
        .route("/quiet", get(quiet))
        .route("/cancelled", get(cancelled))
        .layer(middleware::from_fn(attach_cancellation))
        .with_state(state)
}

async fn attach_cancellation(mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(CancellationToken::new());
    next.run(request).await
}

async fn ok(State(state): State<AppState>, parts: Parts) -> Response {
    state
        .writer
        .write_code(&parts, None, &json!({"foo": "bar"}), EncodeOptions::default())
}

async fn created(State(state): State<AppState>, parts: Parts) -> Response {
    state.writer.write_created(&parts, "/things/1", &json!({"id": 1}))
}

async fn debug(State(state): State<AppState>, parts: Parts) -> Response {
    let err = DefaultError::new("foo")
        .with_status_code(StatusCode::BAD_REQUEST)
        .with_debug("bar");
    state.writer.write_error(&parts, Some(&err), ErrorOptions::default())
}

async fn missing(State(state): State<AppState>, parts: Parts) -> Response {
    let err = DefaultError::new("loading thing 42").with_wrap(ERR_NOT_FOUND);
    state.writer.write_error(&parts, Some(&err), ErrorOptions::default())
}

async fn with_id(State(state): State<AppState>, parts: Parts) -> Response {
    let err = ERR_BAD_REQUEST
        .to_error()
        .with_id("invalid_configuration")
        .with_reason("port must be a number");
    state.writer.write_error(&parts, Some(&err), ErrorOptions::default())
}

async fn io(State(state): State<AppState>, parts: Parts) -> Response {
    let err = Opaque(std::io::Error::other("disk on fire"));
    state.writer.write_error(&parts, Some(&err), ErrorOptions::default())
}

async fn quiet(State(state): State<AppState>, parts: Parts) -> Response {
    state
        .writer
        .write_error_code(&parts, Some(StatusCode::CONFLICT), Some(&ERR_BAD_REQUEST), ErrorOptions::without_logging())
}

async fn cancelled(State(state): State<AppState>, parts: Parts) -> Response {
    if let Some(token) = parts.extensions.get::<CancellationToken>() {
        token.cancel();
    }
    state.writer.write_error(&parts, Some(&ERR_NOT_FOUND), ErrorOptions::default())
}
