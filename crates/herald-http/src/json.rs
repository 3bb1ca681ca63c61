use std::sync::Arc;

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use herald_core::{ErrorCarrier, NormalizeError, Traced};
use http::header::CONTENT_TYPE;
use http::request::Parts;
use http::{HeaderMap, HeaderValue, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::config::WriterConfig;
use crate::reporter::ErrorReporter;
use crate::request::{error_code, request_id, success_code};
use crate::writer::{
    ENCODE_FAILURE_MESSAGE, EncodeError, EncodeOptions, ErrorEnhancer, ErrorOptions, REPORT_MESSAGE, Writer,
    default_error_enhancer, encode_json, error_id,
};

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Writes values and errors as JSON
///
/// Errors are rendered through the error enhancer, by default as
/// `{"error": {...}}` holding the normalized error. `debug` is removed from
/// the payload unless [`WriterConfig::expose_debug`] is set.
#[derive(Clone)]
pub struct JsonWriter {
    reporter: Arc<dyn ErrorReporter>,
    enhancer: ErrorEnhancer,
    config: WriterConfig,
}

impl JsonWriter {
    pub fn new(reporter: Arc<dyn ErrorReporter>) -> Self {
        Self::from_config(reporter, &WriterConfig::default())
    }

    pub fn from_config(reporter: Arc<dyn ErrorReporter>, config: &WriterConfig) -> Self {
        Self {
            reporter,
            enhancer: default_error_enhancer(),
            config: config.clone(),
        }
    }

    /// Replace the function producing error payloads
    #[must_use]
    pub fn with_error_enhancer(mut self, enhancer: ErrorEnhancer) -> Self {
        self.enhancer = enhancer;
        self
    }

    pub const fn config(&self) -> &WriterConfig {
        &self.config
    }

    fn error_payload(&self, request: &Parts, err: &dyn ErrorCarrier) -> serde_json::Result<Vec<u8>> {
        let mut payload = (self.enhancer)(request, err, request_id(request, &self.config.request_id_header))?;
        if !self.config.expose_debug {
            scrub_debug(&mut payload);
        }
        serde_json::to_vec(&payload)
    }
}

impl Writer for JsonWriter {
    fn write_code<T>(&self, request: &Parts, code: Option<StatusCode>, payload: &T, options: EncodeOptions) -> Response
    where
        T: Serialize + ?Sized,
    {
        match encode_json(payload, options) {
            Ok(body) => (
                success_code(request, code),
                [(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))],
                Body::from(body),
            )
                .into_response(),
            Err(err) => {
                let err = Traced::new(err);
                self.write_error_code(request, None, Some(&err), ErrorOptions::default())
            }
        }
    }

    fn write_error_code(
        &self,
        request: &Parts,
        code: Option<StatusCode>,
        err: Option<&dyn ErrorCarrier>,
        options: ErrorOptions,
    ) -> Response {
        let err = err.unwrap_or(&NormalizeError::Nil);
        let code = error_code(request, code);

        if options.reports() {
            self.reporter.report_error(request, code, err, REPORT_MESSAGE);
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        if let Some(id) = error_id(err) {
            headers.insert(self.config.error_id_header.clone(), id);
        }

        match self.error_payload(request, err) {
            Ok(body) => (code, headers, Body::from(body)).into_response(),
            Err(encode) => {
                let encode = Traced::new(EncodeError::from(encode));
                self.reporter.report_error(request, code, &encode, ENCODE_FAILURE_MESSAGE);
                (code, headers).into_response()
            }
        }
    }
}

/// Remove `debug` from the envelope and from a bare error object
fn scrub_debug(payload: &mut Value) {
    let Some(object) = payload.as_object_mut() else {
        return;
    };

    object.remove("debug");
    if let Some(error) = object.get_mut("error").and_then(Value::as_object_mut) {
        error.remove("debug");
    }
}
