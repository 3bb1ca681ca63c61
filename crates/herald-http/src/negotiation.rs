use std::sync::Arc;

use axum::response::Response;
use herald_core::ErrorCarrier;
use http::StatusCode;
use http::request::Parts;
use serde::Serialize;

use crate::config::WriterConfig;
use crate::json::JsonWriter;
use crate::negotiate::{APPLICATION_JSON, OFFERS, TEXT_HTML, TEXT_PLAIN, negotiate_content_type};
use crate::reporter::ErrorReporter;
use crate::text::TextWriter;
use crate::writer::{EncodeOptions, ErrorEnhancer, ErrorOptions, Writer};

/// Picks the JSON, plain text or HTML writer from the `Accept` header
///
/// All three writers share one reporter. Anything that does not clearly
/// ask for text gets JSON.
#[derive(Clone)]
pub struct NegotiationHandler {
    json: JsonWriter,
    plain: TextWriter,
    html: TextWriter,
}

impl NegotiationHandler {
    pub fn new(reporter: Arc<dyn ErrorReporter>) -> Self {
        Self::from_config(reporter, &WriterConfig::default())
    }

    pub fn from_config(reporter: Arc<dyn ErrorReporter>, config: &WriterConfig) -> Self {
        Self {
            json: JsonWriter::from_config(Arc::clone(&reporter), config),
            plain: TextWriter::plain_from_config(Arc::clone(&reporter), config),
            html: TextWriter::html_from_config(reporter, config),
        }
    }

    /// Replace the error enhancer of the JSON writer
    #[must_use]
    pub fn with_error_enhancer(mut self, enhancer: ErrorEnhancer) -> Self {
        self.json = self.json.with_error_enhancer(enhancer);
        self
    }
}

macro_rules! negotiated {
    ($handler:expr, $request:expr, |$writer:ident| $call:expr) => {
        match negotiate_content_type(&$request.headers, &OFFERS, APPLICATION_JSON) {
            TEXT_HTML => {
                let $writer = &$handler.html;
                $call
            }
            TEXT_PLAIN => {
                let $writer = &$handler.plain;
                $call
            }
            _ => {
                let $writer = &$handler.json;
                $call
            }
        }
    };
}

impl Writer for NegotiationHandler {
    fn write_code<T>(&self, request: &Parts, code: Option<StatusCode>, payload: &T, options: EncodeOptions) -> Response
    where
        T: Serialize + ?Sized,
    {
        negotiated!(self, request, |writer| writer.write_code(request, code, payload, options))
    }

    fn write_error_code(
        &self,
        request: &Parts,
        code: Option<StatusCode>,
        err: Option<&dyn ErrorCarrier>,
        options: ErrorOptions,
    ) -> Response {
        negotiated!(self, request, |writer| writer.write_error_code(request, code, err, options))
    }

    fn write_created<T>(&self, request: &Parts, location: &str, payload: &T) -> Response
    where
        T: Serialize + ?Sized,
    {
        negotiated!(self, request, |writer| writer.write_created(request, location, payload))
    }

    fn write_error(&self, request: &Parts, err: Option<&dyn ErrorCarrier>, options: ErrorOptions) -> Response {
        negotiated!(self, request, |writer| writer.write_error(request, err, options))
    }
}
