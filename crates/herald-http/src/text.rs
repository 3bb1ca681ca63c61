use std::sync::Arc;

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use herald_core::{ErrorCarrier, NormalizeError, Traced};
use http::header::CONTENT_TYPE;
use http::request::Parts;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::config::WriterConfig;
use crate::negotiate::{TEXT_HTML, TEXT_PLAIN};
use crate::reporter::ErrorReporter;
use crate::request::{error_code, success_code};
use crate::writer::{EncodeError, EncodeOptions, ErrorOptions, REPORT_MESSAGE, Writer, error_id};

/// Writes values and errors as plain text or HTML
///
/// String payloads are written verbatim, anything else as compact JSON
/// text. Errors are written as their `Display` text, which carries no
/// debug detail. The HTML flavor escapes markup in the body.
#[derive(Clone)]
pub struct TextWriter {
    reporter: Arc<dyn ErrorReporter>,
    content_type: &'static str,
    error_id_header: HeaderName,
}

impl TextWriter {
    /// `text/plain` writer
    pub fn plain(reporter: Arc<dyn ErrorReporter>) -> Self {
        Self::plain_from_config(reporter, &WriterConfig::default())
    }

    /// `text/html` writer
    pub fn html(reporter: Arc<dyn ErrorReporter>) -> Self {
        Self::html_from_config(reporter, &WriterConfig::default())
    }

    /// `text/plain` writer using the headers named in `config`
    pub fn plain_from_config(reporter: Arc<dyn ErrorReporter>, config: &WriterConfig) -> Self {
        Self::with_content_type(reporter, TEXT_PLAIN, config)
    }

    /// `text/html` writer using the headers named in `config`
    pub fn html_from_config(reporter: Arc<dyn ErrorReporter>, config: &WriterConfig) -> Self {
        Self::with_content_type(reporter, TEXT_HTML, config)
    }

    fn with_content_type(
        reporter: Arc<dyn ErrorReporter>,
        content_type: &'static str,
        config: &WriterConfig,
    ) -> Self {
        Self {
            reporter,
            content_type,
            error_id_header: config.error_id_header.clone(),
        }
    }

    pub const fn content_type(&self) -> &'static str {
        self.content_type
    }

    fn respond(&self, code: StatusCode, headers: HeaderMap, text: &str) -> Response {
        let body = if self.content_type == TEXT_HTML {
            escape_markup(text)
        } else {
            text.to_owned()
        };

        (code, headers, Body::from(body)).into_response()
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(self.content_type));
        headers
    }
}

impl Writer for TextWriter {
    fn write_code<T>(&self, request: &Parts, code: Option<StatusCode>, payload: &T, _options: EncodeOptions) -> Response
    where
        T: Serialize + ?Sized,
    {
        let text = match serde_json::to_value(payload) {
            Ok(Value::String(text)) => text,
            Ok(value) => value.to_string(),
            Err(err) => {
                let err = Traced::new(EncodeError::from(err));
                return self.write_error_code(request, None, Some(&err), ErrorOptions::default());
            }
        };

        self.respond(success_code(request, code), self.headers(), &text)
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

        let mut headers = self.headers();
        if let Some(id) = error_id(err) {
            headers.insert(self.error_id_header.clone(), id);
        }

        self.respond(code, headers, &err.to_string())
    }
}

fn escape_markup(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
