//! HTTP rendering for Herald errors
//!
//! Writers turn values and errors into axum responses. Errors are
//! normalized through `herald-core`, reported once through an
//! [`ErrorReporter`] and written as JSON, plain text or HTML.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod config;
mod json;
pub mod negotiate;
mod negotiation;
mod reporter;
mod request;
mod text;
mod writer;

pub use config::{DEFAULT_ERROR_ID_HEADER, DEFAULT_REQUEST_ID_HEADER, WriterConfig};
pub use json::{JSON_CONTENT_TYPE, JsonWriter};
pub use negotiate::negotiate_content_type;
pub use negotiation::NegotiationHandler;
pub use reporter::{ErrorReporter, TracingReporter};
pub use request::{is_cancelled, request_id};
pub use text::TextWriter;
pub use writer::{
    ENCODE_FAILURE_MESSAGE, EncodeError, EncodeOptions, ErrorEnhancer, ErrorOptions, REPORT_MESSAGE, Writer,
    default_error_enhancer,
};
