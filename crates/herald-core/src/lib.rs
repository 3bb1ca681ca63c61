//! Canonical error model for Herald
//!
//! Turns arbitrary error values into a [`DefaultError`] by querying the
//! optional capabilities declared on [`ErrorCarrier`]. Pure data and
//! extraction logic; rendering lives in `herald-http`.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod carrier;
pub mod catalog;
mod error;
mod grpc;
mod normalize;
mod status;

pub use carrier::{Chain, ErrorCarrier, FieldViolation, Opaque, Traced, chain, extract, find_stack_trace, root_cause};
pub use catalog::ErrDef;
pub use error::{DefaultError, ErrorEnvelope};
pub use grpc::{ERROR_ID_METADATA, ERROR_REASON_METADATA, REQUEST_ID_METADATA, grpc_code_for};
pub use normalize::{NormalizeError, normalize, normalize_carrier};
pub use status::{STATUS_CLIENT_CLOSED_REQUEST, client_closed_request, status_text};
