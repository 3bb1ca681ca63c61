//! Capability-based extraction of error information
//!
//! Errors opt into the pieces of information they can provide by
//! overriding methods of [`ErrorCarrier`]. Extraction asks the outermost
//! error first and falls back to the root cause, one capability at a time.

use std::backtrace::Backtrace;
use std::fmt;

use http::StatusCode;
use serde_json::{Map, Value};

/// Upper bound on cause links followed while walking a chain
const MAX_CAUSE_DEPTH: usize = 64;

/// An error that can carry structured information for rendering
///
/// Every capability defaults to absent, so implementing the trait with an
/// empty body is valid and yields a plain 500 once normalized.
pub trait ErrorCarrier: std::error::Error {
    /// Transport status code for this error
    fn status_code(&self) -> Option<StatusCode> {
        None
    }

    /// Short status description (e.g. `Not Found`)
    fn status(&self) -> Option<&str> {
        None
    }

    /// Correlation id of the request that caused the error
    fn request_id(&self) -> Option<&str> {
        None
    }

    /// Longer explanation that is safe to show to clients
    fn reason(&self) -> Option<&str> {
        None
    }

    /// Diagnostic detail, only exposed to clients when explicitly enabled
    fn debug(&self) -> Option<&str> {
        None
    }

    /// Structured additional context
    fn details(&self) -> Option<&Map<String, Value>> {
        None
    }

    /// Stable application-level error identifier
    fn id(&self) -> Option<&str> {
        None
    }

    /// Status code for the gRPC transport
    fn grpc_code(&self) -> Option<tonic::Code> {
        None
    }

    /// Backtrace captured when the error was created or wrapped
    fn stack_trace(&self) -> Option<&Backtrace> {
        None
    }

    /// Per-field validation failures, rendered as a gRPC `BadRequest`
    fn field_violations(&self) -> Option<&[FieldViolation]> {
        None
    }

    /// The error this one wraps, if any
    ///
    /// Named apart from the deprecated `std::error::Error::cause` so calls on
    /// `dyn ErrorCarrier` stay unambiguous.
    fn carrier_source(&self) -> Option<&dyn ErrorCarrier> {
        None
    }
}

/// One invalid field of a rejected request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: String,
    pub description: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            description: description.into(),
        }
    }
}

/// Iterator over an error and its causes, outermost first
///
/// Stops after a bounded number of steps, so a chain that links back to
/// itself can never loop forever. Links are not compared by address: a
/// newtype shares its address with the error it wraps.
pub struct Chain<'a> {
    next: Option<&'a dyn ErrorCarrier>,
    remaining: usize,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a dyn ErrorCarrier;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let current = self.next.take()?;
        self.next = current.carrier_source();

        Some(current)
    }
}

/// Walk `err` and everything it wraps
pub fn chain(err: &dyn ErrorCarrier) -> Chain<'_> {
    Chain {
        next: Some(err),
        remaining: MAX_CAUSE_DEPTH,
    }
}

/// Innermost error reachable through [`ErrorCarrier::carrier_source`]
pub fn root_cause(err: &dyn ErrorCarrier) -> &dyn ErrorCarrier {
    chain(err).last().unwrap_or(err)
}

/// Query one capability on `err`, falling back to its root cause
///
/// This is the single place where precedence is decided: the outermost
/// error wins, the root cause fills in what the outer error lacks, and the
/// levels in between are not consulted.
pub fn extract<'a, T>(err: &'a dyn ErrorCarrier, capability: impl Fn(&'a dyn ErrorCarrier) -> Option<T>) -> Option<T> {
    if let Some(value) = capability(err) {
        return Some(value);
    }

    capability(root_cause(err))
}

/// First backtrace found anywhere in the chain
pub fn find_stack_trace(err: &dyn ErrorCarrier) -> Option<&Backtrace> {
    chain(err).find_map(|level| level.stack_trace())
}

/// Adapter for foreign errors that carry no capabilities
///
/// Lets `std::io::Error`, `serde_json::Error` and friends flow through the
/// writers; they render as a 500 with their display text as message.
#[derive(Debug)]
pub struct Opaque<E>(pub E);

impl<E: fmt::Display> fmt::Display for Opaque<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<E: std::error::Error> std::error::Error for Opaque<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl<E: std::error::Error> ErrorCarrier for Opaque<E> {}

/// Transparent wrapper that records a backtrace
///
/// All capabilities are delegated to the wrapped error; only the stack
/// trace is added.
#[derive(Debug)]
pub struct Traced<E> {
    inner: E,
    backtrace: Backtrace,
}

impl<E: ErrorCarrier> Traced<E> {
    /// Wrap `inner`, capturing the current backtrace
    ///
    /// Capture honors `RUST_BACKTRACE` / `RUST_LIB_BACKTRACE`.
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            backtrace: Backtrace::capture(),
        }
    }

    /// The wrapped error
    pub const fn inner(&self) -> &E {
        &self.inner
    }
}

impl<E: fmt::Display> fmt::Display for Traced<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

impl<E: std::error::Error + 'static> std::error::Error for Traced<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.inner)
    }
}

impl<E: ErrorCarrier + 'static> ErrorCarrier for Traced<E> {
    fn status_code(&self) -> Option<StatusCode> {
        self.inner.status_code()
    }

    fn status(&self) -> Option<&str> {
        self.inner.status()
    }

    fn request_id(&self) -> Option<&str> {
        self.inner.request_id()
    }

    fn reason(&self) -> Option<&str> {
        self.inner.reason()
    }

    fn debug(&self) -> Option<&str> {
        self.inner.debug()
    }

    fn details(&self) -> Option<&Map<String, Value>> {
        self.inner.details()
    }

    fn id(&self) -> Option<&str> {
        self.inner.id()
    }

    fn grpc_code(&self) -> Option<tonic::Code> {
        self.inner.grpc_code()
    }

    fn stack_trace(&self) -> Option<&Backtrace> {
        Some(&self.backtrace)
    }

    fn field_violations(&self) -> Option<&[FieldViolation]> {
        self.inner.field_violations()
    }

    fn carrier_source(&self) -> Option<&dyn ErrorCarrier> {
        Some(&self.inner)
    }
}
