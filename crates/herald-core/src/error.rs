use std::backtrace::Backtrace;
use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::carrier::{ErrorCarrier, FieldViolation, Traced, find_stack_trace};

/// Canonical, serializable representation of an error
///
/// Built once per rendered error, usually by [`crate::normalize`]. The
/// `with_*` methods consume the value and return the modified copy, so
/// shared instances are customized by cloning first.
///
/// Equality only compares `message`, `status`, `id` and `code`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[must_use]
pub struct DefaultError {
    /// Stable application error id, e.g. `invalid_configuration`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Transport status code, resolved to 500 when absent
    #[serde(default, skip_serializing_if = "Option::is_none", with = "status_code_serde")]
    pub code: Option<StatusCode>,

    /// Short status description, e.g. `Not Found`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,

    /// Correlation id of the failed request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,

    /// Human-readable reason, safe to expose
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Diagnostic detail, stripped from client responses unless enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<String>,

    /// Further structured details
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, Value>,

    /// Error message, always present
    pub message: String,

    /// Status code for the gRPC transport
    #[serde(skip)]
    pub grpc_code: Option<tonic::Code>,

    /// Invalid request fields, sent as `BadRequest` on `InvalidArgument`
    #[serde(skip)]
    pub field_violations: Vec<FieldViolation>,

    #[serde(skip)]
    pub(crate) wrapped: Option<Arc<dyn ErrorCarrier + Send + Sync>>,
}

impl DefaultError {
    /// Create an error with only a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Normalize `err` and keep it as the wrapped cause
    pub fn from_error<E>(err: E, fallback_request_id: &str) -> Self
    where
        E: ErrorCarrier + Send + Sync + 'static,
    {
        crate::normalize_carrier(&err, fallback_request_id).with_wrap(err)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_status_code(mut self, code: StatusCode) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request = Some(request_id.into());
        self
    }

    /// Set the request id unless one is already present
    pub fn with_fallback_request_id(mut self, request_id: &str) -> Self {
        if self.request.as_deref().is_none_or(str::is_empty) && !request_id.is_empty() {
            self.request = Some(request_id.to_owned());
        }
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_debug(mut self, debug: impl Into<String>) -> Self {
        self.debug = Some(debug.into());
        self
    }

    /// Add or replace a single entry in `details`
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn with_grpc_code(mut self, code: tonic::Code) -> Self {
        self.grpc_code = Some(code);
        self
    }

    pub fn with_field_violation(mut self, field: impl Into<String>, description: impl Into<String>) -> Self {
        self.field_violations.push(FieldViolation::new(field, description));
        self
    }

    /// Attach `cause` without touching any other field
    pub fn with_wrap<E>(mut self, cause: E) -> Self
    where
        E: ErrorCarrier + Send + Sync + 'static,
    {
        self.wrapped = Some(Arc::new(cause));
        self
    }

    /// Attach `cause`, capturing a backtrace unless it already has one
    pub fn with_trace<E>(self, cause: E) -> Self
    where
        E: ErrorCarrier + Send + Sync + 'static,
    {
        if find_stack_trace(&cause).is_some() {
            self.with_wrap(cause)
        } else {
            self.with_wrap(Traced::new(cause))
        }
    }

    /// Copy without the debug field, for client-facing output
    pub fn without_debug(mut self) -> Self {
        self.debug = None;
        self
    }

    /// The wrapped cause, if any
    pub fn wrapped(&self) -> Option<&(dyn ErrorCarrier + Send + Sync)> {
        self.wrapped.as_deref()
    }

    /// Status code with the 500 default applied
    pub fn resolved_status_code(&self) -> StatusCode {
        self.code.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Backtrace recorded somewhere below this error
    ///
    /// Empty when nothing is wrapped or nothing below recorded a trace.
    pub fn trace(&self) -> Option<&Backtrace> {
        find_stack_trace(self.wrapped.as_deref()?)
    }
}

impl PartialEq for DefaultError {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message && self.status == other.status && self.id == other.id && self.code == other.code
    }
}

impl fmt::Display for DefaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !f.alternate() {
            return f.write_str(&self.message);
        }

        writeln!(f, "id={}", self.id.as_deref().unwrap_or_default())?;
        writeln!(f, "rid={}", self.request.as_deref().unwrap_or_default())?;
        writeln!(f, "error={}", self.message)?;
        writeln!(f, "reason={}", self.reason.as_deref().unwrap_or_default())?;
        writeln!(f, "details={}", Value::Object(self.details.clone()))?;
        writeln!(f, "debug={}", self.debug.as_deref().unwrap_or_default())?;
        if let Some(trace) = self.trace() {
            write!(f, "{trace}")?;
        }
        Ok(())
    }
}

impl std::error::Error for DefaultError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.wrapped
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

impl ErrorCarrier for DefaultError {
    fn status_code(&self) -> Option<StatusCode> {
        self.code
    }

    fn status(&self) -> Option<&str> {
        non_empty(&self.status)
    }

    fn request_id(&self) -> Option<&str> {
        self.request.as_deref().and_then(non_empty)
    }

    fn reason(&self) -> Option<&str> {
        self.reason.as_deref().and_then(non_empty)
    }

    fn debug(&self) -> Option<&str> {
        self.debug.as_deref().and_then(non_empty)
    }

    fn details(&self) -> Option<&Map<String, Value>> {
        (!self.details.is_empty()).then_some(&self.details)
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref().and_then(non_empty)
    }

    fn grpc_code(&self) -> Option<tonic::Code> {
        self.grpc_code
    }

    fn stack_trace(&self) -> Option<&Backtrace> {
        self.trace()
    }

    fn field_violations(&self) -> Option<&[FieldViolation]> {
        (!self.field_violations.is_empty()).then_some(self.field_violations.as_slice())
    }

    fn carrier_source(&self) -> Option<&dyn ErrorCarrier> {
        self.wrapped.as_deref().map(|cause| cause as &dyn ErrorCarrier)
    }
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

/// Wire envelope: `{"error": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: DefaultError,
}

impl ErrorEnvelope {
    /// Wrap `error` for the wire, dropping `debug` unless `expose_debug`
    pub fn new(error: DefaultError, expose_debug: bool) -> Self {
        let error = if expose_debug { error } else { error.without_debug() };
        Self { error }
    }
}

/// Serializes `Option<StatusCode>` as an optional integer; `0` reads as absent
mod status_code_serde {
    use http::StatusCode;
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)] // serde requires &T signature
    pub fn serialize<S>(code: &Option<StatusCode>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match code {
            Some(code) => serializer.serialize_u16(code.as_u16()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<StatusCode>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<u16>::deserialize(deserializer)?
            .filter(|code| *code != 0)
            .map(StatusCode::from_u16)
            .transpose()
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::carrier::Opaque;

    #[test]
    fn serializes_only_present_fields() {
        let err = DefaultError::new("Some Error");
        insta::assert_snapshot!(serde_json::to_string(&err).unwrap(), @r#"{"message":"Some Error"}"#);
    }

    #[test]
    fn serializes_every_field_in_wire_order() {
        let err = DefaultError::new("The requested resource could not be found")
            .with_id("resource_missing")
            .with_status_code(StatusCode::NOT_FOUND)
            .with_status("Not Found")
            .with_request_id("rid-1")
            .with_reason("User 1234 does not exist")
            .with_debug("row not found")
            .with_detail("user", 1234);

        insta::assert_snapshot!(
            serde_json::to_string(&err).unwrap(),
            @r#"{"id":"resource_missing","code":404,"status":"Not Found","request":"rid-1","reason":"User 1234 does not exist","debug":"row not found","details":{"user":1234},"message":"The requested resource could not be found"}"#
        );
    }

    #[test]
    fn envelope_hides_debug_by_default() {
        let err = DefaultError::new("Some Error").with_debug("whatever");

        let hidden = serde_json::to_value(ErrorEnvelope::new(err.clone(), false)).unwrap();
        assert_eq!(hidden, json!({"error": {"message": "Some Error"}}));

        let shown = serde_json::to_value(ErrorEnvelope::new(err.clone(), true)).unwrap();
        assert_eq!(shown, json!({"error": {"message": "Some Error", "debug": "whatever"}}));

        // the original keeps its debug text
        assert_eq!(err.debug.as_deref(), Some("whatever"));
    }

    #[test]
    fn envelope_round_trip() {
        let err = DefaultError::new("boom")
            .with_status_code(StatusCode::CONFLICT)
            .with_status("Conflict")
            .with_reason("already exists")
            .with_request_id("rid-7")
            .with_debug("unique violation");

        let encoded = serde_json::to_string(&ErrorEnvelope::new(err.clone(), false)).unwrap();
        let decoded: ErrorEnvelope = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded.error.message, "boom");
        assert_eq!(decoded.error.status, "Conflict");
        assert_eq!(decoded.error.code, Some(StatusCode::CONFLICT));
        assert_eq!(decoded.error.reason.as_deref(), Some("already exists"));
        assert_eq!(decoded.error.request.as_deref(), Some("rid-7"));
        assert!(decoded.error.debug.is_none());

        let encoded = serde_json::to_string(&ErrorEnvelope::new(err, true)).unwrap();
        let decoded: ErrorEnvelope = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.error.debug.as_deref(), Some("unique violation"));
    }

    #[test]
    fn zero_code_deserializes_as_absent() {
        let err: DefaultError = serde_json::from_str(r#"{"code":0,"message":"m"}"#).unwrap();
        assert!(err.code.is_none());
        assert_eq!(err.resolved_status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn equality_ignores_reason_debug_and_details() {
        let a = DefaultError::new("m").with_status_code(StatusCode::NOT_FOUND).with_id("x");
        let b = a.clone().with_reason("r").with_debug("d").with_detail("k", "v");
        assert_eq!(a, b);

        let c = a.clone().with_id("y");
        assert_ne!(a, c);
    }

    #[test]
    fn with_operations_are_idempotent() {
        let base = DefaultError::new("m");
        assert_eq!(base.clone().with_reason("r"), base.clone().with_reason("r").with_reason("r"));
        assert_eq!(
            base.clone().with_id("i").with_status("s"),
            base.clone().with_id("i").with_id("i").with_status("s").with_status("s")
        );

        let once = base.clone().with_detail("k", "v");
        let twice = base.with_detail("k", "v").with_detail("k", "v");
        assert_eq!(once.details, twice.details);
    }

    #[test]
    fn with_detail_merges() {
        let err = DefaultError::new("m").with_detail("a", 1).with_detail("b", "two");
        assert_eq!(Value::Object(err.details), json!({"a": 1, "b": "two"}));
    }

    #[test]
    fn with_operations_leave_the_source_untouched() {
        let shared = DefaultError::new("m").with_reason("original");
        let custom = shared.clone().with_reason("custom");
        assert_eq!(shared.reason.as_deref(), Some("original"));
        assert_eq!(custom.reason.as_deref(), Some("custom"));
    }

    #[test]
    fn fallback_request_id_is_first_write_wins() {
        let err = DefaultError::new("m").with_fallback_request_id("first");
        assert_eq!(err.request.as_deref(), Some("first"));

        let err = err.with_fallback_request_id("second");
        assert_eq!(err.request.as_deref(), Some("first"));

        let err = DefaultError::new("m").with_fallback_request_id("");
        assert!(err.request.is_none());
    }

    #[test]
    fn wrap_keeps_fields() {
        let err = DefaultError::new("m")
            .with_reason("r")
            .with_wrap(Opaque(std::io::Error::other("io")));
        assert_eq!(err.reason.as_deref(), Some("r"));
        assert_eq!(err.wrapped().map(ToString::to_string).as_deref(), Some("io"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn trace_is_found_through_the_wrapped_chain() {
        let err = DefaultError::new("m").with_trace(Opaque(std::io::Error::other("io")));
        assert!(err.trace().is_some());

        let plain = DefaultError::new("m").with_wrap(Opaque(std::io::Error::other("io")));
        assert!(plain.trace().is_none());
    }

    #[test]
    fn with_trace_reuses_existing_trace() {
        let traced = DefaultError::new("inner").with_trace(Opaque(std::io::Error::other("io")));
        let outer = DefaultError::new("outer").with_trace(traced);
        let cause = outer.wrapped().unwrap();
        assert_eq!(cause.to_string(), "inner");
        assert!(outer.trace().is_some());
    }

    #[test]
    fn self_wrapped_error_has_empty_trace() {
        let err = DefaultError::new("self");
        let wrapped = err.clone().with_wrap(err);
        assert!(wrapped.trace().is_none());
    }

    #[test]
    fn unwrapped_error_has_empty_trace() {
        assert!(DefaultError::new("m").trace().is_none());
    }

    #[test]
    fn alternate_display_lists_fields() {
        let err = DefaultError::new("boom").with_id("i").with_reason("r").with_debug("d");
        assert_eq!(err.to_string(), "boom");

        let full = format!("{err:#}");
        assert!(full.contains("id=i\n"));
        assert!(full.contains("error=boom\n"));
        assert!(full.contains("reason=r\n"));
        assert!(full.contains("debug=d\n"));
    }
}
