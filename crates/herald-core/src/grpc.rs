//! Mapping of the canonical error onto `tonic::Status`

use std::backtrace::BacktraceStatus;
use std::collections::HashMap;

use http::StatusCode;
use tonic::metadata::{MetadataMap, MetadataValue};
use tonic::{Code, Status};
use tonic_types::{ErrorDetails, StatusExt};

use crate::error::DefaultError;
use crate::status::STATUS_CLIENT_CLOSED_REQUEST;

/// Metadata key carrying the request correlation id
pub const REQUEST_ID_METADATA: &str = "x-request-id";
/// Metadata key carrying the application error id
pub const ERROR_ID_METADATA: &str = "x-error-id";
/// Metadata key carrying the error reason
pub const ERROR_REASON_METADATA: &str = "x-error-reason";

/// gRPC code closest to an HTTP status
pub fn grpc_code_for(status: StatusCode) -> Code {
    match status.as_u16() {
        200..=299 => Code::Ok,
        400 => Code::InvalidArgument,
        401 => Code::Unauthenticated,
        403 => Code::PermissionDenied,
        404 => Code::NotFound,
        409 => Code::Aborted,
        412 => Code::FailedPrecondition,
        429 => Code::ResourceExhausted,
        STATUS_CLIENT_CLOSED_REQUEST => Code::Cancelled,
        501 => Code::Unimplemented,
        503 => Code::Unavailable,
        504 => Code::DeadlineExceeded,
        _ if status.is_server_error() => Code::Internal,
        _ => Code::Unknown,
    }
}

impl DefaultError {
    /// Build a gRPC status from this error
    ///
    /// Uses the explicit gRPC code when set, otherwise maps the HTTP
    /// status. The reason and request id are attached as `ErrorInfo` and
    /// `RequestInfo` details, and field violations as `BadRequest` for
    /// `InvalidArgument`. Request id, error id and reason are also sent as
    /// ASCII metadata. Debug text and stack traces are left out.
    pub fn grpc_status(&self) -> Status {
        self.build_grpc_status(false)
    }

    /// Like [`DefaultError::grpc_status`], plus a `DebugInfo` detail with
    /// the debug text and any recorded stack trace
    pub fn grpc_status_with_debug(&self) -> Status {
        self.build_grpc_status(true)
    }

    fn build_grpc_status(&self, expose_debug: bool) -> Status {
        let code = self
            .grpc_code
            .unwrap_or_else(|| grpc_code_for(self.resolved_status_code()));

        let mut details = ErrorDetails::new();
        if let Some(reason) = self.reason.as_deref().filter(|r| !r.is_empty()) {
            details.set_error_info(reason, "", HashMap::<String, String>::new());
        }
        if let Some(request_id) = self.request.as_deref().filter(|rid| !rid.is_empty()) {
            details.set_request_info(request_id, "");
        }
        if code == Code::InvalidArgument {
            for violation in &self.field_violations {
                details.add_bad_request_violation(violation.field.clone(), violation.description.clone());
            }
        }
        if expose_debug {
            let stack_entries = self.stack_entries();
            let detail = self.debug.clone().unwrap_or_default();
            if !detail.is_empty() || !stack_entries.is_empty() {
                details.set_debug_info(stack_entries, detail);
            }
        }

        let mut metadata = MetadataMap::new();
        insert_ascii(&mut metadata, REQUEST_ID_METADATA, self.request.as_deref());
        insert_ascii(&mut metadata, ERROR_ID_METADATA, self.id.as_deref());
        insert_ascii(&mut metadata, ERROR_REASON_METADATA, self.reason.as_deref());

        Status::with_error_details_and_metadata(code, self.message.clone(), details, metadata)
    }

    /// Captured backtrace below this error, one frame line per entry
    fn stack_entries(&self) -> Vec<String> {
        self.trace()
            .filter(|trace| trace.status() == BacktraceStatus::Captured)
            .map(|trace| trace.to_string().lines().map(|line| line.trim().to_owned()).collect())
            .unwrap_or_default()
    }
}

impl From<DefaultError> for Status {
    fn from(err: DefaultError) -> Self {
        err.grpc_status()
    }
}

/// Metadata values must be printable ASCII; anything else is left out
fn insert_ascii(metadata: &mut MetadataMap, key: &'static str, value: Option<&str>) {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return;
    };
    if !value.bytes().all(|b| (0x20..0x7f).contains(&b)) {
        return;
    }

    if let Ok(value) = MetadataValue::try_from(value) {
        metadata.insert(key, value);
    }
}
