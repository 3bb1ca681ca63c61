//! Ready-made errors for common HTTP conditions
//!
//! The definitions are `const` data. Customize them through
//! [`ErrDef::to_error`] and the `with_*` methods of [`DefaultError`]; a
//! definition can also be handed to a writer as-is.

use std::fmt;

use http::StatusCode;
use tonic::Code;

use crate::carrier::ErrorCarrier;
use crate::error::DefaultError;

/// Static error definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrDef {
    pub status: StatusCode,
    pub title: &'static str,
    pub message: &'static str,
    pub grpc_code: Code,
}

impl ErrDef {
    /// Owned copy of this definition, ready for `with_*` customization
    pub fn to_error(&self) -> DefaultError {
        DefaultError::new(self.message)
            .with_status_code(self.status)
            .with_status(self.title)
            .with_grpc_code(self.grpc_code)
    }
}

impl From<ErrDef> for DefaultError {
    fn from(def: ErrDef) -> Self {
        def.to_error()
    }
}

impl fmt::Display for ErrDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message)
    }
}

impl std::error::Error for ErrDef {}

impl ErrorCarrier for ErrDef {
    fn status_code(&self) -> Option<StatusCode> {
        Some(self.status)
    }

    fn status(&self) -> Option<&str> {
        Some(self.title)
    }

    fn grpc_code(&self) -> Option<Code> {
        Some(self.grpc_code)
    }
}

pub const ERR_NOT_FOUND: ErrDef = ErrDef {
    status: StatusCode::NOT_FOUND,
    title: "Not Found",
    message: "The requested resource could not be found",
    grpc_code: Code::NotFound,
};

pub const ERR_UNAUTHORIZED: ErrDef = ErrDef {
    status: StatusCode::UNAUTHORIZED,
    title: "Unauthorized",
    message: "The request could not be authorized",
    grpc_code: Code::Unauthenticated,
};

pub const ERR_FORBIDDEN: ErrDef = ErrDef {
    status: StatusCode::FORBIDDEN,
    title: "Forbidden",
    message: "The requested action was forbidden",
    grpc_code: Code::PermissionDenied,
};

pub const ERR_INTERNAL_SERVER_ERROR: ErrDef = ErrDef {
    status: StatusCode::INTERNAL_SERVER_ERROR,
    title: "Internal Server Error",
    message: "An internal server error occurred, please contact the system administrator",
    grpc_code: Code::Internal,
};

pub const ERR_BAD_REQUEST: ErrDef = ErrDef {
    status: StatusCode::BAD_REQUEST,
    title: "Bad Request",
    message: "The request was malformed or contained invalid parameters",
    grpc_code: Code::FailedPrecondition,
};

pub const ERR_UNSUPPORTED_MEDIA_TYPE: ErrDef = ErrDef {
    status: StatusCode::UNSUPPORTED_MEDIA_TYPE,
    title: "Unsupported Media Type",
    message: "The request is using an unknown content type",
    grpc_code: Code::InvalidArgument,
};

pub const ERR_CONFLICT: ErrDef = ErrDef {
    status: StatusCode::CONFLICT,
    title: "Conflict",
    message: "The resource could not be created due to a conflict",
    grpc_code: Code::FailedPrecondition,
};
