//! Error taxonomy shared by the diff, template and CLI layers.
//!
//! Every failure in the core is an [`OpsError`]. Errors are returned to the
//! immediate caller; nothing here terminates the process. The CLI entry point
//! maps [`OpsError::exit_code`] onto the process status.

use serde_json::{json, Value};
use thiserror::Error;

use crate::json_patch::PatchError;

/// Closed set of failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Parse,
    PatchConflict,
    UnresolvedPlaceholder,
    InvalidTemplate,
    Argument,
    Descriptor,
    HandlerFailure,
    Service,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Parse => "ParseError",
            ErrorKind::PatchConflict => "PatchConflictError",
            ErrorKind::UnresolvedPlaceholder => "UnresolvedPlaceholderError",
            ErrorKind::InvalidTemplate => "InvalidTemplateError",
            ErrorKind::Argument => "ArgumentError",
            ErrorKind::Descriptor => "DescriptorError",
            ErrorKind::HandlerFailure => "HandlerFailure",
            ErrorKind::Service => "ServiceError",
            ErrorKind::Internal => "InternalError",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum OpsError {
    #[error("{}", parse_display(.message, *.line, *.column))]
    Parse {
        message: String,
        /// 1-based; 0 when the position is unknown.
        line: usize,
        column: usize,
    },

    #[error(transparent)]
    PatchConflict(#[from] PatchError),

    #[error("unresolved placeholder '${{{placeholder}}}' at {location:?}")]
    UnresolvedPlaceholder { placeholder: String, location: String },

    #[error("invalid template at {location:?}: {message}")]
    InvalidTemplate { location: String, message: String },

    #[error("{}", argument_display(.flag, .message))]
    Argument { flag: Option<String>, message: String },

    #[error("invalid descriptor '{name}': {message}")]
    Descriptor { name: String, message: String },

    #[error("handler for '{operation}' failed: {cause}")]
    HandlerFailure {
        operation: String,
        #[source]
        cause: Box<OpsError>,
    },

    #[error("service error {code}: {message}")]
    Service { code: String, message: String },

    #[error("internal error: {0}")]
    Internal(String),
}

fn parse_display(message: &str, line: usize, column: usize) -> String {
    if line == 0 {
        format!("parse error: {message}")
    } else {
        format!("parse error at line {line}, column {column}: {message}")
    }
}

fn argument_display(flag: &Option<String>, message: &str) -> String {
    match flag {
        Some(flag) => format!("invalid argument --{flag}: {message}"),
        None => format!("invalid arguments: {message}"),
    }
}

impl OpsError {
    pub fn parse(message: impl Into<String>) -> Self {
        OpsError::Parse { message: message.into(), line: 0, column: 0 }
    }

    pub fn argument(flag: impl Into<String>, message: impl Into<String>) -> Self {
        OpsError::Argument { flag: Some(flag.into()), message: message.into() }
    }

    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        OpsError::Service { code: code.into(), message: message.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            OpsError::Parse { .. } => ErrorKind::Parse,
            OpsError::PatchConflict(_) => ErrorKind::PatchConflict,
            OpsError::UnresolvedPlaceholder { .. } => ErrorKind::UnresolvedPlaceholder,
            OpsError::InvalidTemplate { .. } => ErrorKind::InvalidTemplate,
            OpsError::Argument { .. } => ErrorKind::Argument,
            OpsError::Descriptor { .. } => ErrorKind::Descriptor,
            OpsError::HandlerFailure { .. } => ErrorKind::HandlerFailure,
            OpsError::Service { .. } => ErrorKind::Service,
            OpsError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The wrapped error, for kinds that carry one.
    pub fn cause(&self) -> Option<&OpsError> {
        match self {
            OpsError::HandlerFailure { cause, .. } => Some(cause),
            _ => None,
        }
    }

    /// Process exit status for this error at the CLI boundary.
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Parse
            | ErrorKind::PatchConflict
            | ErrorKind::UnresolvedPlaceholder
            | ErrorKind::InvalidTemplate
            | ErrorKind::Argument => 1,
            ErrorKind::HandlerFailure | ErrorKind::Service => 2,
            ErrorKind::Descriptor | ErrorKind::Internal => 3,
        }
    }

    /// Structured form: `{kind, message, cause?}`.
    pub fn to_value(&self) -> Value {
        let message = match self {
            OpsError::HandlerFailure { operation, .. } => {
                format!("handler for '{operation}' failed")
            }
            other => other.to_string(),
        };
        let mut out = json!({ "kind": self.kind().as_str(), "message": message });
        if let Some(cause) = self.cause() {
            out["cause"] = cause.to_value();
        }
        out
    }
}

impl From<serde_json::Error> for OpsError {
    fn from(e: serde_json::Error) -> Self {
        let line = e.line();
        let column = e.column();
        let mut message = e.to_string();
        // serde_json appends " at line L column C"; the position is kept in fields.
        if let Some(idx) = message.rfind(" at line ") {
            message.truncate(idx);
        }
        OpsError::Parse { message, line, column }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_cover_every_kind() {
        assert_eq!(OpsError::parse("x").exit_code(), 1);
        assert_eq!(OpsError::argument("region", "missing").exit_code(), 1);
        assert_eq!(OpsError::service("Throttled", "slow down").exit_code(), 2);
        assert_eq!(OpsError::Internal("boom".into()).exit_code(), 3);
        let wrapped = OpsError::HandlerFailure {
            operation: "describe".into(),
            cause: Box::new(OpsError::service("AccessDenied", "no")),
        };
        assert_eq!(wrapped.exit_code(), 2);
    }

    #[test]
    fn argument_message_names_flag() {
        let err = OpsError::argument("region", "required parameter is missing");
        assert_eq!(err.to_string(), "invalid argument --region: required parameter is missing");
    }

    #[test]
    fn from_serde_error_keeps_position() {
        let err: OpsError = serde_json::from_str::<Value>("{\n  \"a\": }").unwrap_err().into();
        match err {
            OpsError::Parse { line, column, ref message } => {
                assert_eq!(line, 2);
                assert!(column > 0);
                assert!(!message.contains(" at line "));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn to_value_nests_cause() {
        let err = OpsError::HandlerFailure {
            operation: "create-lb".into(),
            cause: Box::new(OpsError::service("LimitExceeded", "too many")),
        };
        let v = err.to_value();
        assert_eq!(v["kind"], "HandlerFailure");
        assert_eq!(v["cause"]["kind"], "ServiceError");
        assert_eq!(v["cause"]["message"], "service error LimitExceeded: too many");
        assert!(err.cause().is_some());
    }
}
