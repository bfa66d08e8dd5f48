//! The error taxonomy from the error-handling design: one kind per failure
//! mode the switch-interaction core can produce, plus the kind -> HTTP
//! status mapping the request router applies.
//!
//! Grounded on the teacher's `dal::web::ResultWithCode`/`ApiError`, which
//! carries a `StatusCode` alongside an outward-facing message; here the
//! status is derived from the error kind itself rather than threaded
//! through call sites by hand.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum CoreError {
    #[error("not authenticated")]
    Unauthenticated,

    #[error("principal lacks the required role")]
    Forbidden,

    #[error("malformed MAC address")]
    MacFormat,

    #[error("malformed port specification: {0}")]
    PortSpecFormat(String),

    #[error("vlan id out of range")]
    VlanRange,

    #[error("vlan does not exist on the target switch")]
    VlanAbsent,

    #[error("switch id is not known to the inventory")]
    SwitchUnknown,

    #[error("switch was unreachable: {0}")]
    Unreachable(String),

    #[error("switch rejected the supplied credentials")]
    AuthRejected,

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("could not parse switch output: {0}")]
    ParseFailure(String),

    #[error("switch rejected a configuration command: {0}")]
    WriteRejected(String),

    #[error("switch model family does not support writes")]
    Unsupported,

    #[error("plan no longer matches switch state, re-preview required")]
    PlanDrift,

    #[error("no admission capacity available within the deadline")]
    Busy,

    #[error("host is overloaded, privileged operations are rejected")]
    Overloaded,

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// §7: kind -> HTTP status.
    pub fn status_code(&self) -> StatusCode {
        use CoreError::*;
        match self {
            Unauthenticated => StatusCode::UNAUTHORIZED,
            Forbidden => StatusCode::FORBIDDEN,
            MacFormat | PortSpecFormat(_) | VlanRange => StatusCode::BAD_REQUEST,
            SwitchUnknown => StatusCode::NOT_FOUND,
            PlanDrift => StatusCode::CONFLICT,
            VlanAbsent => StatusCode::UNPROCESSABLE_ENTITY,
            Busy | Overloaded => StatusCode::SERVICE_UNAVAILABLE,
            Unreachable(_) | AuthRejected | Timeout(_) | ParseFailure(_) | WriteRejected(_)
            | Unsupported => StatusCode::BAD_GATEWAY,
            Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the caller. Never includes command output or
    /// credentials verbatim, per §7.
    pub fn public_message(&self) -> String {
        self.to_string()
    }
}

impl IntoResponse for CoreError {
    /// Lets a handler return `Result<Json<T>, CoreError>` directly — the
    /// router's kind -> status mapping applies without call sites having to
    /// thread a `StatusCode` through by hand (§7).
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({ "error": self.public_message() });
        (status, axum::Json(body)).into_response()
    }
}

/// Convert an opaque `anyhow::Error` crossing an I/O boundary (DB, SSH) into
/// a classified `CoreError`. Used at the engine boundary, the same seam the
/// teacher's `dal::web::ResultWithCode` sits at.
pub trait IntoCoreError<T> {
    fn internal(self) -> Result<T, CoreError>;
}

impl<T> IntoCoreError<T> for Result<T, anyhow::Error> {
    fn internal(self) -> Result<T, CoreError> {
        self.map_err(|e| CoreError::Internal(e.to_string()))
    }
}
