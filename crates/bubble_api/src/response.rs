//! Response envelope and status codes.
//!
//! # Invariants
//! - `code == Ok` always carries `data`.
//! - `FailExist` carries `data` too; callers inspect item-level flags.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Status code of one API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseCode {
    Ok,
    InappropriateDepth,
    BadRequest,
    NoWorkspace,
    AlreadyExist,
    NoParent,
    FailExist,
    BubbleNotFound,
    InternalError,
}

impl ResponseCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::InappropriateDepth => "INAPPROPRIATE_DEPTH",
            Self::BadRequest => "BAD_REQUEST",
            Self::NoWorkspace => "NO_WORKSPACE",
            Self::AlreadyExist => "ALREADY_EXIST",
            Self::NoParent => "NO_PARENT",
            Self::FailExist => "FAIL_EXIST",
            Self::BubbleNotFound => "BUBBLE_NOT_FOUND",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl Display for ResponseCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Envelope returned by every API call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: ResponseCode,
    /// Human-readable diagnostics. Empty on plain success.
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: ResponseCode::Ok,
            message: String::new(),
            data: Some(data),
        }
    }

    pub fn with_code(code: ResponseCode, message: impl Into<String>, data: T) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn failure(code: ResponseCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == ResponseCode::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::{ApiResponse, ResponseCode};

    #[test]
    fn codes_serialize_as_screaming_snake_case() {
        let json = serde_json::to_value(ResponseCode::InappropriateDepth).unwrap();
        assert_eq!(json, "INAPPROPRIATE_DEPTH");
        assert_eq!(ResponseCode::FailExist.to_string(), "FAIL_EXIST");
    }

    #[test]
    fn failure_envelope_has_no_data() {
        let response: ApiResponse<u32> = ApiResponse::failure(ResponseCode::NoParent, "missing");
        assert!(!response.is_ok());
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            serde_json::json!({ "code": "NO_PARENT", "message": "missing", "data": null })
        );
    }
}
