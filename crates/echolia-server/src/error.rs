//! API error responses.
//!
//! Every failure becomes `{"error": tag}` with the tag's status code;
//! quota exhaustion additionally carries the current usage so clients can
//! display a countdown. Nothing else ever leaks into a response body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use echolia_core::error::InferenceError;
use echolia_proto::ErrorTag;
use serde_json::{json, Value};

/// A response-ready API error: status plus JSON body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: Value,
}

impl ApiError {
    fn tagged(tag: ErrorTag) -> Self {
        Self {
            status: StatusCode::from_u16(tag.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body: json!({ "error": tag.as_str() }),
        }
    }

    /// 401 with the `auth_required` tag.
    pub fn auth_required() -> Self {
        Self::tagged(ErrorTag::AuthRequired)
    }
}

impl From<InferenceError> for ApiError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::QuotaExceeded(snapshot) => Self {
                status: StatusCode::TOO_MANY_REQUESTS,
                body: json!({
                    "error": ErrorTag::QuotaExceeded.as_str(),
                    "usage": snapshot.to_wire(),
                }),
            },
            other => Self::tagged(other.tag()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
