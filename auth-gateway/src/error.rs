use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use error_common::AuthError;

/// HTTP rendering of [`AuthError`].
///
/// The body is `{"error", "code", "status"}` with a generic message, so
/// callers never learn whether a token expired or was forged, or whether an
/// identity exists.
#[derive(Debug)]
pub struct ApiError(pub AuthError);

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(error_code = err.code(), error = %err, "Request failed");
        }

        let body = serde_json::json!({
            "error": err.public_message(),
            "code": err.code(),
            "status": status.as_u16(),
        });

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = err.retry_after_secs() {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
