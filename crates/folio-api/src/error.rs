use std::sync::atomic::{AtomicBool, Ordering};

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

static DEV_MODE: AtomicBool = AtomicBool::new(false);

/// Set once at startup. In development mode internal error details are
/// surfaced in response bodies; otherwise a generic message is returned
/// and the detail only goes to the log.
pub fn set_dev_mode(enabled: bool) {
    DEV_MODE.store(enabled, Ordering::Relaxed);
}

fn dev_mode() -> bool {
    DEV_MODE.load(Ordering::Relaxed)
}

/// Error taxonomy for the whole API surface. Every route handler returns
/// `Result<_, ApiError>`; the `IntoResponse` impl maps each kind to its
/// status code and a JSON `{"error": ...}` body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("Authorization token is required")]
    MissingCredential,
    #[error("Invalid token")]
    InvalidCredential,
    #[error("Token has expired")]
    ExpiredCredential,
    #[error("Invalid username or password")]
    BadLogin,
    #[error("Access denied")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Only image files are allowed")]
    UnsupportedMediaType,
    #[error("File too large")]
    PayloadTooLarge,
    #[error("No file uploaded")]
    NoFileProvided,
    #[error("Current password is incorrect")]
    PasswordMismatch,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::UnsupportedMediaType
            | ApiError::PayloadTooLarge
            | ApiError::NoFileProvided
            | ApiError::PasswordMismatch => StatusCode::BAD_REQUEST,
            ApiError::MissingCredential
            | ApiError::InvalidCredential
            | ApiError::ExpiredCredential
            | ApiError::BadLogin => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(err) => {
                error!("internal error: {:#}", err);
                if dev_mode() {
                    format!("{:#}", err)
                } else {
                    "Internal server error".to_string()
                }
            }
            other => other.to_string(),
        };

        let body = Json(serde_json::json!({ "error": message }));
        (status, body).into_response()
    }
}

/// Run a blocking database closure off the async runtime.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("blocking task failed: {}", e)))?
        .map_err(ApiError::Internal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(
            ApiError::Validation("Title is required".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::MissingCredential.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::ExpiredCredential.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound("Project").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::UnsupportedMediaType.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::PayloadTooLarge.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::PasswordMismatch.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn expired_and_invalid_messages_are_distinguishable() {
        assert_ne!(
            ApiError::ExpiredCredential.to_string(),
            ApiError::InvalidCredential.to_string()
        );
    }
}
