use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use recon_resolver::ResolveError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Resolve(ResolveError::Validation(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::Resolve(ResolveError::Conflict { .. }) => StatusCode::CONFLICT,
            Self::Resolve(ResolveError::Store(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Resolve(ResolveError::Integrity(_))
            | Self::Config(_)
            | Self::Io(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for the error body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Resolve(ResolveError::Validation(_)) => "validation",
            Self::Resolve(ResolveError::Conflict { .. }) => "conflict",
            Self::Resolve(ResolveError::Store(_)) => "store_unavailable",
            Self::Resolve(ResolveError::Integrity(_)) => "integrity",
            Self::Config(_) => "config",
            Self::Io(_) | Self::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        let body = json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recon_store::StoreError;

    #[test]
    fn status_mapping() {
        let cases = [
            (ServerError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (
                ResolveError::Validation("empty".into()).into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                ResolveError::Conflict { attempts: 4, reason: "race".into() }.into(),
                StatusCode::CONFLICT,
            ),
            (
                ResolveError::Store(StoreError::Unavailable("down".into())).into(),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ResolveError::Integrity("cycle".into()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(error.status(), status, "{error}");
        }
    }

    #[test]
    fn codes_are_stable() {
        let err: ServerError = ResolveError::Conflict { attempts: 1, reason: "r".into() }.into();
        assert_eq!(err.code(), "conflict");
        assert_eq!(ServerError::Internal("boom".into()).code(), "internal");
    }
}
