use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{debug, error};

use brainly_db::StoreError;
use brainly_types::api::MessageResponse;

/// Every failure a handler can produce. The `Display` text is the `message`
/// sent to the client, so it never carries internal detail.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Error in inputs")]
    InvalidInput,

    #[error("Invalid request body")]
    MalformedBody(String),

    #[error("User already exists with this username")]
    UserExists,

    #[error("Incorrect username or password")]
    BadCredentials,

    #[error("Authorization token is missing")]
    TokenMissing,

    #[error("You are not logged in or session expired")]
    SessionExpired,

    #[error("Content ID is required")]
    ContentIdMissing,

    #[error("Content not found")]
    ContentNotFound,

    #[error("sorry incorrect input")]
    InvalidShareLink,

    /// Store failure while deleting content; reported as 403.
    #[error("Server Error")]
    DeleteFailed(#[source] StoreError),

    #[error("Server Error")]
    Store(#[from] StoreError),

    #[error("Server Error")]
    Internal { kind: &'static str, detail: String },
}

impl ApiError {
    pub fn malformed(rejection: JsonRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text())
    }

    pub fn internal(kind: &'static str, detail: impl ToString) -> Self {
        ApiError::Internal {
            kind,
            detail: detail.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput | ApiError::InvalidShareLink => StatusCode::LENGTH_REQUIRED,
            ApiError::MalformedBody(_) | ApiError::ContentIdMissing => StatusCode::BAD_REQUEST,
            ApiError::UserExists | ApiError::BadCredentials | ApiError::DeleteFailed(_) => {
                StatusCode::FORBIDDEN
            }
            ApiError::TokenMissing | ApiError::SessionExpired => StatusCode::UNAUTHORIZED,
            ApiError::ContentNotFound => StatusCode::NOT_FOUND,
            ApiError::Store(_) | ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Kind name of a server-side failure, exposed as the `error` field.
    pub fn kind(&self) -> Option<&'static str> {
        match self {
            ApiError::DeleteFailed(e) | ApiError::Store(e) => Some(e.kind()),
            ApiError::Internal { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::DeleteFailed(e) | ApiError::Store(e) => error!("Store error: {}", e),
            ApiError::Internal { kind, detail } => error!("{}: {}", kind, detail),
            ApiError::MalformedBody(detail) => debug!("Rejected request body: {}", detail),
            _ => {}
        }

        let body = MessageResponse {
            message: self.to_string(),
            error: self.kind().map(str::to_string),
        };
        (self.status(), Json(body)).into_response()
    }
}
