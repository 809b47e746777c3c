use http::StatusCode;
use spin_sdk::http::Response;
use thiserror::Error;

/// Every way a request can be turned away, with the status it maps to.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("You must be logged in to complete this action.")]
    AuthRequired,

    #[error("You must be logged out to complete this action.")]
    AlreadyLoggedIn,

    #[error("{0}")]
    Exists(String),

    #[error("{message}")]
    Missing { status: StatusCode, message: String },

    #[error("{0}")]
    UnknownUser(String),

    #[error("Invalid user login credentials provided.")]
    InvalidCredentials,

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Internal Error: {0}")]
    InternalError(String),
}

impl ApiError {
    /// A missing resource reported as 403, the way the owner-scoped routes do.
    pub fn missing(message: impl Into<String>) -> Self {
        ApiError::Missing {
            status: StatusCode::FORBIDDEN,
            message: message.into(),
        }
    }

    /// A missing resource reported as 404.
    pub fn missing_not_found(message: impl Into<String>) -> Self {
        ApiError::Missing {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::AuthRequired | ApiError::AlreadyLoggedIn | ApiError::Exists(_) => {
                StatusCode::FORBIDDEN
            }
            ApiError::Missing { status, .. } => *status,
            ApiError::UnknownUser(_) | ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ApiError> for Response {
    fn from(err: ApiError) -> Self {
        let status = err.status();
        if status.is_server_error() {
            tracing::error!(error = %err, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %err, "request rejected");
        }

        let body = serde_json::json!({ "error": err.to_string() });
        Response::builder()
            .status(status.as_u16())
            .header("Content-Type", "application/json")
            .body(body.to_string().into_bytes())
            .build()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(ApiError::AuthRequired.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::Exists("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::missing("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::missing_not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::UnknownUser("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn response_carries_json_error_body() {
        let resp: Response = ApiError::Exists("Feed already exists.".into()).into();
        assert_eq!(*resp.status(), 403);
        let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body["error"], "Feed already exists.");
    }
}
