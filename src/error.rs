use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::validation::FieldError;

/// Error returned by every handler.
///
/// Internal details are logged when the response is built and never sent.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    #[error("{title}: {message}")]
    Unauthorized {
        title: &'static str,
        message: String,
    },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("account locked")]
    Locked,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn unauthorized(title: &'static str, message: impl Into<String>) -> Self {
        Self::Unauthorized {
            title,
            message: message.into(),
        }
    }

    /// The vague answer given for unknown emails and wrong passwords alike.
    pub fn invalid_credentials() -> Self {
        Self::unauthorized("Authentication failed", "Invalid email or password")
    }

    pub fn field(field: &str, message: &str) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Locked => StatusCode::LOCKED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    details: Vec<FieldError>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::Validation(details) => ErrorBody {
                error: "Validation failed".into(),
                message: None,
                details,
            },
            Self::Unauthorized { title, message } => ErrorBody {
                error: title.into(),
                message: Some(message),
                details: vec![],
            },
            Self::NotFound(what) => ErrorBody {
                error: format!("{what} not found"),
                message: None,
                details: vec![],
            },
            Self::Conflict(message) => ErrorBody {
                error: "Conflict".into(),
                message: Some(message),
                details: vec![],
            },
            Self::Locked => ErrorBody {
                error: "Account locked".into(),
                message: Some(
                    "Account is temporarily locked due to multiple failed login attempts".into(),
                ),
                details: vec![],
            },
            Self::Internal(e) => {
                error!(error = ?e, "internal error");
                ErrorBody {
                    error: "Internal server error".into(),
                    message: Some("Please try again.".into()),
                    details: vec![],
                }
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::field("body", &rejection.body_text())
    }
}

/// `Json` whose rejections come back as structured 400s.
#[derive(Debug, axum::extract::FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let res = err.into_response();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_lists_fields() {
        let (status, body) = body_json(AppError::Validation(vec![
            FieldError::new("email", "Please enter a valid email address"),
            FieldError::new("password", "Password must be at least 8 characters long"),
        ]))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Validation failed");
        assert_eq!(body["details"][1]["field"], "password");
    }

    #[tokio::test]
    async fn internal_hides_details() {
        let (status, body) = body_json(AppError::Internal(anyhow::anyhow!("pool timed out"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.to_string().contains("pool timed out"));
    }

    #[tokio::test]
    async fn locked_is_423() {
        let (status, body) = body_json(AppError::Locked).await;
        assert_eq!(status, StatusCode::LOCKED);
        assert_eq!(body["error"], "Account locked");
    }
}
