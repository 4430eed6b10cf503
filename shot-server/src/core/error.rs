use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use shared::ShotError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("不支持的内容类型: {0}")]
    UnsupportedMediaType(String),

    #[error("保存失败: {0}")]
    Persistence(#[from] std::io::Error),

    #[error("内部服务器错误")]
    Internal(#[from] anyhow::Error),
}

impl From<ShotError> for ServerError {
    fn from(err: ShotError) -> Self {
        ServerError::Validation(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    status: &'static str,
    error: String,
    message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            ServerError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg.clone())
            }
            ServerError::UnsupportedMediaType(_) => (
                StatusCode::BAD_REQUEST,
                "unsupported_media_type",
                self.to_string(),
            ),
            ServerError::Persistence(err) => {
                tracing::error!(error = %err, "Failed to persist shot");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "persistence_error",
                    self.to_string(),
                )
            }
            ServerError::Internal(err) => {
                // 记录内部错误但不暴露详细信息
                tracing::error!(error = ?err, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            status: "error",
            error: error_type.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

/// 处理器的 Result 类型别名
pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ServerError::Validation("bad".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::UnsupportedMediaType("text/plain".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::NotFound("x.png".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        let io = std::io::Error::other("disk full");
        assert_eq!(
            ServerError::from(io).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
