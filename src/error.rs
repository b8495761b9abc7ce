use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// トークン状態エラー共通のメッセージ（期限切れ・使用済み・不明を区別しない）
const INVALID_LINK_MESSAGE: &str = "Link invalid or expired";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    #[error("アカウントが見つかりません")]
    AccountNotFound,

    #[error("トークンが見つかりません")]
    TokenNotFound,

    #[error("トークンの有効期限切れ")]
    TokenExpired,

    #[error("トークンは使用済みです")]
    TokenAlreadyConsumed,

    #[error("メール送信に失敗しました")]
    NotificationFailed,

    #[error("データベースエラー")]
    PersistenceFailure(#[from] sqlx::Error),

    #[error("内部エラー")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::AccountNotFound => (StatusCode::BAD_REQUEST, "Invalid email".to_string()),
            // 存在有無・失敗理由の漏洩防止
            Self::TokenNotFound | Self::TokenExpired | Self::TokenAlreadyConsumed => {
                tracing::warn!(reason = %self, "無効なリセットトークン");
                (StatusCode::BAD_REQUEST, INVALID_LINK_MESSAGE.to_string())
            }
            Self::NotificationFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to send email".to_string(),
            ),
            Self::PersistenceFailure(e) => {
                tracing::error!(error = ?e, "データベースエラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            Self::Internal(e) => {
                tracing::error!(error = ?e, "内部エラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
