use axum::{
    Json,
    body::Bytes,
    extract::{Query, State, rejection::QueryRejection},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::AppError;
use crate::repositories::AccountRepository;
use crate::services::{Notifier, PasswordHasher, PasswordResetService};
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 8;

/// パラメータはJSONボディまたはクエリ文字列で受け付ける（ボディ優先）
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|_| AppError::Validation("Malformed request body".to_string()))
}

/// クエリ文字列の抽出失敗もJSONエラーレスポンスで返す
fn parse_query<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    match query {
        Ok(Query(query)) => Ok(query),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "クエリ文字列の解析失敗");
            Err(AppError::Validation("Malformed query string".to_string()))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

// === リセットリクエスト ===

#[derive(Debug, Default, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: Option<String>,
}

/// POST /api/forgot-password
pub async fn forgot_password(
    State(state): State<AppState>,
    query: Result<Query<ForgotPasswordRequest>, QueryRejection>,
    body: Bytes,
) -> Result<Json<MessageResponse>, AppError> {
    let request = forgot_password_params(query, &body)?;

    // バリデーション
    let email = validate_email(request.email.as_deref())?;

    request_reset_link(
        &state.password_reset,
        email,
        state.config.password_reset_conceal_unknown_email,
    )
    .await
}

/// リセットリンク送信
///
/// `conceal_unknown_email` が true の場合、未登録アドレスでも成功レスポンスを返す
async fn request_reset_link<R, N, H>(
    service: &PasswordResetService<R, N, H>,
    email: &str,
    conceal_unknown_email: bool,
) -> Result<Json<MessageResponse>, AppError>
where
    R: AccountRepository + Clone,
    N: Notifier,
    H: PasswordHasher,
{
    match service.request_reset(email).await {
        Ok(()) => {}
        Err(AppError::AccountNotFound) if conceal_unknown_email => {}
        Err(e) => return Err(e),
    }

    Ok(MessageResponse::new("Password reset link sent to email"))
}

fn forgot_password_params(
    query: Result<Query<ForgotPasswordRequest>, QueryRejection>,
    body: &Bytes,
) -> Result<ForgotPasswordRequest, AppError> {
    let query = parse_query(query)?;
    let request: ForgotPasswordRequest = parse_body(body)?;
    Ok(ForgotPasswordRequest {
        email: request.email.or(query.email),
    })
}

// === パスワードリセット実行 ===

#[derive(Debug, Default, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default, alias = "new_password")]
    pub password: Option<String>,
}

/// POST /api/reset-password
///
/// # Security
/// - token, password はログに出力しない
pub async fn reset_password(
    State(state): State<AppState>,
    query: Result<Query<ResetPasswordRequest>, QueryRejection>,
    body: Bytes,
) -> Result<Json<MessageResponse>, AppError> {
    let request = reset_password_params(query, &body)?;

    // バリデーション
    let (token, password) = validate_reset_password_request(&request)?;

    confirm_reset(&state.password_reset, token, password).await
}

async fn confirm_reset<R, N, H>(
    service: &PasswordResetService<R, N, H>,
    token: &str,
    password: &str,
) -> Result<Json<MessageResponse>, AppError>
where
    R: AccountRepository + Clone,
    N: Notifier,
    H: PasswordHasher,
{
    service.confirm_reset(token, password).await?;

    Ok(MessageResponse::new("Password changed successfully"))
}

fn reset_password_params(
    query: Result<Query<ResetPasswordRequest>, QueryRejection>,
    body: &Bytes,
) -> Result<ResetPasswordRequest, AppError> {
    let query = parse_query(query)?;
    let request: ResetPasswordRequest = parse_body(body)?;
    Ok(ResetPasswordRequest {
        token: request.token.or(query.token),
        password: request.password.or(query.password),
    })
}

/// メールアドレスのバリデーション
fn validate_email(email: Option<&str>) -> Result<&str, AppError> {
    match email.map(str::trim) {
        Some(email) if !email.is_empty() && email.contains('@') => Ok(email),
        _ => Err(AppError::Validation("Invalid email".to_string())),
    }
}

/// リセットパスワードリクエストのバリデーション
fn validate_reset_password_request(
    request: &ResetPasswordRequest,
) -> Result<(&str, &str), AppError> {
    let token = match request.token.as_deref().map(str::trim) {
        Some(token) if !token.is_empty() => token,
        _ => return Err(AppError::Validation("Token is required".to_string())),
    };
    let password = match request.password.as_deref() {
        Some(password) if password.chars().count() >= MIN_PASSWORD_LEN => password,
        _ => {
            return Err(AppError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
    };
    Ok((token, password))
}
