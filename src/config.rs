use secrecy::SecretBox;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub database_url: SecretBox<String>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    // SMTP設定（オプション - email機能有効時のみ使用）
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_username: Option<SecretBox<String>>,
    pub smtp_password: Option<SecretBox<String>>,
    #[serde(default)]
    pub smtp_from_address: Option<String>,
    /// メール送信のタイムアウト（秒）
    #[serde(default = "default_notifier_timeout_secs")]
    pub notifier_timeout_secs: u64,

    // パスワードリセット設定
    /// リセットページのURL（`?token=...` を付与して送信する）
    #[serde(default = "default_password_reset_url_base")]
    pub password_reset_url_base: String,
    #[serde(default = "default_password_reset_token_ttl_secs")]
    pub password_reset_token_ttl_secs: i64,
    /// true の場合、未登録メールアドレスでも成功レスポンスを返す
    #[serde(default)]
    pub password_reset_conceal_unknown_email: bool,
}

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_NOTIFIER_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PASSWORD_RESET_URL_BASE: &str = "http://localhost:3000/reset-password";
const DEFAULT_PASSWORD_RESET_TOKEN_TTL_SECS: i64 = 1800;

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

fn default_notifier_timeout_secs() -> u64 {
    DEFAULT_NOTIFIER_TIMEOUT_SECS
}

fn default_password_reset_url_base() -> String {
    DEFAULT_PASSWORD_RESET_URL_BASE.to_string()
}

fn default_password_reset_token_ttl_secs() -> i64 {
    DEFAULT_PASSWORD_RESET_TOKEN_TTL_SECS
}

impl Config {
    pub fn load() -> Result<Self, envy::Error> {
        envy::from_env::<Self>()?.validated()
    }

    /// 値の範囲チェック
    fn validated(self) -> Result<Self, envy::Error> {
        if self.password_reset_token_ttl_secs <= 0 {
            return Err(envy::Error::Custom(format!(
                "PASSWORD_RESET_TOKEN_TTL_SECS must be positive (got {})",
                self.password_reset_token_ttl_secs
            )));
        }
        Ok(self)
    }
}
