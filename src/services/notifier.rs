use crate::config::Config;

#[cfg(feature = "email")]
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
#[cfg(feature = "email")]
use secrecy::ExposeSecret;

#[cfg(feature = "email")]
const RESET_EMAIL_SUBJECT: &str = "Password Reset";

#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("無効なメールアドレス: {0}")]
    InvalidAddress(String),

    #[error("送信タイムアウト")]
    Timeout,

    #[cfg(feature = "email")]
    #[error("SMTPエラー: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[cfg(feature = "email")]
    #[error("メッセージ構築エラー: {0}")]
    MessageBuild(#[from] lettre::error::Error),
}

/// リセットリンクの送信先
#[trait_variant::make(Notifier: Send)]
pub trait LocalNotifier {
    async fn send(&self, reset_url: &str, recipient: &str) -> Result<(), NotifierError>;
}

/// メール送信サービス
///
/// SMTP未設定（または email 機能無効）の場合は送信をスキップしてログのみ出力する。
#[derive(Clone)]
pub enum EmailNotifier {
    LogOnly,
    #[cfg(feature = "email")]
    Smtp(SmtpMailer),
}

impl EmailNotifier {
    pub fn from_config(config: &Config) -> Result<Self, NotifierError> {
        #[cfg(feature = "email")]
        if let (Some(host), Some(from)) = (&config.smtp_host, &config.smtp_from_address) {
            tracing::info!(smtp_host = %host, smtp_port = config.smtp_port, "SMTP送信を有効化");
            return Ok(Self::Smtp(SmtpMailer::new(config, host, from)?));
        }

        #[cfg(not(feature = "email"))]
        if config.smtp_host.is_some() {
            tracing::warn!("SMTP設定がありますが email 機能が無効です（ログ出力のみ）");
        }

        Ok(Self::LogOnly)
    }
}

impl Notifier for EmailNotifier {
    async fn send(&self, reset_url: &str, recipient: &str) -> Result<(), NotifierError> {
        if !recipient.contains('@') {
            return Err(NotifierError::InvalidAddress(recipient.to_string()));
        }

        match self {
            Self::LogOnly => {
                tracing::warn!(
                    to = %recipient,
                    page = %redact_token(reset_url),
                    "パスワードリセットメール送信スキップ（SMTP未設定）"
                );
                Ok(())
            }
            #[cfg(feature = "email")]
            Self::Smtp(mailer) => mailer.send(reset_url, recipient).await,
        }
    }
}

/// クエリ（トークン）を除いたURL
fn redact_token(reset_url: &str) -> &str {
    reset_url.split('?').next().unwrap_or_default()
}

/// lettre による SMTP 送信
#[cfg(feature = "email")]
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

#[cfg(feature = "email")]
impl SmtpMailer {
    fn new(config: &Config, host: &str, from: &str) -> Result<Self, NotifierError> {
        let from: Mailbox = from
            .parse()
            .map_err(|_| NotifierError::InvalidAddress(from.to_string()))?;

        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?.port(config.smtp_port);

        if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(
                username.expose_secret().clone(),
                password.expose_secret().clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    async fn send(&self, reset_url: &str, recipient: &str) -> Result<(), NotifierError> {
        let to: Mailbox = recipient
            .parse()
            .map_err(|_| NotifierError::InvalidAddress(recipient.to_string()))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(RESET_EMAIL_SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(reset_email_body(reset_url))?;

        self.transport.send(message).await?;

        tracing::info!(to = %recipient, "パスワードリセットメール送信完了");
        Ok(())
    }
}

/// メール本文
#[cfg(feature = "email")]
fn reset_email_body(reset_url: &str) -> String {
    format!(
        "Hello,\n\n\
         You have requested to reset your password.\n\
         Open the link below to change your password:\n\n\
         {reset_url}\n\n\
         If you did not request this, you can ignore this email.\n"
    )
}
