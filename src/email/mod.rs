use async_trait::async_trait;
use serde::Serialize;

use crate::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("mail provider rejected the request: {0}")]
    Rejected(u16),
}

/// 事务邮件出口。注册是否算成功取决于这一步有没有发出去
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification_code(
        &self,
        email: &str,
        username: &str,
        code: &str,
    ) -> Result<(), MailError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MailAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendMailBody {
    sender: MailAddress,
    to: Vec<MailAddress>,
    subject: String,
    html_content: String,
}

/// 通过 HTTP 邮件服务商发送验证码邮件
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    sender: String,
}

impl HttpMailer {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            api_url: config.mail_api_url.clone(),
            api_key: config.mail_api_key.clone(),
            sender: config.mail_sender.clone(),
        }
    }
}

fn verification_html(username: &str, code: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; text-align: center; padding: 40px;">
  <h2>Hi {username} 👋</h2>
  <p>Thanks for signing up! Use this verification code to complete your registration:</p>
  <p style="font-size: 32px; font-weight: bold; margin: 24px 0;">{code}</p>
  <p>This code is valid for 10 minutes.</p>
  <p>If you didn't request this code, you can ignore this email safely.</p>
</div>"#
    )
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send_verification_code(
        &self,
        email: &str,
        username: &str,
        code: &str,
    ) -> Result<(), MailError> {
        let body = SendMailBody {
            sender: MailAddress {
                email: self.sender.clone(),
                name: Some("Mystery Message".into()),
            },
            to: vec![MailAddress {
                email: email.to_string(),
                name: None,
            }],
            subject: "Verify your account".into(),
            html_content: verification_html(username, code),
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("Mail provider returned {} for {}", status, email);
            return Err(MailError::Rejected(status.as_u16()));
        }

        tracing::info!("Verification code sent to {}", email);
        Ok(())
    }
}
