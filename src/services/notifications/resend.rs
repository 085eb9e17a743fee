use anyhow::Context;
use async_trait::async_trait;

use super::NotificationSender;

pub struct ResendEmailSender {
    api_key: String,
    from: String,
    client: reqwest::Client,
}

impl ResendEmailSender {
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            api_key,
            from,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl NotificationSender for ResendEmailSender {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        if self.api_key.is_empty() {
            tracing::info!(to = %to, subject = %subject, "email sending disabled, skipping");
            return Ok(());
        }

        self.client
            .post("https://api.resend.com/emails")
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "from": self.from,
                "to": [to],
                "subject": subject,
                "text": body,
            }))
            .send()
            .await
            .context("failed to reach Resend")?
            .error_for_status()
            .context("Resend API returned error")?;

        Ok(())
    }
}
