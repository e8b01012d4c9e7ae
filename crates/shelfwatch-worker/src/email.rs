//! The outbound notification sink.
//!
//! Transport and templating live in an external service; this worker only
//! POSTs notification events to a configured webhook. With no webhook
//! configured the sink reports itself unusable and delivery stays pending.

use std::time::Duration;

use shelfwatch_core::AppConfig;
use shelfwatch_db::NotificationRow;

/// Where delivered notifications go.
pub enum EmailSink {
    Webhook { client: reqwest::Client, url: String },
    Disabled,
}

impl EmailSink {
    /// Build the sink from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_app_config(config: &AppConfig) -> anyhow::Result<Self> {
        match &config.email_webhook_url {
            Some(url) => {
                let client = reqwest::Client::builder()
                    .timeout(Duration::from_secs(10))
                    .build()?;
                Ok(Self::Webhook {
                    client,
                    url: url.clone(),
                })
            }
            None => Ok(Self::Disabled),
        }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        matches!(self, Self::Webhook { .. })
    }

    /// Ship one notification. A non-2xx response or transport failure is an
    /// error; the caller leaves the row unsent so the next sweep retries.
    ///
    /// # Errors
    ///
    /// Returns an error when the sink is disabled, the request fails, or
    /// the webhook answers with a non-success status.
    pub async fn send(
        &self,
        notification: &NotificationRow,
        product_name: &str,
        product_url: &str,
    ) -> anyhow::Result<()> {
        let Self::Webhook { client, url } = self else {
            anyhow::bail!("email delivery is not configured (EMAIL_WEBHOOK_URL unset)");
        };

        let payload = serde_json::json!({
            "user_id": notification.user_id,
            "notification_id": notification.id,
            "type": notification.notification_type,
            "message": notification.message,
            "product_id": notification.product_id,
            "product_name": product_name,
            "product_url": product_url,
            "variant_id": notification.variant_id,
            "old_price": notification.old_price,
            "new_price": notification.new_price,
            "old_status": notification.old_status,
            "new_status": notification.new_status,
            "created_at": notification.created_at,
        });

        let response = client.post(url).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("email webhook answered {status}");
        }
        Ok(())
    }
}
