//! services/api/src/adapters/notifier.rs
//!
//! This module contains the adapter for the SMS / voice gateway used to reach a
//! user's emergency contact. It implements the `NotificationService` port.
//!
//! The gateway takes JSON bodies authenticated by an `api_key` field and expects
//! international numbers without the leading `+`.

use async_trait::async_trait;
use medvault_core::ports::{NotificationService, PortError, PortResult};
use serde::Serialize;
use tracing::{error, info};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct HttpNotificationAdapter {
    http: reqwest::Client,
    sms_url: String,
    voice_url: String,
    api_key: String,
    sender_id: String,
}

impl HttpNotificationAdapter {
    pub fn new(
        http: reqwest::Client,
        sms_url: String,
        voice_url: String,
        api_key: String,
        sender_id: String,
    ) -> Self {
        Self {
            http,
            sms_url,
            voice_url,
            api_key,
            sender_id,
        }
    }

    async fn post<T: Serialize + ?Sized>(&self, url: &str, body: &T, what: &str) -> PortResult<()> {
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| PortError::Upstream(format!("{} gateway unreachable: {}", what, e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        // Surface the provider's own explanation when it sends one.
        let detail = response.text().await.unwrap_or_default();
        error!("{} gateway rejected request ({}): {}", what, status, detail);
        Err(PortError::Upstream(format!(
            "{} delivery failed ({}): {}",
            what,
            status,
            detail.trim()
        )))
    }
}

#[derive(Serialize)]
struct SmsRequest<'a> {
    api_key: &'a str,
    to: &'a str,
    from: &'a str,
    sms: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    channel: &'static str,
}

#[derive(Serialize)]
struct VoiceRequest<'a> {
    api_key: &'a str,
    to: &'a str,
    from: &'a str,
    message: &'a str,
}

fn gateway_number(to: &str) -> &str {
    to.trim_start_matches('+')
}

//=========================================================================================
// `NotificationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl NotificationService for HttpNotificationAdapter {
    async fn send_sms(&self, to: &str, message: &str) -> PortResult<()> {
        let body = SmsRequest {
            api_key: &self.api_key,
            to: gateway_number(to),
            from: &self.sender_id,
            sms: message,
            kind: "plain",
            channel: "generic",
        };
        self.post(&self.sms_url, &body, "SMS").await?;
        info!("Emergency SMS sent to {}", to);
        Ok(())
    }

    async fn place_voice_call(&self, to: &str, message: &str) -> PortResult<()> {
        let body = VoiceRequest {
            api_key: &self.api_key,
            to: gateway_number(to),
            from: &self.sender_id,
            message,
        };
        self.post(&self.voice_url, &body, "Voice call").await?;
        info!("Emergency voice call placed to {}", to);
        Ok(())
    }
}
