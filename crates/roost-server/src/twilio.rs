//! Twilio REST transport
//!
//! Texts go to `Messages.json`, calls to `Calls.json`, both as form posts with
//! basic auth. Failures surface as delivery errors and are never retried here.

use async_trait::async_trait;
use roost_core::config::TwilioConfig;
use roost_core::{Person, Result, RoostError};
use roost_engine::{CallbackUrls, MessageTransport, VoiceTransport};
use serde::Deserialize;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct CreatedResource {
    sid: String,
}

/// Sends texts and places calls through the Twilio API
#[derive(Debug, Clone)]
pub struct TwilioClient {
    http: reqwest::Client,
    config: TwilioConfig,
}

impl TwilioClient {
    pub fn new(config: TwilioConfig) -> Result<Self> {
        if config.account_sid.is_empty() || config.auth_token.is_empty() {
            return Err(RoostError::Config(
                "twilio.account_sid and twilio.auth_token must be set".to_string(),
            ));
        }
        if config.phone.is_empty() {
            return Err(RoostError::Config("twilio.phone must be set".to_string()));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            config,
        })
    }

    fn endpoint(&self, resource: &str) -> String {
        format!(
            "{}/Accounts/{}/{}.json",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_sid,
            resource
        )
    }

    async fn create(&self, resource: &str, form: &[(&str, &str)]) -> Result<String> {
        let response = self
            .http
            .post(self.endpoint(resource))
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(form)
            .send()
            .await
            .map_err(|e| RoostError::Delivery(format!("Failed to reach Twilio: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown".to_string());
            return Err(RoostError::Delivery(format!(
                "Twilio error {}: {}",
                status, error_text
            )));
        }

        let created: CreatedResource = response
            .json()
            .await
            .map_err(|e| RoostError::Delivery(format!("Failed to parse Twilio response: {}", e)))?;
        Ok(created.sid)
    }
}

/// Form fields for an outbound text
pub fn message_form<'a>(
    from: &'a str,
    to: &'a str,
    body: &'a str,
    media: &'a [String],
) -> Vec<(&'static str, &'a str)> {
    let mut form = vec![("From", from), ("To", to), ("Body", body)];
    form.extend(media.iter().map(|url| ("MediaUrl", url.as_str())));
    form
}

/// Form fields for an outbound call
pub fn call_form<'a>(
    from: &'a str,
    to: &'a str,
    callbacks: &'a CallbackUrls,
) -> Vec<(&'static str, &'a str)> {
    vec![
        ("From", from),
        ("To", to),
        ("Url", callbacks.prompt.as_str()),
        ("StatusCallback", callbacks.status.as_str()),
    ]
}

#[async_trait]
impl MessageTransport for TwilioClient {
    async fn send(&self, to: &Person, body: &str, media: &[String]) -> Result<()> {
        let form = message_form(&self.config.phone, &to.phone, body, media);
        let sid = self.create("Messages", &form).await?;
        debug!("Message {} queued for {}", sid, to.name);
        Ok(())
    }
}

#[async_trait]
impl VoiceTransport for TwilioClient {
    async fn initiate_call(&self, to: &Person, callbacks: &CallbackUrls) -> Result<String> {
        let form = call_form(&self.config.phone, &to.phone, callbacks);
        let sid = self.create("Calls", &form).await?;
        info!("Call {} placed to {}", sid, to.name);
        Ok(sid)
    }
}
