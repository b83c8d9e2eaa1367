//! Voice notification
//!
//! Places one phone call through the telephony REST API. The call speaks a
//! fixed message naming the site, three times.

use std::time::Duration;

use async_trait::async_trait;

use crate::constants::TELEPHONY_API_BASE;
use crate::logic::errors::NotifierError;

#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn notify(&self) -> Result<(), NotifierError>;
}

/// Telephony account and numbers; any `None` means not configured
#[derive(Debug, Clone, Default)]
pub struct VoiceCallConfig {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub from_number: Option<String>,
    pub to_number: Option<String>,
    pub site_id: String,
    pub api_base: Option<String>,
}

impl VoiceCallConfig {
    pub fn is_complete(&self) -> bool {
        self.missing().is_none()
    }

    /// First missing setting, by env var name
    pub fn missing(&self) -> Option<&'static str> {
        if self.account_sid.is_none() {
            Some("TWILIO_ACCOUNT_SID")
        } else if self.auth_token.is_none() {
            Some("TWILIO_AUTH_TOKEN")
        } else if self.from_number.is_none() {
            Some("TWILIO_PHONE_NUMBER")
        } else if self.to_number.is_none() {
            Some("FIRESENTINEL_ALERT_PHONE")
        } else {
            None
        }
    }
}

pub fn alert_message(site_id: &str) -> String {
    format!(
        "Alert! A fire has been detected by sensor {}. Please take immediate action.",
        site_id
    )
}

fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Spoken-message instructions for the call
pub fn twiml(site_id: &str) -> String {
    format!(
        "<Response><Say voice=\"woman\" loop=\"3\">{}</Say></Response>",
        xml_escape(&alert_message(site_id))
    )
}

pub struct VoiceCallNotifier {
    config: VoiceCallConfig,
    http_client: reqwest::Client,
}

impl VoiceCallNotifier {
    pub fn new(config: VoiceCallConfig, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Failed to build telephony HTTP client ({}), using defaults", e);
                reqwest::Client::new()
            });

        Self { config, http_client }
    }
}

#[async_trait]
impl Notifier for VoiceCallNotifier {
    fn name(&self) -> &str {
        "voice-call"
    }

    async fn notify(&self) -> Result<(), NotifierError> {
        let c = &self.config;
        let (sid, token, from, to) = match (&c.account_sid, &c.auth_token, &c.from_number, &c.to_number) {
            (Some(sid), Some(token), Some(from), Some(to)) => (sid, token, from, to),
            _ => {
                return Err(NotifierError::NotConfigured(
                    c.missing().unwrap_or("credentials").to_string(),
                ))
            }
        };

        let base = c.api_base.as_deref().unwrap_or(TELEPHONY_API_BASE);
        let url = format!("{}/Accounts/{}/Calls.json", base.trim_end_matches('/'), sid);
        let twiml = twiml(&c.site_id);

        log::info!("Placing alert call to {} for site {}", to, c.site_id);

        let response = self
            .http_client
            .post(&url)
            .basic_auth(sid, Some(token))
            .form(&[("To", to.as_str()), ("From", from.as_str()), ("Twiml", twiml.as_str())])
            .send()
            .await
            .map_err(|e| NotifierError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifierError::Http {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        log::info!("Alert call placed (HTTP {})", status.as_u16());
        Ok(())
    }
}
