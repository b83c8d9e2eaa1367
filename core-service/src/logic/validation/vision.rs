//! External stage - hosted vision-language validator
//!
//! Sends the image with a fixed expert prompt (temperature 0) to a
//! Messages-style API and reduces the reply to YES / NO. A missing API
//! key disables the stage; transport and HTTP failures make it Unavailable.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::{json, Value};

use super::answer::{parse_answer, ValidatorAnswer};
use super::types::{StageKind, StageVerdict, UnavailableReason};
use super::ValidationStage;
use crate::constants::{VLM_API_URL, VLM_API_VERSION, VLM_MAX_TOKENS};
use crate::logic::errors::ValidationStageError;

pub const SYSTEM_PROMPT: &str = "You are a fire detection expert. Your job is to analyze images and determine if there are fires or potential fires present. Respond only with YES or NO.";

pub const USER_PROMPT: &str = "Here is an image taken out in the wild. Do you detect any fires or potential fires or wildfires in this image? Reply with a YES or NO.";

#[derive(Debug, Clone)]
pub struct VisionValidatorConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_url: String,
    pub timeout: Duration,
    pub enabled: bool,
}

impl VisionValidatorConfig {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            api_key,
            model: model.into(),
            api_url: VLM_API_URL.to_string(),
            timeout: Duration::from_secs(crate::constants::VALIDATOR_TIMEOUT_SECS),
            enabled: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

pub struct VisionValidatorStage {
    config: VisionValidatorConfig,
    http_client: reqwest::Client,
}

impl VisionValidatorStage {
    pub fn new(config: VisionValidatorConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Failed to build validator HTTP client ({}), using defaults", e);
                reqwest::Client::new()
            });

        Self { config, http_client }
    }
}

/// JPEG unless the bytes carry the PNG signature
pub fn media_type(image: &[u8]) -> &'static str {
    if image.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else {
        "image/jpeg"
    }
}

pub fn build_request(model: &str, image: &[u8]) -> Value {
    json!({
        "model": model,
        "max_tokens": VLM_MAX_TOKENS,
        "temperature": 0,
        "system": SYSTEM_PROMPT,
        "messages": [{
            "role": "user",
            "content": [
                { "type": "text", "text": USER_PROMPT },
                {
                    "type": "image",
                    "source": {
                        "type": "base64",
                        "media_type": media_type(image),
                        "data": STANDARD.encode(image),
                    }
                }
            ]
        }]
    })
}

/// Concatenated text blocks of a Messages response
pub fn response_text(body: &str) -> Result<String, ValidationStageError> {
    let parsed: MessagesResponse =
        serde_json::from_str(body).map_err(|e| ValidationStageError::Response(e.to_string()))?;

    let text = parsed
        .content
        .into_iter()
        .filter(|b| b.kind == "text")
        .filter_map(|b| b.text)
        .collect::<Vec<_>>()
        .join("\n");

    Ok(text)
}

pub fn verdict_for(answer: ValidatorAnswer) -> StageVerdict {
    match answer {
        ValidatorAnswer::Yes => StageVerdict::Fire { confidence: 1.0 },
        ValidatorAnswer::No => StageVerdict::NoFire { confidence: 1.0 },
        ValidatorAnswer::Unparseable(raw) => StageVerdict::unavailable(UnavailableReason::Unparseable(raw)),
    }
}

#[async_trait]
impl ValidationStage for VisionValidatorStage {
    fn name(&self) -> &str {
        "vision-validator"
    }

    fn kind(&self) -> StageKind {
        StageKind::External
    }

    fn enabled(&self) -> bool {
        self.config.enabled && self.config.api_key.is_some()
    }

    async fn evaluate(&self, image: &[u8]) -> Result<StageVerdict, ValidationStageError> {
        let api_key = match &self.config.api_key {
            Some(key) => key,
            None => return Ok(StageVerdict::unavailable(UnavailableReason::Disabled)),
        };

        log::info!("Asking {} ({}) to validate image", self.config.model, self.config.api_url);

        let response = self
            .http_client
            .post(&self.config.api_url)
            .header("x-api-key", api_key)
            .header("anthropic-version", VLM_API_VERSION)
            .json(&build_request(&self.config.model, image))
            .send()
            .await
            .map_err(|e| ValidationStageError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ValidationStageError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(ValidationStageError::Http {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let text = response_text(&body)?;
        log::info!("Validator response: {}", text.trim());

        Ok(verdict_for(parse_answer(&text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let body = build_request("claude-3-opus-20240229", &[0xFF, 0xD8, 0xFF]);
        assert_eq!(body["temperature"], 0);
        assert_eq!(body["max_tokens"], 1024);
        assert_eq!(body["system"], SYSTEM_PROMPT);
        let content = &body["messages"][0]["content"];
        assert_eq!(content[0]["text"], USER_PROMPT);
        assert_eq!(content[1]["source"]["media_type"], "image/jpeg");
        assert_eq!(content[1]["source"]["data"], "/9j/");
    }

    #[test]
    fn test_png_media_type() {
        assert_eq!(media_type(&[0x89, b'P', b'N', b'G', 0x0D]), "image/png");
    }

    #[test]
    fn test_response_text() {
        let text = response_text(r#"{"content":[{"type":"text","text":"NO"}],"role":"assistant"}"#).unwrap();
        assert_eq!(text, "NO");
        assert!(response_text("<html>").is_err());
    }

    #[test]
    fn test_unparseable_maps_to_unavailable() {
        assert_eq!(
            verdict_for(ValidatorAnswer::Unparseable("maybe".to_string())),
            StageVerdict::Unavailable {
                reason: UnavailableReason::Unparseable("maybe".to_string())
            }
        );
    }

    #[test]
    fn test_missing_key_disables_stage() {
        let stage = VisionValidatorStage::new(VisionValidatorConfig::new(None, "m"));
        assert!(!stage.enabled());
    }
}
