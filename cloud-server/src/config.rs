//! Configuration module

use std::env;
use std::path::PathBuf;

use firesentinel_core::constants;
use firesentinel_core::logic::config::{parse_flag, ConfigError};
use firesentinel_core::logic::dispatch::VoiceCallConfig;
use firesentinel_core::logic::validation::{FailPolicy, VisionValidatorConfig};

/// Default artifact directory
pub const DEFAULT_SAVE_DIR: &str = "received_alerts";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Where received images and their sidecars are written
    pub save_dir: PathBuf,

    /// External validator (API key may be missing: stage then reports Disabled)
    pub vision: VisionValidatorConfig,

    /// Voice alert account and numbers
    pub voice: VoiceCallConfig,

    /// Only a confirmed YES places a call at this tier
    pub fail_policy: FailPolicy,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut vision = VisionValidatorConfig::new(constants::get_vlm_api_key(), constants::get_vlm_model());
        vision.enabled = parse_flag(
            "FIRESENTINEL_VLM_STAGE_ENABLED",
            constants::get_vlm_stage_enabled().as_deref(),
            true,
        )?;

        Ok(Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(constants::DEFAULT_SERVER_PORT),

            save_dir: env::var("FIRESENTINEL_SAVE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_SAVE_DIR)),

            vision,

            voice: VoiceCallConfig {
                account_sid: constants::get_twilio_account_sid(),
                auth_token: constants::get_twilio_auth_token(),
                from_number: constants::get_twilio_phone_number(),
                to_number: constants::get_alert_phone(),
                site_id: constants::get_site_id(),
                api_base: None,
            },

            fail_policy: FailPolicy::Closed,
        })
    }

    /// Settings that are missing for the full validate-and-call path
    pub fn missing_settings(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.vision.api_key.is_none() {
            missing.push("ANTHROPIC_API_KEY");
        }
        if let Some(var) = self.voice.missing() {
            missing.push(var);
        }
        missing
    }
}
