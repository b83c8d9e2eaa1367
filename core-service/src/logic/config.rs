//! Agent Configuration
//!
//! Reads every runtime option once at startup (env vars with defaults from
//! `constants.rs`), validates it, and builds the pipeline collaborators.
//! Invalid values are rejected here so the monitor never runs half-configured.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::constants::{self, CAMERA_WARMUP_MS, CAPTURE_TIMEOUT_MS, DISPATCH_TIMEOUT_SECS, SENSOR_COMMAND_TIMEOUT_MS};
use crate::logic::capture::{CaptureProvider, DisabledCapture, FileCapture, StillCommandCamera};
use crate::logic::dispatch::{Dispatcher, HttpTransport, Notifier, VoiceCallConfig, VoiceCallNotifier};
use crate::logic::errors::SensorReadError;
use crate::logic::model::{BundleSource, FireCutoff, FireModel};
use crate::logic::sensors::{CommandSource, ReadingSource, ReplaySource};
use crate::logic::validation::{
    EdgeModelStage, FailPolicy, ValidationCascade, VisionValidatorConfig, VisionValidatorStage,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("FIRESENTINEL_THRESHOLD must be an integer >= 1, got '{0}'")]
    Threshold(String),

    #[error("FIRE_THRESHOLD must be a number in [0, 1], got '{0}'")]
    FireCutoff(String),

    #[error("{key} must be true/false, 1/0, yes/no or on/off, got '{value}'")]
    Flag { key: &'static str, value: String },

    #[error("FIRESENTINEL_CAPTURE_MODE must be camera, file or disabled, got '{0}'")]
    CaptureMode(String),

    #[error("capture mode 'file' needs FIRESENTINEL_CAPTURE_FILE")]
    MissingCaptureFile,

    #[error("capture command is empty")]
    EmptyCaptureCommand,

    #[error("no reading source: set FIRESENTINEL_SENSOR_COMMAND or FIRESENTINEL_REPLAY_FILE")]
    NoReadingSource,

    #[error("sensor command is empty")]
    EmptySensorCommand,

    #[error("cannot open replay file: {0}")]
    Replay(#[from] SensorReadError),
}

// ============================================================================
// VALUE PARSING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    Camera,
    File,
    Disabled,
}

impl CaptureMode {
    pub fn parse(raw: Option<&str>) -> Result<Self, ConfigError> {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            None | Some("") | Some("camera") => Ok(CaptureMode::Camera),
            Some("file") => Ok(CaptureMode::File),
            Some("disabled") | Some("none") | Some("off") => Ok(CaptureMode::Disabled),
            Some(other) => Err(ConfigError::CaptureMode(other.to_string())),
        }
    }
}

pub fn parse_threshold(raw: Option<&str>) -> Result<u32, ConfigError> {
    match raw {
        None => Ok(constants::DEFAULT_ABNORMAL_THRESHOLD),
        Some(s) => match s.trim().parse::<u32>() {
            Ok(n) if n >= 1 => Ok(n),
            _ => Err(ConfigError::Threshold(s.to_string())),
        },
    }
}

/// Strict on/off switch; unset means `default`, anything unrecognised is an error
pub fn parse_flag(key: &'static str, raw: Option<&str>, default: bool) -> Result<bool, ConfigError> {
    match raw.map(|s| s.trim().to_lowercase()).as_deref() {
        None => Ok(default),
        Some("true") | Some("1") | Some("yes") | Some("on") => Ok(true),
        Some("false") | Some("0") | Some("no") | Some("off") => Ok(false),
        Some(_) => Err(ConfigError::Flag {
            key,
            value: raw.unwrap_or_default().to_string(),
        }),
    }
}

pub fn parse_fail_policy(raw: Option<&str>) -> Result<FailPolicy, ConfigError> {
    parse_flag("FIRESENTINEL_FAIL_OPEN", raw, true).map(FailPolicy::from_flag)
}

pub fn parse_cutoff(raw: Option<&str>) -> Result<FireCutoff, ConfigError> {
    match raw {
        None => Ok(FireCutoff::default()),
        Some(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(FireCutoff::new)
            .ok_or_else(|| ConfigError::FireCutoff(s.to_string())),
    }
}

// ============================================================================
// AGENT CONFIG
// ============================================================================

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub collector_url: String,
    pub threshold: u32,
    pub fire_cutoff: FireCutoff,
    pub fire_model_path: PathBuf,
    pub model_dir: PathBuf,
    pub model_sha256: Option<String>,
    pub sample_interval: Duration,
    pub sensor_command: Option<String>,
    pub replay_file: Option<PathBuf>,
    pub capture_mode: CaptureMode,
    pub capture_command: String,
    pub capture_file: Option<PathBuf>,
    pub capture_dir: PathBuf,
    pub edge_stage_enabled: bool,
    pub vlm_stage_enabled: bool,
    pub fail_policy: FailPolicy,
    pub site_id: String,
    pub vlm_api_key: Option<String>,
    pub vlm_model: String,
    pub voice: VoiceCallConfig,
}

impl AgentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let capture_mode = CaptureMode::parse(constants::get_capture_mode().as_deref())?;
        let capture_file = constants::get_capture_file().map(PathBuf::from);
        if capture_mode == CaptureMode::File && capture_file.is_none() {
            return Err(ConfigError::MissingCaptureFile);
        }

        let site_id = constants::get_site_id();

        Ok(Self {
            collector_url: constants::get_collector_url(),
            threshold: parse_threshold(constants::get_abnormal_threshold().as_deref())?,
            fire_cutoff: parse_cutoff(constants::get_fire_cutoff().as_deref())?,
            fire_model_path: PathBuf::from(constants::get_fire_model_path()),
            model_dir: PathBuf::from(constants::get_model_dir()),
            model_sha256: constants::get_model_sha256(),
            sample_interval: Duration::from_millis(constants::get_sample_interval_ms()),
            sensor_command: constants::get_sensor_command(),
            replay_file: constants::get_replay_file().map(PathBuf::from),
            capture_mode,
            capture_command: constants::get_capture_command(),
            capture_file,
            capture_dir: PathBuf::from(constants::get_capture_dir()),
            edge_stage_enabled: parse_flag(
                "FIRESENTINEL_EDGE_STAGE_ENABLED",
                constants::get_edge_stage_enabled().as_deref(),
                true,
            )?,
            vlm_stage_enabled: parse_flag(
                "FIRESENTINEL_VLM_STAGE_ENABLED",
                constants::get_vlm_stage_enabled().as_deref(),
                true,
            )?,
            fail_policy: parse_fail_policy(constants::get_fail_open().as_deref())?,
            site_id: site_id.clone(),
            vlm_api_key: constants::get_vlm_api_key(),
            vlm_model: constants::get_vlm_model(),
            voice: VoiceCallConfig {
                account_sid: constants::get_twilio_account_sid(),
                auth_token: constants::get_twilio_auth_token(),
                from_number: constants::get_twilio_phone_number(),
                to_number: constants::get_alert_phone(),
                site_id,
                api_base: None,
            },
        })
    }

    pub fn bundle_source(&self) -> BundleSource {
        BundleSource::new(&self.model_dir).with_checksum(self.model_sha256.clone())
    }

    /// Replay file wins over the sampler command
    pub fn build_source(&self) -> Result<Box<dyn ReadingSource>, ConfigError> {
        if let Some(path) = &self.replay_file {
            return Ok(Box::new(ReplaySource::open(path, false)?));
        }

        match &self.sensor_command {
            Some(cmd) => CommandSource::new(cmd, Duration::from_millis(SENSOR_COMMAND_TIMEOUT_MS))
                .map(|s| Box::new(s) as Box<dyn ReadingSource>)
                .ok_or(ConfigError::EmptySensorCommand),
            None => Err(ConfigError::NoReadingSource),
        }
    }

    pub fn build_capture(&self) -> Result<Arc<dyn CaptureProvider>, ConfigError> {
        match self.capture_mode {
            CaptureMode::Camera => {
                if let Err(e) = std::fs::create_dir_all(&self.capture_dir) {
                    log::warn!("Cannot create capture dir {}: {}", self.capture_dir.display(), e);
                }
                let camera = StillCommandCamera::new(
                    &self.capture_command,
                    &self.capture_dir,
                    Duration::from_millis(CAMERA_WARMUP_MS),
                    Duration::from_millis(CAPTURE_TIMEOUT_MS),
                )
                .ok_or(ConfigError::EmptyCaptureCommand)?;
                Ok(Arc::new(camera))
            }
            CaptureMode::File => {
                let path = self.capture_file.as_ref().ok_or(ConfigError::MissingCaptureFile)?;
                Ok(Arc::new(FileCapture::new(path)))
            }
            CaptureMode::Disabled => Ok(Arc::new(DisabledCapture)),
        }
    }

    /// Edge stage first, then the external validator. A missing fire model
    /// leaves the edge stage in place but always Unavailable.
    pub fn build_cascade(&self) -> ValidationCascade {
        let edge = if self.edge_stage_enabled {
            match FireModel::load(&self.fire_model_path) {
                Ok(model) => EdgeModelStage::new(model, self.fire_cutoff),
                Err(e) => {
                    log::warn!("Edge fire model unavailable: {}", e);
                    EdgeModelStage::without_model(self.fire_cutoff)
                }
            }
        } else {
            EdgeModelStage::without_model(self.fire_cutoff).with_enabled(false)
        };

        ValidationCascade::new(self.fail_policy)
            .with_stage(Arc::new(edge))
            .with_stage(Arc::new(VisionValidatorStage::new(self.vision_config())))
    }

    pub fn vision_config(&self) -> VisionValidatorConfig {
        let mut config = VisionValidatorConfig::new(self.vlm_api_key.clone(), self.vlm_model.clone());
        config.enabled = self.vlm_stage_enabled;
        config
    }

    pub fn build_notifier(&self) -> Option<Arc<dyn Notifier>> {
        if !self.voice.is_complete() {
            log::warn!(
                "Voice alerts disabled (missing {})",
                self.voice.missing().unwrap_or("configuration")
            );
            return None;
        }
        Some(Arc::new(VoiceCallNotifier::new(
            self.voice.clone(),
            Duration::from_secs(DISPATCH_TIMEOUT_SECS),
        )))
    }

    pub fn build_dispatcher(&self) -> Dispatcher {
        let transport = HttpTransport::new(&self.collector_url, Duration::from_secs(DISPATCH_TIMEOUT_SECS));
        Dispatcher::new(Arc::new(transport)).with_notifier(self.build_notifier())
    }

    pub fn log_summary(&self) {
        log::info!("Collector: {}", self.collector_url);
        log::info!(
            "Threshold: {} consecutive abnormal readings, sampling every {} ms",
            self.threshold,
            self.sample_interval.as_millis()
        );
        log::info!(
            "Cascade: edge={} (cutoff {}), vlm={} (key {}), fail policy {:?}",
            self.edge_stage_enabled,
            self.fire_cutoff.value(),
            self.vlm_stage_enabled,
            if self.vlm_api_key.is_some() { "set" } else { "missing" },
            self.fail_policy
        );
        log::info!("Capture: {:?}, site id: {}", self.capture_mode, self.site_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_defaults_and_rejects_zero() {
        assert_eq!(parse_threshold(None).unwrap(), 10);
        assert_eq!(parse_threshold(Some(" 3 ")).unwrap(), 3);
        assert!(matches!(parse_threshold(Some("0")), Err(ConfigError::Threshold(_))));
        assert!(matches!(parse_threshold(Some("-2")), Err(ConfigError::Threshold(_))));
        assert!(matches!(parse_threshold(Some("ten")), Err(ConfigError::Threshold(_))));
    }

    #[test]
    fn test_cutoff_range() {
        assert_eq!(parse_cutoff(None).unwrap().value(), 0.5);
        assert_eq!(parse_cutoff(Some("0.8")).unwrap().value(), 0.8);
        assert_eq!(parse_cutoff(Some("1")).unwrap().value(), 1.0);
        assert!(parse_cutoff(Some("1.5")).is_err());
        assert!(parse_cutoff(Some("-0.1")).is_err());
        assert!(parse_cutoff(Some("NaN")).is_err());
    }

    #[test]
    fn test_fail_open_flag_maps_to_policy() {
        assert_eq!(parse_fail_policy(None).unwrap(), FailPolicy::Open);
        assert_eq!(parse_fail_policy(Some("true")).unwrap(), FailPolicy::Open);
        assert_eq!(parse_fail_policy(Some("1")).unwrap(), FailPolicy::Open);
        assert_eq!(parse_fail_policy(Some(" ON ")).unwrap(), FailPolicy::Open);
        assert_eq!(parse_fail_policy(Some("false")).unwrap(), FailPolicy::Closed);
        assert_eq!(parse_fail_policy(Some("0")).unwrap(), FailPolicy::Closed);
        assert_eq!(parse_fail_policy(Some("No")).unwrap(), FailPolicy::Closed);

        for typo in ["flase", "disable", "2", "open"] {
            match parse_fail_policy(Some(typo)) {
                Err(ConfigError::Flag { key, value }) => {
                    assert_eq!(key, "FIRESENTINEL_FAIL_OPEN");
                    assert_eq!(value, typo);
                }
                other => panic!("'{}' must be rejected, got {:?}", typo, other),
            }
        }
    }

    #[test]
    fn test_stage_flags_default_on() {
        assert!(parse_flag("FIRESENTINEL_EDGE_STAGE_ENABLED", None, true).unwrap());
        assert!(!parse_flag("FIRESENTINEL_EDGE_STAGE_ENABLED", Some("off"), true).unwrap());
        assert!(parse_flag("FIRESENTINEL_VLM_STAGE_ENABLED", Some("nope"), true).is_err());
    }

    #[test]
    fn test_capture_mode_parse() {
        assert_eq!(CaptureMode::parse(None).unwrap(), CaptureMode::Camera);
        assert_eq!(CaptureMode::parse(Some("FILE")).unwrap(), CaptureMode::File);
        assert_eq!(CaptureMode::parse(Some("disabled")).unwrap(), CaptureMode::Disabled);
        assert!(matches!(
            CaptureMode::parse(Some("webcam")),
            Err(ConfigError::CaptureMode(_))
        ));
    }
}
