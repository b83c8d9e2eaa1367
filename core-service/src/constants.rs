//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Every runtime option can be overridden by an environment variable
//! (optionally loaded from `.env`).

/// Default collector host
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default collector port
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Consecutive abnormal readings before escalation
pub const DEFAULT_ABNORMAL_THRESHOLD: u32 = 10;

/// Minimum fire probability for the edge model
pub const DEFAULT_FIRE_CUTOFF: f64 = 0.5;

/// Edge fire model (ONNX)
pub const DEFAULT_FIRE_MODEL_PATH: &str = "models/wildfire_model.onnx";

/// Classifier bundle directory (model.json, scaler.json, feature_names.json)
pub const DEFAULT_MODEL_DIR: &str = "models/anomaly";

/// Sampling cadence (milliseconds)
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 2000;

/// Sensor sampler command timeout (milliseconds)
pub const SENSOR_COMMAND_TIMEOUT_MS: u64 = 5000;

/// Still-capture command and its warm-up before the shot
pub const DEFAULT_CAPTURE_COMMAND: &str = "rpicam-still";
pub const CAMERA_WARMUP_MS: u64 = 2000;
pub const CAPTURE_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_CAPTURE_DIR: &str = "captures";

/// Collector request timeout (seconds)
pub const DISPATCH_TIMEOUT_SECS: u64 = 10;

/// External validator request timeout (seconds)
pub const VALIDATOR_TIMEOUT_SECS: u64 = 30;

/// Vision-language validator defaults
pub const DEFAULT_VLM_MODEL: &str = "claude-3-opus-20240229";
pub const VLM_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const VLM_API_VERSION: &str = "2023-06-01";
pub const VLM_MAX_TOKENS: u32 = 1024;

/// Telephony REST API base
pub const TELEPHONY_API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Labels kept for diagnostics
pub const RECENT_LABELS_CAPACITY: usize = 20;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "FireSentinel";

// ============================================
// Helper functions to read from env with fallback
// ============================================

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Collector base URL built from host and port
pub fn get_collector_url() -> String {
    let host = env_string("FIRESENTINEL_SERVER_HOST").unwrap_or_else(|| DEFAULT_SERVER_HOST.to_string());
    let port = std::env::var("FIRESENTINEL_SERVER_PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(DEFAULT_SERVER_PORT);
    format!("http://{}:{}", host, port)
}

/// Raw threshold string; parsed and validated by `AgentConfig`
pub fn get_abnormal_threshold() -> Option<String> {
    env_string("FIRESENTINEL_THRESHOLD")
}

pub fn get_fire_cutoff() -> Option<String> {
    env_string("FIRE_THRESHOLD")
}

pub fn get_fire_model_path() -> String {
    env_string("WILDFIRE_MODEL_PATH").unwrap_or_else(|| DEFAULT_FIRE_MODEL_PATH.to_string())
}

pub fn get_model_dir() -> String {
    env_string("FIRESENTINEL_MODEL_DIR").unwrap_or_else(|| DEFAULT_MODEL_DIR.to_string())
}

pub fn get_model_sha256() -> Option<String> {
    env_string("FIRESENTINEL_MODEL_SHA256")
}

pub fn get_sample_interval_ms() -> u64 {
    std::env::var("FIRESENTINEL_SAMPLE_INTERVAL_MS")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|ms| *ms > 0)
        .unwrap_or(DEFAULT_SAMPLE_INTERVAL_MS)
}

pub fn get_sensor_command() -> Option<String> {
    env_string("FIRESENTINEL_SENSOR_COMMAND")
}

pub fn get_replay_file() -> Option<String> {
    env_string("FIRESENTINEL_REPLAY_FILE")
}

pub fn get_capture_mode() -> Option<String> {
    env_string("FIRESENTINEL_CAPTURE_MODE")
}

pub fn get_capture_command() -> String {
    env_string("FIRESENTINEL_CAPTURE_COMMAND").unwrap_or_else(|| DEFAULT_CAPTURE_COMMAND.to_string())
}

pub fn get_capture_file() -> Option<String> {
    env_string("FIRESENTINEL_CAPTURE_FILE")
}

pub fn get_capture_dir() -> String {
    env_string("FIRESENTINEL_CAPTURE_DIR").unwrap_or_else(|| DEFAULT_CAPTURE_DIR.to_string())
}

// Raw on/off switches; parsed strictly by `logic::config::parse_flag`

pub fn get_edge_stage_enabled() -> Option<String> {
    env_string("FIRESENTINEL_EDGE_STAGE_ENABLED")
}

pub fn get_vlm_stage_enabled() -> Option<String> {
    env_string("FIRESENTINEL_VLM_STAGE_ENABLED")
}

pub fn get_fail_open() -> Option<String> {
    env_string("FIRESENTINEL_FAIL_OPEN")
}

/// Site identifier spoken in voice alerts (defaults to the hostname)
pub fn get_site_id() -> String {
    env_string("FIRESENTINEL_SITE_ID").unwrap_or_else(|| {
        hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown-site".to_string())
    })
}

pub fn get_vlm_api_key() -> Option<String> {
    env_string("ANTHROPIC_API_KEY")
}

pub fn get_vlm_model() -> String {
    env_string("FIRESENTINEL_VLM_MODEL").unwrap_or_else(|| DEFAULT_VLM_MODEL.to_string())
}

pub fn get_twilio_account_sid() -> Option<String> {
    env_string("TWILIO_ACCOUNT_SID")
}

pub fn get_twilio_auth_token() -> Option<String> {
    env_string("TWILIO_AUTH_TOKEN")
}

pub fn get_twilio_phone_number() -> Option<String> {
    env_string("TWILIO_PHONE_NUMBER")
}

pub fn get_alert_phone() -> Option<String> {
    env_string("FIRESENTINEL_ALERT_PHONE")
}
