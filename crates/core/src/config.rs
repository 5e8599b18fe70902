use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::form::FormPolicy;
use crate::signature::{validate_stroke_width, SurfaceSize};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub endpoint: EndpointConfig,
    pub form: FormConfig,
    pub signature: SignatureConfig,
    pub notification: NotificationConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct EndpointConfig {
    pub base_url: String,
    pub submit_path: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct FormConfig {
    pub require_consent: bool,
    pub require_signature: bool,
    pub enforce_attachment_type: bool,
    pub max_attachment_bytes: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct SignatureConfig {
    pub stroke_width: f32,
    pub width: f32,
    pub height: f32,
    pub device_pixel_ratio: f32,
}

#[derive(Clone, Debug)]
pub struct NotificationConfig {
    pub dismiss_after_ms: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub endpoint_base_url: Option<String>,
    pub endpoint_timeout_secs: Option<u64>,
    pub require_signature: Option<bool>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: EndpointConfig {
                base_url: "http://127.0.0.1:3000".to_string(),
                submit_path: "/add".to_string(),
                timeout_secs: 15,
            },
            form: FormConfig {
                require_consent: true,
                require_signature: true,
                enforce_attachment_type: true,
                max_attachment_bytes: None,
            },
            signature: SignatureConfig {
                stroke_width: 2.5,
                width: 600.0,
                height: 160.0,
                device_pixel_ratio: 1.0,
            },
            notification: NotificationConfig { dismiss_after_ms: 4_000 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl EndpointConfig {
    pub fn submit_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = self.submit_path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl From<&FormConfig> for FormPolicy {
    fn from(config: &FormConfig) -> Self {
        Self {
            require_consent: config.require_consent,
            require_signature: config.require_signature,
            enforce_attachment_type: config.enforce_attachment_type,
            max_attachment_bytes: config.max_attachment_bytes,
        }
    }
}

impl SignatureConfig {
    pub fn surface(&self) -> SurfaceSize {
        SurfaceSize::new(self.width, self.height, self.device_pixel_ratio)
    }
}

impl NotificationConfig {
    pub fn dismiss_after(&self) -> Duration {
        Duration::from_millis(self.dismiss_after_ms)
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("referral.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(endpoint) = patch.endpoint {
            if let Some(base_url) = endpoint.base_url {
                self.endpoint.base_url = base_url;
            }
            if let Some(submit_path) = endpoint.submit_path {
                self.endpoint.submit_path = submit_path;
            }
            if let Some(timeout_secs) = endpoint.timeout_secs {
                self.endpoint.timeout_secs = timeout_secs;
            }
        }

        if let Some(form) = patch.form {
            if let Some(require_consent) = form.require_consent {
                self.form.require_consent = require_consent;
            }
            if let Some(require_signature) = form.require_signature {
                self.form.require_signature = require_signature;
            }
            if let Some(enforce_attachment_type) = form.enforce_attachment_type {
                self.form.enforce_attachment_type = enforce_attachment_type;
            }
            if let Some(max_attachment_bytes) = form.max_attachment_bytes {
                self.form.max_attachment_bytes = Some(max_attachment_bytes);
            }
        }

        if let Some(signature) = patch.signature {
            if let Some(stroke_width) = signature.stroke_width {
                self.signature.stroke_width = stroke_width;
            }
            if let Some(width) = signature.width {
                self.signature.width = width;
            }
            if let Some(height) = signature.height {
                self.signature.height = height;
            }
            if let Some(device_pixel_ratio) = signature.device_pixel_ratio {
                self.signature.device_pixel_ratio = device_pixel_ratio;
            }
        }

        if let Some(notification) = patch.notification {
            if let Some(dismiss_after_ms) = notification.dismiss_after_ms {
                self.notification.dismiss_after_ms = dismiss_after_ms;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("REFERRAL_ENDPOINT_BASE_URL") {
            self.endpoint.base_url = value;
        }
        if let Some(value) = read_env("REFERRAL_ENDPOINT_SUBMIT_PATH") {
            self.endpoint.submit_path = value;
        }
        if let Some(value) = read_env("REFERRAL_ENDPOINT_TIMEOUT_SECS") {
            self.endpoint.timeout_secs = parse_u64("REFERRAL_ENDPOINT_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("REFERRAL_FORM_REQUIRE_CONSENT") {
            self.form.require_consent = parse_bool("REFERRAL_FORM_REQUIRE_CONSENT", &value)?;
        }
        if let Some(value) = read_env("REFERRAL_FORM_REQUIRE_SIGNATURE") {
            self.form.require_signature = parse_bool("REFERRAL_FORM_REQUIRE_SIGNATURE", &value)?;
        }
        if let Some(value) = read_env("REFERRAL_FORM_ENFORCE_ATTACHMENT_TYPE") {
            self.form.enforce_attachment_type =
                parse_bool("REFERRAL_FORM_ENFORCE_ATTACHMENT_TYPE", &value)?;
        }
        if let Some(value) = read_env("REFERRAL_FORM_MAX_ATTACHMENT_BYTES") {
            self.form.max_attachment_bytes =
                Some(parse_u64("REFERRAL_FORM_MAX_ATTACHMENT_BYTES", &value)?);
        }

        if let Some(value) = read_env("REFERRAL_SIGNATURE_STROKE_WIDTH") {
            self.signature.stroke_width = parse_f32("REFERRAL_SIGNATURE_STROKE_WIDTH", &value)?;
        }
        if let Some(value) = read_env("REFERRAL_SIGNATURE_DEVICE_PIXEL_RATIO") {
            self.signature.device_pixel_ratio =
                parse_f32("REFERRAL_SIGNATURE_DEVICE_PIXEL_RATIO", &value)?;
        }

        if let Some(value) = read_env("REFERRAL_NOTIFICATION_DISMISS_AFTER_MS") {
            self.notification.dismiss_after_ms =
                parse_u64("REFERRAL_NOTIFICATION_DISMISS_AFTER_MS", &value)?;
        }

        let log_level =
            read_env("REFERRAL_LOGGING_LEVEL").or_else(|| read_env("REFERRAL_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("REFERRAL_LOGGING_FORMAT").or_else(|| read_env("REFERRAL_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(base_url) = overrides.endpoint_base_url {
            self.endpoint.base_url = base_url;
        }
        if let Some(timeout_secs) = overrides.endpoint_timeout_secs {
            self.endpoint.timeout_secs = timeout_secs;
        }
        if let Some(require_signature) = overrides.require_signature {
            self.form.require_signature = require_signature;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_endpoint(&self.endpoint)?;
        validate_signature(&self.signature)?;
        validate_notification(&self.notification)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("referral.toml"), PathBuf::from("config/referral.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_endpoint(endpoint: &EndpointConfig) -> Result<(), ConfigError> {
    let base_url = endpoint.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "endpoint.base_url must start with http:// or https://".to_string(),
        ));
    }

    if endpoint.submit_path.trim().is_empty() {
        return Err(ConfigError::Validation("endpoint.submit_path must not be empty".to_string()));
    }

    if endpoint.timeout_secs == 0 || endpoint.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "endpoint.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_signature(signature: &SignatureConfig) -> Result<(), ConfigError> {
    validate_stroke_width(signature.stroke_width)
        .map_err(|error| ConfigError::Validation(format!("signature.stroke_width: {error}")))?;
    signature
        .surface()
        .validate()
        .map_err(|error| ConfigError::Validation(format!("signature surface: {error}")))
}

fn validate_notification(notification: &NotificationConfig) -> Result<(), ConfigError> {
    if notification.dismiss_after_ms == 0 || notification.dismiss_after_ms > 10_000 {
        return Err(ConfigError::Validation(
            "notification.dismiss_after_ms must be in range 1..=10000".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.parse::<f32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    endpoint: Option<EndpointPatch>,
    form: Option<FormPatch>,
    signature: Option<SignaturePatch>,
    notification: Option<NotificationPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct EndpointPatch {
    base_url: Option<String>,
    submit_path: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct FormPatch {
    require_consent: Option<bool>,
    require_signature: Option<bool>,
    enforce_attachment_type: Option<bool>,
    max_attachment_bytes: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SignaturePatch {
    stroke_width: Option<f32>,
    width: Option<f32>,
    height: Option<f32>,
    device_pixel_ratio: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct NotificationPatch {
    dismiss_after_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
