use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use referral_core::config::{AppConfig, LoadOptions};
use toml::Value;

/// One reported setting: dotted key, the env var that can set it, rendered value.
struct Setting {
    key: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for setting in settings(&config) {
        let source = field_source(
            setting.key,
            setting.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(format!("- {} = {} (source: {source})", setting.key, setting.value));
    }
    lines.push(format!("- submit url = {}", config.endpoint.submit_url()));

    lines.join("\n")
}

fn settings(config: &AppConfig) -> Vec<Setting> {
    vec![
        setting("endpoint.base_url", &["REFERRAL_ENDPOINT_BASE_URL"], config.endpoint.base_url.clone()),
        setting(
            "endpoint.submit_path",
            &["REFERRAL_ENDPOINT_SUBMIT_PATH"],
            config.endpoint.submit_path.clone(),
        ),
        setting(
            "endpoint.timeout_secs",
            &["REFERRAL_ENDPOINT_TIMEOUT_SECS"],
            config.endpoint.timeout_secs.to_string(),
        ),
        setting(
            "form.require_consent",
            &["REFERRAL_FORM_REQUIRE_CONSENT"],
            config.form.require_consent.to_string(),
        ),
        setting(
            "form.require_signature",
            &["REFERRAL_FORM_REQUIRE_SIGNATURE"],
            config.form.require_signature.to_string(),
        ),
        setting(
            "form.enforce_attachment_type",
            &["REFERRAL_FORM_ENFORCE_ATTACHMENT_TYPE"],
            config.form.enforce_attachment_type.to_string(),
        ),
        setting(
            "form.max_attachment_bytes",
            &["REFERRAL_FORM_MAX_ATTACHMENT_BYTES"],
            config
                .form
                .max_attachment_bytes
                .map(|limit| limit.to_string())
                .unwrap_or_else(|| "<unlimited>".to_string()),
        ),
        setting(
            "signature.stroke_width",
            &["REFERRAL_SIGNATURE_STROKE_WIDTH"],
            config.signature.stroke_width.to_string(),
        ),
        setting("signature.width", &[], config.signature.width.to_string()),
        setting("signature.height", &[], config.signature.height.to_string()),
        setting(
            "signature.device_pixel_ratio",
            &["REFERRAL_SIGNATURE_DEVICE_PIXEL_RATIO"],
            config.signature.device_pixel_ratio.to_string(),
        ),
        setting(
            "notification.dismiss_after_ms",
            &["REFERRAL_NOTIFICATION_DISMISS_AFTER_MS"],
            config.notification.dismiss_after_ms.to_string(),
        ),
        setting(
            "logging.level",
            &["REFERRAL_LOGGING_LEVEL", "REFERRAL_LOG_LEVEL"],
            config.logging.level.clone(),
        ),
        setting(
            "logging.format",
            &["REFERRAL_LOGGING_FORMAT", "REFERRAL_LOG_FORMAT"],
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
        ),
    ]
}

fn setting(key: &'static str, env_keys: &'static [&'static str], value: String) -> Setting {
    Setting { key, env_keys, value }
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("referral.toml"), PathBuf::from("config/referral.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<toml::Table>().ok().map(Value::Table)
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
