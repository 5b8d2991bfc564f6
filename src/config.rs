//! Pipeline configuration loaded from the environment
//!
//! | Env Var               | Required | Default |
//! |-----------------------|----------|---------|
//! | `QR_TOKEN_SECRET`     | **yes**  | --      |
//! | `QR_TOKEN_TTL`        | no       | `7d`    |
//! | `QR_BATCH_PACING_MS`  | no       | `300`   |
//! | `QR_BATCH_EC_LEVEL`   | no       | `H`     |
//! | `QR_PREVIEW_EC_LEVEL` | no       | `M`     |
//! | `QR_EXPORT_SCALE`     | no       | `8`     |
//! | `QR_QUIET_ZONE`       | no       | `2`     |
//! | `QR_MAX_VERSION`      | no       | `40`    |
//! | `QR_LINK_BASE`        | no       | --      |
//!
//! `QR_TOKEN_SECRET` is the standard base64 encoding of 32 random bytes.
//! When `QR_LINK_BASE` is set, symbols carry `{base}?id={token}` instead of
//! the bare token.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::batch::{BatchOptions, DEFAULT_EXPORT_SCALE, DEFAULT_PACING};
use crate::encoder::{EncodeOptions, OpticalEncoder};
use crate::models::{ECLevel, Version};
use crate::payload::PayloadFormat;
use crate::token::{SecretKey, TokenCodec, TtlSpec};

/// Base64 key, 32 bytes once decoded
pub const ENV_TOKEN_SECRET: &str = "QR_TOKEN_SECRET";
/// Token lifetime such as `7d`
pub const ENV_TOKEN_TTL: &str = "QR_TOKEN_TTL";
/// Milliseconds between batch items
pub const ENV_BATCH_PACING_MS: &str = "QR_BATCH_PACING_MS";
/// EC level for exported symbols
pub const ENV_BATCH_EC_LEVEL: &str = "QR_BATCH_EC_LEVEL";
/// EC level for on-screen previews
pub const ENV_PREVIEW_EC_LEVEL: &str = "QR_PREVIEW_EC_LEVEL";
/// Pixels per module in exports
pub const ENV_EXPORT_SCALE: &str = "QR_EXPORT_SCALE";
/// Quiet zone in modules
pub const ENV_QUIET_ZONE: &str = "QR_QUIET_ZONE";
/// Largest symbol version to try
pub const ENV_MAX_VERSION: &str = "QR_MAX_VERSION";
/// Optional link prefix
pub const ENV_LINK_BASE: &str = "QR_LINK_BASE";

/// Default quiet zone for exported symbols, in modules
pub const DEFAULT_QUIET_ZONE: u32 = 2;

/// Rejected configuration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `QR_TOKEN_SECRET` is unset or blank
    #[error("QR_TOKEN_SECRET must be set")]
    MissingSecret,
    /// The secret is not base64 or not 32 bytes
    #[error("invalid token secret: {0}")]
    InvalidSecret(String),
    /// A variable has an unusable value
    #[error("invalid value {value:?} for {key}")]
    InvalidValue {
        /// Variable name
        key: &'static str,
        /// Raw value as read
        value: String,
    },
}

/// Settings shared by issuing, exporting and scanning
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Token key
    pub secret: SecretKey,
    /// Lifetime of issued tokens
    pub token_ttl: TtlSpec,
    /// Pause between batch items
    pub batch_pacing: Duration,
    /// EC level for exported symbols
    pub batch_ec_level: ECLevel,
    /// EC level for previews
    pub preview_ec_level: ECLevel,
    /// Pixels per module in exports
    pub export_scale: u32,
    /// Quiet zone in modules
    pub quiet_zone: u32,
    /// Largest symbol version
    pub max_version: Version,
    /// Link prefix; bare tokens when `None`
    pub link_base: Option<String>,
}

impl PipelineConfig {
    /// Defaults for everything except the key
    pub fn new(secret: SecretKey) -> Self {
        Self {
            secret,
            token_ttl: TtlSpec::DEFAULT,
            batch_pacing: DEFAULT_PACING,
            batch_ec_level: ECLevel::H,
            preview_ec_level: ECLevel::M,
            export_scale: DEFAULT_EXPORT_SCALE,
            quiet_zone: DEFAULT_QUIET_ZONE,
            max_version: Version::MAX,
            link_base: None,
        }
    }

    /// Load from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through any key lookup (environment, file, test map)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let secret = get(ENV_TOKEN_SECRET).ok_or(ConfigError::MissingSecret)?;
        let mut config = Self::new(SecretKey::from_base64(&secret)?);

        if let Some(raw) = get(ENV_TOKEN_TTL) {
            config.token_ttl = TtlSpec::parse(&raw).map_err(|_| invalid(ENV_TOKEN_TTL, &raw))?;
        }
        if let Some(raw) = get(ENV_BATCH_PACING_MS) {
            config.batch_pacing = Duration::from_millis(parse_number(ENV_BATCH_PACING_MS, &raw)?);
        }
        if let Some(raw) = get(ENV_BATCH_EC_LEVEL) {
            config.batch_ec_level = ECLevel::parse(&raw).ok_or_else(|| invalid(ENV_BATCH_EC_LEVEL, &raw))?;
        }
        if let Some(raw) = get(ENV_PREVIEW_EC_LEVEL) {
            config.preview_ec_level =
                ECLevel::parse(&raw).ok_or_else(|| invalid(ENV_PREVIEW_EC_LEVEL, &raw))?;
        }
        if let Some(raw) = get(ENV_EXPORT_SCALE) {
            config.export_scale = parse_number(ENV_EXPORT_SCALE, &raw)?;
            if config.export_scale == 0 {
                return Err(invalid(ENV_EXPORT_SCALE, &raw));
            }
        }
        if let Some(raw) = get(ENV_QUIET_ZONE) {
            config.quiet_zone = parse_number(ENV_QUIET_ZONE, &raw)?;
        }
        if let Some(raw) = get(ENV_MAX_VERSION) {
            config.max_version = parse_number::<u8>(ENV_MAX_VERSION, &raw)
                .ok()
                .and_then(Version::new)
                .ok_or_else(|| invalid(ENV_MAX_VERSION, &raw))?;
        }
        config.link_base = get(ENV_LINK_BASE).map(|v| v.trim().to_string());

        tracing::debug!(
            ttl = %config.token_ttl,
            pacing_ms = config.batch_pacing.as_millis() as u64,
            batch_ec = %config.batch_ec_level,
            preview_ec = %config.preview_ec_level,
            link = config.link_base.is_some(),
            "pipeline configuration loaded"
        );
        Ok(config)
    }

    /// Codec keyed with [`PipelineConfig::secret`]
    pub fn token_codec(&self) -> TokenCodec {
        TokenCodec::new(self.secret.clone())
    }

    /// Encoder bounded by the configured version and quiet zone
    pub fn encoder(&self) -> OpticalEncoder {
        OpticalEncoder::new(EncodeOptions {
            max_version: self.max_version,
            quiet_zone: self.quiet_zone,
            ..EncodeOptions::default()
        })
    }

    /// Link when a base URL is set, bare token otherwise
    pub fn payload_format(&self) -> PayloadFormat {
        match &self.link_base {
            Some(base_url) => PayloadFormat::Link {
                base_url: base_url.clone(),
            },
            None => PayloadFormat::Token,
        }
    }

    /// Batch settings from this configuration
    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            pacing: self.batch_pacing,
            scale: self.export_scale,
            payload: self.payload_format(),
            ..BatchOptions::default()
        }
    }
}

fn invalid(key: &'static str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    }
}

fn parse_number<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| invalid(key, raw))
}
