//! Settings validation.
//!
//! Turns a [`ConfigPort`] into the immutable [`RiskConfig`] and
//! [`RunSettings`] for one run. Risk keys live in the section-less part of
//! the settings file. Every required key must be present and parse, or the
//! run aborts before anything is evaluated.

use crate::domain::error::TurtleError;
use crate::domain::risk::RiskConfig;
use crate::ports::config_port::ConfigPort;

/// Section holding keys written before any `[section]` header.
pub const DEFAULT_SECTION: &str = "default";

pub const REQUIRED_KEYS: [&str; 7] = [
    "TOTAL_SEED_KRW",
    "MAX_LOSS_RATE",
    "VOLUME_THRESHOLD",
    "ADX_THRESHOLD",
    "ATR_UPPER_LIMIT",
    "SECTOR_LIMIT",
    "FORWARD_PER",
];

pub const DEFAULT_MAX_PYRAMID_UNITS: u32 = 4;
pub const DEFAULT_BACKTEST_LIMIT: usize = 10;
pub const DEFAULT_MAX_STALE_DAYS: i64 = 7;
pub const DEFAULT_VIX: f64 = 30.0;
pub const DEFAULT_EXCHANGE_RATE: f64 = 1372.88;
pub const DEFAULT_SMTP_PORT: u16 = 465;

/// Run-level settings that are not part of the risk model.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub backtest_limit: usize,
    pub max_stale_days: i64,
    pub vix_default: f64,
    pub exchange_rate_default: f64,
    pub price_dir: String,
    pub universe_file: String,
    pub positions_file: String,
    pub report_output: String,
}

/// Outgoing mail settings. The password is supplied separately.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailSettings {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub sender: String,
    pub receiver: String,
}

fn missing(section: &str, key: &str) -> TurtleError {
    TurtleError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> TurtleError {
    TurtleError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn raw(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_f64(section: &str, key: &str, value: &str) -> Result<f64, TurtleError> {
    let parsed: f64 = value
        .parse()
        .map_err(|_| invalid(section, key, format!("'{value}' is not a number")))?;
    if !parsed.is_finite() {
        return Err(invalid(section, key, "must be finite"));
    }
    Ok(parsed)
}

fn require_f64(config: &dyn ConfigPort, key: &str) -> Result<f64, TurtleError> {
    let value = raw(config, DEFAULT_SECTION, key).ok_or_else(|| missing(DEFAULT_SECTION, key))?;
    parse_f64(DEFAULT_SECTION, key, &value)
}

fn optional_f64(config: &dyn ConfigPort, key: &str, default: f64) -> Result<f64, TurtleError> {
    match raw(config, DEFAULT_SECTION, key) {
        Some(value) => parse_f64(DEFAULT_SECTION, key, &value),
        None => Ok(default),
    }
}

fn parse_count(section: &str, key: &str, value: &str) -> Result<u32, TurtleError> {
    // "2" and "2.0" are both accepted; "2.5" is not
    let parsed = parse_f64(section, key, value)?;
    if parsed < 0.0 || parsed.fract() != 0.0 {
        return Err(invalid(section, key, format!("'{value}' is not a whole number")));
    }
    if parsed > f64::from(u32::MAX) {
        return Err(invalid(section, key, format!("'{value}' is too large")));
    }
    Ok(parsed as u32)
}

fn optional_count(config: &dyn ConfigPort, key: &str, default: u32) -> Result<u32, TurtleError> {
    match raw(config, DEFAULT_SECTION, key) {
        Some(value) => parse_count(DEFAULT_SECTION, key, &value),
        None => Ok(default),
    }
}

fn positive(key: &str, value: f64) -> Result<f64, TurtleError> {
    if value <= 0.0 {
        return Err(invalid(DEFAULT_SECTION, key, format!("{key} must be positive")));
    }
    Ok(value)
}

pub fn load_risk_config(config: &dyn ConfigPort) -> Result<RiskConfig, TurtleError> {
    let total_seed = positive("TOTAL_SEED_KRW", require_f64(config, "TOTAL_SEED_KRW")?)?;

    let max_loss_rate = require_f64(config, "MAX_LOSS_RATE")?;
    if max_loss_rate <= 0.0 || max_loss_rate >= 1.0 {
        return Err(invalid(
            DEFAULT_SECTION,
            "MAX_LOSS_RATE",
            "MAX_LOSS_RATE must be between 0 and 1",
        ));
    }

    let volume_ratio_threshold = require_f64(config, "VOLUME_THRESHOLD")?;
    if volume_ratio_threshold < 0.0 {
        return Err(invalid(
            DEFAULT_SECTION,
            "VOLUME_THRESHOLD",
            "VOLUME_THRESHOLD must be non-negative",
        ));
    }

    let adx_threshold = require_f64(config, "ADX_THRESHOLD")?;
    if !(0.0..=100.0).contains(&adx_threshold) {
        return Err(invalid(
            DEFAULT_SECTION,
            "ADX_THRESHOLD",
            "ADX_THRESHOLD must be between 0 and 100",
        ));
    }

    let atr_upper_limit_pct = positive("ATR_UPPER_LIMIT", require_f64(config, "ATR_UPPER_LIMIT")?)?;

    let sector_limit = raw(config, DEFAULT_SECTION, "SECTOR_LIMIT")
        .ok_or_else(|| missing(DEFAULT_SECTION, "SECTOR_LIMIT"))?;
    let sector_limit = parse_count(DEFAULT_SECTION, "SECTOR_LIMIT", &sector_limit)?;
    if sector_limit < 1 {
        return Err(invalid(
            DEFAULT_SECTION,
            "SECTOR_LIMIT",
            "SECTOR_LIMIT must be at least 1",
        ));
    }

    let forward_pe_default = positive("FORWARD_PER", require_f64(config, "FORWARD_PER")?)?;

    let max_pyramid_units =
        optional_count(config, "MAX_PYRAMID_UNITS", DEFAULT_MAX_PYRAMID_UNITS)?;
    if max_pyramid_units < 1 {
        return Err(invalid(
            DEFAULT_SECTION,
            "MAX_PYRAMID_UNITS",
            "MAX_PYRAMID_UNITS must be at least 1",
        ));
    }

    Ok(RiskConfig {
        total_seed,
        max_loss_rate,
        volume_ratio_threshold,
        adx_threshold,
        atr_upper_limit_pct,
        sector_limit: sector_limit as usize,
        max_pyramid_units,
        forward_pe_default,
    })
}

pub fn load_run_settings(config: &dyn ConfigPort) -> Result<RunSettings, TurtleError> {
    let backtest_limit = optional_count(config, "BACKTEST_LIMIT", DEFAULT_BACKTEST_LIMIT as u32)?;
    let max_stale_days = optional_count(config, "MAX_STALE_DAYS", DEFAULT_MAX_STALE_DAYS as u32)?;
    let vix_default = positive("VIX_DEFAULT", optional_f64(config, "VIX_DEFAULT", DEFAULT_VIX)?)?;
    let exchange_rate_default = positive(
        "EXCHANGE_RATE_DEFAULT",
        optional_f64(config, "EXCHANGE_RATE_DEFAULT", DEFAULT_EXCHANGE_RATE)?,
    )?;

    let path = |section: &str, key: &str, default: &str| {
        raw(config, section, key).unwrap_or_else(|| default.to_string())
    };

    Ok(RunSettings {
        backtest_limit: backtest_limit as usize,
        max_stale_days: i64::from(max_stale_days),
        vix_default,
        exchange_rate_default,
        price_dir: path("data", "price_dir", "data/prices"),
        universe_file: path("data", "universe_file", "data/universe.csv"),
        positions_file: path("data", "positions_file", "portfolio.csv"),
        report_output: path("report", "output", "report.html"),
    })
}

/// Mail settings, or `None` when no `[email]` section is configured.
pub fn load_email_settings(config: &dyn ConfigPort) -> Result<Option<EmailSettings>, TurtleError> {
    let Some(smtp_host) = raw(config, "email", "smtp_host") else {
        return Ok(None);
    };
    let smtp_port = match raw(config, "email", "smtp_port") {
        Some(v) => v
            .parse::<u16>()
            .map_err(|_| invalid("email", "smtp_port", format!("'{v}' is not a port")))?,
        None => DEFAULT_SMTP_PORT,
    };
    let sender = raw(config, "email", "sender").ok_or_else(|| missing("email", "sender"))?;
    let receiver = raw(config, "email", "receiver").unwrap_or_else(|| sender.clone());

    Ok(Some(EmailSettings {
        smtp_host,
        smtp_port,
        sender,
        receiver,
    }))
}
