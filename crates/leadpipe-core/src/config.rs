use crate::app_config::{AppConfig, Environment, ScoringSettings};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_positive_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        match raw.parse::<usize>() {
            Ok(0) => Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be at least 1".to_string(),
            }),
            Ok(v) => Ok(v),
            Err(e) => Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            }),
        }
    };

    let parse_score = |var: &str, default: &str| -> Result<i32, ConfigError> {
        let raw = or_default(var, default);
        let value = raw.parse::<i32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })?;
        if (0..=100).contains(&value) {
            Ok(value)
        } else {
            Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: format!("{value} is outside 0..=100"),
            })
        }
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        let raw = or_default(var, default);
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: format!("expected a boolean, got '{other}'"),
            }),
        }
    };

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("LEADPIPE_ENV", "development"))?;
    let log_level = or_default("LEADPIPE_LOG_LEVEL", "info");
    let sources_path = PathBuf::from(or_default(
        "LEADPIPE_SOURCES_PATH",
        "./config/sources.yaml",
    ));

    let db_max_connections = parse_u32("LEADPIPE_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("LEADPIPE_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("LEADPIPE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let apify_api_token = optional("APIFY_API_TOKEN");
    let search_api_url = optional("LEADPIPE_SEARCH_API_URL");
    let search_api_key = optional("LEADPIPE_SEARCH_API_KEY");
    let allow_synthetic_leads = parse_bool("LEADPIPE_ALLOW_SYNTHETIC_LEADS", "false")?;
    let acquisition_timeout_secs = parse_u64("LEADPIPE_ACQUISITION_TIMEOUT_SECS", "120")?;
    let source_user_agent = or_default("LEADPIPE_SOURCE_USER_AGENT", "leadpipe/0.1 (lead-research)");
    let source_max_retries = parse_u32("LEADPIPE_SOURCE_MAX_RETRIES", "2")?;
    let source_retry_backoff_base_secs = parse_u64("LEADPIPE_SOURCE_RETRY_BACKOFF_BASE_SECS", "2")?;

    let scoring_api_url = optional("LEADPIPE_SCORING_API_URL");
    let scoring_api_key = optional("LEADPIPE_SCORING_API_KEY");
    let scoring_model = or_default("LEADPIPE_SCORING_MODEL", "gpt-4o-mini");
    let scoring = ScoringSettings {
        batch_size: parse_positive_usize("LEADPIPE_SCORING_BATCH_SIZE", "20")?,
        threshold: parse_score("LEADPIPE_SCORING_THRESHOLD", "40")?,
        default_score: parse_score("LEADPIPE_SCORING_DEFAULT_SCORE", "50")?,
        concurrency: parse_positive_usize("LEADPIPE_SCORING_CONCURRENCY", "1")?,
        timeout_secs: parse_u64("LEADPIPE_SCORING_TIMEOUT_SECS", "60")?,
    };

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        sources_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        apify_api_token,
        search_api_url,
        search_api_key,
        allow_synthetic_leads,
        acquisition_timeout_secs,
        source_user_agent,
        source_max_retries,
        source_retry_backoff_base_secs,
        scoring_api_url,
        scoring_api_key,
        scoring_model,
        scoring,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "LEADPIPE_ENV".to_string(),
            reason: format!("expected development, test, or production; got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
