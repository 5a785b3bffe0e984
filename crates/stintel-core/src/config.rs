use crate::app_config::{AppConfig, Environment, LlmProvider};
use crate::schedule::Frequency;
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
/// Decoupled from the process environment so tests can drive it with a
/// plain `HashMap`.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    // Set-but-empty disables the collector; unset falls back to the local port.
    let collector_url = |var: &str, default: &str| -> Option<String> {
        let raw = or_default(var, default);
        let trimmed = raw.trim().trim_end_matches('/');
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("STINTEL_ENV", "development"));

    let bind_addr = or_default("STINTEL_BIND_ADDR", "0.0.0.0:8080")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("STINTEL_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("STINTEL_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("STINTEL_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("STINTEL_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("STINTEL_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let news_collector_url = collector_url("NEWS_SCRAPER_URL", "http://localhost:3001");
    let startup_collector_url = collector_url("STARTUP_API_URL", "http://localhost:3002");
    let github_collector_url = collector_url("GITHUB_MONITOR_URL", "http://localhost:3003");
    let collector_timeout_secs = parse_u64("STINTEL_COLLECTOR_TIMEOUT_SECS", "30")?;
    let collector_user_agent = or_default(
        "STINTEL_COLLECTOR_USER_AGENT",
        "stintel/0.1 (startup-intelligence)",
    );
    let collector_max_retries = parse_u32("STINTEL_COLLECTOR_MAX_RETRIES", "0")?;
    let collector_backoff_base_ms = parse_u64("STINTEL_COLLECTOR_BACKOFF_BASE_MS", "500")?;

    let llm_provider = parse_llm_provider(&or_default("LLM_PROVIDER", "openai"))
        .ok_or_else(|| invalid("LLM_PROVIDER", "expected 'openai' or 'anthropic'".into()))?;
    let llm_model = lookup("LLM_MODEL")
        .ok()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| llm_provider.default_model().to_string());
    let key_var = match llm_provider {
        LlmProvider::OpenAi => "OPENAI_API_KEY",
        LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
    };
    let llm_api_key = lookup(key_var).ok().filter(|k| !k.trim().is_empty());
    let llm_timeout_secs = parse_u64("STINTEL_LLM_TIMEOUT_SECS", "120")?;

    let default_days_back = parse_u32("STINTEL_DEFAULT_DAYS_BACK", "7")?;
    if !(1..=30).contains(&default_days_back) {
        return Err(invalid(
            "STINTEL_DEFAULT_DAYS_BACK",
            format!("{default_days_back} is outside 1..=30"),
        ));
    }
    let scheduler_error_backoff_secs = parse_u64("STINTEL_SCHEDULER_ERROR_BACKOFF_SECS", "300")?;

    let schedule_on_startup = match lookup("STINTEL_SCHEDULE") {
        Ok(raw) if !raw.trim().is_empty() => Some(
            raw.trim()
                .parse::<Frequency>()
                .map_err(|e| invalid("STINTEL_SCHEDULE", e.to_string()))?,
        ),
        _ => None,
    };
    let schedule_interval_secs = match lookup("STINTEL_SCHEDULE_INTERVAL_SECS") {
        Ok(raw) => Some(
            raw.parse::<u64>()
                .map_err(|e| invalid("STINTEL_SCHEDULE_INTERVAL_SECS", e.to_string()))?,
        ),
        Err(_) => None,
    };

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        news_collector_url,
        startup_collector_url,
        github_collector_url,
        collector_timeout_secs,
        collector_user_agent,
        collector_max_retries,
        collector_backoff_base_ms,
        llm_provider,
        llm_model,
        llm_api_key,
        llm_timeout_secs,
        default_days_back,
        scheduler_error_backoff_secs,
        schedule_on_startup,
        schedule_interval_secs,
    })
}

/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

fn parse_llm_provider(s: &str) -> Option<LlmProvider> {
    match s.trim().to_ascii_lowercase().as_str() {
        "openai" => Some(LlmProvider::OpenAi),
        "anthropic" => Some(LlmProvider::Anthropic),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
