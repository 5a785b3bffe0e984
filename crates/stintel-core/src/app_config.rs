use std::net::SocketAddr;

use crate::schedule::Frequency;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Which hosted completion API the analysis stages talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
}

impl LlmProvider {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "openai",
            LlmProvider::Anthropic => "anthropic",
        }
    }

    #[must_use]
    pub fn default_model(self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "gpt-4o-mini",
            LlmProvider::Anthropic => "claude-3-5-haiku-latest",
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// `None` when the variable is set to an empty string.
    pub news_collector_url: Option<String>,
    pub startup_collector_url: Option<String>,
    pub github_collector_url: Option<String>,
    pub collector_timeout_secs: u64,
    pub collector_user_agent: String,
    pub collector_max_retries: u32,
    pub collector_backoff_base_ms: u64,
    pub llm_provider: LlmProvider,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    pub llm_timeout_secs: u64,
    pub default_days_back: u32,
    pub scheduler_error_backoff_secs: u64,
    pub schedule_on_startup: Option<Frequency>,
    pub schedule_interval_secs: Option<u64>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("news_collector_url", &self.news_collector_url)
            .field("startup_collector_url", &self.startup_collector_url)
            .field("github_collector_url", &self.github_collector_url)
            .field("collector_timeout_secs", &self.collector_timeout_secs)
            .field("collector_user_agent", &self.collector_user_agent)
            .field("collector_max_retries", &self.collector_max_retries)
            .field("collector_backoff_base_ms", &self.collector_backoff_base_ms)
            .field("llm_provider", &self.llm_provider)
            .field("llm_model", &self.llm_model)
            .field(
                "llm_api_key",
                &self.llm_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("llm_timeout_secs", &self.llm_timeout_secs)
            .field("default_days_back", &self.default_days_back)
            .field(
                "scheduler_error_backoff_secs",
                &self.scheduler_error_backoff_secs,
            )
            .field("schedule_on_startup", &self.schedule_on_startup)
            .field("schedule_interval_secs", &self.schedule_interval_secs)
            .finish()
    }
}
