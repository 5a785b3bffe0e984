//! HTTP collectors for the news, startup and GitHub source services.
//!
//! Each collector implements [`stintel_core::SourceCollector`] and converts
//! the service's JSON into typed [`stintel_core::CollectedRecord`]s.

pub mod client;
pub mod error;
pub mod github;
pub mod news;
pub(crate) mod retry;
pub mod startup;
pub mod wire;

use std::sync::Arc;
use std::time::Duration;

use stintel_core::{AppConfig, SourceCollector};

pub use client::{ClientSettings, ServiceClient};
pub use error::CollectorError;
pub use github::GithubCollector;
pub use news::NewsCollector;
pub use startup::StartupCollector;

/// Slot names of every collector the pipeline knows about.
pub const SOURCE_NAMES: [&str; 3] = ["news", "startup", "github"];

/// Collectors built from configuration, plus the slots left unconfigured.
pub struct SourceSet {
    pub available: Vec<Arc<dyn SourceCollector>>,
    pub missing: Vec<&'static str>,
}

impl std::fmt::Debug for SourceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.available.iter().map(|c| c.name()).collect();
        f.debug_struct("SourceSet")
            .field("available", &names)
            .field("missing", &self.missing)
            .finish()
    }
}

/// Per-source time budget for the collection coordinator.
#[must_use]
pub fn source_timeout(config: &AppConfig) -> Duration {
    ClientSettings::from_app_config(config).source_budget()
}

/// Build a collector for every configured service URL.
///
/// # Errors
///
/// Returns [`CollectorError`] if a configured URL is invalid or the HTTP
/// client cannot be built.
pub fn configured_collectors(config: &AppConfig) -> Result<SourceSet, CollectorError> {
    let settings = ClientSettings::from_app_config(config);
    let mut available: Vec<Arc<dyn SourceCollector>> = Vec::new();
    let mut missing = Vec::new();

    match config.news_collector_url.as_deref() {
        Some(url) => available.push(Arc::new(NewsCollector::new(url, &settings)?)),
        None => missing.push("news"),
    }
    match config.startup_collector_url.as_deref() {
        Some(url) => available.push(Arc::new(StartupCollector::new(url, &settings)?)),
        None => missing.push("startup"),
    }
    match config.github_collector_url.as_deref() {
        Some(url) => available.push(Arc::new(GithubCollector::new(url, &settings)?)),
        None => missing.push("github"),
    }

    if !missing.is_empty() {
        tracing::warn!(?missing, "some collectors are not configured");
    }
    Ok(SourceSet { available, missing })
}
