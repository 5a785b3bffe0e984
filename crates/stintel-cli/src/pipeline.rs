//! Pipeline command handlers for the CLI.
//!
//! Runs execute on the calling task through [`IntelligenceService`], so the
//! same guard and history bookkeeping apply as on the server.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use stintel_core::{
    AnalysisLimits, AppConfig, MemoryGateway, PersistenceGateway, RunReport, RunType,
    TextCompletion,
};
use stintel_llm::CompletionClient;
use stintel_pipeline::{CollectionCoordinator, IntelligenceService, PipelineRunner};

/// Load configuration; in memory mode `DATABASE_URL` may be absent.
pub(crate) fn load_config(memory: bool) -> anyhow::Result<AppConfig> {
    let config = if memory {
        stintel_core::build_app_config(|key| match std::env::var(key) {
            Err(_) if key == "DATABASE_URL" => Ok(String::new()),
            other => other,
        })?
    } else {
        stintel_core::load_app_config_from_env()?
    };
    Ok(config)
}

async fn open_gateway(
    config: &AppConfig,
    memory: bool,
) -> anyhow::Result<Arc<dyn PersistenceGateway>> {
    if memory {
        tracing::info!("using in-memory storage; nothing is persisted");
        return Ok(Arc::new(MemoryGateway::new()));
    }
    let pool = stintel_db::connect_pool(
        &config.database_url,
        stintel_db::PoolConfig::from_app_config(config),
    )
    .await?;
    Ok(Arc::new(stintel_db::PgGateway::new(pool)))
}

fn build_runner(
    config: &AppConfig,
    gateway: Arc<dyn PersistenceGateway>,
) -> anyhow::Result<PipelineRunner> {
    let sources = stintel_collectors::configured_collectors(config)?;
    let coordinator = CollectionCoordinator::new(
        sources.available,
        stintel_collectors::source_timeout(config),
    )
    .with_unavailable(sources.missing);

    let client = CompletionClient::from_app_config(config)?;
    let completion: Option<Arc<dyn TextCompletion>> = if client.is_configured() {
        Some(Arc::new(client))
    } else {
        tracing::warn!("no LLM API key set; analysis and summaries will use fallbacks");
        None
    };
    Ok(PipelineRunner::new(gateway, coordinator, completion))
}

/// Human-readable run report.
pub(crate) fn format_report(report: &RunReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "run {} ({}, {} days): {:?} in {} ms",
        report.run_id,
        report.run_type.as_str(),
        report.days_back,
        report.outcome,
        report.duration_ms
    );
    for stage in &report.stages {
        let _ = write!(out, "  {:<16} {:?}", format!("{:?}", stage.stage), stage.status);
        if let Some(detail) = &stage.detail {
            let _ = write!(out, " - {detail}");
        }
        out.push('\n');
    }
    for (source, count) in &report.collected {
        let _ = write!(out, "  source {source}: {count} records");
        if let Some(error) = report.source_errors.get(source) {
            let _ = write!(out, " ({error})");
        }
        out.push('\n');
    }
    for (kind, counts) in &report.stored {
        let _ = writeln!(
            out,
            "  stored {kind}: {} new, {} duplicates",
            counts.inserted, counts.duplicates
        );
    }
    let _ = writeln!(out, "  enriched: {}", report.enriched);
    if let Some(date) = report.briefing_date {
        let _ = writeln!(out, "  briefing: {date}");
    }
    if let Some(error) = &report.error {
        let _ = writeln!(out, "  error: {error}");
    }
    out
}

/// Run the pipeline to completion and print the report.
///
/// # Errors
///
/// Returns an error if wiring fails, the window is invalid, or the run ends
/// with outcome `error`.
pub(crate) async fn run_pipeline(
    config: &AppConfig,
    memory: bool,
    run_type: RunType,
    days_back: Option<u32>,
) -> anyhow::Result<()> {
    let gateway = open_gateway(config, memory).await?;
    let runner = build_runner(config, gateway)?;
    let service = IntelligenceService::new(Arc::new(runner), config.default_days_back);

    let report = service.run_blocking(run_type, days_back).await?;
    print!("{}", format_report(&report));
    if !report.is_success() {
        anyhow::bail!(
            "pipeline run failed: {}",
            report.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

/// Print a stored briefing as pretty JSON.
///
/// # Errors
///
/// Returns an error if storage is unreachable or no briefing matches.
pub(crate) async fn show_briefing(
    config: &AppConfig,
    memory: bool,
    date: Option<NaiveDate>,
) -> anyhow::Result<()> {
    let gateway = open_gateway(config, memory).await?;
    let briefing = match date {
        Some(d) => gateway.briefing_by_date(d).await?,
        None => gateway.latest_briefing().await?,
    };
    let Some(briefing) = briefing else {
        match date {
            Some(d) => anyhow::bail!("no briefing for {d}"),
            None => anyhow::bail!("no briefings generated yet"),
        }
    };
    println!("{}", serde_json::to_string_pretty(&briefing)?);
    Ok(())
}

/// Normalize raw model text from `file` and print the payload.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub(crate) fn run_extract(file: &Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", file.display()))?;
    if let Err(reason) = stintel_pipeline::extract_json_object(&text) {
        eprintln!("warning: {reason}; printing the empty payload");
    }
    let payload = stintel_pipeline::parse_analysis(&text, AnalysisLimits::default(), Utc::now());
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}
