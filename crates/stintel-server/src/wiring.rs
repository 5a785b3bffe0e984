use std::sync::Arc;

use stintel_core::{AppConfig, PersistenceGateway, TextCompletion};
use stintel_llm::CompletionClient;
use stintel_pipeline::{CollectionCoordinator, PipelineRunner};

pub(crate) fn build_runner(
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
        tracing::info!(provider = ?client.provider(), model = %config.llm_model, "completion client configured");
        Some(Arc::new(client))
    } else {
        tracing::warn!("no LLM API key set; analysis and summaries will use fallbacks");
        None
    };

    Ok(PipelineRunner::new(gateway, coordinator, completion))
}
