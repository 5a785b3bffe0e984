//! Concurrent fan-out over every configured source.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use stintel_core::{CollectedRecord, SourceCollector, SourceError};

/// Records from one source, or the reason it produced none.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceResult {
    pub records: Vec<CollectedRecord>,
    pub error: Option<SourceError>,
}

impl SourceResult {
    fn failed(error: SourceError) -> Self {
        Self {
            records: Vec::new(),
            error: Some(error),
        }
    }
}

/// Runs every collector in its own task with a per-source timeout.
///
/// Each slot in the result is filled: failures, timeouts and panics become
/// an empty, error-tagged [`SourceResult`] and never affect sibling sources.
#[derive(Clone)]
pub struct CollectionCoordinator {
    collectors: Vec<Arc<dyn SourceCollector>>,
    unavailable: Vec<String>,
    timeout: Duration,
}

impl std::fmt::Debug for CollectionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.collectors.iter().map(|c| c.name()).collect();
        f.debug_struct("CollectionCoordinator")
            .field("collectors", &names)
            .field("unavailable", &self.unavailable)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl CollectionCoordinator {
    #[must_use]
    pub fn new(collectors: Vec<Arc<dyn SourceCollector>>, timeout: Duration) -> Self {
        Self {
            collectors,
            unavailable: Vec::new(),
            timeout,
        }
    }

    /// Register source slots that have no collector; they always report
    /// [`SourceError::NotConfigured`].
    #[must_use]
    pub fn with_unavailable<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unavailable.extend(names.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn source_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .collectors
            .iter()
            .map(|c| c.name().to_string())
            .chain(self.unavailable.iter().cloned())
            .collect();
        names.sort();
        names
    }

    pub async fn collect_all(&self, days_back: u32) -> BTreeMap<String, SourceResult> {
        let timeout = self.timeout;
        let tasks = self.collectors.iter().map(|collector| {
            let collector = Arc::clone(collector);
            let name = collector.name().to_string();
            let handle = tokio::spawn(async move {
                tokio::time::timeout(timeout, collector.collect(days_back)).await
            });
            async move {
                let result = match handle.await {
                    Ok(Ok(Ok(records))) => SourceResult {
                        records,
                        error: None,
                    },
                    Ok(Ok(Err(e))) => SourceResult::failed(e),
                    Ok(Err(_elapsed)) => SourceResult::failed(SourceError::TimedOut(timeout)),
                    Err(join_err) => SourceResult::failed(SourceError::Aborted(join_err.to_string())),
                };
                (name, result)
            }
        });

        let mut results: BTreeMap<String, SourceResult> = join_all(tasks).await.into_iter().collect();

        for name in &self.unavailable {
            results.entry(name.clone()).or_insert_with(|| {
                SourceResult::failed(SourceError::NotConfigured(format!(
                    "no base URL configured for {name}"
                )))
            });
        }

        for (name, result) in &results {
            match &result.error {
                None => tracing::info!(source = %name, records = result.records.len(), "collect: source finished"),
                Some(e) => tracing::warn!(source = %name, error = %e, "collect: source failed"),
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use stintel_core::Article;

    use super::*;

    struct Fixed(&'static str, usize);

    #[async_trait]
    impl SourceCollector for Fixed {
        fn name(&self) -> &str {
            self.0
        }
        async fn collect(&self, _days_back: u32) -> Result<Vec<CollectedRecord>, SourceError> {
            Ok((0..self.1)
                .map(|i| {
                    CollectedRecord::Article(Article {
                        url: format!("https://{}/{i}", self.0),
                        title: format!("{} {i}", self.0),
                        source: None,
                        summary: None,
                        author: None,
                        published_at: None,
                        tags: vec![],
                    })
                })
                .collect())
        }
    }

    struct Failing;

    #[async_trait]
    impl SourceCollector for Failing {
        fn name(&self) -> &str {
            "startup"
        }
        async fn collect(&self, _days_back: u32) -> Result<Vec<CollectedRecord>, SourceError> {
            Err(SourceError::Unavailable("connection refused".into()))
        }
    }

    struct Slow;

    #[async_trait]
    impl SourceCollector for Slow {
        fn name(&self) -> &str {
            "slow"
        }
        async fn collect(&self, _days_back: u32) -> Result<Vec<CollectedRecord>, SourceError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(vec![])
        }
    }

    struct Panicking;

    #[async_trait]
    impl SourceCollector for Panicking {
        fn name(&self) -> &str {
            "panics"
        }
        async fn collect(&self, _days_back: u32) -> Result<Vec<CollectedRecord>, SourceError> {
            panic!("collector bug")
        }
    }

    #[tokio::test]
    async fn one_failure_leaves_other_slots_intact() {
        let coordinator = CollectionCoordinator::new(
            vec![Arc::new(Fixed("news", 2)), Arc::new(Failing), Arc::new(Fixed("github", 1))],
            Duration::from_secs(5),
        );
        let results = coordinator.collect_all(7).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results["news"].records.len(), 2);
        assert_eq!(results["github"].records.len(), 1);
        assert!(results["startup"].records.is_empty());
        assert!(matches!(results["startup"].error, Some(SourceError::Unavailable(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_source_times_out() {
        let coordinator =
            CollectionCoordinator::new(vec![Arc::new(Slow)], Duration::from_secs(30));
        let results = coordinator.collect_all(1).await;
        assert_eq!(
            results["slow"].error,
            Some(SourceError::TimedOut(Duration::from_secs(30)))
        );
    }

    #[tokio::test]
    async fn panic_is_contained() {
        let coordinator = CollectionCoordinator::new(
            vec![Arc::new(Panicking), Arc::new(Fixed("news", 1))],
            Duration::from_secs(5),
        );
        let results = coordinator.collect_all(1).await;
        assert!(matches!(results["panics"].error, Some(SourceError::Aborted(_))));
        assert_eq!(results["news"].records.len(), 1);
    }

    #[tokio::test]
    async fn unconfigured_sources_get_tagged_slots() {
        let coordinator = CollectionCoordinator::new(vec![], Duration::from_secs(5))
            .with_unavailable(["github"]);
        let results = coordinator.collect_all(1).await;
        assert!(matches!(results["github"].error, Some(SourceError::NotConfigured(_))));
        assert_eq!(coordinator.source_names(), vec!["github".to_string()]);
    }
}
