//! Response shapes of the collector services and their conversion into
//! typed records. Fields the services sometimes omit are optional here;
//! entries missing their identity fields are dropped.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use stintel_core::{Article, FundingRound, Launch, RepoSignal, Repository};

/// Parse the timestamp formats the services emit: RFC 3339, RFC 2822 (RSS),
/// `YYYY-MM-DD HH:MM:SS` and bare dates.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[derive(Debug, Deserialize)]
pub struct NewsResponse {
    #[serde(default)]
    pub sources: BTreeMap<String, NewsSource>,
    #[serde(default)]
    pub total: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct NewsSource {
    #[serde(default)]
    pub articles: Vec<NewsArticle>,
}

#[derive(Debug, Deserialize)]
pub struct NewsArticle {
    pub title: Option<String>,
    pub url: Option<String>,
    pub source: Option<String>,
    pub timestamp: Option<String>,
    pub summary: Option<String>,
    pub author: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl NewsResponse {
    /// Flatten the per-source buckets; the bucket name backs a missing `source`.
    #[must_use]
    pub fn into_articles(self) -> Vec<Article> {
        self.sources
            .into_iter()
            .flat_map(|(bucket, source)| {
                source
                    .articles
                    .into_iter()
                    .filter_map(move |a| a.into_article(&bucket))
            })
            .collect()
    }
}

impl NewsArticle {
    fn into_article(self, bucket: &str) -> Option<Article> {
        let url = non_empty(self.url)?;
        let title = non_empty(self.title)?;
        let tags = self
            .metadata
            .as_ref()
            .and_then(|m| m.get("tags"))
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Some(Article {
            url,
            title,
            source: non_empty(self.source).or_else(|| Some(bucket.to_string())),
            summary: non_empty(self.summary),
            author: non_empty(self.author),
            published_at: self.timestamp.as_deref().and_then(parse_timestamp),
            tags,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct FundingResponse {
    #[serde(default)]
    pub funding_rounds: Vec<FundingWire>,
}

#[derive(Debug, Deserialize)]
pub struct FundingWire {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub round_type: Option<String>,
    pub amount: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub investors: Vec<String>,
    pub link: Option<String>,
    pub source: Option<String>,
}

impl FundingWire {
    #[must_use]
    pub fn into_record(self) -> Option<FundingRound> {
        Some(FundingRound {
            company: non_empty(self.name)?,
            amount: non_empty(self.amount),
            round_type: non_empty(self.round_type),
            investors: self.investors,
            description: non_empty(self.description),
            link: non_empty(self.link),
            source: non_empty(self.source),
            announced_at: self.date.as_deref().and_then(parse_timestamp),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct LaunchResponse {
    #[serde(default)]
    pub launches: Vec<LaunchWire>,
}

#[derive(Debug, Deserialize)]
pub struct LaunchWire {
    pub name: Option<String>,
    pub tagline: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub category: Option<String>,
    pub link: Option<String>,
    pub votes: Option<i64>,
    pub source: Option<String>,
}

impl LaunchWire {
    #[must_use]
    pub fn into_record(self) -> Option<Launch> {
        Some(Launch {
            name: non_empty(self.name)?,
            tagline: non_empty(self.tagline),
            description: non_empty(self.description),
            link: non_empty(self.link),
            votes: self.votes,
            topics: non_empty(self.category).into_iter().collect(),
            source: non_empty(self.source),
            launched_at: self.date.as_deref().and_then(parse_timestamp),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct TrendingResponse {
    #[serde(default)]
    pub repositories: Vec<RepositoryWire>,
}

#[derive(Debug, Deserialize)]
pub struct RepositoryWire {
    pub full_name: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub stars: Option<i64>,
    pub stars_today: Option<i64>,
    pub forks: Option<i64>,
    pub url: Option<String>,
    pub updated_at: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
}

impl RepositoryWire {
    #[must_use]
    pub fn into_record(self) -> Option<Repository> {
        Some(Repository {
            full_name: non_empty(self.full_name)?,
            description: non_empty(self.description),
            url: non_empty(self.url),
            language: non_empty(self.language),
            stars: self.stars,
            forks: self.forks,
            stars_today: self.stars_today,
            topics: self.topics,
            updated_at: self.updated_at.as_deref().and_then(parse_timestamp),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SignalsResponse {
    #[serde(default)]
    pub signals: Vec<SignalWire>,
}

#[derive(Debug, Deserialize)]
pub struct SignalWire {
    pub signal_type: Option<String>,
    pub repository_name: Option<String>,
    pub repository_url: Option<String>,
    pub indicator: Option<String>,
    pub confidence: Option<String>,
    pub date: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl SignalWire {
    #[must_use]
    pub fn into_record(self) -> Option<RepoSignal> {
        let repository = non_empty(self.repository_name)
            .or_else(|| non_empty(self.repository_url))
            .unwrap_or_else(|| "unknown".to_string());
        let strength = match self.confidence.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("high") => Some(0.9),
            Some("medium") => Some(0.6),
            Some("low") => Some(0.3),
            _ => None,
        };
        let description = self
            .metadata
            .as_ref()
            .and_then(|m| m.get("description"))
            .and_then(Value::as_str)
            .map(str::to_string);
        Some(RepoSignal {
            signal_type: non_empty(self.signal_type)?,
            repository,
            indicator: non_empty(self.indicator)?,
            description,
            strength,
            detected_at: self.date.as_deref().and_then(parse_timestamp),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_supported_timestamp_formats() {
        let rfc3339 = parse_timestamp("2026-03-01T10:30:00Z").unwrap();
        assert_eq!(rfc3339.hour(), 10);
        let rss = parse_timestamp("Sun, 01 Mar 2026 10:30:00 +0000").unwrap();
        assert_eq!(rss, rfc3339);
        let spaced = parse_timestamp("2026-03-01 10:30:00").unwrap();
        assert_eq!(spaced, rfc3339);
        let day = parse_timestamp("2026-03-01").unwrap();
        assert_eq!(day.day(), 1);
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn news_response_flattens_buckets_and_drops_incomplete_articles() {
        let body = json!({
            "sources": {
                "hackernews": {"articles": [
                    {"title": "Show HN: Rust ORM", "url": "https://hn/1", "timestamp": "2026-03-01"},
                    {"title": "No link"}
                ]},
                "techcrunch": {"articles": [
                    {"title": "Acme raises", "url": "https://tc/2", "source": "TechCrunch",
                     "metadata": {"tags": ["funding", "ai"]}}
                ]}
            },
            "total": 3
        });
        let parsed: NewsResponse = serde_json::from_value(body).unwrap();
        let articles = parsed.into_articles();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].source.as_deref(), Some("hackernews"));
        assert_eq!(articles[1].source.as_deref(), Some("TechCrunch"));
        assert_eq!(articles[1].tags, vec!["funding", "ai"]);
    }

    #[test]
    fn signal_confidence_maps_to_strength() {
        let wire: SignalWire = serde_json::from_value(json!({
            "signal_type": "emerging_technology",
            "repository_url": "https://github.com/acme/agent",
            "indicator": "rapid star growth",
            "confidence": "High",
            "date": "2026-03-02"
        }))
        .unwrap();
        let record = wire.into_record().unwrap();
        assert_eq!(record.strength, Some(0.9));
        assert_eq!(record.repository, "https://github.com/acme/agent");
    }

    #[test]
    fn funding_without_name_is_dropped() {
        let wire: FundingWire =
            serde_json::from_value(json!({"type": "Seed", "amount": "$2M"})).unwrap();
        assert!(wire.into_record().is_none());
    }
}
