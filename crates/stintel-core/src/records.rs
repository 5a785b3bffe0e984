//! Collected record variants and their natural dedup keys.
//!
//! Collectors convert loosely-shaped wire JSON into these structs; everything
//! downstream of the collector boundary works with the typed variants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Article,
    FundingRound,
    Launch,
    Repository,
    RepoSignal,
}

impl RecordKind {
    pub const ALL: [RecordKind; 5] = [
        RecordKind::Article,
        RecordKind::FundingRound,
        RecordKind::Launch,
        RecordKind::Repository,
        RecordKind::RepoSignal,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Article => "article",
            RecordKind::FundingRound => "funding_round",
            RecordKind::Launch => "launch",
            RecordKind::Repository => "repository",
            RecordKind::RepoSignal => "repo_signal",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown record kind: {s}"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub url: String,
    pub title: String,
    pub source: Option<String>,
    pub summary: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingRound {
    pub company: String,
    pub amount: Option<String>,
    pub round_type: Option<String>,
    #[serde(default)]
    pub investors: Vec<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub source: Option<String>,
    pub announced_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Launch {
    pub name: String,
    pub tagline: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub votes: Option<i64>,
    #[serde(default)]
    pub topics: Vec<String>,
    pub source: Option<String>,
    pub launched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub full_name: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub language: Option<String>,
    pub stars: Option<i64>,
    pub forks: Option<i64>,
    pub stars_today: Option<i64>,
    #[serde(default)]
    pub topics: Vec<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoSignal {
    pub signal_type: String,
    pub repository: String,
    pub indicator: String,
    pub description: Option<String>,
    pub strength: Option<f64>,
    pub detected_at: Option<DateTime<Utc>>,
}

/// One raw record from a collector, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CollectedRecord {
    Article(Article),
    FundingRound(FundingRound),
    Launch(Launch),
    Repository(Repository),
    RepoSignal(RepoSignal),
}

impl CollectedRecord {
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        match self {
            CollectedRecord::Article(_) => RecordKind::Article,
            CollectedRecord::FundingRound(_) => RecordKind::FundingRound,
            CollectedRecord::Launch(_) => RecordKind::Launch,
            CollectedRecord::Repository(_) => RecordKind::Repository,
            CollectedRecord::RepoSignal(_) => RecordKind::RepoSignal,
        }
    }

    /// Natural identity of the record within its kind.
    #[must_use]
    pub fn dedup_key(&self) -> String {
        match self {
            CollectedRecord::Article(a) => a.url.clone(),
            CollectedRecord::FundingRound(f) => f.link.clone().unwrap_or_else(|| {
                format!(
                    "{}|{}|{}",
                    f.company,
                    f.round_type.as_deref().unwrap_or_default(),
                    day_or_empty(f.announced_at)
                )
                .to_lowercase()
            }),
            CollectedRecord::Launch(l) => l
                .link
                .clone()
                .unwrap_or_else(|| format!("{}|{}", l.name, day_or_empty(l.launched_at)).to_lowercase()),
            CollectedRecord::Repository(r) => r.full_name.clone(),
            CollectedRecord::RepoSignal(s) => {
                let mut hasher = Sha256::new();
                hasher.update(s.signal_type.as_bytes());
                hasher.update(b"|");
                hasher.update(s.repository.as_bytes());
                hasher.update(b"|");
                hasher.update(s.indicator.as_bytes());
                hasher.update(b"|");
                hasher.update(day_or_empty(s.detected_at).as_bytes());
                format!("{:x}", hasher.finalize())
            }
        }
    }

    /// When the underlying event happened, as reported by the source.
    #[must_use]
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        match self {
            CollectedRecord::Article(a) => a.published_at,
            CollectedRecord::FundingRound(f) => f.announced_at,
            CollectedRecord::Launch(l) => l.launched_at,
            CollectedRecord::Repository(r) => r.updated_at,
            CollectedRecord::RepoSignal(s) => s.detected_at,
        }
    }

    /// Short human-readable label used in prompts and briefings.
    #[must_use]
    pub fn headline(&self) -> &str {
        match self {
            CollectedRecord::Article(a) => &a.title,
            CollectedRecord::FundingRound(f) => &f.company,
            CollectedRecord::Launch(l) => &l.name,
            CollectedRecord::Repository(r) => &r.full_name,
            CollectedRecord::RepoSignal(s) => &s.indicator,
        }
    }

    /// All free text of the record, joined for keyword and lexicon scans.
    #[must_use]
    pub fn text(&self) -> String {
        let parts: Vec<&str> = match self {
            CollectedRecord::Article(a) => {
                let mut v = vec![a.title.as_str()];
                v.extend(a.summary.as_deref());
                v.extend(a.tags.iter().map(String::as_str));
                v
            }
            CollectedRecord::FundingRound(f) => {
                let mut v = vec![f.company.as_str()];
                v.extend(f.round_type.as_deref());
                v.extend(f.description.as_deref());
                v
            }
            CollectedRecord::Launch(l) => {
                let mut v = vec![l.name.as_str()];
                v.extend(l.tagline.as_deref());
                v.extend(l.description.as_deref());
                v.extend(l.topics.iter().map(String::as_str));
                v
            }
            CollectedRecord::Repository(r) => {
                let mut v = vec![r.full_name.as_str()];
                v.extend(r.description.as_deref());
                v.extend(r.language.as_deref());
                v.extend(r.topics.iter().map(String::as_str));
                v
            }
            CollectedRecord::RepoSignal(s) => {
                let mut v = vec![s.signal_type.as_str(), s.indicator.as_str()];
                v.extend(s.description.as_deref());
                v
            }
        };
        parts.join(" ")
    }

    /// Serialize the variant body without its tag, for opaque storage.
    ///
    /// # Errors
    ///
    /// Returns a serde error if the body cannot be represented as JSON.
    pub fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            CollectedRecord::Article(a) => serde_json::to_value(a),
            CollectedRecord::FundingRound(f) => serde_json::to_value(f),
            CollectedRecord::Launch(l) => serde_json::to_value(l),
            CollectedRecord::Repository(r) => serde_json::to_value(r),
            CollectedRecord::RepoSignal(s) => serde_json::to_value(s),
        }
    }

    /// Inverse of [`CollectedRecord::to_payload`].
    ///
    /// # Errors
    ///
    /// Returns a serde error if `payload` does not match the shape of `kind`.
    pub fn from_payload(
        kind: RecordKind,
        payload: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            RecordKind::Article => CollectedRecord::Article(serde_json::from_value(payload)?),
            RecordKind::FundingRound => {
                CollectedRecord::FundingRound(serde_json::from_value(payload)?)
            }
            RecordKind::Launch => CollectedRecord::Launch(serde_json::from_value(payload)?),
            RecordKind::Repository => CollectedRecord::Repository(serde_json::from_value(payload)?),
            RecordKind::RepoSignal => CollectedRecord::RepoSignal(serde_json::from_value(payload)?),
        })
    }
}

fn day_or_empty(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Derived attributes attached once by the enrichment stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    pub category: Option<String>,
    pub sentiment: Option<f32>,
    pub industry: Option<String>,
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub technologies: Vec<String>,
    pub activity_score: Option<f32>,
    pub enriched_at: Option<DateTime<Utc>>,
}

/// A persisted record with its storage metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: i64,
    pub record: CollectedRecord,
    pub enrichment: Option<Enrichment>,
    pub is_enriched: bool,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredRecord {
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        self.record.kind()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn signal(indicator: &str) -> CollectedRecord {
        CollectedRecord::RepoSignal(RepoSignal {
            signal_type: "star_spike".into(),
            repository: "acme/widget".into(),
            indicator: indicator.into(),
            description: None,
            strength: Some(0.8),
            detected_at: Some(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()),
        })
    }

    #[test]
    fn kind_round_trips_through_str() {
        for kind in RecordKind::ALL {
            assert_eq!(kind.as_str().parse::<RecordKind>().unwrap(), kind);
        }
        assert!("tweet".parse::<RecordKind>().is_err());
    }

    #[test]
    fn article_dedup_key_is_url() {
        let rec = CollectedRecord::Article(Article {
            url: "https://news.example/a".into(),
            title: "A".into(),
            source: None,
            summary: None,
            author: None,
            published_at: None,
            tags: vec![],
        });
        assert_eq!(rec.dedup_key(), "https://news.example/a");
    }

    #[test]
    fn funding_without_link_falls_back_to_company_round_and_day() {
        let rec = CollectedRecord::FundingRound(FundingRound {
            company: "Acme".into(),
            amount: Some("$5M".into()),
            round_type: Some("Seed".into()),
            investors: vec![],
            description: None,
            link: None,
            source: None,
            announced_at: Some(Utc.with_ymd_and_hms(2026, 2, 3, 9, 0, 0).unwrap()),
        });
        assert_eq!(rec.dedup_key(), "acme|seed|2026-02-03");
    }

    #[test]
    fn repo_signal_key_is_stable_hash() {
        let a = signal("stars doubled");
        let b = signal("stars doubled");
        let c = signal("forks doubled");
        assert_eq!(a.dedup_key(), b.dedup_key());
        assert_ne!(a.dedup_key(), c.dedup_key());
        assert_eq!(a.dedup_key().len(), 64);
    }

    #[test]
    fn payload_round_trip_keeps_variant() {
        let rec = signal("stars doubled");
        let payload = rec.to_payload().unwrap();
        assert!(payload.get("kind").is_none());
        let back = CollectedRecord::from_payload(RecordKind::RepoSignal, payload).unwrap();
        assert_eq!(back, rec);
    }
}
