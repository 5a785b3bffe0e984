//! Word tables for the deterministic enrichment heuristics.

/// Startup-news sentiment weights.
///
/// Keys are lowercase single words. Values in `(0.0, 1.0]` are positive,
/// in `[-1.0, 0.0)` are negative. The final score is clamped to `[-1.0, 1.0]`.
pub(crate) const SENTIMENT: &[(&str, f32)] = &[
    ("raises", 0.4),
    ("raised", 0.4),
    ("funding", 0.2),
    ("launch", 0.3),
    ("launches", 0.3),
    ("growth", 0.4),
    ("growing", 0.3),
    ("record", 0.3),
    ("profitable", 0.5),
    ("profit", 0.4),
    ("breakthrough", 0.5),
    ("surge", 0.4),
    ("soars", 0.5),
    ("expands", 0.3),
    ("partnership", 0.3),
    ("acquires", 0.2),
    ("success", 0.4),
    ("innovative", 0.3),
    ("unicorn", 0.5),
    ("wins", 0.4),
    ("layoffs", -0.6),
    ("layoff", -0.6),
    ("shutdown", -0.7),
    ("shuts", -0.6),
    ("bankrupt", -0.8),
    ("bankruptcy", -0.8),
    ("lawsuit", -0.5),
    ("sued", -0.5),
    ("breach", -0.6),
    ("hack", -0.5),
    ("decline", -0.4),
    ("declines", -0.4),
    ("downturn", -0.5),
    ("cuts", -0.4),
    ("fraud", -0.8),
    ("fails", -0.5),
    ("failed", -0.4),
    ("struggles", -0.4),
    ("loss", -0.4),
    ("losses", -0.4),
];

/// Category name and the phrases that select it, in priority order.
pub(crate) const CATEGORIES: &[(&str, &[&str])] = &[
    ("funding", &["raises", "raised", "funding", "series a", "series b", "seed round", "investment"]),
    ("acquisition", &["acquires", "acquired", "acquisition", "merger", "buys"]),
    ("ipo", &["ipo", "goes public", "public listing", "spac"]),
    ("layoffs", &["layoffs", "layoff", "job cuts", "downsizing"]),
    ("product_launch", &["launches", "launched", "unveils", "introduces", "release", "beta"]),
    ("partnership", &["partnership", "partners with", "teams up", "collaboration"]),
    ("regulation", &["regulation", "regulator", "antitrust", "ftc", "sec ", "compliance", "lawsuit"]),
    ("research", &["research", "paper", "study", "benchmark"]),
];

pub(crate) const INDUSTRIES: &[(&str, &[&str])] = &[
    ("artificial_intelligence", &["ai", "artificial intelligence", "machine learning", "llm", "gpt", "agent", "agents", "neural"]),
    ("fintech", &["fintech", "payments", "banking", "lending", "crypto", "defi", "insurance"]),
    ("healthtech", &["health", "medical", "clinical", "patient", "telehealth", "biotech", "drug"]),
    ("climate", &["climate", "carbon", "solar", "battery", "energy", "emissions", "ev"]),
    ("cybersecurity", &["security", "cybersecurity", "breach", "malware", "zero trust", "identity"]),
    ("developer_tools", &["developer", "devtools", "api", "sdk", "open source", "database", "infrastructure"]),
    ("ecommerce", &["ecommerce", "e-commerce", "retail", "marketplace", "shopping"]),
    ("edtech", &["education", "edtech", "learning platform", "students"]),
    ("mobility", &["mobility", "autonomous", "vehicle", "logistics", "delivery"]),
];

/// Round names, most specific first so "series b" wins over "seed".
pub(crate) const STAGES: &[(&str, &[&str])] = &[
    ("pre_seed", &["pre-seed", "pre seed", "preseed"]),
    ("seed", &["seed"]),
    ("series_a", &["series a"]),
    ("series_b", &["series b"]),
    ("series_c_plus", &["series c", "series d", "series e", "series f"]),
    ("growth", &["growth", "late stage", "late-stage"]),
    ("public", &["ipo", "public"]),
];

pub(crate) const TECHNOLOGIES: &[(&str, &[&str])] = &[
    ("llm", &["llm", "large language model", "gpt", "claude", "gemini"]),
    ("machine_learning", &["machine learning", "ml", "deep learning", "neural"]),
    ("ai_agents", &["agent", "agents", "agentic"]),
    ("blockchain", &["blockchain", "web3", "crypto", "ethereum", "solana"]),
    ("rust", &["rust"]),
    ("python", &["python"]),
    ("typescript", &["typescript", "javascript", "node"]),
    ("go", &["golang"]),
    ("kubernetes", &["kubernetes", "k8s"]),
    ("vector_database", &["vector database", "vector db", "embeddings", "rag"]),
    ("robotics", &["robot", "robotics", "humanoid"]),
    ("quantum", &["quantum"]),
];

pub(crate) const STOPWORDS: &[&str] = &[
    "about", "after", "also", "been", "being", "between", "both", "could", "does", "from",
    "have", "here", "into", "just", "more", "most", "much", "only", "other", "over", "said",
    "some", "such", "than", "that", "their", "them", "then", "there", "these", "they", "this",
    "those", "through", "today", "very", "what", "when", "where", "which", "while", "will",
    "with", "would", "your", "yours", "new", "news", "week", "year",
];

/// Score a text string using the startup lexicon.
///
/// Splits text into lowercase words, sums matching weights, and clamps
/// the result to `[-1.0, 1.0]`. Returns `0.0` for empty or unknown text.
#[must_use]
pub fn lexicon_score(text: &str) -> f32 {
    let mut score = 0.0_f32;
    for word in text.split_whitespace() {
        let w = word
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        if let Some(&(_, weight)) = SENTIMENT.iter().find(|(lex, _)| *lex == w) {
            score += weight;
        }
    }
    score.clamp(-1.0, 1.0)
}

/// Lowercased text padded and with punctuation collapsed to spaces, so
/// phrase lookups can match on word boundaries with `contains(" x ")`.
pub(crate) fn normalized(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push(' ');
    for c in text.chars() {
        if c.is_alphanumeric() || c == '-' {
            out.extend(c.to_lowercase());
        } else {
            out.push(' ');
        }
    }
    out.push(' ');
    out
}

pub(crate) fn contains_phrase(normalized_text: &str, phrase: &str) -> bool {
    normalized_text.contains(&format!(" {} ", phrase.trim()))
}

/// First table entry with any phrase present in the text.
pub(crate) fn first_match(
    normalized_text: &str,
    table: &[(&'static str, &[&str])],
) -> Option<&'static str> {
    table
        .iter()
        .find(|(_, phrases)| phrases.iter().any(|p| contains_phrase(normalized_text, p)))
        .map(|(name, _)| *name)
}

/// Every table entry with a phrase present in the text.
pub(crate) fn all_matches(
    normalized_text: &str,
    table: &[(&'static str, &[&str])],
) -> Vec<String> {
    table
        .iter()
        .filter(|(_, phrases)| phrases.iter().any(|p| contains_phrase(normalized_text, p)))
        .map(|(name, _)| (*name).to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_returns_zero() {
        assert_eq!(lexicon_score(""), 0.0);
    }

    #[test]
    fn unknown_text_returns_zero() {
        assert_eq!(lexicon_score("the quick brown fox"), 0.0);
    }

    #[test]
    fn funding_news_is_positive() {
        let score = lexicon_score("Acme raises $20M as revenue growth continues");
        assert!(score > 0.0, "expected positive score, got {score}");
    }

    #[test]
    fn layoff_news_is_negative() {
        let score = lexicon_score("Startup announces layoffs after failed pivot");
        assert!(score < 0.0, "expected negative score, got {score}");
    }

    #[test]
    fn score_clamps_to_negative_one() {
        let text = "fraud bankrupt bankruptcy shutdown layoffs";
        assert_eq!(lexicon_score(text), -1.0);
    }

    #[test]
    fn punctuation_stripped_from_words() {
        assert!(lexicon_score("unicorn!") > 0.0);
    }

    #[test]
    fn phrase_matching_respects_word_boundaries() {
        let text = normalized("Said the AI startup, raising a Series A.");
        assert!(contains_phrase(&text, "ai"));
        assert!(contains_phrase(&text, "series a"));
        assert!(!contains_phrase(&normalized("A fair deal"), "ai"));
    }

    #[test]
    fn stage_table_prefers_specific_rounds() {
        let text = normalized("pre-seed round led by Acme Ventures");
        assert_eq!(first_match(&text, STAGES), Some("pre_seed"));
    }
}
