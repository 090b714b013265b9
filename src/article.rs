// src/article.rs
//! Typed wire model for one news article and its display fallbacks.
//! All nested objects are optional; an absent object reads as empty and is
//! never an ingestion error.

use serde::{Deserialize, Deserializer};

/// Display summaries are cut to this many characters.
pub const SUMMARY_MAX_CHARS: usize = 300;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Article {
    /// Unique identifier used for dedup. The feed emits `_id`; older
    /// deployments used `articleId`.
    #[serde(rename = "_id", alias = "articleId")]
    pub id: Option<String>,
    pub companies_mentioned: Vec<CompanyMention>,
    pub symbol_code: Option<String>,
    pub classification: Classification,
    pub events_extracted: Vec<ExtractedEvent>,
    pub content: Content,
    pub source: Source,
    pub sentiment: Option<Sentiment>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CompanyMention {
    pub ticker: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Classification {
    #[serde(deserialize_with = "strings_only")]
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractedEvent {
    pub event_type: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Content {
    pub headline: Option<String>,
    pub subheadline: Option<String>,
    pub summary: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Source {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Sentiment {
    pub overall_sentiment: f64,
}

/// Keep string entries, silently drop anything else. The feed occasionally
/// mixes objects into `classification.topics`.
fn strings_only<'de, D>(de: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<serde_json::Value>::deserialize(de)?;
    Ok(raw
        .into_iter()
        .filter_map(|v| match v {
            serde_json::Value::String(s) => Some(s),
            _ => None,
        })
        .collect())
}

impl Article {
    /// Headline with fallback: headline → subheadline → fixed placeholder.
    pub fn display_headline(&self) -> &str {
        self.content
            .headline
            .as_deref()
            .or(self.content.subheadline.as_deref())
            .unwrap_or("No Headline")
    }

    /// Summary with fallback to body, cut to [`SUMMARY_MAX_CHARS`].
    pub fn display_summary(&self) -> String {
        self.content
            .summary
            .as_deref()
            .or(self.content.body.as_deref())
            .unwrap_or_default()
            .chars()
            .take(SUMMARY_MAX_CHARS)
            .collect()
    }

    pub fn display_url(&self) -> &str {
        self.source.url.as_deref().unwrap_or("#")
    }

    /// Bucket the overall sentiment score for display. Scores exactly at the
    /// thresholds read as Neutral; a missing sentiment object reads as N/A.
    pub fn sentiment_label(&self) -> &'static str {
        match &self.sentiment {
            None => "N/A",
            Some(s) if s.overall_sentiment > 0.2 => "Positive",
            Some(s) if s.overall_sentiment < -0.2 => "Negative",
            Some(_) => "Neutral",
        }
    }
}
