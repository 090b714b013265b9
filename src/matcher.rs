// src/matcher.rs
//! Watch-list matching for incoming articles. Pure classification, no I/O;
//! the poll loop decides what to do with the outcome.

use std::collections::HashSet;

use tracing::debug;

use crate::article::Article;

/// The specific watched values found in one article, with the article-side
/// casing preserved. Empty on all three lists means "processed, no alert".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchResult {
    pub symbols: Vec<String>,
    pub topics: Vec<String>,
    pub event_types: Vec<String>,
}

impl MatchResult {
    pub fn has_matches(&self) -> bool {
        !(self.symbols.is_empty() && self.topics.is_empty() && self.event_types.is_empty())
    }
}

/// Case-insensitive matcher over three watch-lists. Entries are lowercased
/// once at construction; the lists are immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    symbols: HashSet<String>,
    topics: HashSet<String>,
    event_types: HashSet<String>,
}

fn lowered(items: &[String]) -> HashSet<String> {
    items.iter().map(|s| s.to_lowercase()).collect()
}

impl KeywordMatcher {
    pub fn new(symbols: &[String], topics: &[String], event_types: &[String]) -> Self {
        Self {
            symbols: lowered(symbols),
            topics: lowered(topics),
            event_types: lowered(event_types),
        }
    }

    /// Evaluate all three field rules independently and union the results.
    pub fn match_article(&self, article: &Article) -> MatchResult {
        let result = MatchResult {
            symbols: self.match_symbols(article),
            topics: self.match_topics(article),
            event_types: self.match_event_types(article),
        };

        if result.has_matches() {
            debug!(
                symbols = ?result.symbols,
                topics = ?result.topics,
                events = ?result.event_types,
                "article matched"
            );
        }

        result
    }

    /// `companies_mentioned[].ticker` first (duplicates collapse, first
    /// appearance wins), then `symbol_code` if not already present.
    fn match_symbols(&self, article: &Article) -> Vec<String> {
        let mut matched: Vec<String> = Vec::new();

        for company in &article.companies_mentioned {
            let ticker = company.ticker.as_str();
            if !ticker.is_empty()
                && self.symbols.contains(&ticker.to_lowercase())
                && !matched.iter().any(|m| m == ticker)
            {
                matched.push(ticker.to_string());
            }
        }

        if let Some(code) = article.symbol_code.as_deref() {
            if !code.is_empty()
                && self.symbols.contains(&code.to_lowercase())
                && !matched.iter().any(|m| m == code)
            {
                matched.push(code.to_string());
            }
        }

        matched
    }

    fn match_topics(&self, article: &Article) -> Vec<String> {
        article
            .classification
            .topics
            .iter()
            .filter(|t| self.topics.contains(&t.to_lowercase()))
            .cloned()
            .collect()
    }

    fn match_event_types(&self, article: &Article) -> Vec<String> {
        article
            .events_extracted
            .iter()
            .map(|e| e.event_type.as_str())
            .filter(|et| !et.is_empty() && self.event_types.contains(&et.to_lowercase()))
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn article(v: serde_json::Value) -> Article {
        serde_json::from_value(v).expect("article json")
    }

    fn matcher(symbols: &[&str], topics: &[&str], events: &[&str]) -> KeywordMatcher {
        let owned = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        KeywordMatcher::new(&owned(symbols), &owned(topics), &owned(events))
    }

    #[test]
    fn case_insensitive_and_preserves_article_casing() {
        let m = matcher(&["AAPL"], &[], &[]);
        let a = article(json!({"companiesMentioned": [{"ticker": "aapl"}]}));
        let r = m.match_article(&a);
        assert_eq!(r.symbols, vec!["aapl"]);
        assert!(r.has_matches());
    }

    #[test]
    fn duplicate_tickers_collapse_in_first_appearance_order() {
        let m = matcher(&["aapl", "msft"], &[], &[]);
        let a = article(json!({"companiesMentioned": [
            {"ticker": "MSFT"}, {"ticker": "AAPL"}, {"ticker": "MSFT"}
        ]}));
        assert_eq!(m.match_article(&a).symbols, vec!["MSFT", "AAPL"]);
    }

    #[test]
    fn symbol_code_unions_without_duplicating() {
        let m = matcher(&["aapl", "tsla"], &[], &[]);
        let both = article(json!({
            "companiesMentioned": [{"ticker": "AAPL"}],
            "symbolCode": "TSLA"
        }));
        assert_eq!(m.match_article(&both).symbols, vec!["AAPL", "TSLA"]);

        let dup = article(json!({
            "companiesMentioned": [{"ticker": "AAPL"}],
            "symbolCode": "AAPL"
        }));
        assert_eq!(m.match_article(&dup).symbols, vec!["AAPL"]);
    }

    #[test]
    fn watched_topic_selects_only_listed_entries() {
        let m = matcher(&[], &["earnings"], &[]);
        let a = article(json!({"classification": {"topics": ["Earnings", "Guidance"]}}));
        assert_eq!(m.match_article(&a).topics, vec!["Earnings"]);
    }

    #[test]
    fn empty_event_types_do_not_match() {
        let m = matcher(&[], &[], &["acquisition"]);
        let a = article(json!({"eventsExtracted": [
            {"eventType": ""}, {"eventType": "Acquisition"}
        ]}));
        assert_eq!(m.match_article(&a).event_types, vec!["Acquisition"]);
    }

    #[test]
    fn no_matches_yields_empty_result() {
        let m = matcher(&["aapl"], &["earnings"], &["acquisition"]);
        let a = article(json!({
            "companiesMentioned": [{"ticker": "NFLX"}],
            "classification": {"topics": ["Weather"]},
            "eventsExtracted": [{"eventType": "other"}]
        }));
        let r = m.match_article(&a);
        assert!(!r.has_matches());
        assert_eq!(r, MatchResult::default());
    }

    #[test]
    fn missing_fields_match_nothing() {
        let m = matcher(&["aapl"], &["earnings"], &["acquisition"]);
        let a = article(json!({"_id": "bare"}));
        assert!(!m.match_article(&a).has_matches());
    }
}
