// src/notify/mod.rs
pub mod telegram;

pub use telegram::TelegramNotifier;

use async_trait::async_trait;

use crate::article::Article;
use crate::matcher::MatchResult;

/// Outbound alert channel. Implementations fan out to their own
/// destinations internally and report one aggregate success flag.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_alert(&self, article: &Article, matches: &MatchResult) -> bool;
}

/// Render one matching article as a Telegram-flavoured HTML message.
pub fn format_alert(article: &Article, matches: &MatchResult) -> String {
    let summary = article.display_summary();
    let summary = if summary.is_empty() {
        "No summary available".to_string()
    } else {
        summary
    };

    let mut highlights = Vec::new();
    if !matches.symbols.is_empty() {
        highlights.push(format!("<b>Symbols:</b> {}", matches.symbols.join(", ")));
    }
    if !matches.topics.is_empty() {
        highlights.push(format!("<b>Topics:</b> {}", matches.topics.join(", ")));
    }
    if !matches.event_types.is_empty() {
        highlights.push(format!("<b>Events:</b> {}", matches.event_types.join(", ")));
    }
    let highlights = if highlights.is_empty() {
        "No specific matches".to_string()
    } else {
        highlights.join("\n")
    };

    format!(
        "\u{1F4F0} <b>{}</b>\n\n{}\n\n{}\n\n<b>Sentiment:</b> {}\n\n\u{1F517} <a href=\"{}\">Read more</a>",
        article.display_headline(),
        summary,
        highlights,
        article.sentiment_label(),
        article.display_url(),
    )
}
