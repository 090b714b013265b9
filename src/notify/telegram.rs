// src/notify/telegram.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};

use super::{format_alert, Notifier};
use crate::article::Article;
use crate::matcher::MatchResult;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Sends formatted alerts through the Telegram Bot API, fanning out to every
/// configured chat. A failed chat is logged and reflected in the aggregate
/// flag; remaining chats are still attempted.
pub struct TelegramNotifier {
    api_base: String,
    bot_token: String,
    chat_ids: Vec<String>,
    thread_id: Option<i64>,
    client: Client,
    timeout: Duration,
}

#[derive(Serialize)]
struct SendMessagePayload<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_thread_id: Option<i64>,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, chat_ids: Vec<String>, thread_id: Option<i64>) -> Self {
        Self {
            api_base: TELEGRAM_API_BASE.to_string(),
            bot_token,
            chat_ids,
            thread_id,
            client: Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Point at a different API host (tests/tools).
    pub fn with_api_base(mut self, base: String) -> Self {
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }

    async fn send_to_chat(&self, chat_id: &str, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        let payload = SendMessagePayload {
            chat_id,
            text,
            parse_mode: "HTML",
            message_thread_id: self.thread_id,
        };
        self.client
            .post(&url)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .context("telegram post")?
            .error_for_status()
            .context("telegram non-2xx")?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_alert(&self, article: &Article, matches: &MatchResult) -> bool {
        let message = format_alert(article, matches);
        let mut all_sent = true;

        for chat_id in &self.chat_ids {
            match self.send_to_chat(chat_id, &message).await {
                Ok(()) => {
                    info!(chat_id = %chat_id, thread_id = ?self.thread_id, "sent alert")
                }
                Err(e) => {
                    warn!(
                        chat_id = %chat_id,
                        error = ?e,
                        "failed to send alert"
                    );
                    all_sent = false;
                }
            }
        }

        all_sent
    }
}
