// src/poller.rs
//! The orchestrator: fetch → dedup → match → notify → persist on a fixed
//! interval, until a shutdown signal arrives.
//!
//! One cycle never overlaps another, and no failure inside a cycle stops the
//! loop; everything recoverable is logged and the next tick proceeds on
//! schedule. Shutdown is cooperative and only honored between cycles.

use std::time::Duration;

use chrono::Utc;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::article::Article;
use crate::feed::ArticleSource;
use crate::matcher::KeywordMatcher;
use crate::notify::Notifier;
use crate::state::StateStore;

/// One-time metrics registration (so series show up on an exporter, if one
/// is installed; the facade no-ops otherwise).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("poll_cycles_total", "Completed poll cycles.");
        describe_counter!("articles_fetched_total", "Articles returned by the feed.");
        describe_counter!("articles_matched_total", "Articles that matched a watch-list.");
        describe_counter!("alerts_sent_total", "Alerts fully delivered by the notifier.");
        describe_counter!("feed_errors_total", "Fetch failures treated as empty batches.");
        describe_gauge!("poll_last_run_ts", "Unix ms when the last cycle completed.");
    });
}

#[derive(Clone, Copy, Debug)]
pub struct PollerCfg {
    pub interval_secs: u64,
    pub fetch_limit: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub fetched: usize,
    pub matched: usize,
}

pub struct Poller {
    feed: Box<dyn ArticleSource>,
    matcher: KeywordMatcher,
    notifier: Box<dyn Notifier>,
    state: StateStore,
    cfg: PollerCfg,
}

impl Poller {
    pub fn new(
        feed: Box<dyn ArticleSource>,
        matcher: KeywordMatcher,
        notifier: Box<dyn Notifier>,
        state: StateStore,
        cfg: PollerCfg,
    ) -> Self {
        Self {
            feed,
            matcher,
            notifier,
            state,
            cfg,
        }
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    /// Run until `shutdown` flips to true (or its sender goes away). The
    /// first cycle starts immediately; a stop request interrupts the wait
    /// between cycles, never a cycle in progress.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let interval = Duration::from_secs(self.cfg.interval_secs);

        'poll: loop {
            self.poll_once().await;

            let sleep = tokio::time::sleep(interval);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break 'poll;
                        }
                    }
                    _ = &mut sleep => break,
                }
            }
        }

        info!("poll loop stopped");
    }

    /// One fetch-process-advance cycle. Total: every failure mode inside is
    /// recovered locally, so the loop above never sees an error.
    pub async fn poll_once(&mut self) -> CycleSummary {
        ensure_metrics_described();

        let now = Utc::now().timestamp_millis();
        let start = self.state.last_checked_at();
        info!(since = ?start, "polling for articles");

        let articles = match self
            .feed
            .fetch_window(start, now, self.cfg.fetch_limit)
            .await
        {
            Ok(batch) => batch,
            Err(e) => {
                warn!(
                    source = self.feed.name(),
                    error = ?e,
                    "fetch failed, treating batch as empty"
                );
                counter!("feed_errors_total").increment(1);
                Vec::new()
            }
        };

        let mut summary = CycleSummary {
            fetched: articles.len(),
            matched: 0,
        };
        info!(fetched = summary.fetched, "fetched articles");

        for article in &articles {
            if self.process_article(article).await {
                summary.matched += 1;
            }
        }

        // The cursor moves to `now` even when the fetch failed; the missed
        // window is not retried.
        self.state.update_last_checked(now);

        counter!("poll_cycles_total").increment(1);
        counter!("articles_fetched_total").increment(summary.fetched as u64);
        counter!("articles_matched_total").increment(summary.matched as u64);
        gauge!("poll_last_run_ts").set(now as f64);

        if summary.matched > 0 {
            info!(matched = summary.matched, "sent alerts this cycle");
        }

        summary
    }

    /// Returns true when the article matched (whether or not delivery
    /// succeeded). Skips never abort the rest of the batch.
    async fn process_article(&mut self, article: &Article) -> bool {
        let Some(id) = article.id.as_deref() else {
            warn!("article missing id, skipping");
            return false;
        };

        if self.state.is_processed(id) {
            return false;
        }

        let matches = self.matcher.match_article(article);
        if !matches.has_matches() {
            self.state.mark_processed(id);
            return false;
        }

        info!(headline = article.display_headline(), "match found");
        let delivered = self.notifier.send_alert(article, &matches).await;
        if delivered {
            counter!("alerts_sent_total").increment(1);
        } else {
            warn!(article_id = %id, "alert delivery failed; article will not be retried");
        }

        // Processed even on failed delivery: dedup wins over redelivery.
        self.state.mark_processed(id);
        true
    }
}
