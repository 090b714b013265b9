// tests/poll_cycle.rs
//! Orchestrator behavior: dedup, idempotent processing, failure isolation,
//! cursor advancement, and cooperative shutdown.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use news_watcher::article::Article;
use news_watcher::feed::ArticleSource;
use news_watcher::matcher::{KeywordMatcher, MatchResult};
use news_watcher::notify::Notifier;
use news_watcher::poller::{Poller, PollerCfg};
use news_watcher::state::StateStore;
use tokio::sync::watch;

fn article(v: serde_json::Value) -> Article {
    serde_json::from_value(v).expect("article json")
}

fn aapl_matcher() -> KeywordMatcher {
    KeywordMatcher::new(&["AAPL".to_string()], &[], &[])
}

#[derive(Clone)]
struct StaticFeed {
    articles: Arc<Vec<Article>>,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl StaticFeed {
    fn ok(articles: Vec<Article>) -> Self {
        Self {
            articles: Arc::new(articles),
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn failing() -> Self {
        Self {
            articles: Arc::new(Vec::new()),
            fail: true,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl ArticleSource for StaticFeed {
    async fn fetch_window(
        &self,
        _start: Option<i64>,
        _end: i64,
        _limit: usize,
    ) -> Result<Vec<Article>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            bail!("connection refused");
        }
        Ok(self.articles.as_ref().clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

#[derive(Clone, Default)]
struct RecordingNotifier {
    sent: Arc<Mutex<Vec<String>>>,
    fail: Arc<AtomicBool>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_alert(&self, article: &Article, _matches: &MatchResult) -> bool {
        self.sent
            .lock()
            .unwrap()
            .push(article.id.clone().unwrap_or_default());
        !self.fail.load(Ordering::SeqCst)
    }
}

fn poller_with(
    feed: StaticFeed,
    notifier: RecordingNotifier,
    dir: &tempfile::TempDir,
) -> Poller {
    let state = StateStore::load(dir.path().join("state.json"));
    Poller::new(
        Box::new(feed),
        aapl_matcher(),
        Box::new(notifier),
        state,
        PollerCfg {
            interval_secs: 3600,
            fetch_limit: 100,
        },
    )
}

fn three_articles_one_match() -> Vec<Article> {
    vec![
        article(serde_json::json!({
            "_id": "m1",
            "companiesMentioned": [{"ticker": "AAPL"}],
            "content": {"headline": "AAPL pops"}
        })),
        article(serde_json::json!({"_id": "n1", "companiesMentioned": [{"ticker": "NFLX"}]})),
        article(serde_json::json!({"_id": "n2"})),
    ]
}

#[tokio::test]
async fn every_fetched_article_is_marked_processed() {
    let dir = tempfile::tempdir().unwrap();
    let notifier = RecordingNotifier::default();
    let mut poller = poller_with(
        StaticFeed::ok(three_articles_one_match()),
        notifier.clone(),
        &dir,
    );

    let summary = poller.poll_once().await;
    assert_eq!(summary.fetched, 3);
    assert_eq!(summary.matched, 1);

    assert_eq!(*notifier.sent.lock().unwrap(), vec!["m1"]);
    for id in ["m1", "n1", "n2"] {
        assert!(poller.state().is_processed(id));
    }
    assert!(poller.state().last_checked_at().is_some());
}

#[tokio::test]
async fn failed_delivery_still_marks_processed_and_advances_cursor() {
    let dir = tempfile::tempdir().unwrap();
    let notifier = RecordingNotifier::default();
    notifier.fail.store(true, Ordering::SeqCst);
    let mut poller = poller_with(
        StaticFeed::ok(three_articles_one_match()),
        notifier.clone(),
        &dir,
    );

    let summary = poller.poll_once().await;
    assert_eq!(summary.matched, 1);
    assert_eq!(notifier.sent.lock().unwrap().len(), 1);
    assert!(poller.state().is_processed("m1"));
    assert!(poller.state().last_checked_at().is_some());
}

#[tokio::test]
async fn second_cycle_does_not_realert() {
    let dir = tempfile::tempdir().unwrap();
    let notifier = RecordingNotifier::default();
    let mut poller = poller_with(
        StaticFeed::ok(three_articles_one_match()),
        notifier.clone(),
        &dir,
    );

    let first = poller.poll_once().await;
    let second = poller.poll_once().await;
    assert_eq!(first.matched, 1);
    assert_eq!(second.matched, 0);
    assert_eq!(notifier.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn article_without_id_is_never_processed_or_alerted() {
    let dir = tempfile::tempdir().unwrap();
    let notifier = RecordingNotifier::default();
    // Would match, but carries no id under either wire key.
    let no_id = article(serde_json::json!({
        "companiesMentioned": [{"ticker": "AAPL"}]
    }));
    let mut poller = poller_with(StaticFeed::ok(vec![no_id]), notifier.clone(), &dir);

    let summary = poller.poll_once().await;
    assert_eq!(summary.fetched, 1);
    assert_eq!(summary.matched, 0);
    assert!(notifier.sent.lock().unwrap().is_empty());
    assert!(poller.state().snapshot().processed_article_ids.is_empty());
}

#[tokio::test]
async fn fetch_failure_is_an_empty_batch_and_the_cursor_still_advances() {
    let dir = tempfile::tempdir().unwrap();
    let mut poller = poller_with(StaticFeed::failing(), RecordingNotifier::default(), &dir);

    let summary = poller.poll_once().await;
    assert_eq!(summary.fetched, 0);
    let first = poller.state().last_checked_at().expect("cursor set");

    let _ = poller.poll_once().await;
    let second = poller.state().last_checked_at().expect("cursor still set");
    assert!(second >= first);
}

#[tokio::test]
async fn dedup_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let notifier = RecordingNotifier::default();
    {
        let mut poller = poller_with(
            StaticFeed::ok(three_articles_one_match()),
            notifier.clone(),
            &dir,
        );
        poller.poll_once().await;
    }

    // Fresh poller over the same state file sees the same batch again.
    let mut poller = poller_with(
        StaticFeed::ok(three_articles_one_match()),
        notifier.clone(),
        &dir,
    );
    let summary = poller.poll_once().await;
    assert_eq!(summary.matched, 0);
    assert_eq!(notifier.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn shutdown_interrupts_the_wait_between_cycles() {
    let dir = tempfile::tempdir().unwrap();
    let feed = StaticFeed::ok(Vec::new());
    let calls = feed.calls.clone();
    let poller = poller_with(feed, RecordingNotifier::default(), &dir);

    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn(poller.run(rx));
    tx.send(true).unwrap();

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("loop exits promptly despite the 3600s interval")
        .unwrap();
    // Only the startup cycle ran; the stop request landed during the wait.
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
