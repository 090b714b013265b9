//! News Alert Service — Binary Entrypoint
//! Wires configuration, the feed client, matcher, state store, and Telegram
//! notifier, then runs the polling loop until SIGINT/SIGTERM.

use news_watcher::config::Config;
use news_watcher::feed::NewsFeedClient;
use news_watcher::matcher::KeywordMatcher;
use news_watcher::notify::TelegramNotifier;
use news_watcher::poller::{Poller, PollerCfg};
use news_watcher::state::StateStore;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Flip the shutdown channel on SIGINT or SIGTERM. The loop observes it
/// between cycles; an in-flight cycle runs to completion first.
fn spawn_signal_listener() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("installing SIGTERM handler");
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("received SIGINT, shutting down"),
                _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            info!("received ctrl-c, shutting down");
        }
        let _ = tx.send(true);
    });
    rx
}

#[tokio::main]
async fn main() {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = match Config::load_default() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = ?e, "configuration error");
            std::process::exit(1);
        }
    };

    let feed = match NewsFeedClient::new(&config.api.base_url, config.api.timeout_secs) {
        Ok(client) => client,
        Err(e) => {
            error!(error = ?e, "failed to build feed client");
            std::process::exit(1);
        }
    };
    let matcher = KeywordMatcher::new(
        &config.watched.symbols,
        &config.watched.topics,
        &config.watched.event_types,
    );
    let notifier = TelegramNotifier::new(
        config.telegram.bot_token.clone(),
        config.telegram.chat_ids.clone(),
        config.telegram.thread_id,
    );
    let state = StateStore::load(&config.state.path);

    info!(
        interval_secs = config.polling.interval_secs,
        symbols = config.watched.symbols.len(),
        topics = config.watched.topics.len(),
        event_types = config.watched.event_types.len(),
        "starting news alert service"
    );

    let shutdown = spawn_signal_listener();
    let poller = Poller::new(
        Box::new(feed),
        matcher,
        Box::new(notifier),
        state,
        PollerCfg {
            interval_secs: config.polling.interval_secs,
            fetch_limit: config.api.fetch_limit,
        },
    );
    poller.run(shutdown).await;

    info!("shutdown complete");
}
