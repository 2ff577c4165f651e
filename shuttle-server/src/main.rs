use std::process::ExitCode;
use std::sync::Arc;

use shuttle_server::cache::{CacheConfig, CachedFeedSource};
use shuttle_server::config::AppConfig;
use shuttle_server::domain::RouteGeometry;
use shuttle_server::feeds::{FeedClient, FeedKind, FeedSource, MockFeedClient};
use shuttle_server::tracker::{ManualRefresh, Refresher, Telemetry, Tracker};
use shuttle_server::web::{AppState, create_router};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    let telemetry = match &config.telemetry_url {
        Some(url) => Telemetry::with_endpoint(url.as_str())?,
        None => Telemetry::new(),
    };
    let tracker = Arc::new(Tracker::new(
        config.tracker.clone(),
        RouteGeometry::campus(),
        telemetry,
    ));

    let refresher = if config.use_mock {
        info!(dir = %config.mock_data_dir.display(), "serving mock feeds");
        start(&tracker, MockFeedClient::load(&config.mock_data_dir)?)
    } else {
        let client = FeedClient::new(config.feeds.clone())?;
        for kind in [FeedKind::Live, FeedKind::Schedule, FeedKind::Status] {
            if !client.is_configured(kind) {
                warn!(feed = %kind, "feed URL not set");
            }
        }
        start(&tracker, CachedFeedSource::new(client, &CacheConfig::default()))
    };

    let app = create_router(AppState::new(Arc::clone(&tracker), refresher), &config.static_dir);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "shuttle arrival board listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for ctrl-c");
            }
            info!("shutting down");
            tracker.shutdown();
        })
        .await?;
    Ok(())
}

/// Start the refresh loops for `source` and hand back its manual refresh.
fn start<S: FeedSource>(tracker: &Arc<Tracker>, source: S) -> Arc<dyn ManualRefresh> {
    let refresher = Arc::new(Refresher::new(Arc::clone(tracker), source));
    Arc::clone(&refresher).spawn();
    refresher
}
