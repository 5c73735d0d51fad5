use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
mod middleware;

use axum::body::Body;
use axum::response::IntoResponse;
use http::{HeaderValue, StatusCode};
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::{GovernorError, GovernorLayer};

mod config;
mod error;
mod i18n;
mod models;
mod routes;
mod services;

use config::Config;
use error::AppError;
use services::content::ContentStore;
use services::init;
use services::poller::EventPoller;

pub struct AppState {
    pub config: Config,
    pub poller: Arc<EventPoller>,
    pub content: ContentStore,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    init::init_tracing();
    let config = Config::from_env()?;

    tracing::info!("Starting {}", i18n::t("app.name"));

    let poller = init::build_event_poller(&config)?;
    let content = ContentStore::new(&config.content.dir);
    tracing::info!("Serving content from {}", config.content.dir.display());

    let app_state = Arc::new(AppState {
        config: config.clone(),
        poller,
        content,
    });

    // Create shutdown notifier for background workers and std threads
    let (shutdown_tx, _shutdown_rx) = tokio::sync::broadcast::channel::<()>(1);
    let thread_shutdown = Arc::new(AtomicBool::new(false));

    // Spawn background workers (returns handles so we can stop them on shutdown)
    let bg_handles = init::spawn_background_workers(app_state.clone(), shutdown_tx.clone());

    // Rate limiter for the public API.
    // The error handler returns a proper 429 status and Retry-After header when limits are exceeded.
    let mut api_builder = GovernorConfigBuilder::default();
    api_builder.per_second(config.rate_limit.api_per_second.into());
    api_builder.burst_size(config.rate_limit.api_burst);
    api_builder.error_handler(|error: GovernorError| -> http::Response<Body> {
        match error {
            GovernorError::TooManyRequests { wait_time, headers } => {
                // Same error shape as every other API error
                let mut resp = AppError::RateLimited
                    .with_details(serde_json::json!({ "retry_after_seconds": wait_time }))
                    .into_response();

                if let Some(hmap) = headers {
                    for (name, value) in hmap.iter() {
                        resp.headers_mut().append(name.clone(), value.clone());
                    }
                }

                if let Ok(value) = HeaderValue::from_str(&wait_time.to_string()) {
                    resp.headers_mut().insert(http::header::RETRY_AFTER, value);
                }

                resp
            }
            GovernorError::UnableToExtractKey => {
                AppError::BadRequest("Unable to determine client IP for rate limiting".to_string())
                    .into_response()
            }
            GovernorError::Other { code, msg, headers } => {
                let body = msg.unwrap_or_else(|| "Rate limiting error".to_string());
                let mut resp = http::Response::new(Body::from(body));
                let status = StatusCode::from_u16(code.as_u16())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                *resp.status_mut() = status;
                if let Some(hmap) = headers {
                    for (name, value) in hmap.iter() {
                        resp.headers_mut().append(name.clone(), value.clone());
                    }
                }
                resp
            }
        }
    });

    let api_gov_conf = Arc::new(
        api_builder
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Failed to build API governor config"))?,
    );

    // Background cleanup for limiter storage
    let api_cleaner = {
        let limiter = api_gov_conf.limiter().clone();
        let interval = Duration::from_secs(60);
        let flag = thread_shutdown.clone();
        std::thread::spawn(move || {
            // Use smaller sleep granularity to allow quick shutdown.
            let tick = Duration::from_secs(1);
            loop {
                for _ in 0..interval.as_secs() {
                    if flag.load(Ordering::SeqCst) {
                        tracing::info!("API rate limiter cleanup thread exiting");
                        return;
                    }
                    std::thread::sleep(tick);
                }
                tracing::debug!("api rate limiter size: {}", limiter.len());
                limiter.retain_recent();
            }
        })
    };

    let api_rate_layer = GovernorLayer {
        config: api_gov_conf.clone(),
    };

    let frontend_origin = config
        .server
        .frontend_url
        .parse::<HeaderValue>()
        .map_err(|_| {
            AppError::Config(format!("invalid FRONTEND_URL {}", config.server.frontend_url))
        })?;

    // Build router
    let mut app = Router::new()
        // Health check
        .route("/health", get(routes::health::health_check))
        // Event board and site content (rate limited)
        .nest("/api", routes::api_router().layer(api_rate_layer))
        // Add shared state
        .with_state(app_state.clone());

    // Static site pages
    if let Some(dir) = &config.server.static_dir {
        tracing::info!("Serving static site from {}", dir.display());
        app = app.fallback_service(ServeDir::new(dir));
    }

    let app = app
        // CSP middleware: set Content-Security-Policy headers
        .layer(axum::middleware::from_fn(middleware::csp::csp_middleware))
        // Add middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(frontend_origin)
                .allow_methods([http::Method::GET, http::Method::POST, http::Method::OPTIONS])
                .allow_headers([http::header::CONTENT_TYPE, http::header::ACCEPT]),
        );

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);

    tracing::info!("Server listening on {}", addr);

    // Select between the server future and a signal future. When a shutdown
    // signal is received we notify the poller and the cleanup thread, then
    // drop the server future (which stops accepting new connections).
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let server_fut = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    );

    let thread_shutdown_clone = thread_shutdown.clone();

    let signal_fut = async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut term) => {
                    tokio::select! {
                        _ = ctrl_c => {},
                        _ = term.recv() => {},
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to bind SIGTERM, waiting for Ctrl+C only: {}", e);
                    let _ = ctrl_c.await;
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
        }

        tracing::info!("Shutdown signal received, notifying background workers and threads");
        thread_shutdown_clone.store(true, Ordering::SeqCst);
    };

    tokio::select! {
        res = server_fut => {
            if let Err(e) = res {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = signal_fut => {
            tracing::info!("Signal handler completed; server future dropped to stop accepting new connections");
        }
    }

    // Give the poller some time to finish an in-flight fetch.
    let shutdown_wait = Duration::from_secs(15);
    tracing::info!(
        "Waiting up to {}s for background workers to exit",
        shutdown_wait.as_secs()
    );
    for handle in bg_handles {
        handle.stop(shutdown_wait).await;
    }

    // The cleanup thread checks `thread_shutdown` once a second.
    thread_shutdown.store(true, Ordering::SeqCst);
    if let Err(e) = api_cleaner.join() {
        tracing::warn!("API cleanup thread join failed: {:?}", e);
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
