use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use salesdash_server::config::{AuthMode, Config};
use salesdash_server::state::AppState;

/// `salesdash health`: liveness probe for Docker HEALTHCHECK.
///
/// Calls `GET http://localhost:$SALESDASH_PORT/health`.
/// Exits 0 if the server responds with HTTP 200, exits 1 otherwise.
fn run_health_check() -> ! {
    let port = std::env::var("SALESDASH_PORT").unwrap_or_else(|_| "3000".to_string());
    let url = format!("http://localhost:{}/health", port);
    match ureq::get(&url).call() {
        Ok(resp) if resp.status() == 200 => std::process::exit(0),
        _ => std::process::exit(1),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(|s| s.as_str()) == Some("health") {
        run_health_check();
    }
    // Structured JSON logging. Level controlled via RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("salesdash=info".parse()?),
        )
        .json()
        .init();

    let cfg = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;
    let source = salesdash_source::from_config(&cfg.data_source)?;

    match &cfg.auth_mode {
        AuthMode::Jwt(_) => info!("JWT auth enabled"),
        AuthMode::None => info!("Auth disabled (SALESDASH_AUTH=none), all routes open"),
    }

    let state = Arc::new(AppState::new(cfg.clone(), source));
    state.warm_up().await;

    let addr = format!("0.0.0.0:{}", cfg.port);
    let app = salesdash_server::app::build_app(Arc::clone(&state));

    info!(port = cfg.port, "salesdash listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    Ok(())
}
