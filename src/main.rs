use anyhow::Context;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dpgf_engine::config::Config;
use dpgf_engine::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dpgf_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("invalid configuration")?;
    let addr = config.bind_addr()?;

    info!(
        "DPGF defaults: TVA {}%, currency {} dp, quantity {} dp",
        config.default_tva_percentage, config.precision.currency, config.precision.quantity
    );

    let app = build_router(AppState::new(config)).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("dpgf-engine listening on http://{}", addr);

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
