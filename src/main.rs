use mimalloc::MiMalloc;
use practice_agenda::config::Config;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.basic.database_url,
        calendar_api = %cfg.google.calendar_api_base,
        calendar_id = %cfg.google.calendar_id,
        proxy = %cfg.google.proxy.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
        completion_mirror = ?cfg.billing.completion_mirror,
        loglevel = %cfg.basic.loglevel,
    );

    let pool = practice_agenda::db::connect(&cfg.basic.database_url).await?;
    let http = practice_agenda::google_oauth::build_http_client(&cfg.google)?;

    let state = practice_agenda::AgendaState::new(pool, http, &cfg);
    let app = practice_agenda::agenda_router(state);

    let listener = TcpListener::bind(&cfg.basic.listen_addr).await?;
    info!("HTTP server listening on {}", cfg.basic.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
