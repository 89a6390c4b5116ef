use anyhow::{Context, Result};
use clap::Parser;
use qbr_pptx::TemplateMerger;
use qbr_server::{build_router, config::Config, state::AppState};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    let state = AppState::new(TemplateMerger::new().with_policy(config.policy));
    let app = build_router(state, config.max_body_bytes());

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    log::info!("QBR merge service listening on http://{}", addr);
    log::info!("  POST /process-pptx  merge qbr_data into a base64 PPTX");
    log::info!("  GET  /health        liveness probe");
    log::info!("Substitution policy: {}", config.policy);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
