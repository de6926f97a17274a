//! EcoScan: identify salvaged electronic components and suggest what to do with them.
//!
//! This is the app shell that wires the domains together. No business logic
//! lives here, only module declarations and startup.
//!
//! Domains:
//!   - capture: camera devices, frame capture, upload ingestion
//!   - llm: the hosted model behind classification and ideation
//!   - workflow: the scan state machine
//!   - server.rs / routes.rs: the HTTP surface

pub mod capture;
pub mod error;
pub mod llm;
pub mod routes;
pub mod server;
pub mod settings;
pub mod workflow;

use error::AppError;
use settings::Settings;

/// Entry point: load env files, start logging, serve until Ctrl-C.
pub async fn run() -> Result<(), AppError> {
    settings::load_env_files();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::from_env()?;
    log::info!(
        "[STARTUP] EcoScan v{} (provider: {}, timeout: {}s)",
        env!("CARGO_PKG_VERSION"),
        settings.provider,
        settings.timeout.as_secs()
    );

    server::run(settings).await
}
