//! Curio Kernel
//!
//! HTTP server and maintenance commands for the museum catalogue.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use curio_kernel::cli::{self, Cli, Command};
use curio_kernel::config::Config;
use curio_kernel::routes;
use curio_kernel::session;
use curio_kernel::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Cli::parse();

    // Initialize tracing
    init_tracing();

    // Load configuration from environment
    let config = Config::from_env().context("failed to load configuration")?;

    match args.command() {
        Command::Serve => serve(config).await,
        Command::CreateAdmin {
            email,
            password,
            username,
        } => {
            let user_id = cli::create_admin(&config, &email, &password, username.as_deref())
                .await
                .context("failed to create admin")?;
            println!("admin ready: user_id={user_id}");
            Ok(())
        }
        Command::Import { file } => {
            let report = cli::import_file(&config, &file).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to encode report")?
            );
            Ok(())
        }
    }
}

async fn serve(config: Config) -> Result<()> {
    info!("Starting Curio");
    info!(port = config.port, "Configuration loaded");

    // Initialize application state (database pool, templates, services)
    let state = AppState::new(&config)
        .await
        .context("failed to initialize application state")?;

    // Create session layer
    let same_site = session::parse_same_site(&config.cookie_same_site);
    let session_layer =
        session::create_session_layer(&config.redis_url, same_site, config.cookie_secure)
            .await
            .context("failed to create session layer")?;

    let app = routes::build_app(state, session_layer);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind to address")?;

    info!(%addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
