use std::env;
use std::io;
use std::net::SocketAddr;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keywarden_panel::{build_router, cli, AppState};

#[derive(Parser)]
#[command(name = "keywarden")]
#[command(about = "HWID-bound license key server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve,
    /// Install the server as a systemd service
    Install,
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        println!("⚠️  Warning: Failed to load .env file: {}", e);
    }

    let cli_args = Cli::parse();

    let file_appender = tracing_appender::rolling::never(".", "keywarden.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keywarden=debug,axum=info,tower_http=info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stdout))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .init();

    match cli_args.command {
        Commands::Serve => {
            let pool = keywarden_db::db::init_db().await?;
            tracing::info!("Database initialized");
            run_server(pool).await?;
        }
        Commands::Install => {
            cli::install_service()?;
        }
    }

    Ok(())
}

async fn run_server(pool: sqlx::SqlitePool) -> Result<()> {
    let state = AppState::new(pool);
    let app = build_router(state);

    let port: u16 = env::var("LISTEN_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("keywarden listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
