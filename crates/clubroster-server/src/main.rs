use std::sync::Arc;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use clubroster_core::model::NewUser;
use clubroster_core::principal::{AccountStatus, Role};
use clubroster_server::auth::TokenSigner;
use clubroster_server::cli::{Cli, Command};
use clubroster_server::config::{AppConfig, LogFormat};
use clubroster_server::metrics::Metrics;
use clubroster_server::rest;
use clubroster_server::{auth, rest::AppState};
use clubroster_storage::PostgresStore;
use clubroster_storage::postgres::{migrations, seed};
use clubroster_storage::traits::IdentityStore;

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    let registry = tracing_subscriber::registry().with(filter);

    match config.log.format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer().json();
            registry.with(fmt_layer).init();
        }
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer().pretty();
            registry.with(fmt_layer).init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    init_logging(&config);

    match cli.command {
        Some(Command::Migrate) => run_migrate(&config).await,
        Some(Command::CreateAdmin {
            email,
            password,
            first_name,
            last_name,
        }) => run_create_admin(&config, &email, &password, &first_name, &last_name).await,
        Some(Command::Seed) => run_seed(&config).await,
        Some(Command::Serve) | None => run_serve(config).await,
    }
}

async fn connect(config: &AppConfig) -> Result<sqlx::PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
}

async fn run_migrate(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("running database migrations");
    let pool = connect(config).await?;
    migrations::run_migrations(&pool).await?;
    tracing::info!("migrations completed successfully");
    Ok(())
}

async fn run_create_admin(
    config: &AppConfig,
    email: &str,
    password: &str,
    first_name: &str,
    last_name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let pool = connect(config).await?;
    migrations::run_migrations(&pool).await?;

    let password_hash = auth::hash_password(password)?;
    let store = PostgresStore::new(pool);
    let user = store
        .create_user(
            &NewUser {
                email: email.to_string(),
                role: Role::Admin,
                status: AccountStatus::Active,
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
            },
            &password_hash,
        )
        .await?;

    println!("Admin account created");
    println!("  Email: {}", user.email);
    println!("  Id:    {}", user.id);
    Ok(())
}

async fn run_seed(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let pool = connect(config).await?;
    migrations::run_migrations(&pool).await?;

    let password_hash = auth::hash_password(seed::DEMO_PASSWORD)?;
    seed::seed_demo_data(&pool, &password_hash).await?;

    println!("Demo data seeded");
    println!("  Coach login:  coach@demo.club / {}", seed::DEMO_PASSWORD);
    println!("  Player login: ana@demo.club / {}", seed::DEMO_PASSWORD);
    Ok(())
}

async fn run_serve(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(http_addr = %config.http_addr(), "starting clubroster server");

    let pool = connect(&config).await?;
    migrations::run_migrations(&pool).await?;

    let store = PostgresStore::new(pool);
    let signer = Arc::new(TokenSigner::new(
        &config.auth.jwt_secret,
        config.auth.token_ttl_secs,
    ));
    let metrics = Arc::new(Metrics::new());

    let state = AppState {
        store,
        signer,
        metrics,
    };
    let router = rest::create_router(state);

    let addr: std::net::SocketAddr = config.http_addr().parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "HTTP server listening");

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(());
    tokio::spawn(shutdown_signal(shutdown_tx));

    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        let _ = shutdown_rx.changed().await;
    });
    if let Err(e) = server.await {
        tracing::error!(error = %e, "HTTP server error");
    }

    tracing::info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal(shutdown_tx: tokio::sync::watch::Sender<()>) {
    let ctrl_c = tokio::signal::ctrl_c();

    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = ctrl_c => { tracing::info!("received SIGINT"); }
                _ = sigterm.recv() => { tracing::info!("received SIGTERM"); }
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to register SIGTERM handler, using SIGINT only");
            let _ = ctrl_c.await;
            tracing::info!("received SIGINT");
        }
    }

    let _ = shutdown_tx.send(());
}
