use anyhow::{Result, bail};
use clap::Parser;
use satchel_server::{
    auth::TokenSigner,
    config::{Command, Config},
    routes,
    state::AppState,
};
use satchel_share::{Sweeper, UserId};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
pub async fn main() -> Result<()> {
    let config = Config::parse();

    if let Some(Command::Token { user }) = &config.command {
        let Some(secret) = &config.token_secret else {
            bail!("SATCHEL_TOKEN_SECRET must be set to issue tokens");
        };
        println!("{}", TokenSigner::new(secret).issue(&UserId::new(user.as_str())));
        return Ok(());
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "satchel_server=info,satchel_share=info,satchel_storage=info,tower_http=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = AppState::from_config(&config).await?;

    if let Some(period) = config.sweep_interval() {
        let sweeper = Sweeper::new(state.handles.clone())
            .with_grace(config.sweep_grace());
        tokio::spawn(sweeper.run(period));
    }

    let app = routes::router(state);

    let addr = config.address()?;
    tracing::info!(%addr, documents = ?config.documents, objects = ?config.objects, "Starting satchel");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
