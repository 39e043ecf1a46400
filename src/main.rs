use clap::Parser;
use std::net::SocketAddr;
use wx_station::config::cli::CommonArgs;
use wx_station::{create_router, AppState, WxError};

#[derive(Parser)]
#[command(name = "wx-station")]
#[command(about = "Weather station ingestion endpoint and dashboard")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Override server.bind_address from the config
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日誌
    args.common.init_logging();
    tracing::info!("🚀 Starting wx-station v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = serve(args).await {
        tracing::error!(
            "❌ Server stopped: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.severity().exit_code().max(1));
    }
    Ok(())
}

async fn serve(args: Args) -> Result<(), WxError> {
    let mut config = args.common.load_config()?;
    if let Some(bind) = args.bind {
        tracing::info!("🔧 Bind address overridden to: {}", bind);
        config.server.bind_address = bind;
    }

    let addr: SocketAddr = config
        .server
        .bind_address
        .parse()
        .map_err(|_| WxError::InvalidConfigValueError {
            field: "server.bind_address".to_string(),
            value: config.server.bind_address.clone(),
            reason: "Expected host:port, e.g. 0.0.0.0:8080".to_string(),
        })?;

    tracing::info!(
        "📍 Station '{}' at ({}, {}), zone {}",
        config.location.name,
        config.location.latitude,
        config.location.longitude,
        config.location.timezone
    );
    tracing::info!("📁 Data directory: {}", config.storage.data_dir);
    if config.server.passkey.is_none() {
        tracing::warn!("No server.passkey configured; accepting observations from anyone");
    }

    let state = AppState::new(config)?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("🌐 Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(wx_station::app::scheduler::ctrl_c())
        .await?;

    tracing::info!("👋 Server shut down");
    Ok(())
}
