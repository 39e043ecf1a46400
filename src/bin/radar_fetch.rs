use clap::Parser;
use wx_station::app::scheduler::{ctrl_c, run_periodically};
use wx_station::config::cli::{CommonArgs, PollArgs};
use wx_station::{LocalStorage, RadarFetcher, WxError};

#[derive(Parser)]
#[command(name = "radar-fetch")]
#[command(about = "Download the regional radar loop for the dashboard")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    poll: PollArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日誌
    args.common.init_logging();

    let config = match args.common.load_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(e.severity().exit_code().max(1));
        }
    };

    let fetcher = RadarFetcher::new(LocalStorage::new(&config.storage.data_dir), &config);
    let (fetcher, radar_file) = (&fetcher, &config.storage.radar_file);
    let fetch = move || async move {
        let bytes = fetcher.fetch().await?;
        Ok::<_, WxError>(format!("{} bytes -> {}", bytes, radar_file))
    };

    if let Some(every) = args.poll.interval(config.radar.poll_interval_minutes) {
        tracing::info!("⏱️ Fetching {} every {:?}", config.radar.url, every);
        run_periodically("radar fetch", every, fetch, ctrl_c()).await;
        return Ok(());
    }

    if let Err(e) = fetch().await {
        tracing::error!("❌ Radar fetch failed: {} (Severity: {:?})", e, e.severity());
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        let exit_code = e.severity().exit_code();
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
    Ok(())
}
