use clap::Parser;
use wx_station::app::scheduler::{ctrl_c, run_periodically};
use wx_station::config::cli::{CommonArgs, PollArgs};
use wx_station::{EtlEngine, ForecastPipeline, LocalStorage};

#[derive(Parser)]
#[command(name = "forecast-etl")]
#[command(about = "Pull the hourly gridpoint forecast from api.weather.gov into CSV")]
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
    tracing::info!("🚀 Starting forecast ETL");

    let config = match args.common.load_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(e.severity().exit_code().max(1));
        }
    };

    let storage = LocalStorage::new(&config.storage.data_dir);
    let pipeline = ForecastPipeline::new(storage, &config);
    tracing::info!("📡 Forecast endpoint: {}", pipeline.endpoint());
    let engine = EtlEngine::new(pipeline);
    let engine = &engine;

    if let Some(every) = args.poll.interval(config.forecast.poll_interval_minutes) {
        tracing::info!("⏱️ Polling every {:?}", every);
        run_periodically("forecast ETL", every, move || engine.run(), ctrl_c()).await;
        return Ok(());
    }

    match engine.run().await {
        Ok(output) => {
            tracing::info!("✅ Forecast ETL completed: {}", output);
            println!("✅ Forecast ETL completed: {}", output);
        }
        Err(e) => {
            tracing::error!(
                "❌ Forecast ETL failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());

            let exit_code = e.severity().exit_code();
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }
    Ok(())
}
