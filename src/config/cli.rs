use crate::config::StationConfig;
use crate::utils::error::Result;
use crate::utils::{logger, validation::Validate};
use clap::Args;
use std::time::Duration;

/// Flags shared by every binary.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "station.toml")]
    pub config: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Log as JSON lines instead of compact text
    #[arg(long)]
    pub json_logs: bool,
}

impl CommonArgs {
    pub fn init_logging(&self) {
        logger::init_logger(self.verbose, self.json_logs);
    }

    /// Load, substitute `${VAR}`s and validate.
    pub fn load_config(&self) -> Result<StationConfig> {
        tracing::info!("📁 Loading configuration from: {}", self.config);
        let config = StationConfig::from_file(&self.config)?;
        config.validate()?;
        tracing::info!("✅ Configuration loaded and validated successfully");
        Ok(config)
    }
}

/// Flags for the pollers.
#[derive(Debug, Clone, Args)]
pub struct PollArgs {
    /// Keep running and poll every N minutes (overrides the config); run once when absent
    #[arg(long)]
    pub every_minutes: Option<u64>,

    /// Keep running at the configured interval
    #[arg(long, conflicts_with = "every_minutes")]
    pub daemon: bool,
}

impl PollArgs {
    /// `None` means run once.
    pub fn interval(&self, configured_minutes: u64) -> Option<Duration> {
        let minutes = match (self.every_minutes, self.daemon) {
            (Some(minutes), _) => minutes,
            (None, true) => configured_minutes,
            (None, false) => return None,
        };
        Some(Duration::from_secs(minutes.max(1) * 60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_interval() {
        let once = PollArgs { every_minutes: None, daemon: false };
        assert_eq!(once.interval(60), None);

        let daemon = PollArgs { every_minutes: None, daemon: true };
        assert_eq!(daemon.interval(10), Some(Duration::from_secs(600)));

        let explicit = PollArgs { every_minutes: Some(0), daemon: false };
        assert_eq!(explicit.interval(10), Some(Duration::from_secs(60)));
    }
}
