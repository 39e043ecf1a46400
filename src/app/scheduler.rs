use crate::utils::error::{ErrorSeverity, Result, WxError};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;

fn report_failure(name: &str, e: &WxError) {
    if e.severity() <= ErrorSeverity::Medium {
        tracing::warn!("⚠️ {} failed, will retry on the next tick: {}", name, e);
        return;
    }
    tracing::error!(
        "❌ {} failed: {} (Category: {:?}, Severity: {:?})",
        name,
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
}

/// Runs `task` on a fixed interval until `shutdown` resolves.
///
/// A failed run is logged and the next tick tries again. The first run starts immediately.
/// Returns the number of runs that succeeded.
pub async fn run_periodically<F, Fut>(
    name: &str,
    every: Duration,
    mut task: F,
    shutdown: impl Future<Output = ()>,
) -> usize
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String>>,
{
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut succeeded = 0;
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("🛑 {} stopping after {} successful runs", name, succeeded);
                return succeeded;
            }
            _ = interval.tick() => {
                let started = Instant::now();
                match task().await {
                    Ok(output) => {
                        succeeded += 1;
                        tracing::info!("✅ {} finished in {:?}: {}", name, started.elapsed(), output);
                    }
                    Err(e) => report_failure(name, &e),
                }
                tracing::debug!("Next {} run in {:?}", name, every);
            }
        }
    }
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed.
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Could not listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
