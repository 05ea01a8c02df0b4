//! Periodic rate ingestion inside the server process.
//!
//! Disabled unless `INGEST_INTERVAL_SECS` is set; an external scheduler
//! running `ingest_rates` is the usual alternative. Stops on SIGINT.

use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::{error, info, warn};

use crate::services::ingestion::{IngestOutcome, IngestionPipeline};

/// Spawn the ingestion loop. The first run happens immediately.
pub fn start_rate_ingestion_job(pipeline: IngestionPipeline, interval_secs: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_secs, "Rate ingestion job started");

        let mut ticker = interval(Duration::from_secs(interval_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received, stopping rate ingestion job");
                    break;
                }
                _ = ticker.tick() => {
                    match pipeline.run_once().await {
                        Ok(report) if report.outcome == IngestOutcome::Persisted => {
                            info!(
                                timestamp = %report.timestamp,
                                persisted = report.persisted,
                                "Scheduled ingestion completed"
                            );
                        }
                        Ok(report) => {
                            warn!(
                                timestamp = %report.timestamp,
                                outcome = report.outcome.as_str(),
                                "Scheduled ingestion produced no data"
                            );
                        }
                        Err(e) => {
                            // Next tick retries
                            error!(error = %e, "Scheduled ingestion failed");
                        }
                    }
                }
            }
        }

        info!("Rate ingestion job stopped");
    })
}
