use gerot_core::ExecutionReport;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

use crate::client::GerotClient;
use crate::executor::{execute_job, QueryRunner};
use crate::Result;

/// Outcome of one poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub executed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Jobs whose result could not be delivered to the API.
    pub unreported: usize,
}

impl CycleStats {
    fn record(&mut self, report: &ExecutionReport, delivered: bool) {
        self.executed += 1;
        if report.success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        if !delivered {
            self.unreported += 1;
        }
    }
}

pub struct Agent {
    client: GerotClient,
    runner: Arc<dyn QueryRunner>,
    poll_every: Duration,
}

impl Agent {
    pub fn new(client: GerotClient, runner: Arc<dyn QueryRunner>, poll_every: Duration) -> Self {
        Self {
            client,
            runner,
            poll_every,
        }
    }

    /// Checks the source database is reachable.
    pub async fn verify(&self) -> Result<()> {
        match self.runner.ping().await {
            Ok(()) => {
                tracing::info!("MySQL connection OK");
                Ok(())
            }
            Err(e) => {
                tracing::error!("Could not connect to MySQL: {}", e);
                Err(e)
            }
        }
    }

    /// Polls RPAs then dashboard requests, running and reporting each job in turn.
    pub async fn run_once(&self) -> CycleStats {
        let mut stats = CycleStats::default();

        let rpas = self.client.fetch_pending_rpas().await;
        if !rpas.is_empty() {
            tracing::info!("{} pending RPA(s)", rpas.len());
        }
        for rpa in rpas {
            tracing::info!("Executing RPA #{}: {}", rpa.id, rpa.name);
            let report = execute_job(self.runner.as_ref(), &rpa.name, rpa.parameters.as_ref()).await;
            let delivered = self.client.send_rpa_result(rpa.id, &report).await;

            if report.success {
                tracing::info!("RPA #{} finished: {} rows", rpa.id, report.row_count);
            } else {
                tracing::error!(
                    "RPA #{} failed: {}",
                    rpa.id,
                    report.error.as_deref().unwrap_or("unknown error")
                );
            }
            stats.record(&report, delivered);
        }

        let dashboards = self.client.fetch_pending_dashboards().await;
        if !dashboards.is_empty() {
            tracing::info!("{} pending dashboard(s)", dashboards.len());
        }
        for dashboard in dashboards {
            tracing::info!("Processing dashboard #{}: {}", dashboard.id, dashboard.title);
            let report =
                execute_job(self.runner.as_ref(), &dashboard.title, dashboard.filters.as_ref()).await;
            let delivered = self
                .client
                .send_dashboard_result(dashboard.id, &report)
                .await;

            if report.success {
                tracing::info!("Dashboard #{} finished: {} rows", dashboard.id, report.row_count);
            } else {
                tracing::error!(
                    "Dashboard #{} failed: {}",
                    dashboard.id,
                    report.error.as_deref().unwrap_or("unknown error")
                );
            }
            stats.record(&report, delivered);
        }

        stats
    }

    /// Verifies the database, then polls until Ctrl-C.
    pub async fn run(&self) -> Result<()> {
        self.verify().await?;

        let mut ticker = interval(self.poll_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested, stopping agent");
                    break;
                }
                _ = ticker.tick() => {
                    let stats = self.run_once().await;
                    if stats.executed > 0 {
                        tracing::debug!(?stats, "Poll cycle finished");
                    }
                }
            }
        }

        Ok(())
    }
}
