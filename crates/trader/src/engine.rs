//! Assembly: one manager actor plus three interval loops.

use crate::handle::TraderHandle;
use crate::manager::PositionManager;
use crate::notify::Notifier;
use crate::report::report_once;
use crate::scan::Scanner;
use crate::watch::watch_once;
use anyhow::Result;
use quorum_core::config::AppConfig;
use quorum_exchange::ExchangeGateway;
use quorum_ledger::Ledger;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const COMMAND_BUFFER: usize = 32;

/// Running trading loop. Dropping it does not stop the tasks; call
/// [`Trader::shutdown`].
pub struct Trader {
    handle: TraderHandle,
    manager_task: JoinHandle<()>,
    loop_tasks: Vec<JoinHandle<()>>,
}

impl Trader {
    /// Spawns the manager actor and the scan/watch/report loops.
    ///
    /// The three loops never touch positions directly: they funnel every
    /// mutation through the manager's channel, so two loops firing at
    /// once cannot race on the book.
    ///
    /// # Errors
    ///
    /// Returns an error if the scanner cannot be built from the config.
    pub fn spawn(
        config: &AppConfig,
        gateway: Arc<dyn ExchangeGateway>,
        ledger: Ledger,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let handle = TraderHandle::new(tx);

        let manager = PositionManager::new(
            rx,
            gateway.clone(),
            ledger.clone(),
            notifier.clone(),
            config.trading.capacity,
        );
        let manager_task = tokio::spawn(manager.run());

        let scanner = Arc::new(Scanner::from_config(config, gateway.clone())?);
        let scheduler = &config.scheduler;

        let scan_task = {
            let scanner = scanner.clone();
            let handle = handle.clone();
            let period = Duration::from_secs(scheduler.scan_interval_secs);
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(period);
                loop {
                    interval.tick().await;
                    scanner.scan_once(&handle).await;
                }
            })
        };

        let watch_task = {
            let gateway = gateway.clone();
            let handle = handle.clone();
            let period = Duration::from_secs(scheduler.watch_interval_secs);
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(period);
                loop {
                    interval.tick().await;
                    watch_once(&gateway, &handle).await;
                }
            })
        };

        let report_task = {
            let ledger = ledger.clone();
            let handle = handle.clone();
            let notifier = notifier.clone();
            let period = Duration::from_secs(scheduler.report_interval_secs);
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(period);
                // A report at second zero would always be empty; wait a
                // full period before the first one.
                interval.tick().await;
                loop {
                    interval.tick().await;
                    report_once(&ledger, &handle, &notifier).await;
                }
            })
        };

        tracing::info!(
            scan_secs = scheduler.scan_interval_secs,
            watch_secs = scheduler.watch_interval_secs,
            report_secs = scheduler.report_interval_secs,
            capacity = config.trading.capacity,
            "trader started"
        );

        Ok(Self {
            handle,
            manager_task,
            loop_tasks: vec![scan_task, watch_task, report_task],
        })
    }

    /// Handle for the operator surface (API, CLI).
    #[must_use]
    pub fn handle(&self) -> TraderHandle {
        self.handle.clone()
    }

    /// Stops the loops, then the manager. Open positions stay open; this
    /// is a process shutdown, not a manual stop.
    pub async fn shutdown(self) {
        for task in &self.loop_tasks {
            task.abort();
        }
        if let Err(e) = self.handle.shutdown().await {
            tracing::warn!(error = %e, "manager already stopped");
        }
        let _ = self.manager_task.await;
        tracing::info!("trader stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::LogNotifier;
    use quorum_exchange::StaticGateway;

    #[tokio::test]
    async fn spawn_and_shutdown_round_trip() {
        let mut config = AppConfig::default();
        // Long intervals so the loops stay quiet during the test.
        config.scheduler.scan_interval_secs = 3600;
        config.scheduler.watch_interval_secs = 3600;
        config.scheduler.report_interval_secs = 3600;

        let gateway: Arc<dyn ExchangeGateway> = Arc::new(StaticGateway::new());
        let ledger = Ledger::new_in_memory().await.unwrap();
        let trader = Trader::spawn(&config, gateway, ledger, Arc::new(LogNotifier)).unwrap();

        let status = trader.handle().snapshot().await.unwrap();
        assert_eq!(status.open_count, 0);
        assert_eq!(status.capacity, config.trading.capacity);

        trader.shutdown().await;
    }
}
