use crate::commands::{OpenOutcome, OpenRequest, TraderCommand, TraderStatus};
use anyhow::Result;
use rust_decimal::Decimal;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Cloneable handle to the position manager. Every mutation of the book
/// goes through this channel.
#[derive(Clone)]
pub struct TraderHandle {
    tx: mpsc::Sender<TraderCommand>,
}

impl TraderHandle {
    #[must_use]
    pub const fn new(tx: mpsc::Sender<TraderCommand>) -> Self {
        Self { tx }
    }

    /// Asks the manager to open a position for an actionable decision.
    ///
    /// # Errors
    /// Returns an error if the manager has shut down.
    pub async fn try_open(&self, request: OpenRequest) -> Result<OpenOutcome> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(TraderCommand::TryOpen { request, reply }).await?;
        Ok(rx.await?)
    }

    /// Submits fresh marks for exit evaluation. Returns the number of
    /// positions closed.
    ///
    /// # Errors
    /// Returns an error if the manager has shut down.
    pub async fn sync_exits(&self, marks: Vec<(Uuid, Decimal)>) -> Result<usize> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(TraderCommand::SyncExits { marks, reply }).await?;
        Ok(rx.await?)
    }

    /// Closes every open position at market. Returns the number closed.
    ///
    /// # Errors
    /// Returns an error if the manager has shut down.
    pub async fn stop_all(&self) -> Result<usize> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(TraderCommand::StopAll { reply }).await?;
        Ok(rx.await?)
    }

    /// # Errors
    /// Returns an error if the manager has shut down.
    pub async fn snapshot(&self) -> Result<TraderStatus> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(TraderCommand::Snapshot { reply }).await?;
        Ok(rx.await?)
    }

    /// # Errors
    /// Returns an error if the manager has already shut down.
    pub async fn shutdown(&self) -> Result<()> {
        self.tx.send(TraderCommand::Shutdown).await?;
        Ok(())
    }
}
