//! Command protocol for the position manager actor.

use quorum_core::risk::EntryPlan;
use quorum_core::types::{ConsensusDecision, Position};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::oneshot;
use uuid::Uuid;

/// An actionable decision plus its sized entry, ready for the manager.
#[derive(Debug, Clone)]
pub struct OpenRequest {
    pub decision: ConsensusDecision,
    pub plan: EntryPlan,
}

/// Manager's answer to an open attempt. Everything except `Opened` leaves
/// the book untouched.
#[derive(Debug, Clone)]
pub enum OpenOutcome {
    Opened(Position),
    AtCapacity,
    AlreadyOpen,
    Rejected(String),
}

/// Point-in-time view of the book, served to the API and the report.
#[derive(Debug, Clone, Serialize)]
pub struct TraderStatus {
    pub open_positions: Vec<Position>,
    pub open_count: usize,
    pub capacity: usize,
    pub last_error: Option<String>,
}

pub enum TraderCommand {
    TryOpen {
        request: OpenRequest,
        reply: oneshot::Sender<OpenOutcome>,
    },
    /// Current marks for open positions; the manager re-validates each
    /// against its protective levels and closes the ones that touched.
    /// Replies with the number of positions closed.
    SyncExits {
        marks: Vec<(Uuid, Decimal)>,
        reply: oneshot::Sender<usize>,
    },
    /// Close every open position at market. Replies with the number
    /// closed; zero on a repeat invocation.
    StopAll {
        reply: oneshot::Sender<usize>,
    },
    Snapshot {
        reply: oneshot::Sender<TraderStatus>,
    },
    Shutdown,
}
