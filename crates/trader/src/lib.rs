pub mod commands;
pub mod engine;
pub mod handle;
pub mod manager;
pub mod notify;
pub mod report;
pub mod scan;
pub mod watch;

pub use commands::{OpenOutcome, OpenRequest, TraderCommand, TraderStatus};
pub use engine::Trader;
pub use handle::TraderHandle;
pub use manager::PositionManager;
pub use notify::{LogNotifier, Notification, Notifier, WebhookNotifier};
pub use scan::{Scanner, SymbolAnalysis, SymbolOutcome};
