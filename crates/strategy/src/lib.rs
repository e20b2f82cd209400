pub mod bollinger;
pub mod ema_trend;
pub mod horizon;
pub mod indicators;
pub mod macd_momentum;
pub mod rsi_reversal;
pub mod scorer;
pub mod scorer_set;

pub use bollinger::BollingerScorer;
pub use ema_trend::EmaTrendScorer;
pub use horizon::{classify_trend, HorizonAnalyzer};
pub use macd_momentum::MacdMomentumScorer;
pub use rsi_reversal::RsiReversalScorer;
pub use scorer::{Scorer, ScorerInput};
pub use scorer_set::ScorerSet;
