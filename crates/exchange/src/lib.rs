pub mod binance;
pub mod gateway;
pub mod paper;

pub use binance::BinanceFuturesGateway;
pub use gateway::{ExchangeGateway, GatewayError, OrderFill};
pub use paper::{PaperExecution, StaticGateway};
