//! Entry planning: ATR-anchored stops and risk-amount sizing.

use crate::config::TradingConfig;
use crate::types::{Side, Signal};
use anyhow::Result;
use rust_decimal::Decimal;

/// Quantity precision used when sizing orders.
const QUANTITY_DP: u32 = 8;

/// Risk inputs for entry planning, lifted out of the raw config so the
/// planner works on validated decimals.
#[derive(Debug, Clone, Copy)]
pub struct RiskParams {
    pub risk_amount: Decimal,
    pub stop_atr_mult: Decimal,
    pub profit_atr_mult: Decimal,
}

impl RiskParams {
    /// # Errors
    ///
    /// Returns an error if any parameter is non-positive or not
    /// representable as a decimal.
    pub fn from_config(config: &TradingConfig) -> Result<Self> {
        let risk_amount = Decimal::try_from(config.risk_amount)?;
        let stop_atr_mult = Decimal::try_from(config.stop_atr_mult)?;
        let profit_atr_mult = Decimal::try_from(config.profit_atr_mult)?;

        if risk_amount <= Decimal::ZERO {
            anyhow::bail!("risk_amount must be positive");
        }
        if stop_atr_mult <= Decimal::ZERO || profit_atr_mult <= Decimal::ZERO {
            anyhow::bail!("ATR multiples must be positive");
        }

        Ok(Self {
            risk_amount,
            stop_atr_mult,
            profit_atr_mult,
        })
    }
}

/// Fully-specified entry: direction, protective levels, and size.
#[derive(Debug, Clone)]
pub struct EntryPlan {
    pub side: Side,
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub quantity: Decimal,
    pub reward_risk: Decimal,
}

/// Plans an entry for a directional signal.
///
/// The stop sits `stop_atr_mult` ATRs from entry and the target
/// `profit_atr_mult` ATRs, on opposite sides for longs and shorts.
/// Quantity is chosen so a stop-out loses exactly `risk_amount`:
/// `quantity = risk_amount / stop_distance`.
///
/// # Errors
///
/// Returns an error on a Hold signal, a non-positive entry price or ATR,
/// or when the long stop would cross zero.
pub fn plan_entry(
    signal: Signal,
    entry_price: Decimal,
    atr: Decimal,
    params: &RiskParams,
) -> Result<EntryPlan> {
    let side = match signal {
        Signal::Buy => Side::Long,
        Signal::Sell => Side::Short,
        Signal::Hold => anyhow::bail!("cannot plan an entry for a hold signal"),
    };

    if entry_price <= Decimal::ZERO {
        anyhow::bail!("entry price must be positive");
    }
    if atr <= Decimal::ZERO {
        anyhow::bail!("ATR must be positive");
    }

    let stop_distance = atr * params.stop_atr_mult;
    let profit_distance = atr * params.profit_atr_mult;

    let (stop_loss, take_profit) = match side {
        Side::Long => (entry_price - stop_distance, entry_price + profit_distance),
        Side::Short => (entry_price + stop_distance, entry_price - profit_distance),
    };

    if stop_loss <= Decimal::ZERO || take_profit <= Decimal::ZERO {
        anyhow::bail!(
            "ATR stop distance {stop_distance} is too wide for entry price {entry_price}"
        );
    }

    let quantity = (params.risk_amount / stop_distance).round_dp(QUANTITY_DP);
    if quantity <= Decimal::ZERO {
        anyhow::bail!("computed quantity rounds to zero");
    }

    Ok(EntryPlan {
        side,
        entry_price,
        stop_loss,
        take_profit,
        quantity,
        reward_risk: profit_distance / stop_distance,
    })
}

/// Realized P&L for a closed quantity, signed by side.
#[must_use]
pub fn realized_pnl(side: Side, entry_price: Decimal, exit_price: Decimal, quantity: Decimal) -> Decimal {
    (exit_price - entry_price) * quantity * side.sign()
}
