// =============================================================================
// Crossover Replay — the dashboard's moving-average crossover "backtest"
// =============================================================================
//
// Replays closes bar by bar:
//   fast crosses above slow  ->  close any short, go long
//   fast crosses below slow  ->  close any long, go short (if allowed)
//
// A cross at bar i means fast[i-1] <= slow[i-1] and fast[i] > slow[i]
// (mirror for a cross below). Fills happen at the crossover bar's close and
// a position still open at the end is closed on the last bar. Fees are
// charged per side as a percentage of notional, so a round trip returns
//
//   (1 + side·(exit/entry - 1)) · (1 - fee)² - 1
//
// Equity starts at 100 and is marked to market on every bar.
// =============================================================================

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::indicators::ema::calculate_ema;
use crate::indicators::series::{align, MAX_PERIOD};
use crate::indicators::sma::calculate_sma;
use crate::market_data::Candle;
use crate::types::PositionSide;

const INITIAL_EQUITY: f64 = 100.0;

#[derive(Debug, Error, PartialEq)]
pub enum BacktestError {
    #[error("{0} must be greater than zero")]
    ZeroPeriod(&'static str),

    #[error("{0} must not exceed {max}", max = MAX_PERIOD)]
    PeriodTooLarge(&'static str),

    #[error("fast period ({fast}) must be shorter than slow period ({slow})")]
    InvalidPeriods { fast: usize, slow: usize },

    #[error("fee_pct must be in [0, 100), got {0}")]
    InvalidFee(f64),

    #[error("insufficient data: need {required} candles, have {available}")]
    InsufficientData { required: usize, available: usize },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovingAverage {
    #[default]
    Sma,
    Ema,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossoverConfig {
    pub fast_period: usize,
    pub slow_period: usize,
    #[serde(default)]
    pub ma: MovingAverage,
    #[serde(default)]
    pub allow_short: bool,
    /// Fee per side in percent, e.g. 0.03.
    #[serde(default)]
    pub fee_pct: f64,
}

impl CrossoverConfig {
    pub fn validate(&self) -> Result<(), BacktestError> {
        if self.fast_period == 0 {
            return Err(BacktestError::ZeroPeriod("fast_period"));
        }
        if self.slow_period == 0 {
            return Err(BacktestError::ZeroPeriod("slow_period"));
        }
        if self.slow_period > MAX_PERIOD {
            return Err(BacktestError::PeriodTooLarge("slow_period"));
        }
        if self.fast_period >= self.slow_period {
            return Err(BacktestError::InvalidPeriods {
                fast: self.fast_period,
                slow: self.slow_period,
            });
        }
        if !(self.fee_pct.is_finite() && (0.0..100.0).contains(&self.fee_pct)) {
            return Err(BacktestError::InvalidFee(self.fee_pct));
        }
        Ok(())
    }
}

/// A completed round trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    /// Unique identifier (UUID v4).
    pub id: String,
    pub side: PositionSide,
    pub entry_index: usize,
    pub exit_index: usize,
    pub entry_time: i64,
    pub exit_time: i64,
    pub entry_price: f64,
    pub exit_price: f64,
    /// Net of fees.
    pub return_pct: f64,
    /// Closed because the data ran out rather than on a crossover.
    pub closed_at_end: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EquityPoint {
    pub index: usize,
    pub timestamp: i64,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestReport {
    pub trades: Vec<Trade>,
    /// Compounded over all trades, net of fees.
    pub total_return_pct: f64,
    /// Winning trades as a percentage of all trades (0 when there are none).
    pub win_rate: f64,
    pub max_drawdown_pct: f64,
    pub equity_curve: Vec<EquityPoint>,
}

struct OpenPosition {
    side: PositionSide,
    entry_index: usize,
    entry_price: f64,
}

fn gross_multiplier(side: PositionSide, entry: f64, exit: f64) -> f64 {
    1.0 + side.sign() * (exit / entry - 1.0)
}

/// Replay a fast/slow moving-average crossover over `candles`.
pub fn run_crossover(candles: &[Candle], config: &CrossoverConfig) -> Result<BacktestReport, BacktestError> {
    config.validate()?;
    let required = config.slow_period + 1;
    if candles.len() < required {
        return Err(BacktestError::InsufficientData {
            required,
            available: candles.len(),
        });
    }

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let ma = |period: usize| match config.ma {
        MovingAverage::Sma => calculate_sma(&closes, period),
        MovingAverage::Ema => calculate_ema(&closes, period),
    };
    let fast = align(&ma(config.fast_period), config.fast_period - 1, closes.len());
    let slow = align(&ma(config.slow_period), config.slow_period - 1, closes.len());

    let fee = config.fee_pct / 100.0;
    let mut realized = INITIAL_EQUITY;
    let mut position: Option<OpenPosition> = None;
    let mut trades = Vec::new();
    let mut equity_curve = Vec::with_capacity(candles.len());

    let close_position = |pos: OpenPosition, exit_index: usize, realized: &mut f64, at_end: bool| -> Trade {
        let exit_price = closes[exit_index];
        let gross = gross_multiplier(pos.side, pos.entry_price, exit_price);
        *realized *= gross * (1.0 - fee);
        Trade {
            id: Uuid::new_v4().to_string(),
            side: pos.side,
            entry_index: pos.entry_index,
            exit_index,
            entry_time: candles[pos.entry_index].timestamp,
            exit_time: candles[exit_index].timestamp,
            entry_price: pos.entry_price,
            exit_price,
            return_pct: (gross * (1.0 - fee) * (1.0 - fee) - 1.0) * 100.0,
            closed_at_end: at_end,
        }
    };

    for i in 0..candles.len() {
        let cross = match (fast[i], slow[i], i.checked_sub(1).map(|p| (fast[p], slow[p]))) {
            (Some(f), Some(s), Some((Some(pf), Some(ps)))) => {
                if pf <= ps && f > s {
                    Some(PositionSide::Long)
                } else if pf >= ps && f < s {
                    Some(PositionSide::Short)
                } else {
                    None
                }
            }
            _ => None,
        };

        if let Some(direction) = cross {
            if let Some(pos) = position.take() {
                if pos.side == direction {
                    position = Some(pos);
                } else {
                    trades.push(close_position(pos, i, &mut realized, false));
                }
            }
            let wants_entry = direction == PositionSide::Long || config.allow_short;
            if position.is_none() && wants_entry {
                realized *= 1.0 - fee;
                position = Some(OpenPosition {
                    side: direction,
                    entry_index: i,
                    entry_price: closes[i],
                });
            }
        }

        let equity = match &position {
            Some(pos) => realized * gross_multiplier(pos.side, pos.entry_price, closes[i]),
            None => realized,
        };
        equity_curve.push(EquityPoint {
            index: i,
            timestamp: candles[i].timestamp,
            equity,
        });
    }

    let last = candles.len() - 1;
    if let Some(pos) = position.take() {
        trades.push(close_position(pos, last, &mut realized, true));
        if let Some(point) = equity_curve.last_mut() {
            point.equity = realized;
        }
    }

    let wins = trades.iter().filter(|t| t.return_pct > 0.0).count();
    let win_rate = if trades.is_empty() {
        0.0
    } else {
        wins as f64 / trades.len() as f64 * 100.0
    };

    let report = BacktestReport {
        total_return_pct: (realized / INITIAL_EQUITY - 1.0) * 100.0,
        win_rate,
        max_drawdown_pct: max_drawdown_pct(&equity_curve),
        trades,
        equity_curve,
    };
    debug!(
        trades = report.trades.len(),
        total_return_pct = report.total_return_pct,
        "crossover replay complete"
    );
    Ok(report)
}

/// Largest peak-to-trough decline of the curve, in percent.
pub fn max_drawdown_pct(curve: &[EquityPoint]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for p in curve {
        peak = peak.max(p.equity);
        if peak > 0.0 {
            worst = worst.max((peak - p.equity) / peak * 100.0);
        }
    }
    worst
}
