// =============================================================================
// Technical Summary — latest indicator readings folded into one verdict
// =============================================================================
//
// Each indicator votes with a direction and a confidence:
//
//   rsi         <= oversold  bullish     >= overbought  bearish
//   macd        histogram > 0 bullish    < 0 bearish
//   ema_trend   fast > mid > slow bullish, reversed bearish
//   bollinger   close at/below lower band bullish, at/above upper bearish
//   stochastic  %K < 20 bullish          > 80 bearish
//   cci         < -100 bullish           > 100 bearish
//   williams_r  < -80 bullish            > -20 bearish
//   mfi         < 20 bullish             > 80 bearish
//   psar        SAR below price bullish, above bearish
//
// ADX scales the trend-following votes (macd, ema_trend, psar): x1.25 when
// ADX >= the trend threshold, x0.75 below it. Confidence is capped at 1.
// =============================================================================

use serde::Serialize;

use crate::indicators::adx::{current_adx, AdxReading};
use crate::indicators::atr::{calculate_atr, calculate_atr_pct};
use crate::indicators::bollinger::{calculate_bollinger, BollingerResult};
use crate::indicators::cci::calculate_cci;
use crate::indicators::ema::{ema_trend_aligned, TrendAlignment};
use crate::indicators::macd::{current_macd, MacdReading};
use crate::indicators::mfi::calculate_mfi;
use crate::indicators::psar::current_psar;
use crate::indicators::roc::current_roc;
use crate::indicators::rsi::{current_rsi, RsiZone};
use crate::indicators::sma::current_sma;
use crate::indicators::stochastic::current_stochastic;
use crate::indicators::williams_r::calculate_williams_r;
use crate::market_data::Candle;
use crate::runtime_config::{IndicatorDefaults, SummaryThresholds};
use crate::signals::weighted_score::{ScoringResult, SignalInput, WeightedScorer};
use crate::types::Bias;

const TREND_SIGNALS: [&str; 3] = ["macd", "ema_trend", "psar"];
/// MACD histograms within this fraction of the close count as flat.
const FLAT_HISTOGRAM: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StochasticReading {
    pub k: f64,
    pub d: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PsarReading {
    pub sar: f64,
    pub uptrend: bool,
}

/// Latest value of every indicator on the card; `None` means not enough data.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndicatorReadings {
    pub rsi: Option<f64>,
    pub rsi_zone: Option<RsiZone>,
    pub macd: Option<MacdReading>,
    pub ema_trend: Option<TrendAlignment>,
    pub bollinger: Option<BollingerResult>,
    pub stochastic: Option<StochasticReading>,
    pub cci: Option<f64>,
    pub williams_r: Option<f64>,
    pub mfi: Option<f64>,
    pub psar: Option<PsarReading>,
    pub adx: Option<AdxReading>,
    pub atr: Option<f64>,
    /// ATR as a percentage of the close.
    pub atr_pct: Option<f64>,
    pub roc: Option<f64>,
    pub sma: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechnicalSummary {
    pub symbol: String,
    pub interval: String,
    pub timestamp: i64,
    pub close: f64,
    pub readings: IndicatorReadings,
    pub scoring: ScoringResult,
    pub bias: Bias,
}

/// Compute the latest readings with the configured periods.
pub fn readings(candles: &[Candle], defaults: &IndicatorDefaults, thresholds: &SummaryThresholds) -> IndicatorReadings {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let rsi = current_rsi(&closes, defaults.rsi_period, thresholds.rsi_oversold, thresholds.rsi_overbought);

    IndicatorReadings {
        rsi: rsi.map(|(v, _)| v),
        rsi_zone: rsi.map(|(_, zone)| zone),
        macd: current_macd(&closes, defaults.macd_fast, defaults.macd_slow, defaults.macd_signal),
        ema_trend: ema_trend_aligned(&closes, thresholds.ema_fast, thresholds.ema_mid, thresholds.ema_slow),
        bollinger: calculate_bollinger(&closes, defaults.bollinger_period, defaults.bollinger_std_dev),
        stochastic: current_stochastic(
            candles,
            defaults.stochastic_k,
            defaults.stochastic_smooth,
            defaults.stochastic_d,
        )
        .map(|(k, d)| StochasticReading { k, d }),
        cci: calculate_cci(candles, defaults.cci_period).last().copied(),
        williams_r: calculate_williams_r(candles, defaults.williams_r_period).last().copied(),
        mfi: calculate_mfi(candles, defaults.mfi_period).last().copied(),
        psar: current_psar(candles, defaults.psar_step, defaults.psar_max_step)
            .map(|(sar, uptrend)| PsarReading { sar, uptrend }),
        adx: current_adx(candles, defaults.adx_period),
        atr: calculate_atr(candles, defaults.atr_period),
        atr_pct: calculate_atr_pct(candles, defaults.atr_period),
        roc: current_roc(&closes, defaults.roc_period),
        sma: current_sma(&closes, defaults.sma_period),
    }
}

fn vote(name: &str, direction: f64, confidence: f64) -> SignalInput {
    SignalInput {
        name: name.to_string(),
        weight: 0.0,
        confidence: confidence.clamp(0.0, 1.0),
        direction,
    }
}

/// Band vote: bullish below `low`, bearish above `high`. Confidence grows
/// from 0.6 with the distance past the band relative to `span`.
fn band_vote(name: &str, value: f64, low: f64, high: f64, span: f64, inclusive: bool) -> SignalInput {
    let below = if inclusive { value <= low } else { value < low };
    let above = if inclusive { value >= high } else { value > high };
    if below {
        vote(name, 1.0, 0.6 + (low - value) / span)
    } else if above {
        vote(name, -1.0, 0.6 + (value - high) / span)
    } else {
        vote(name, 0.0, 0.0)
    }
}

/// Turn readings into scorer inputs. Missing readings cast no vote.
pub fn signal_inputs(r: &IndicatorReadings, close: f64, t: &SummaryThresholds) -> Vec<SignalInput> {
    let mut votes = Vec::new();

    if let Some(v) = r.rsi {
        votes.push(band_vote("rsi", v, t.rsi_oversold, t.rsi_overbought, 30.0, true));
    }
    if let Some(m) = r.macd {
        let flat = FLAT_HISTOGRAM * close.abs();
        let direction = if m.histogram > flat {
            1.0
        } else if m.histogram < -flat {
            -1.0
        } else {
            0.0
        };
        // Stronger when the MACD line sits on the same side of zero.
        let confidence = if m.line * m.histogram > 0.0 { 1.0 } else { 0.6 };
        votes.push(vote("macd", direction, confidence));
    }
    if let Some(trend) = r.ema_trend {
        let direction = if trend.bullish { 1.0 } else { -1.0 };
        votes.push(vote("ema_trend", direction, 0.5 + trend.strength * 50.0));
    }
    if let Some(pb) = r.bollinger.and_then(|b| b.percent_b(close)) {
        votes.push(band_vote("bollinger", pb, 0.0, 1.0, 0.5, true));
    }
    if let Some(s) = r.stochastic {
        votes.push(band_vote("stochastic", s.k, t.stochastic_oversold, t.stochastic_overbought, 20.0, false));
    }
    if let Some(v) = r.cci {
        votes.push(band_vote("cci", v, -t.cci_band, t.cci_band, 100.0, false));
    }
    if let Some(v) = r.williams_r {
        votes.push(band_vote("williams_r", v, t.williams_oversold, t.williams_overbought, 20.0, false));
    }
    if let Some(v) = r.mfi {
        votes.push(band_vote("mfi", v, t.mfi_oversold, t.mfi_overbought, 20.0, false));
    }
    if let Some(p) = r.psar {
        votes.push(vote("psar", if p.uptrend { 1.0 } else { -1.0 }, 0.8));
    }

    if let Some(adx) = r.adx {
        let factor = if adx.adx >= t.adx_trend { 1.25 } else { 0.75 };
        for v in votes.iter_mut().filter(|v| TREND_SIGNALS.contains(&v.name.as_str())) {
            v.confidence = (v.confidence * factor).min(1.0);
        }
    }

    votes
}

/// Build the summary card. `None` when there are no candles.
pub fn summarize(
    symbol: &str,
    interval: &str,
    candles: &[Candle],
    defaults: &IndicatorDefaults,
    thresholds: &SummaryThresholds,
) -> Option<TechnicalSummary> {
    let last = candles.last()?;
    let readings = readings(candles, defaults, thresholds);
    let scoring = WeightedScorer::new(thresholds.entry_threshold).score(&signal_inputs(&readings, last.close, thresholds));
    let bias = scoring.decision.bias();

    Some(TechnicalSummary {
        symbol: symbol.to_uppercase(),
        interval: interval.to_string(),
        timestamp: last.timestamp,
        close: last.close,
        readings,
        scoring,
        bias,
    })
}
