// =============================================================================
// Indicator Requests — dispatch and chart alignment
// =============================================================================
//
// The dashboard asks for indicators by name with optional parameters, e.g.
//
//   { "type": "macd", "fast": 12, "slow": 26, "signal": 9 }
//   { "type": "ema", "period": 50, "source": "hlc3" }
//
// Missing parameters fall back to `IndicatorDefaults` from the runtime config.
// Every output line is aligned to the candle array: same length, `None` in
// the warm-up region, so the chart can plot it against the candle index.
// =============================================================================

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::indicators::error::IndicatorError;
use crate::indicators::{
    adx, atr, bollinger, cci, ema, macd, mfi, psar, roc, rsi, sma, stochastic, vwap, williams_r, wma,
};
use crate::market_data::Candle;
use crate::runtime_config::IndicatorDefaults;

/// Which candle field feeds a close-based indicator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    Open,
    High,
    Low,
    #[default]
    Close,
    /// (H + L) / 2
    Hl2,
    /// (H + L + C) / 3
    Hlc3,
    /// (O + H + L + C) / 4
    Ohlc4,
}

impl PriceSource {
    pub fn extract(self, candles: &[Candle]) -> Vec<f64> {
        candles
            .iter()
            .map(|c| match self {
                Self::Open => c.open,
                Self::High => c.high,
                Self::Low => c.low,
                Self::Close => c.close,
                Self::Hl2 => (c.high + c.low) / 2.0,
                Self::Hlc3 => c.typical_price(),
                Self::Ohlc4 => (c.open + c.high + c.low + c.close) / 4.0,
            })
            .collect()
    }
}

/// One indicator request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IndicatorSpec {
    Sma {
        period: Option<usize>,
        #[serde(default)]
        source: PriceSource,
    },
    Ema {
        period: Option<usize>,
        #[serde(default)]
        source: PriceSource,
    },
    Wma {
        period: Option<usize>,
        #[serde(default)]
        source: PriceSource,
    },
    Rsi {
        period: Option<usize>,
        #[serde(default)]
        source: PriceSource,
    },
    Macd {
        fast: Option<usize>,
        slow: Option<usize>,
        signal: Option<usize>,
        #[serde(default)]
        source: PriceSource,
    },
    Bollinger {
        period: Option<usize>,
        std_dev: Option<f64>,
        #[serde(default)]
        source: PriceSource,
    },
    Atr {
        period: Option<usize>,
    },
    Stochastic {
        k_period: Option<usize>,
        smooth: Option<usize>,
        d_period: Option<usize>,
    },
    Cci {
        period: Option<usize>,
    },
    Mfi {
        period: Option<usize>,
    },
    WilliamsR {
        period: Option<usize>,
    },
    Roc {
        period: Option<usize>,
        #[serde(default)]
        source: PriceSource,
    },
    Adx {
        period: Option<usize>,
    },
    Psar {
        step: Option<f64>,
        max_step: Option<f64>,
    },
    Vwap {
        /// Session reset offset in minutes east of UTC; overrides the default.
        session_utc_offset_minutes: Option<i32>,
        /// Accumulate over the whole series instead of per session.
        #[serde(default)]
        cumulative: bool,
    },
}

impl IndicatorSpec {
    /// Short indicator name as used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sma { .. } => "sma",
            Self::Ema { .. } => "ema",
            Self::Wma { .. } => "wma",
            Self::Rsi { .. } => "rsi",
            Self::Macd { .. } => "macd",
            Self::Bollinger { .. } => "bollinger",
            Self::Atr { .. } => "atr",
            Self::Stochastic { .. } => "stochastic",
            Self::Cci { .. } => "cci",
            Self::Mfi { .. } => "mfi",
            Self::WilliamsR { .. } => "williams_r",
            Self::Roc { .. } => "roc",
            Self::Adx { .. } => "adx",
            Self::Psar { .. } => "psar",
            Self::Vwap { .. } => "vwap",
        }
    }

    /// Check parameters without computing anything.
    pub fn validate(&self, defaults: &IndicatorDefaults) -> Result<(), IndicatorError> {
        compute(self, &[], defaults).map(|_| ())
    }

    /// Defaults-only request for `name`, used by the chart endpoint.
    pub fn by_name(name: &str) -> Option<Self> {
        let json = serde_json::json!({ "type": name });
        serde_json::from_value(json).ok()
    }
}

/// Computed indicator, every line aligned to the input candles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorOutput {
    /// Display name with resolved parameters, e.g. `macd(12,26,9)`.
    pub name: String,
    pub lines: BTreeMap<String, Vec<Option<f64>>>,
}

/// Longest look-back any request may ask for.
pub const MAX_PERIOD: usize = 5_000;

/// Place a compact series starting at `offset` onto a `len`-long axis.
pub fn align(series: &[f64], offset: usize, len: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; len];
    for (i, &v) in series.iter().enumerate() {
        match offset.checked_add(i).and_then(|at| out.get_mut(at)) {
            Some(slot) => *slot = Some(v),
            None => break,
        }
    }
    out
}

fn positive(value: usize, indicator: &'static str, param: &'static str) -> Result<usize, IndicatorError> {
    if value == 0 {
        return Err(IndicatorError::ZeroPeriod { indicator, param });
    }
    if value > MAX_PERIOD {
        return Err(IndicatorError::OutOfRange {
            indicator,
            param,
            value: value as f64,
            min: 1.0,
            max: MAX_PERIOD as f64,
        });
    }
    Ok(value)
}

/// Validate `spec`, compute it over `candles`, and align every line.
pub fn compute(
    spec: &IndicatorSpec,
    candles: &[Candle],
    defaults: &IndicatorDefaults,
) -> Result<IndicatorOutput, IndicatorError> {
    let n = candles.len();
    let name = spec.name();
    let mut lines = BTreeMap::new();

    let resolved = match spec {
        IndicatorSpec::Sma { period, source } => {
            let p = positive(period.unwrap_or(defaults.sma_period), name, "period")?;
            let values = sma::calculate_sma(&source.extract(candles), p);
            lines.insert("sma".to_string(), align(&values, p - 1, n));
            format!("sma({p})")
        }
        IndicatorSpec::Ema { period, source } => {
            let p = positive(period.unwrap_or(defaults.ema_period), name, "period")?;
            let values = ema::calculate_ema(&source.extract(candles), p);
            lines.insert("ema".to_string(), align(&values, p - 1, n));
            format!("ema({p})")
        }
        IndicatorSpec::Wma { period, source } => {
            let p = positive(period.unwrap_or(defaults.wma_period), name, "period")?;
            let values = wma::calculate_wma(&source.extract(candles), p);
            lines.insert("wma".to_string(), align(&values, p - 1, n));
            format!("wma({p})")
        }
        IndicatorSpec::Rsi { period, source } => {
            let p = positive(period.unwrap_or(defaults.rsi_period), name, "period")?;
            let values = rsi::calculate_rsi(&source.extract(candles), p);
            lines.insert("rsi".to_string(), align(&values, p, n));
            format!("rsi({p})")
        }
        IndicatorSpec::Macd {
            fast,
            slow,
            signal,
            source,
        } => {
            let f = positive(fast.unwrap_or(defaults.macd_fast), name, "fast")?;
            let s = positive(slow.unwrap_or(defaults.macd_slow), name, "slow")?;
            let sig = positive(signal.unwrap_or(defaults.macd_signal), name, "signal")?;
            if f >= s {
                return Err(IndicatorError::InvalidParams {
                    indicator: name,
                    reason: format!("fast period ({f}) must be shorter than slow period ({s})"),
                });
            }
            let m = macd::calculate_macd(&source.extract(candles), f, s, sig);
            lines.insert("macd".to_string(), align(&m.line, s - 1, n));
            lines.insert("signal".to_string(), align(&m.signal, s + sig - 2, n));
            lines.insert("histogram".to_string(), align(&m.histogram, s + sig - 2, n));
            format!("macd({f},{s},{sig})")
        }
        IndicatorSpec::Bollinger {
            period,
            std_dev,
            source,
        } => {
            let p = positive(period.unwrap_or(defaults.bollinger_period), name, "period")?;
            let k = std_dev.unwrap_or(defaults.bollinger_std_dev);
            if !(k > 0.0 && k.is_finite()) {
                return Err(IndicatorError::OutOfRange {
                    indicator: name,
                    param: "std_dev",
                    value: k,
                    min: f64::MIN_POSITIVE,
                    max: f64::MAX,
                });
            }
            let bands = bollinger::calculate_bollinger_series(&source.extract(candles), p, k);
            let pick = |f: fn(&bollinger::BollingerResult) -> f64| -> Vec<f64> { bands.iter().map(f).collect() };
            lines.insert("upper".to_string(), align(&pick(|b| b.upper), p - 1, n));
            lines.insert("middle".to_string(), align(&pick(|b| b.middle), p - 1, n));
            lines.insert("lower".to_string(), align(&pick(|b| b.lower), p - 1, n));
            lines.insert("width".to_string(), align(&pick(|b| b.width), p - 1, n));
            format!("bollinger({p},{k})")
        }
        IndicatorSpec::Atr { period } => {
            let p = positive(period.unwrap_or(defaults.atr_period), name, "period")?;
            let values = atr::calculate_atr_series(candles, p);
            lines.insert("atr".to_string(), align(&values, p, n));
            format!("atr({p})")
        }
        IndicatorSpec::Stochastic {
            k_period,
            smooth,
            d_period,
        } => {
            let k = positive(k_period.unwrap_or(defaults.stochastic_k), name, "k_period")?;
            let sm = positive(smooth.unwrap_or(defaults.stochastic_smooth), name, "smooth")?;
            let d = positive(d_period.unwrap_or(defaults.stochastic_d), name, "d_period")?;
            let s = stochastic::calculate_stochastic(candles, k, sm, d);
            lines.insert("k".to_string(), align(&s.k, k + sm - 2, n));
            lines.insert("d".to_string(), align(&s.d, k + sm + d - 3, n));
            format!("stochastic({k},{sm},{d})")
        }
        IndicatorSpec::Cci { period } => {
            let p = positive(period.unwrap_or(defaults.cci_period), name, "period")?;
            lines.insert("cci".to_string(), align(&cci::calculate_cci(candles, p), p - 1, n));
            format!("cci({p})")
        }
        IndicatorSpec::Mfi { period } => {
            let p = positive(period.unwrap_or(defaults.mfi_period), name, "period")?;
            lines.insert("mfi".to_string(), align(&mfi::calculate_mfi(candles, p), p, n));
            format!("mfi({p})")
        }
        IndicatorSpec::WilliamsR { period } => {
            let p = positive(period.unwrap_or(defaults.williams_r_period), name, "period")?;
            let values = williams_r::calculate_williams_r(candles, p);
            lines.insert("williams_r".to_string(), align(&values, p - 1, n));
            format!("williams_r({p})")
        }
        IndicatorSpec::Roc { period, source } => {
            let p = positive(period.unwrap_or(defaults.roc_period), name, "period")?;
            let values = roc::calculate_roc(&source.extract(candles), p);
            lines.insert("roc".to_string(), align(&values, p, n));
            format!("roc({p})")
        }
        IndicatorSpec::Adx { period } => {
            let p = positive(period.unwrap_or(defaults.adx_period), name, "period")?;
            let s = adx::calculate_adx_series(candles, p);
            lines.insert("adx".to_string(), align(&s.adx, 2 * p - 1, n));
            lines.insert("plus_di".to_string(), align(&s.plus_di, p, n));
            lines.insert("minus_di".to_string(), align(&s.minus_di, p, n));
            format!("adx({p})")
        }
        IndicatorSpec::Psar { step, max_step } => {
            let st = step.unwrap_or(defaults.psar_step);
            let mx = max_step.unwrap_or(defaults.psar_max_step);
            if !(st > 0.0 && st <= mx && mx.is_finite()) {
                return Err(IndicatorError::OutOfRange {
                    indicator: name,
                    param: "step",
                    value: st,
                    min: 0.0,
                    max: mx,
                });
            }
            let s = psar::calculate_psar(candles, st, mx);
            let trend: Vec<f64> = s.uptrend.iter().map(|&u| if u { 1.0 } else { -1.0 }).collect();
            lines.insert("sar".to_string(), align(&s.sar, 1, n));
            lines.insert("trend".to_string(), align(&trend, 1, n));
            format!("psar({st},{mx})")
        }
        IndicatorSpec::Vwap {
            session_utc_offset_minutes,
            cumulative,
        } => {
            let offset = if *cumulative {
                None
            } else {
                session_utc_offset_minutes.or(defaults.vwap_session_utc_offset_minutes)
            };
            lines.insert("vwap".to_string(), align(&vwap::calculate_vwap(candles, offset), 0, n));
            "vwap".to_string()
        }
    };

    Ok(IndicatorOutput { name: resolved, lines })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candles(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let base = 100.0 + (i as f64 * 0.5).sin() * 5.0 + i as f64 * 0.1;
                Candle {
                    timestamp: i as i64 * 60_000,
                    open: base - 0.2,
                    high: base + 1.0,
                    low: base - 1.0,
                    close: base + 0.3,
                    volume: 1000.0 + i as f64,
                }
            })
            .collect()
    }

    fn spec(json: &str) -> IndicatorSpec {
        serde_json::from_str(json).expect("valid spec")
    }

    fn first_value(line: &[Option<f64>]) -> Option<usize> {
        line.iter().position(Option::is_some)
    }

    #[test]
    fn align_pads_warmup() {
        assert_eq!(align(&[1.0, 2.0], 2, 4), vec![None, None, Some(1.0), Some(2.0)]);
        assert_eq!(align(&[1.0, 2.0], 3, 4), vec![None, None, None, Some(1.0)]);
        assert_eq!(align(&[], 0, 2), vec![None, None]);
    }

    #[test]
    fn deserialises_tagged_specs() {
        assert_eq!(
            spec(r#"{"type":"ema","period":50,"source":"hlc3"}"#),
            IndicatorSpec::Ema {
                period: Some(50),
                source: PriceSource::Hlc3
            }
        );
        assert_eq!(spec(r#"{"type":"williams_r"}"#), IndicatorSpec::WilliamsR { period: None });
        assert!(serde_json::from_str::<IndicatorSpec>(r#"{"type":"ichimoku"}"#).is_err());
        assert_eq!(IndicatorSpec::by_name("rsi"), Some(IndicatorSpec::Rsi { period: None, source: PriceSource::Close }));
        assert!(IndicatorSpec::by_name("nope").is_none());
    }

    #[test]
    fn every_line_matches_candle_length() {
        let data = candles(80);
        let defaults = IndicatorDefaults::default();
        for name in [
            "sma", "ema", "wma", "rsi", "macd", "bollinger", "atr", "stochastic", "cci", "mfi", "williams_r", "roc",
            "adx", "psar", "vwap",
        ] {
            let out = compute(&IndicatorSpec::by_name(name).unwrap(), &data, &defaults).unwrap();
            assert!(!out.lines.is_empty(), "{name} produced no lines");
            for (line, values) in &out.lines {
                assert_eq!(values.len(), data.len(), "{name}.{line} misaligned");
                assert!(values.last().unwrap().is_some(), "{name}.{line} has no latest value");
            }
        }
    }

    #[test]
    fn warmup_offsets_match_definitions() {
        let data = candles(80);
        let d = IndicatorDefaults::default();

        let rsi = compute(&spec(r#"{"type":"rsi","period":14}"#), &data, &d).unwrap();
        assert_eq!(first_value(&rsi.lines["rsi"]), Some(14));

        let macd = compute(&spec(r#"{"type":"macd","fast":12,"slow":26,"signal":9}"#), &data, &d).unwrap();
        assert_eq!(macd.name, "macd(12,26,9)");
        assert_eq!(first_value(&macd.lines["macd"]), Some(25));
        assert_eq!(first_value(&macd.lines["signal"]), Some(33));

        let adx = compute(&spec(r#"{"type":"adx","period":14}"#), &data, &d).unwrap();
        assert_eq!(first_value(&adx.lines["plus_di"]), Some(14));
        assert_eq!(first_value(&adx.lines["adx"]), Some(27));

        let stoch = compute(&spec(r#"{"type":"stochastic","k_period":14,"smooth":3,"d_period":3}"#), &data, &d).unwrap();
        assert_eq!(first_value(&stoch.lines["k"]), Some(15));
        assert_eq!(first_value(&stoch.lines["d"]), Some(17));

        let psar = compute(&spec(r#"{"type":"psar"}"#), &data, &d).unwrap();
        assert_eq!(first_value(&psar.lines["sar"]), Some(1));
    }

    #[test]
    fn aligned_values_match_compact_series() {
        let data = candles(60);
        let closes: Vec<f64> = data.iter().map(|c| c.close).collect();
        let out = compute(&spec(r#"{"type":"ema","period":10}"#), &data, &IndicatorDefaults::default()).unwrap();
        let compact = ema::calculate_ema(&closes, 10);
        assert_eq!(out.lines["ema"][9], Some(compact[0]));
        assert_eq!(out.lines["ema"][59], compact.last().copied());
    }

    #[test]
    fn short_input_yields_null_lines() {
        let data = candles(5);
        let out = compute(&spec(r#"{"type":"rsi","period":14}"#), &data, &IndicatorDefaults::default()).unwrap();
        assert!(out.lines["rsi"].iter().all(Option::is_none));
    }

    #[test]
    fn rejects_invalid_params() {
        let data = candles(10);
        let d = IndicatorDefaults::default();
        assert_eq!(
            compute(&spec(r#"{"type":"sma","period":0}"#), &data, &d).unwrap_err(),
            IndicatorError::ZeroPeriod {
                indicator: "sma",
                param: "period"
            }
        );
        assert!(matches!(
            compute(&spec(r#"{"type":"macd","fast":26,"slow":12}"#), &data, &d),
            Err(IndicatorError::InvalidParams { indicator: "macd", .. })
        ));
        assert!(compute(&spec(r#"{"type":"bollinger","std_dev":-1.0}"#), &data, &d).is_err());
        assert!(compute(&spec(r#"{"type":"psar","step":0.5,"max_step":0.2}"#), &data, &d).is_err());
        assert!(spec(r#"{"type":"cci","period":0}"#).validate(&d).is_err());
        assert!(spec(r#"{"type":"cci"}"#).validate(&d).is_ok());
    }

    #[test]
    fn rejects_oversized_periods() {
        let data = candles(30);
        let d = IndicatorDefaults::default();
        for json in [
            r#"{"type":"rsi","period":18446744073709551615}"#,
            r#"{"type":"adx","period":18446744073709551615}"#,
            r#"{"type":"stochastic","k_period":14,"smooth":3,"d_period":18446744073709551615}"#,
            r#"{"type":"macd","fast":12,"slow":9223372036854775808}"#,
        ] {
            assert!(
                matches!(compute(&spec(json), &data, &d), Err(IndicatorError::OutOfRange { .. })),
                "{json} accepted"
            );
        }
        let longest = format!(r#"{{"type":"sma","period":{MAX_PERIOD}}}"#);
        let out = compute(&spec(&longest), &data, &d).unwrap();
        assert!(out.lines["sma"].iter().all(Option::is_none));
    }

    #[test]
    fn align_survives_huge_offset() {
        assert_eq!(align(&[1.0], usize::MAX, 2), vec![None, None]);
    }

    #[test]
    fn price_source_extracts_fields() {
        let c = Candle {
            timestamp: 0,
            open: 1.0,
            high: 4.0,
            low: 2.0,
            close: 3.0,
            volume: 0.0,
        };
        assert_eq!(PriceSource::Hl2.extract(&[c]), vec![3.0]);
        assert_eq!(PriceSource::Ohlc4.extract(&[c]), vec![2.5]);
        assert_eq!(PriceSource::default().extract(&[c]), vec![3.0]);
    }
}
