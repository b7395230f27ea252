// =============================================================================
// Option Chain Analytics
// =============================================================================
//
//   PCR       = Σ put OI / Σ call OI
//   Max pain  = settlement strike K* minimising the total writer payout
//               Σ call_oi·max(K* - K, 0) + put_oi·max(K - K*, 0)
//   ATM       = strike nearest to spot (lower strike on a tie)
//
// Per-row Greeks use the IV solved from each side's last traded price.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::options::greeks::{black_scholes, implied_volatility, Greeks, OptionInputs, OptionType, OptionsError};

/// One strike of the chain as shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChainRow {
    pub strike: f64,
    #[serde(default)]
    pub call_oi: f64,
    #[serde(default)]
    pub put_oi: f64,
    #[serde(default)]
    pub call_ltp: Option<f64>,
    #[serde(default)]
    pub put_ltp: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SideAnalytics {
    pub iv: f64,
    pub greeks: Greeks,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowAnalytics {
    pub strike: f64,
    pub call: Option<SideAnalytics>,
    pub put: Option<SideAnalytics>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainAnalytics {
    pub spot: f64,
    pub total_call_oi: f64,
    pub total_put_oi: f64,
    /// `None` when there is no call open interest.
    pub pcr: Option<f64>,
    pub max_pain: Option<f64>,
    pub atm_strike: Option<f64>,
    pub rows: Vec<RowAnalytics>,
}

/// Put/call open-interest ratio.
pub fn put_call_ratio(rows: &[ChainRow]) -> Option<f64> {
    let calls: f64 = rows.iter().map(|r| r.call_oi).sum();
    let puts: f64 = rows.iter().map(|r| r.put_oi).sum();
    (calls > 0.0).then(|| puts / calls)
}

/// Strike at which option writers pay out the least.
pub fn max_pain(rows: &[ChainRow]) -> Option<f64> {
    let mut best: Option<(f64, f64)> = None;
    for candidate in rows.iter().map(|r| r.strike) {
        let payout: f64 = rows
            .iter()
            .map(|r| r.call_oi * (candidate - r.strike).max(0.0) + r.put_oi * (r.strike - candidate).max(0.0))
            .sum();
        let better = match best {
            None => true,
            Some((strike, pain)) => payout < pain || (payout == pain && candidate < strike),
        };
        if better {
            best = Some((candidate, payout));
        }
    }
    best.map(|(strike, _)| strike)
}

/// Strike nearest to `spot`; the lower one wins a tie.
pub fn atm_strike(rows: &[ChainRow], spot: f64) -> Option<f64> {
    rows.iter().map(|r| r.strike).min_by(|a, b| {
        (a - spot)
            .abs()
            .total_cmp(&(b - spot).abs())
            .then_with(|| a.total_cmp(b))
    })
}

fn side(ltp: Option<f64>, spot: f64, strike: f64, t: f64, rate: f64, option_type: OptionType) -> Option<SideAnalytics> {
    let price = ltp?;
    let iv = implied_volatility(price, spot, strike, t, rate, option_type)?;
    let greeks = black_scholes(&OptionInputs {
        spot,
        strike,
        time_to_expiry: t,
        rate,
        volatility: iv,
        option_type,
    })
    .ok()?;
    Some(SideAnalytics { iv, greeks })
}

/// Analyse a full chain. Rows are returned sorted by strike; rows with a
/// non-positive strike are rejected.
pub fn analyze_chain(
    spot: f64,
    time_to_expiry: f64,
    rate: f64,
    rows: &[ChainRow],
) -> Result<ChainAnalytics, OptionsError> {
    if !(spot.is_finite() && spot > 0.0) {
        return Err(OptionsError::NotPositive { field: "spot", value: spot });
    }
    if !time_to_expiry.is_finite() {
        return Err(OptionsError::NotFinite {
            field: "time_to_expiry",
            value: time_to_expiry,
        });
    }
    if let Some(bad) = rows.iter().find(|r| !(r.strike.is_finite() && r.strike > 0.0)) {
        return Err(OptionsError::NotPositive {
            field: "strike",
            value: bad.strike,
        });
    }

    let mut sorted = rows.to_vec();
    sorted.sort_by(|a, b| a.strike.total_cmp(&b.strike));

    let analytics: Vec<RowAnalytics> = sorted
        .iter()
        .map(|r| RowAnalytics {
            strike: r.strike,
            call: side(r.call_ltp, spot, r.strike, time_to_expiry, rate, OptionType::Call),
            put: side(r.put_ltp, spot, r.strike, time_to_expiry, rate, OptionType::Put),
        })
        .collect();

    let result = ChainAnalytics {
        spot,
        total_call_oi: sorted.iter().map(|r| r.call_oi).sum(),
        total_put_oi: sorted.iter().map(|r| r.put_oi).sum(),
        pcr: put_call_ratio(&sorted),
        max_pain: max_pain(&sorted),
        atm_strike: atm_strike(&sorted, spot),
        rows: analytics,
    };
    debug!(strikes = sorted.len(), pcr = ?result.pcr, max_pain = ?result.max_pain, "option chain analysed");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(strike: f64, call_oi: f64, put_oi: f64) -> ChainRow {
        ChainRow {
            strike,
            call_oi,
            put_oi,
            call_ltp: None,
            put_ltp: None,
        }
    }

    #[test]
    fn pcr_and_empty_calls() {
        let rows = [row(100.0, 200.0, 300.0), row(110.0, 200.0, 100.0)];
        assert!((put_call_ratio(&rows).unwrap() - 1.0).abs() < 1e-12);
        assert!(put_call_ratio(&[row(100.0, 0.0, 50.0)]).is_none());
    }

    #[test]
    fn max_pain_hand_computed() {
        // K*=90:  calls 0, puts 100*10 + 100*20 = 3000
        // K*=100: calls 50*10 = 500, puts 100*10 = 1000 => 1500
        // K*=110: calls 50*20 + 100*10 = 2000, puts 0 => 2000
        let rows = [row(90.0, 50.0, 0.0), row(100.0, 100.0, 100.0), row(110.0, 0.0, 100.0)];
        assert_eq!(max_pain(&rows), Some(100.0));
        assert_eq!(max_pain(&[]), None);
    }

    #[test]
    fn atm_prefers_lower_on_tie() {
        let rows = [row(100.0, 0.0, 0.0), row(110.0, 0.0, 0.0), row(120.0, 0.0, 0.0)];
        assert_eq!(atm_strike(&rows, 104.0), Some(100.0));
        assert_eq!(atm_strike(&rows, 105.0), Some(100.0));
        assert_eq!(atm_strike(&rows, 118.0), Some(120.0));
    }

    #[test]
    fn chain_solves_iv_per_row() {
        let priced = |strike: f64, option_type: OptionType| {
            black_scholes(&OptionInputs {
                spot: 100.0,
                strike,
                time_to_expiry: 30.0 / 365.0,
                rate: 0.065,
                volatility: 0.18,
                option_type,
            })
            .unwrap()
            .price
        };
        let rows = vec![
            ChainRow {
                call_ltp: Some(priced(105.0, OptionType::Call)),
                put_ltp: Some(priced(105.0, OptionType::Put)),
                ..row(105.0, 1000.0, 400.0)
            },
            ChainRow {
                call_ltp: Some(priced(95.0, OptionType::Call)),
                put_ltp: None,
                ..row(95.0, 300.0, 1200.0)
            },
        ];

        let out = analyze_chain(100.0, 30.0 / 365.0, 0.065, &rows).unwrap();
        assert_eq!(out.rows[0].strike, 95.0);
        assert!(out.rows[0].put.is_none());
        let call = out.rows[1].call.unwrap();
        assert!((call.iv - 0.18).abs() < 1e-5);
        assert!(call.greeks.delta > 0.0 && call.greeks.delta < 0.5);
        assert_eq!(out.atm_strike, Some(95.0));
        assert!((out.pcr.unwrap() - 1600.0 / 1300.0).abs() < 1e-12);
    }

    #[test]
    fn chain_rejects_bad_spot_and_strike() {
        assert!(analyze_chain(0.0, 0.1, 0.05, &[]).is_err());
        assert!(analyze_chain(100.0, 0.1, 0.05, &[row(-5.0, 1.0, 1.0)]).is_err());
    }
}
