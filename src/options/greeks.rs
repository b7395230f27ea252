// =============================================================================
// Black-Scholes Pricing and Greeks (European, continuous risk-free rate)
// =============================================================================
//
//   d1 = (ln(S/K) + (r + σ²/2)·T) / (σ·√T)
//   d2 = d1 - σ·√T
//   C  = S·N(d1) - K·e^{-rT}·N(d2)
//   P  = K·e^{-rT}·N(-d2) - S·N(-d1)
//
// Units as shown on the option chain:
//   theta  per calendar day
//   vega   per 1 volatility point (σ += 0.01)
//   rho    per 1 % change in r
//
// At or after expiry (T <= 0) the price is intrinsic value and every Greek
// is zero.
// =============================================================================

use std::f64::consts::{PI, SQRT_2};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const DAYS_PER_YEAR: f64 = 365.0;
const IV_MIN: f64 = 1e-4;
const IV_MAX: f64 = 5.0;
const IV_TOLERANCE: f64 = 1e-8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    #[serde(alias = "CE", alias = "ce")]
    Call,
    #[serde(alias = "PE", alias = "pe")]
    Put,
}

#[derive(Debug, Error, PartialEq)]
pub enum OptionsError {
    #[error("{field} must be a positive finite number, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("{field} must be finite, got {value}")]
    NotFinite { field: &'static str, value: f64 },
}

/// Contract and market parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionInputs {
    pub spot: f64,
    pub strike: f64,
    /// Year fraction until expiry.
    pub time_to_expiry: f64,
    /// Continuously compounded annual rate, e.g. 0.065.
    pub rate: f64,
    /// Annualised volatility, e.g. 0.18.
    pub volatility: f64,
    pub option_type: OptionType,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    pub price: f64,
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
    pub rho: f64,
}

fn positive(field: &'static str, value: f64) -> Result<f64, OptionsError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(OptionsError::NotPositive { field, value })
    }
}

fn finite(field: &'static str, value: f64) -> Result<f64, OptionsError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(OptionsError::NotFinite { field, value })
    }
}

/// Standard normal density.
pub fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Standard normal CDF via the Abramowitz-Stegun 7.1.26 erf (|ε| < 1.5e-7).
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / SQRT_2))
}

fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254_829_592;
    const A2: f64 = -0.284_496_736;
    const A3: f64 = 1.421_413_741;
    const A4: f64 = -1.453_152_027;
    const A5: f64 = 1.061_405_429;
    const P: f64 = 0.327_591_1;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();
    sign * y
}

fn intrinsic(spot: f64, strike: f64, option_type: OptionType) -> f64 {
    match option_type {
        OptionType::Call => (spot - strike).max(0.0),
        OptionType::Put => (strike - spot).max(0.0),
    }
}

/// Price and Greeks for one contract.
pub fn black_scholes(inputs: &OptionInputs) -> Result<Greeks, OptionsError> {
    let s = positive("spot", inputs.spot)?;
    let k = positive("strike", inputs.strike)?;
    let t = finite("time_to_expiry", inputs.time_to_expiry)?;
    let r = finite("rate", inputs.rate)?;

    if t <= 0.0 {
        return Ok(Greeks {
            price: intrinsic(s, k, inputs.option_type),
            delta: 0.0,
            gamma: 0.0,
            theta: 0.0,
            vega: 0.0,
            rho: 0.0,
        });
    }
    let sigma = positive("volatility", inputs.volatility)?;

    let sqrt_t = t.sqrt();
    let d1 = ((s / k).ln() + (r + 0.5 * sigma * sigma) * t) / (sigma * sqrt_t);
    let d2 = d1 - sigma * sqrt_t;
    let discount = (-r * t).exp();
    let pdf_d1 = norm_pdf(d1);

    let gamma = pdf_d1 / (s * sigma * sqrt_t);
    let vega = s * pdf_d1 * sqrt_t / 100.0;
    let decay = -s * pdf_d1 * sigma / (2.0 * sqrt_t);

    let greeks = match inputs.option_type {
        OptionType::Call => Greeks {
            price: s * norm_cdf(d1) - k * discount * norm_cdf(d2),
            delta: norm_cdf(d1),
            gamma,
            theta: (decay - r * k * discount * norm_cdf(d2)) / DAYS_PER_YEAR,
            vega,
            rho: k * t * discount * norm_cdf(d2) / 100.0,
        },
        OptionType::Put => Greeks {
            price: k * discount * norm_cdf(-d2) - s * norm_cdf(-d1),
            delta: norm_cdf(d1) - 1.0,
            gamma,
            theta: (decay + r * k * discount * norm_cdf(-d2)) / DAYS_PER_YEAR,
            vega,
            rho: -k * t * discount * norm_cdf(-d2) / 100.0,
        },
    };

    Ok(greeks)
}

/// Volatility that reproduces `market_price`.
///
/// Newton-Raphson from a Brenner-Subrahmanyam seed; falls back to bisection
/// on `[1e-4, 5.0]` when Newton stalls or leaves that range. `None` when the
/// contract is expired, inputs are invalid, or the price lies outside the
/// no-arbitrage bounds.
pub fn implied_volatility(
    market_price: f64,
    spot: f64,
    strike: f64,
    time_to_expiry: f64,
    rate: f64,
    option_type: OptionType,
) -> Option<f64> {
    if !(market_price.is_finite() && spot > 0.0 && strike > 0.0 && time_to_expiry > 0.0 && rate.is_finite()) {
        return None;
    }

    let discounted_strike = strike * (-rate * time_to_expiry).exp();
    let (lower, upper) = match option_type {
        OptionType::Call => ((spot - discounted_strike).max(0.0), spot),
        OptionType::Put => ((discounted_strike - spot).max(0.0), discounted_strike),
    };
    if market_price <= lower || market_price >= upper {
        return None;
    }

    let price_at = |sigma: f64| -> Option<Greeks> {
        black_scholes(&OptionInputs {
            spot,
            strike,
            time_to_expiry,
            rate,
            volatility: sigma,
            option_type,
        })
        .ok()
    };

    // Newton
    let mut sigma = ((2.0 * PI / time_to_expiry).sqrt() * market_price / spot).clamp(0.05, 1.0);
    for _ in 0..50 {
        let g = price_at(sigma)?;
        let diff = g.price - market_price;
        if diff.abs() < IV_TOLERANCE {
            return Some(sigma);
        }
        let vega = g.vega * 100.0;
        if vega < 1e-10 {
            break;
        }
        sigma -= diff / vega;
        if !(IV_MIN..=IV_MAX).contains(&sigma) {
            break;
        }
    }

    // Bisection
    let (mut lo, mut hi) = (IV_MIN, IV_MAX);
    if price_at(lo)?.price > market_price || price_at(hi)?.price < market_price {
        return None;
    }
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        let diff = price_at(mid)?.price - market_price;
        if diff.abs() < IV_TOLERANCE || hi - lo < 1e-12 {
            return Some(mid);
        }
        if diff > 0.0 {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    Some(0.5 * (lo + hi))
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn atm(option_type: OptionType) -> OptionInputs {
        OptionInputs {
            spot: 100.0,
            strike: 100.0,
            time_to_expiry: 1.0,
            rate: 0.05,
            volatility: 0.2,
            option_type,
        }
    }

    #[test]
    fn cdf_reference_points() {
        assert!((norm_cdf(0.0) - 0.5).abs() < 1e-7);
        assert!((norm_cdf(1.96) - 0.975).abs() < 1e-4);
        assert!((norm_cdf(-1.0) - 0.158_655).abs() < 1e-5);
    }

    #[test]
    fn textbook_prices() {
        // Hull: S=K=100, T=1, r=5%, σ=20% => C ≈ 10.4506, P ≈ 5.5735.
        let call = black_scholes(&atm(OptionType::Call)).unwrap();
        let put = black_scholes(&atm(OptionType::Put)).unwrap();
        assert!((call.price - 10.4506).abs() < 1e-3, "call {}", call.price);
        assert!((put.price - 5.5735).abs() < 1e-3, "put {}", put.price);
        assert!((call.delta - 0.6368).abs() < 1e-3);
        assert!((put.delta + 0.3632).abs() < 1e-3);
    }

    #[test]
    fn put_call_parity() {
        let call = black_scholes(&atm(OptionType::Call)).unwrap();
        let put = black_scholes(&atm(OptionType::Put)).unwrap();
        let forward = 100.0 - 100.0 * (-0.05_f64).exp();
        assert!((call.price - put.price - forward).abs() < 1e-6);
        assert!((call.gamma - put.gamma).abs() < 1e-12);
        assert!((call.vega - put.vega).abs() < 1e-12);
    }

    #[test]
    fn greek_units() {
        let call = black_scholes(&atm(OptionType::Call)).unwrap();
        // Vega per vol point ≈ 0.3752, theta per day ≈ -6.414 / 365.
        assert!((call.vega - 0.3752).abs() < 1e-3);
        assert!((call.theta - (-6.414 / 365.0)).abs() < 1e-3);
        assert!((call.rho - 0.5323).abs() < 1e-3);
        assert!(call.gamma > 0.0);
    }

    #[test]
    fn expired_is_intrinsic() {
        let mut inputs = atm(OptionType::Put);
        inputs.time_to_expiry = 0.0;
        inputs.spot = 90.0;
        let g = black_scholes(&inputs).unwrap();
        assert_eq!(g.price, 10.0);
        assert_eq!(g.delta, 0.0);
        assert_eq!(g.vega, 0.0);
    }

    #[test]
    fn rejects_bad_inputs() {
        let mut inputs = atm(OptionType::Call);
        inputs.spot = -1.0;
        assert_eq!(
            black_scholes(&inputs),
            Err(OptionsError::NotPositive { field: "spot", value: -1.0 })
        );
        let mut inputs = atm(OptionType::Call);
        inputs.volatility = 0.0;
        assert!(black_scholes(&inputs).is_err());
    }

    #[test]
    fn implied_vol_recovers_input() {
        for (option_type, sigma, strike) in [
            (OptionType::Call, 0.2, 100.0),
            (OptionType::Put, 0.35, 110.0),
            (OptionType::Call, 0.8, 140.0),
            (OptionType::Put, 0.12, 85.0),
        ] {
            let inputs = OptionInputs {
                strike,
                volatility: sigma,
                option_type,
                ..atm(option_type)
            };
            let price = black_scholes(&inputs).unwrap().price;
            let iv = implied_volatility(price, 100.0, strike, 1.0, 0.05, option_type).unwrap();
            assert!((iv - sigma).abs() < 1e-5, "{option_type:?} σ={sigma}: got {iv}");
        }
    }

    #[test]
    fn implied_vol_outside_bounds() {
        // Below intrinsic (discounted) for a deep ITM call.
        assert!(implied_volatility(1.0, 150.0, 100.0, 0.5, 0.05, OptionType::Call).is_none());
        // Above the spot price.
        assert!(implied_volatility(120.0, 100.0, 100.0, 0.5, 0.05, OptionType::Call).is_none());
        // Expired.
        assert!(implied_volatility(5.0, 100.0, 100.0, 0.0, 0.05, OptionType::Call).is_none());
    }

    #[test]
    fn option_type_aliases() {
        assert_eq!(serde_json::from_str::<OptionType>("\"CE\"").unwrap(), OptionType::Call);
        assert_eq!(serde_json::from_str::<OptionType>("\"put\"").unwrap(), OptionType::Put);
    }
}
