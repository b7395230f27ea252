// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`. Requests that work on a candle series
// either carry the candles inline (`"candles": [...]`) or name a
// `symbol` (+ optional `interval` / `limit`), in which case the series is
// served from the cache or fetched from the upstream backend.
//
// CORS is configured permissively; the dashboard is served from another
// origin.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

use crate::api::ApiError;
use crate::app_state::AppState;
use crate::backtest::{run_crossover, BacktestReport, CrossoverConfig};
use crate::indicators::{compute, IndicatorOutput, IndicatorSpec};
use crate::market_data::Candle;
use crate::options::{
    analyze_chain, black_scholes, implied_volatility, ChainAnalytics, ChainRow, Greeks, OptionInputs, OptionType,
};
use crate::patterns::{
    check_strength, check_tolerance, evaluate, library, match_library, scan, PatternDefinition, PatternError,
    PatternMatch, PatternOccurrence, PointSet, Relationship, SelectedPoint,
};
use crate::signals::{summarize, TechnicalSummary};

type ApiResult<T> = Result<Json<T>, ApiError>;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Service ─────────────────────────────────────────────────
        .route("/api/v1/health", get(health))
        .route("/api/v1/state", get(full_state))
        // ── Charting ────────────────────────────────────────────────
        .route("/api/v1/indicators", post(indicators))
        .route("/api/v1/chart/:symbol", get(chart))
        .route("/api/v1/summary/:symbol", get(summary))
        // ── Patterns ────────────────────────────────────────────────
        .route("/api/v1/patterns", get(patterns))
        .route("/api/v1/pattern-detection", post(pattern_detection))
        .route("/api/v1/pattern-scan", post(pattern_scan))
        // ── Backtest & options ──────────────────────────────────────
        .route("/api/v1/backtest/crossover", post(backtest_crossover))
        .route("/api/v1/options/greeks", post(option_greeks))
        .route("/api/v1/options/chain", post(option_chain))
        // ── WebSocket (handled separately in ws module but mounted here) ─
        .route("/api/v1/ws", get(crate::api::ws::ws_handler))
        // ── Middleware & State ───────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Candle source shared by the series endpoints
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct CandleSource {
    #[serde(default)]
    candles: Option<Vec<Candle>>,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    interval: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
}

/// Inline candles (sorted by time) or the cached/fetched series for a symbol.
async fn resolve_candles(state: &AppState, source: CandleSource) -> Result<Vec<Candle>, ApiError> {
    if let Some(mut candles) = source.candles {
        if candles.is_empty() {
            return Err(ApiError::BadRequest("candles must not be empty".into()));
        }
        candles.sort_by_key(|c| c.timestamp);
        return Ok(candles);
    }

    let Some(symbol) = source.symbol.filter(|s| !s.trim().is_empty()) else {
        return Err(ApiError::BadRequest("request needs either candles or a symbol".into()));
    };
    let (interval, limit) = {
        let config = state.runtime_config.read();
        (
            source.interval.unwrap_or_else(|| config.watchlist.interval.clone()),
            source.limit.unwrap_or(config.watchlist.history_limit),
        )
    };
    load_series(state, &symbol, &interval, limit).await
}

async fn load_series(state: &AppState, symbol: &str, interval: &str, limit: usize) -> Result<Vec<Candle>, ApiError> {
    let candles = state.load_candles(symbol, interval, limit).await?;
    if candles.is_empty() {
        return Err(ApiError::NotFound(format!(
            "no candles for {}@{interval}",
            symbol.to_uppercase()
        )));
    }
    Ok(candles)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        server_time: chrono::Utc::now().timestamp_millis(),
    };
    Json(resp)
}

// =============================================================================
// Full state snapshot
// =============================================================================

async fn full_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.build_snapshot();
    Json(snapshot)
}

// =============================================================================
// Indicators
// =============================================================================

#[derive(Debug, Deserialize)]
struct IndicatorRequest {
    #[serde(flatten)]
    source: CandleSource,
    /// Empty means the configured chart set.
    #[serde(default)]
    indicators: Vec<IndicatorSpec>,
}

#[derive(Debug, Serialize)]
struct IndicatorResponse {
    timestamps: Vec<i64>,
    indicators: Vec<IndicatorOutput>,
}

fn chart_specs(names: &[String]) -> Vec<IndicatorSpec> {
    names
        .iter()
        .filter_map(|name| {
            let spec = IndicatorSpec::by_name(name);
            if spec.is_none() {
                warn!(indicator = %name, "unknown chart indicator in config, skipped");
            }
            spec
        })
        .collect()
}

fn compute_all(
    specs: &[IndicatorSpec],
    candles: &[Candle],
    defaults: &crate::runtime_config::IndicatorDefaults,
) -> Result<Vec<IndicatorOutput>, ApiError> {
    specs
        .iter()
        .map(|spec| compute(spec, candles, defaults).map_err(ApiError::from))
        .collect()
}

async fn indicators(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IndicatorRequest>,
) -> ApiResult<IndicatorResponse> {
    let defaults = state.runtime_config.read().indicators.clone();
    let specs = if req.indicators.is_empty() {
        chart_specs(&defaults.chart)
    } else {
        req.indicators
    };
    // Reject bad parameters before touching the upstream.
    for spec in &specs {
        spec.validate(&defaults)?;
    }

    let candles = resolve_candles(&state, req.source).await?;
    let outputs = compute_all(&specs, &candles, &defaults)?;
    debug!(candles = candles.len(), indicators = outputs.len(), "indicators computed");

    Ok(Json(IndicatorResponse {
        timestamps: candles.iter().map(|c| c.timestamp).collect(),
        indicators: outputs,
    }))
}

// =============================================================================
// Chart & summary
// =============================================================================

#[derive(Debug, Deserialize)]
struct SeriesQuery {
    interval: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ChartResponse {
    symbol: String,
    interval: String,
    candles: Vec<Candle>,
    indicators: Vec<IndicatorOutput>,
}

async fn chart(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(query): Query<SeriesQuery>,
) -> ApiResult<ChartResponse> {
    let (defaults, interval, limit) = {
        let config = state.runtime_config.read();
        (
            config.indicators.clone(),
            query.interval.unwrap_or_else(|| config.watchlist.interval.clone()),
            query.limit.unwrap_or(config.watchlist.history_limit),
        )
    };

    let candles = load_series(&state, &symbol, &interval, limit).await?;
    let indicators = compute_all(&chart_specs(&defaults.chart), &candles, &defaults)?;

    Ok(Json(ChartResponse {
        symbol: symbol.to_uppercase(),
        interval,
        candles,
        indicators,
    }))
}

async fn summary(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(query): Query<SeriesQuery>,
) -> ApiResult<TechnicalSummary> {
    let (defaults, thresholds, interval, limit) = {
        let config = state.runtime_config.read();
        (
            config.indicators.clone(),
            config.summary.clone(),
            query.interval.unwrap_or_else(|| config.watchlist.interval.clone()),
            query.limit.unwrap_or(config.watchlist.history_limit),
        )
    };

    let candles = load_series(&state, &symbol, &interval, limit).await?;
    let card = summarize(&symbol, &interval, &candles, &defaults, &thresholds)
        .ok_or_else(|| ApiError::NotFound(format!("no candles for {symbol}@{interval}")))?;
    state.store_summary(card.clone());
    Ok(Json(card))
}

// =============================================================================
// Patterns
// =============================================================================

async fn patterns() -> impl IntoResponse {
    Json(library::builtin())
}

fn parse_relationships(raw: &[String]) -> Result<Vec<Relationship>, PatternError> {
    raw.iter().map(|s| s.parse()).collect()
}

#[derive(Debug, Deserialize)]
struct DetectionRequest {
    points: Vec<SelectedPoint>,
    /// Evaluate only this built-in formation.
    #[serde(default)]
    pattern: Option<String>,
    /// Evaluate a user-drawn formation instead of the library.
    #[serde(default)]
    relationships: Option<Vec<String>>,
    #[serde(default)]
    tolerance_pct: Option<f64>,
    #[serde(default)]
    min_score: Option<f64>,
}

#[derive(Debug, Serialize)]
struct DetectionResponse {
    mode: &'static str,
    points: usize,
    matches: Vec<PatternMatch>,
}

async fn pattern_detection(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DetectionRequest>,
) -> ApiResult<DetectionResponse> {
    let defaults = state.runtime_config.read().patterns.clone();
    let tolerance = req.tolerance_pct.unwrap_or(defaults.tolerance_pct);
    let points = PointSet::from_selection(req.points)?;

    let (mode, matches) = match (req.relationships, req.pattern) {
        (Some(raw), _) => {
            let definition = PatternDefinition::custom(parse_relationships(&raw)?, points.len())?;
            ("custom", vec![evaluate(&definition, &points, tolerance)?])
        }
        (None, Some(name)) => {
            let definition = library::find(&name).ok_or(PatternError::UnknownPattern(name))?;
            ("pattern", vec![evaluate(definition, &points, tolerance)?])
        }
        (None, None) => {
            let min_score = req.min_score.unwrap_or(defaults.min_score);
            ("library", match_library(&points, tolerance, min_score)?)
        }
    };

    Ok(Json(DetectionResponse {
        mode,
        points: points.len(),
        matches,
    }))
}

#[derive(Debug, Deserialize)]
struct ScanRequest {
    #[serde(flatten)]
    source: CandleSource,
    #[serde(default)]
    pattern: Option<String>,
    #[serde(default)]
    relationships: Option<Vec<String>>,
    /// Point count of a custom formation; defaults to the highest point referenced.
    #[serde(default)]
    points: Option<usize>,
    #[serde(default)]
    strength: Option<usize>,
    #[serde(default)]
    tolerance_pct: Option<f64>,
}

#[derive(Debug, Serialize)]
struct ScanResponse {
    pattern: String,
    candles: usize,
    occurrences: Vec<PatternOccurrence>,
}

async fn pattern_scan(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ScanRequest>,
) -> ApiResult<ScanResponse> {
    let defaults = state.runtime_config.read().patterns.clone();

    let definition = match (req.relationships, req.pattern) {
        (Some(raw), _) => {
            let rels = parse_relationships(&raw)?;
            let points = req
                .points
                .unwrap_or_else(|| rels.iter().map(Relationship::max_point).max().unwrap_or(0));
            PatternDefinition::custom(rels, points)?
        }
        (None, Some(name)) => library::find(&name)
            .cloned()
            .ok_or(PatternError::UnknownPattern(name))?,
        (None, None) => {
            return Err(ApiError::BadRequest(
                "pattern-scan needs a pattern name or relationships".into(),
            ))
        }
    };
    let strength = req.strength.unwrap_or(defaults.pivot_strength);
    let tolerance = req.tolerance_pct.unwrap_or(defaults.tolerance_pct);
    check_strength(strength)?;
    check_tolerance(tolerance)?;

    let candles = resolve_candles(&state, req.source).await?;
    let occurrences = scan(&candles, &definition, strength, tolerance)?;

    Ok(Json(ScanResponse {
        pattern: definition.name,
        candles: candles.len(),
        occurrences,
    }))
}

// =============================================================================
// Backtest
// =============================================================================

#[derive(Debug, Deserialize)]
struct BacktestRequest {
    #[serde(flatten)]
    source: CandleSource,
    #[serde(flatten)]
    config: CrossoverConfig,
}

async fn backtest_crossover(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BacktestRequest>,
) -> ApiResult<BacktestReport> {
    req.config.validate()?;
    let candles = resolve_candles(&state, req.source).await?;
    let report = run_crossover(&candles, &req.config)?;
    info!(
        fast = req.config.fast_period,
        slow = req.config.slow_period,
        trades = report.trades.len(),
        total_return_pct = report.total_return_pct,
        "crossover backtest complete"
    );
    Ok(Json(report))
}

// =============================================================================
// Options
// =============================================================================

#[derive(Debug, Deserialize)]
struct GreeksRequest {
    spot: f64,
    strike: f64,
    time_to_expiry: f64,
    rate: f64,
    option_type: OptionType,
    /// Used as-is when present.
    #[serde(default)]
    volatility: Option<f64>,
    /// Solved for IV when no volatility is given.
    #[serde(default)]
    market_price: Option<f64>,
}

#[derive(Debug, Serialize)]
struct GreeksResponse {
    volatility: f64,
    implied: bool,
    greeks: Greeks,
}

async fn option_greeks(Json(req): Json<GreeksRequest>) -> ApiResult<GreeksResponse> {
    let (volatility, implied) = match (req.volatility, req.market_price) {
        (Some(vol), _) => (vol, false),
        (None, Some(price)) => {
            let iv = implied_volatility(price, req.spot, req.strike, req.time_to_expiry, req.rate, req.option_type)
                .ok_or_else(|| {
                    ApiError::BadRequest(format!("no implied volatility reproduces price {price}"))
                })?;
            (iv, true)
        }
        (None, None) => {
            return Err(ApiError::BadRequest(
                "either volatility or market_price is required".into(),
            ))
        }
    };

    let greeks = black_scholes(&OptionInputs {
        spot: req.spot,
        strike: req.strike,
        time_to_expiry: req.time_to_expiry,
        rate: req.rate,
        volatility,
        option_type: req.option_type,
    })?;

    Ok(Json(GreeksResponse {
        volatility,
        implied,
        greeks,
    }))
}

#[derive(Debug, Deserialize)]
struct ChainRequest {
    spot: f64,
    time_to_expiry: f64,
    rate: f64,
    rows: Vec<ChainRow>,
}

async fn option_chain(Json(req): Json<ChainRequest>) -> ApiResult<ChainAnalytics> {
    let analytics = analyze_chain(req.spot, req.time_to_expiry, req.rate, &req.rows)?;
    Ok(Json(analytics))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::market_data::CandleKey;
    use crate::runtime_config::RuntimeConfig;

    fn app() -> (Arc<AppState>, Router) {
        let state = Arc::new(AppState::new(RuntimeConfig::default()).unwrap());
        (state.clone(), router(state))
    }

    fn candles(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle {
                timestamp: 1_700_000_000_000 + i as i64 * 60_000,
                open: c,
                high: c + 1.0,
                low: c - 1.0,
                close: c,
                volume: 1_000.0,
            })
            .collect()
    }

    async fn send(router: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(b) => builder
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (_, router) = app();
        let (status, body) = send(router, "GET", "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert!(body["state_version"].as_u64().unwrap() >= 1);
    }

    #[tokio::test]
    async fn state_lists_watchlist() {
        let (_, router) = app();
        let (status, body) = send(router, "GET", "/api/v1/state", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["watchlist"]["interval"], "5m");
        assert_eq!(body["watchlist"]["symbols"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn indicators_align_inline_candles() {
        let (_, router) = app();
        let body = json!({
            "candles": candles(&[1.0, 2.0, 3.0, 4.0, 5.0]),
            "indicators": [{ "type": "sma", "period": 3 }],
        });
        let (status, body) = send(router, "POST", "/api/v1/indicators", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["timestamps"].as_array().unwrap().len(), 5);
        let sma = &body["indicators"][0];
        assert_eq!(sma["name"], "sma(3)");
        assert_eq!(sma["lines"]["sma"], json!([null, null, 2.0, 3.0, 4.0]));
    }

    #[tokio::test]
    async fn indicators_reject_zero_period() {
        let (_, router) = app();
        let body = json!({
            "candles": candles(&[1.0, 2.0, 3.0]),
            "indicators": [{ "type": "rsi", "period": 0 }],
        });
        let (status, body) = send(router, "POST", "/api/v1/indicators", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("rsi"));
    }

    #[tokio::test]
    async fn indicators_reject_oversized_period() {
        let (_, router) = app();
        let body = json!({
            "candles": candles(&[1.0, 2.0, 3.0]),
            "indicators": [{ "type": "adx", "period": u64::MAX }],
        });
        let (status, body) = send(router, "POST", "/api/v1/indicators", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("adx"));
    }

    #[tokio::test]
    async fn indicators_need_a_source() {
        let (_, router) = app();
        let body = json!({ "indicators": [{ "type": "ema" }] });
        let (status, _) = send(router, "POST", "/api/v1/indicators", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn summary_and_chart_from_cache() {
        let (state, router) = app();
        let closes: Vec<f64> = (0..300).map(|i| 100.0 + i as f64 * 0.5).collect();
        state.candle_buffer.replace(CandleKey::new("TCS", "5m"), candles(&closes));

        let (status, body) = send(router.clone(), "GET", "/api/v1/summary/tcs", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["symbol"], "TCS");
        assert_eq!(body["readings"]["ema_trend"]["bullish"], true);
        assert_eq!(body["readings"]["psar"]["uptrend"], true);
        assert_eq!(state.summaries.read().len(), 1);

        let (status, body) = send(router, "GET", "/api/v1/chart/TCS?limit=100", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["candles"].as_array().unwrap().len(), 100);
        assert_eq!(body["indicators"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn off_watchlist_summary_is_served_not_kept() {
        let (state, router) = app();
        let closes: Vec<f64> = (0..300).map(|i| 100.0 + i as f64).collect();
        state.candle_buffer.replace(CandleKey::new("WIPRO", "5m"), candles(&closes));

        let (status, body) = send(router, "GET", "/api/v1/summary/wipro", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["symbol"], "WIPRO");
        assert!(state.summaries.read().is_empty());
    }

    #[tokio::test]
    async fn patterns_lists_library() {
        let (_, router) = app();
        let (status, body) = send(router, "GET", "/api/v1/patterns", None).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["name"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"double_bottom"));
        assert!(names.contains(&"head_and_shoulders"));
    }

    fn five_points() -> Value {
        json!([
            { "index": 0, "price": 110.0 },
            { "index": 10, "price": 100.0 },
            { "index": 20, "price": 108.0 },
            { "index": 30, "price": 100.5 },
            { "index": 40, "price": 112.0 },
        ])
    }

    #[tokio::test]
    async fn detection_ranks_library() {
        let (_, router) = app();
        let body = json!({ "points": five_points() });
        let (status, body) = send(router, "POST", "/api/v1/pattern-detection", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mode"], "library");
        assert_eq!(body["matches"][0]["name"], "double_bottom");
        assert_eq!(body["matches"][0]["matched"], true);
    }

    #[tokio::test]
    async fn detection_custom_and_errors() {
        let (_, router) = app();
        let custom = json!({ "points": five_points(), "relationships": ["point1 > point2", "p5 > p1"] });
        let (status, body) = send(router.clone(), "POST", "/api/v1/pattern-detection", Some(custom)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mode"], "custom");
        assert_eq!(body["matches"][0]["satisfied"], 2);

        let bad = json!({ "points": five_points(), "relationships": ["point1 >> point2"] });
        let (status, _) = send(router.clone(), "POST", "/api/v1/pattern-detection", Some(bad)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let unknown = json!({ "points": five_points(), "pattern": "cup_and_handle" });
        let (status, body) = send(router, "POST", "/api/v1/pattern-detection", Some(unknown)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "unknown pattern 'cup_and_handle'");
    }

    #[tokio::test]
    async fn scan_requires_a_formation() {
        let (_, router) = app();
        let body = json!({ "candles": candles(&[1.0, 2.0, 3.0]) });
        let (status, _) = send(router, "POST", "/api/v1/pattern-scan", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn scan_rejects_bad_strength_and_tolerance() {
        let (_, router) = app();
        let data = candles(&[1.0, 2.0, 3.0]);
        for body in [
            json!({ "candles": data, "pattern": "double_top", "strength": 9_223_372_036_854_775_808_u64 }),
            json!({ "candles": data, "pattern": "double_top", "strength": 0 }),
            json!({ "candles": data, "pattern": "double_top", "tolerance_pct": -1.0 }),
        ] {
            let (status, body) = send(router.clone(), "POST", "/api/v1/pattern-scan", Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        }
    }

    #[tokio::test]
    async fn backtest_runs_and_validates() {
        let (_, router) = app();
        let closes: Vec<f64> = (0..60)
            .map(|i| 100.0 + 10.0 * (i as f64 / 6.0).sin())
            .collect();
        let body = json!({ "candles": candles(&closes), "fast_period": 3, "slow_period": 8 });
        let (status, body) = send(router.clone(), "POST", "/api/v1/backtest/crossover", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body["trades"].as_array().unwrap().is_empty());
        assert_eq!(body["equity_curve"].as_array().unwrap().len(), 60);

        let invalid = json!({ "candles": candles(&closes), "fast_period": 8, "slow_period": 3 });
        let (status, _) = send(router, "POST", "/api/v1/backtest/crossover", Some(invalid)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn greeks_from_volatility_or_price() {
        let (_, router) = app();
        let body = json!({
            "spot": 42.0, "strike": 40.0, "time_to_expiry": 0.5, "rate": 0.1,
            "volatility": 0.2, "option_type": "call",
        });
        let (status, priced) = send(router.clone(), "POST", "/api/v1/options/greeks", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(priced["implied"], false);
        let price = priced["greeks"]["price"].as_f64().unwrap();
        assert!((price - 4.76).abs() < 0.01);

        let body = json!({
            "spot": 42.0, "strike": 40.0, "time_to_expiry": 0.5, "rate": 0.1,
            "market_price": price, "option_type": "CE",
        });
        let (status, solved) = send(router.clone(), "POST", "/api/v1/options/greeks", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(solved["implied"], true);
        assert!((solved["volatility"].as_f64().unwrap() - 0.2).abs() < 1e-5);

        let missing = json!({
            "spot": 42.0, "strike": 40.0, "time_to_expiry": 0.5, "rate": 0.1, "option_type": "put",
        });
        let (status, _) = send(router, "POST", "/api/v1/options/greeks", Some(missing)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn chain_reports_pcr_and_max_pain() {
        let (_, router) = app();
        let body = json!({
            "spot": 101.0, "time_to_expiry": 0.05, "rate": 0.065,
            "rows": [
                { "strike": 90.0, "call_oi": 50.0, "put_oi": 0.0 },
                { "strike": 100.0, "call_oi": 100.0, "put_oi": 100.0 },
                { "strike": 110.0, "call_oi": 0.0, "put_oi": 100.0 },
            ],
        });
        let (status, body) = send(router, "POST", "/api/v1/options/chain", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["max_pain"], 100.0);
        assert_eq!(body["atm_strike"], 100.0);
        assert!((body["pcr"].as_f64().unwrap() - 200.0 / 150.0).abs() < 1e-12);
    }
}
