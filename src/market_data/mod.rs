pub mod candle_buffer;
pub mod refresh;
pub mod upstream;

// Re-export the Candle struct for convenient access (e.g. `use crate::market_data::Candle`).
pub use candle_buffer::{Candle, CandleBuffer, CandleKey};
pub use refresh::refresh_watchlist;
pub use upstream::HistoricalClient;
