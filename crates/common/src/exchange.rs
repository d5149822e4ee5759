use async_trait::async_trait;

use crate::{Candle, InstrumentSnapshot, MarketInfo, Result};

/// Minute candle units the exchange serves.
pub const MINUTE_UNITS: [u32; 8] = [1, 3, 5, 10, 15, 30, 60, 240];

/// Read-only market data source the screener polls.
///
/// `UpbitClient` implements this against the public quotation API.
/// Candle series come back newest first; callers that need chronological
/// order sort them.
#[async_trait]
pub trait CandleFetcher: Send + Sync {
    /// Every market listed on the exchange, with display names.
    async fn list_all_markets(&self) -> Result<Vec<MarketInfo>>;

    /// Ticker snapshots for the given markets. Fails on an empty list.
    async fn get_ticker(&self, markets: &[String]) -> Result<Vec<InstrumentSnapshot>>;

    /// Up to `count` minute candles of width `unit`, newest first.
    /// `unit` must be one of [`MINUTE_UNITS`].
    async fn get_minutes_candles(&self, unit: u32, market: &str, count: u32) -> Result<Vec<Candle>>;

    /// Up to `count` daily candles, newest first.
    async fn get_days_candles(&self, market: &str, count: u32) -> Result<Vec<Candle>>;
}
