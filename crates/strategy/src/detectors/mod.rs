pub mod cross;
pub mod pump;
pub mod volatility;

pub use cross::CrossDetector;
pub use pump::PumpDetector;
pub use volatility::VolatilityBreakoutDetector;

use common::{Candle, Error, Result, SignalSubtype};

use crate::config::ScreeningFileConfig;
use crate::state::MarketState;

/// Candle series a detector needs fetched before it can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandleRequest {
    Minutes { unit: u32, count: u32 },
    Days { count: u32 },
}

/// All detector implementations must satisfy this trait.
///
/// A detector reads one candle series and its own slice of the market's
/// state, and returns at most one signal. Detectors never see each other's
/// state.
pub trait Detector: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Series to fetch for this detector.
    fn candles(&self) -> CandleRequest;

    /// Evaluate the series against `state`. Detectors order the candles by
    /// timestamp themselves, so the feed order does not matter.
    ///
    /// Returns `Err(Error::Data)` when the series is shorter than the
    /// lookback; state is left untouched in that case.
    fn evaluate(&self, candles: &[Candle], state: &mut MarketState) -> Result<Option<SignalSubtype>>;
}

/// The three detectors, in the order a cycle runs them.
pub fn build_detectors(cfg: &ScreeningFileConfig) -> Vec<Box<dyn Detector>> {
    vec![
        Box::new(PumpDetector::new(cfg.pump.clone())),
        Box::new(CrossDetector::new(cfg.cross.clone())),
        Box::new(VolatilityBreakoutDetector::new(cfg.volatility.clone())),
    ]
}

fn require_len(candles: &[Candle], needed: usize, detector: &str) -> Result<()> {
    if candles.len() < needed {
        let market = candles.first().map(|c| c.market.as_str()).unwrap_or("?");
        return Err(Error::Data(format!(
            "{detector}: {market} has {} candles, need {needed}",
            candles.len()
        )));
    }
    Ok(())
}

/// Copy of `candles` sorted oldest first.
fn chronological(candles: &[Candle]) -> Vec<Candle> {
    let mut sorted = candles.to_vec();
    sorted.sort_by_key(|c| c.timestamp);
    sorted
}

/// Copy of `candles` sorted newest first.
fn latest_first(candles: &[Candle]) -> Vec<Candle> {
    let mut sorted = candles.to_vec();
    sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    sorted
}
