use tracing::debug;

use common::{Candle, Result, SignalSubtype};

use super::{chronological, require_len, CandleRequest, Detector};
use crate::config::VolatilityConfig;
use crate::state::MarketState;

/// Range-expansion breakout on daily candles, at most once per market per day.
///
/// Fires when today's body (`close - open`) exceeds `k` times yesterday's
/// high-low range.
#[derive(Debug, Clone)]
pub struct VolatilityBreakoutDetector {
    cfg: VolatilityConfig,
}

impl VolatilityBreakoutDetector {
    pub fn new(cfg: VolatilityConfig) -> Self {
        Self { cfg }
    }

    pub fn qualifies(&self, candles: &[Candle]) -> Result<bool> {
        require_len(candles, 2, self.name())?;

        let sorted = chronological(candles);
        let today = &sorted[sorted.len() - 1];
        let yesterday = &sorted[sorted.len() - 2];

        let range = yesterday.high - yesterday.low;
        Ok(today.close - today.open > self.cfg.k * range)
    }
}

impl Detector for VolatilityBreakoutDetector {
    fn name(&self) -> &'static str {
        "volatility"
    }

    fn candles(&self) -> CandleRequest {
        CandleRequest::Days {
            count: self.cfg.candle_count,
        }
    }

    fn evaluate(&self, candles: &[Candle], state: &mut MarketState) -> Result<Option<SignalSubtype>> {
        if !self.qualifies(candles)? {
            return Ok(None);
        }
        if state.vol.signaled_today {
            debug!(market = %candles[0].market, "Volatility breakout already signaled today");
            return Ok(None);
        }
        state.vol.signaled_today = true;
        Ok(Some(SignalSubtype::VolatilityBreak))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::test_support::newest_first;
    use crate::state::MarketStateStore;
    use common::Error;

    fn detector() -> VolatilityBreakoutDetector {
        VolatilityBreakoutDetector::new(VolatilityConfig::default())
    }

    /// Yesterday ranged 90..110 (range 20); today opened at 100 and trades at `close`.
    fn days(close: f64) -> Vec<Candle> {
        newest_first(
            &[
                (95.0, 110.0, 90.0, 100.0, 1_000.0),
                (100.0, close.max(100.0), 99.0, close, 1_000.0),
            ],
            24 * 60,
        )
    }

    #[test]
    fn body_must_strictly_exceed_half_the_range() {
        let det = detector();
        assert!(!det.qualifies(&days(110.0)).unwrap()); // body 10 == 0.5 * 20
        assert!(det.qualifies(&days(110.5)).unwrap());
    }

    #[test]
    fn fires_once_per_day_then_again_after_reset() {
        let det = detector();
        let mut store = MarketStateStore::new();
        let series = days(115.0);

        let fired: usize = (0..10)
            .filter_map(|_| det.evaluate(&series, store.entry("KRW-TEST")).unwrap())
            .count();
        assert_eq!(fired, 1);

        store.clear();
        assert_eq!(
            det.evaluate(&series, store.entry("KRW-TEST")).unwrap(),
            Some(SignalSubtype::VolatilityBreak)
        );
    }

    #[test]
    fn non_qualifying_day_leaves_flag_clear() {
        let det = detector();
        let mut state = MarketState::default();
        assert_eq!(det.evaluate(&days(101.0), &mut state).unwrap(), None);
        assert!(!state.vol.signaled_today);
    }

    #[test]
    fn single_candle_is_a_data_error() {
        let det = detector();
        let mut state = MarketState::default();
        let series = days(115.0);
        assert!(matches!(det.evaluate(&series[..1], &mut state), Err(Error::Data(_))));
    }
}
