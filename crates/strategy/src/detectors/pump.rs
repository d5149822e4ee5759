use tracing::debug;

use common::{Candle, Result, SignalSubtype};

use super::{latest_first, require_len, CandleRequest, Detector};
use crate::config::PumpConfig;
use crate::state::{MarketState, PumpState};

/// Short-horizon momentum breakout on 30-minute candles.
///
/// The current candle qualifies when its volume beats the lookback mean by
/// `volume_multiplier`, its price clears every lookback high, and its price
/// is above `high_ratio` of its own high. Qualifying hits feed a ratchet:
/// the stored extreme follows every qualifying price, up or down, and a
/// signal fires only when the price climbs above it.
#[derive(Debug, Clone)]
pub struct PumpDetector {
    cfg: PumpConfig,
}

impl PumpDetector {
    pub fn new(cfg: PumpConfig) -> Self {
        Self { cfg }
    }

    /// Apply the three breakout conditions and return the live (newest)
    /// candle if it qualifies. Input order is irrelevant.
    pub fn breakout(&self, candles: &[Candle]) -> Result<Option<Candle>> {
        let count = (self.cfg.candle_count as usize).max(2);
        require_len(candles, count, self.name())?;

        let sorted = latest_first(candles);
        let current = &sorted[0];
        let prior = &sorted[1..count];

        let mean_volume = prior.iter().map(|c| c.volume).sum::<f64>() / prior.len() as f64;
        let prior_high = prior.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);

        let qualifies = current.volume > self.cfg.volume_multiplier * mean_volume
            && current.close > prior_high
            && current.close > self.cfg.high_ratio * current.high;
        Ok(qualifies.then(|| current.clone()))
    }

    /// Ratchet step for a qualifying price.
    pub fn advance(state: &mut PumpState, price: f64) -> Option<SignalSubtype> {
        let previous = state.last_extreme_price.replace(price);
        match previous {
            None => Some(SignalSubtype::NewPumping),
            Some(extreme) if price <= extreme => None,
            Some(_) => Some(SignalSubtype::Pumping),
        }
    }
}

impl Detector for PumpDetector {
    fn name(&self) -> &'static str {
        "pump"
    }

    fn candles(&self) -> CandleRequest {
        CandleRequest::Minutes {
            unit: self.cfg.candle_unit,
            count: self.cfg.candle_count,
        }
    }

    fn evaluate(&self, candles: &[Candle], state: &mut MarketState) -> Result<Option<SignalSubtype>> {
        let Some(live) = self.breakout(candles)? else {
            return Ok(None);
        };

        let price = live.close;
        let emitted = Self::advance(&mut state.pump, price);
        if emitted.is_none() {
            debug!(market = %live.market, price, "Pump below stored extreme, ratcheted down");
        }
        Ok(emitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::test_support::newest_first;
    use common::Error;

    fn detector() -> PumpDetector {
        PumpDetector::new(PumpConfig::default())
    }

    /// Four quiet candles topping out at 99, then a live candle at `price`
    /// with triple volume.
    fn breakout_series(price: f64) -> Vec<Candle> {
        newest_first(
            &[
                (95.0, 98.0, 94.0, 97.0, 10.0),
                (97.0, 99.0, 96.0, 98.0, 10.0),
                (98.0, 99.0, 95.0, 96.0, 10.0),
                (96.0, 97.0, 95.0, 96.0, 10.0),
                (96.0, price, 96.0, price, 30.0),
            ],
            30,
        )
    }

    #[test]
    fn ratchet_sequence_matches_expected_emissions() {
        let pump = detector();
        let mut state = MarketState::default();

        let mut run = |price: f64| {
            let out = pump.evaluate(&breakout_series(price), &mut state).unwrap();
            (out, state.pump.last_extreme_price)
        };

        assert_eq!(run(100.0), (Some(SignalSubtype::NewPumping), Some(100.0)));
        assert_eq!(run(105.0), (Some(SignalSubtype::Pumping), Some(105.0)));
        assert_eq!(run(103.0), (None, Some(103.0)));
        assert_eq!(run(107.0), (Some(SignalSubtype::Pumping), Some(107.0)));
    }

    #[test]
    fn equal_price_does_not_emit() {
        let pump = detector();
        let mut state = MarketState::default();
        pump.evaluate(&breakout_series(100.0), &mut state).unwrap();
        assert_eq!(pump.evaluate(&breakout_series(100.0), &mut state).unwrap(), None);
    }

    #[test]
    fn pullback_rearms_below_first_peak() {
        let mut state = PumpState::default();
        assert_eq!(PumpDetector::advance(&mut state, 110.0), Some(SignalSubtype::NewPumping));
        assert_eq!(PumpDetector::advance(&mut state, 101.0), None);
        // Still under the 110 peak, but above the ratcheted 101.
        assert_eq!(PumpDetector::advance(&mut state, 104.0), Some(SignalSubtype::Pumping));
    }

    #[test]
    fn low_volume_leaves_state_untouched() {
        let pump = detector();
        let mut state = MarketState::default();
        let mut candles = breakout_series(100.0);
        candles[0].volume = 15.0; // exactly 1.5x the mean of 10

        assert_eq!(pump.evaluate(&candles, &mut state).unwrap(), None);
        assert_eq!(state.pump.last_extreme_price, None);
    }

    #[test]
    fn price_inside_prior_range_does_not_qualify() {
        let pump = detector();
        let mut state = MarketState::default();
        assert_eq!(pump.evaluate(&breakout_series(99.0), &mut state).unwrap(), None);
        assert_eq!(state.pump.last_extreme_price, None);
    }

    #[test]
    fn price_far_below_candle_high_does_not_qualify() {
        let pump = detector();
        let mut state = MarketState::default();
        let mut candles = breakout_series(100.0);
        candles[0].high = 120.0; // 100 < 0.9 * 120

        assert_eq!(pump.evaluate(&candles, &mut state).unwrap(), None);
    }

    #[test]
    fn live_candle_is_picked_by_timestamp_not_position() {
        let pump = detector();
        let mut state = MarketState::default();
        let mut candles = breakout_series(100.0);
        candles.rotate_left(2);

        assert_eq!(
            pump.evaluate(&candles, &mut state).unwrap(),
            Some(SignalSubtype::NewPumping)
        );
        assert_eq!(state.pump.last_extreme_price, Some(100.0));
    }

    #[test]
    fn old_candle_moved_to_front_is_not_treated_as_live() {
        let pump = detector();
        let mut state = MarketState::default();
        // Oldest candle first in the slice, breakout candle last.
        let mut candles = breakout_series(100.0);
        candles.reverse();

        let live = pump.breakout(&candles).unwrap().unwrap();
        assert_eq!(live.close, 100.0);
        assert_eq!(live.volume, 30.0);
        assert!(pump.evaluate(&candles, &mut state).unwrap().is_some());
    }

    #[test]
    fn short_series_is_a_data_error() {
        let pump = detector();
        let mut state = MarketState::default();
        let candles = breakout_series(100.0);

        let err = pump.evaluate(&candles[..3], &mut state).unwrap_err();
        assert!(matches!(err, Error::Data(_)));
        assert_eq!(state, MarketState::default());
    }
}
