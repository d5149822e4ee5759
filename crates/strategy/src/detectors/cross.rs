use tracing::debug;

use common::{Candle, Error, Result, SignalSubtype};

use super::{chronological, require_len, CandleRequest, Detector};
use crate::config::CrossConfig;
use crate::indicators::sma::last_two;
use crate::state::{CrossState, MarketState, Regime};

/// Crossover seen on the latest bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossover {
    Golden,
    Dead,
}

/// Short/long SMA crossover on 4-hour candles with regime tracking.
///
/// A golden cross needs the short SMA to have been below the long SMA one
/// bar ago, above it now, and the latest price above the short SMA. Dead
/// cross mirrors it. A regime is announced once and stays announced until
/// the opposite crossover replaces it.
#[derive(Debug, Clone)]
pub struct CrossDetector {
    cfg: CrossConfig,
}

impl CrossDetector {
    pub fn new(cfg: CrossConfig) -> Self {
        Self { cfg }
    }

    /// Crossover on the latest bar of `candles` (any order), if any.
    pub fn crossover(&self, candles: &[Candle]) -> Result<Option<Crossover>> {
        require_len(candles, self.cfg.long_period + 1, self.name())?;

        let sorted = chronological(candles);
        let closes: Vec<f64> = sorted.iter().map(|c| c.close).collect();

        let too_short = || {
            Error::Data(format!(
                "cross: {} closes cannot fill SMA{}/SMA{}",
                closes.len(),
                self.cfg.short_period,
                self.cfg.long_period
            ))
        };
        let (short_prev, short_now) = last_two(&closes, self.cfg.short_period).ok_or_else(too_short)?;
        let (long_prev, long_now) = last_two(&closes, self.cfg.long_period).ok_or_else(too_short)?;
        let price = closes[closes.len() - 1];

        if price > short_now && short_now > long_now && short_prev < long_prev {
            Ok(Some(Crossover::Golden))
        } else if price < short_now && short_now < long_now && short_prev > long_prev {
            Ok(Some(Crossover::Dead))
        } else {
            Ok(None)
        }
    }

    /// Regime transition for a detected crossover. Emits only when the
    /// regime actually changes.
    pub fn advance(state: &mut CrossState, crossover: Crossover) -> Option<SignalSubtype> {
        let (target, subtype) = match crossover {
            Crossover::Golden => (Regime::Golden, SignalSubtype::GoldenCross),
            Crossover::Dead => (Regime::Dead, SignalSubtype::DeadCross),
        };
        if state.regime == target {
            return None;
        }
        state.regime = target;
        Some(subtype)
    }
}

impl Detector for CrossDetector {
    fn name(&self) -> &'static str {
        "cross"
    }

    fn candles(&self) -> CandleRequest {
        CandleRequest::Minutes {
            unit: self.cfg.candle_unit,
            count: self.cfg.candle_count,
        }
    }

    fn evaluate(&self, candles: &[Candle], state: &mut MarketState) -> Result<Option<SignalSubtype>> {
        let Some(crossover) = self.crossover(candles)? else {
            return Ok(None);
        };

        let emitted = Self::advance(&mut state.cross, crossover);
        if emitted.is_none() {
            debug!(market = %candles[0].market, ?crossover, "Crossover already announced");
        }
        Ok(emitted)
    }
}
