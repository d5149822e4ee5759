use std::collections::HashMap;

/// Ratchet for the pump detector.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PumpState {
    /// Price recorded on the last qualifying breakout. `None` until the
    /// market has qualified once since the last reset.
    pub last_extreme_price: Option<f64>,
}

/// Moving-average regime last announced for a market.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Regime {
    #[default]
    None,
    Golden,
    Dead,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrossState {
    pub regime: Regime,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VolState {
    pub signaled_today: bool,
}

/// Everything the detectors remember about one market. Each detector only
/// touches its own field.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MarketState {
    pub pump: PumpState,
    pub cross: CrossState,
    pub vol: VolState,
}

/// Per-market detector state, keyed by market code.
///
/// Owned by the scheduler task and handed to detectors by `&mut`. Entries
/// are created on first access and only ever removed all at once by
/// [`MarketStateStore::clear`].
#[derive(Debug, Default)]
pub struct MarketStateStore {
    markets: HashMap<String, MarketState>,
}

impl MarketStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// State for `market`, created empty on first use.
    pub fn entry(&mut self, market: &str) -> &mut MarketState {
        self.markets.entry(market.to_string()).or_default()
    }

    pub fn get(&self, market: &str) -> Option<&MarketState> {
        self.markets.get(market)
    }

    /// Drop every entry for every market.
    pub fn clear(&mut self) {
        self.markets.clear();
    }

    pub fn len(&self) -> usize {
        self.markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }
}
