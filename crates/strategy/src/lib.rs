pub mod config;
pub mod detectors;
pub mod indicators;
pub mod state;
pub mod universe;

pub use config::{
    CrossConfig, PumpConfig, ScheduleConfig, ScreeningFileConfig, UniverseConfig, VolatilityConfig,
};
pub use detectors::{
    build_detectors, CandleRequest, CrossDetector, Detector, PumpDetector,
    VolatilityBreakoutDetector,
};
pub use state::{CrossState, MarketState, MarketStateStore, PumpState, Regime, VolState};
pub use universe::{quote_markets, select_candidates};
