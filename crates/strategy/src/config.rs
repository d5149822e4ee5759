use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::warn;

use common::{Error, Result, MINUTE_UNITS};

/// Top-level screening config file (TOML). Every section and key is optional.
///
/// Example `config/screening.toml`:
/// ```toml
/// [universe]
/// quote_currency = "KRW"
/// min_retracement_ratio = 1.0
/// max_days_since_high = 365
///
/// [pump]
/// volume_multiplier = 1.5
///
/// [schedule]
/// reset_at = "08:59:50"
/// pacing_delay_ms = 1000
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ScreeningFileConfig {
    pub universe: UniverseConfig,
    pub pump: PumpConfig,
    pub cross: CrossConfig,
    pub volatility: VolatilityConfig,
    pub schedule: ScheduleConfig,
}

impl ScreeningFileConfig {
    /// Load from a TOML file. A missing file falls back to defaults;
    /// a file that exists but does not parse or validate exits the process.
    pub fn load(path: &str) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path, "Screening config not found, using defaults");
                return Self::default();
            }
            Err(e) => panic!("Failed to read screening config at '{path}': {e}"),
        };
        let cfg: Self = toml::from_str(&content).unwrap_or_else(|e| {
            panic!("Failed to parse screening config at '{path}': {e}")
        });
        if let Err(e) = cfg.validate() {
            panic!("Invalid screening config at '{path}': {e}");
        }
        cfg
    }

    /// Reject settings that parse but could never produce a full cycle.
    pub fn validate(&self) -> Result<()> {
        for (section, unit) in [("pump", self.pump.candle_unit), ("cross", self.cross.candle_unit)] {
            if !MINUTE_UNITS.contains(&unit) {
                return Err(Error::Config(format!(
                    "{section}.candle_unit {unit} is not one of {:?}",
                    MINUTE_UNITS
                )));
            }
        }
        if self.pump.candle_count < 2 {
            return Err(Error::Config("pump.candle_count must be at least 2".into()));
        }
        let cross = &self.cross;
        if cross.short_period == 0 || cross.short_period >= cross.long_period {
            return Err(Error::Config(format!(
                "cross.short_period ({}) must be in 1..long_period ({})",
                cross.short_period, cross.long_period
            )));
        }
        if (cross.candle_count as usize) < cross.long_period + 1 {
            return Err(Error::Config(format!(
                "cross.candle_count ({}) must be at least long_period + 1 ({})",
                cross.candle_count,
                cross.long_period + 1
            )));
        }
        if self.volatility.candle_count < 2 {
            return Err(Error::Config("volatility.candle_count must be at least 2".into()));
        }
        let schedule = &self.schedule;
        if !(1..=60).contains(&schedule.cycle_window_secs) {
            return Err(Error::Config("schedule.cycle_window_secs must be in 1..=60".into()));
        }
        if schedule.reset_window_secs == 0 {
            return Err(Error::Config("schedule.reset_window_secs must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UniverseConfig {
    /// Only markets quoted in this currency are screened ("KRW" → "KRW-*").
    pub quote_currency: String,
    /// Exclusive lower bound on price as % of the 52-week high.
    pub min_retracement_ratio: f64,
    /// The 52-week high must be more recent than this many days.
    pub max_days_since_high: u32,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            quote_currency: "KRW".to_string(),
            min_retracement_ratio: 1.0,
            max_days_since_high: 365,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PumpConfig {
    pub candle_unit: u32,
    /// Current candle plus the lookback window.
    pub candle_count: u32,
    pub volume_multiplier: f64,
    pub high_ratio: f64,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            candle_unit: 30,
            candle_count: 5,
            volume_multiplier: 1.5,
            high_ratio: 0.9,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CrossConfig {
    pub candle_unit: u32,
    pub candle_count: u32,
    pub short_period: usize,
    pub long_period: usize,
}

impl Default for CrossConfig {
    fn default() -> Self {
        Self {
            candle_unit: 240,
            candle_count: 21,
            short_period: 5,
            long_period: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VolatilityConfig {
    pub candle_count: u32,
    /// Fraction of the prior day's range today's body must exceed.
    pub k: f64,
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        Self { candle_count: 2, k: 0.5 }
    }
}

/// Wall-clock windows driving the scheduler (local time).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// A cycle may start during the first `cycle_window_secs` of a minute.
    pub cycle_window_secs: u32,
    /// No cycle starts in `[blackout_start, blackout_end)`.
    pub blackout_start: NaiveTime,
    pub blackout_end: NaiveTime,
    /// Start of the daily reset window.
    pub reset_at: NaiveTime,
    pub reset_window_secs: u32,
    /// Pause after every exchange call inside a cycle.
    pub pacing_delay_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cycle_window_secs: 10,
            blackout_start: hms(8, 56, 0),
            blackout_end: hms(8, 59, 0),
            reset_at: hms(8, 59, 50),
            reset_window_secs: 10,
            pacing_delay_ms: 1000,
        }
    }
}

fn hms(h: u32, m: u32, s: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, s).unwrap_or(NaiveTime::MIN)
}
