use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One OHLCV bucket for a market, as returned by the candle endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub market: String,
    /// Start of the bucket (UTC).
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    /// Latest trade price inside the bucket. For the current, still-open
    /// candle this is the live price.
    pub close: f64,
    /// Accumulated trade volume of the bucket.
    pub volume: f64,
}

/// Listing entry for a tradable market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketInfo {
    /// Market code, e.g. "KRW-BTC".
    pub market: String,
    pub korean_name: String,
    pub english_name: String,
}

/// Ticker snapshot taken at request time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSnapshot {
    pub market: String,
    pub trade_price: f64,
    /// Change versus the previous day's close, as a signed fraction.
    pub signed_change_rate: f64,
    pub highest_52_week_price: f64,
    pub highest_52_week_date: NaiveDate,
}

impl InstrumentSnapshot {
    /// Current price as a percentage of the trailing 52-week high.
    pub fn retracement_ratio(&self) -> Result<f64> {
        if !(self.highest_52_week_price > 0.0) {
            return Err(Error::Data(format!(
                "{}: non-positive 52-week high {}",
                self.market, self.highest_52_week_price
            )));
        }
        Ok(self.trade_price / self.highest_52_week_price * 100.0)
    }
}

/// Detector family a signal belongs to. Each kind is persisted in its own
/// collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Pump,
    Cross,
    Volatility,
}

impl SignalKind {
    pub const ALL: [SignalKind; 3] = [SignalKind::Pump, SignalKind::Cross, SignalKind::Volatility];
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalKind::Pump => write!(f, "pump"),
            SignalKind::Cross => write!(f, "cross"),
            SignalKind::Volatility => write!(f, "volatility"),
        }
    }
}

impl std::str::FromStr for SignalKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pump" => Ok(SignalKind::Pump),
            "cross" => Ok(SignalKind::Cross),
            "volatility" | "vol" => Ok(SignalKind::Volatility),
            other => Err(Error::Other(format!("unknown signal kind '{other}'"))),
        }
    }
}

/// What exactly a detector saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
pub enum SignalSubtype {
    /// First qualifying breakout since the last daily reset.
    #[serde(rename = "new pumping")]
    #[sqlx(rename = "new pumping")]
    NewPumping,
    /// Breakout above the stored extreme.
    #[serde(rename = "pumping")]
    #[sqlx(rename = "pumping")]
    Pumping,
    #[serde(rename = "goldencross")]
    #[sqlx(rename = "goldencross")]
    GoldenCross,
    #[serde(rename = "deadcross")]
    #[sqlx(rename = "deadcross")]
    DeadCross,
    #[serde(rename = "vol")]
    #[sqlx(rename = "vol")]
    VolatilityBreak,
}

impl SignalSubtype {
    pub fn kind(&self) -> SignalKind {
        match self {
            SignalSubtype::NewPumping | SignalSubtype::Pumping => SignalKind::Pump,
            SignalSubtype::GoldenCross | SignalSubtype::DeadCross => SignalKind::Cross,
            SignalSubtype::VolatilityBreak => SignalKind::Volatility,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SignalSubtype::NewPumping => "new pumping",
            SignalSubtype::Pumping => "pumping",
            SignalSubtype::GoldenCross => "goldencross",
            SignalSubtype::DeadCross => "deadcross",
            SignalSubtype::VolatilityBreak => "vol",
        }
    }
}

impl std::fmt::Display for SignalSubtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A screening hit, ready to be persisted and broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    pub market: String,
    pub english_name: String,
    pub korean_name: String,
    /// Ticker price at the start of the cycle that produced the signal.
    pub trade_price: f64,
    pub one_day_change_rate: f64,
    pub subtype: SignalSubtype,
    pub created_at: DateTime<Utc>,
}

impl Signal {
    /// Build a signal with a fresh id, stamped now.
    pub fn new(info: &MarketInfo, snapshot: &InstrumentSnapshot, subtype: SignalSubtype) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            market: snapshot.market.clone(),
            english_name: info.english_name.clone(),
            korean_name: info.korean_name.clone(),
            trade_price: snapshot.trade_price,
            one_day_change_rate: snapshot.signed_change_rate,
            subtype,
            created_at: Utc::now(),
        }
    }

    pub fn kind(&self) -> SignalKind {
        self.subtype.kind()
    }
}
