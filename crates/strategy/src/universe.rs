use chrono::{Duration, NaiveDateTime, NaiveTime};

use common::{InstrumentSnapshot, MarketInfo, Result};

use crate::config::UniverseConfig;

/// Markets quoted in `quote_currency`, e.g. "KRW" keeps "KRW-BTC".
pub fn quote_markets<'a>(markets: &'a [MarketInfo], quote_currency: &str) -> Vec<&'a MarketInfo> {
    let prefix = format!("{quote_currency}-");
    markets
        .iter()
        .filter(|m| m.market.starts_with(&prefix))
        .collect()
}

/// Snapshots worth screening this cycle.
///
/// Keeps a market when its price is strictly above `min_retracement_ratio`
/// percent of the 52-week high and that high was set strictly after
/// `now - max_days_since_high`. The high's date counts from midnight.
pub fn select_candidates<'a>(
    snapshots: &'a [InstrumentSnapshot],
    cfg: &UniverseConfig,
    now: NaiveDateTime,
) -> Result<Vec<&'a InstrumentSnapshot>> {
    let cutoff = now - Duration::days(i64::from(cfg.max_days_since_high));

    let mut out = Vec::new();
    for snapshot in snapshots {
        let ratio = snapshot.retracement_ratio()?;
        let high_at = snapshot.highest_52_week_date.and_time(NaiveTime::MIN);
        if ratio > cfg.min_retracement_ratio && high_at > cutoff {
            out.push(snapshot);
        }
    }
    Ok(out)
}
