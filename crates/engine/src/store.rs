use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{Row, SqlitePool};

use common::{Error, Result, Signal, SignalKind, SignalStore, SignalSubtype};

/// SQLite-backed signal sink. One table per signal kind.
#[derive(Clone)]
pub struct SqliteSignalStore {
    db: SqlitePool,
}

impl SqliteSignalStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Latest `limit` signals of `kind`, newest first.
    pub async fn recent(&self, kind: SignalKind, limit: i64) -> Result<Vec<Signal>> {
        let sql = format!(
            "SELECT id, market, english_name, korean_name, trade_price, one_day_rate, subtype, created_at \
             FROM {} ORDER BY created_at DESC LIMIT ?1",
            table(kind)
        );
        let rows = sqlx::query(&sql).bind(limit).fetch_all(&self.db).await?;

        rows.iter()
            .map(|row| -> Result<Signal> {
                let created_at: String = row.try_get("created_at")?;
                let created_at = DateTime::parse_from_rfc3339(&created_at)
                    .map_err(|e| Error::Data(format!("bad created_at '{created_at}': {e}")))?
                    .with_timezone(&Utc);
                Ok(Signal {
                    id: row.try_get("id")?,
                    market: row.try_get("market")?,
                    english_name: row.try_get("english_name")?,
                    korean_name: row.try_get("korean_name")?,
                    trade_price: row.try_get("trade_price")?,
                    one_day_change_rate: row.try_get("one_day_rate")?,
                    subtype: row.try_get::<SignalSubtype, _>("subtype")?,
                    created_at,
                })
            })
            .collect()
    }

    /// Signals of every kind created at or after `since`.
    pub async fn count_since(&self, since: DateTime<Utc>) -> Result<i64> {
        let since = timestamp(since);
        let mut total = 0;
        for kind in SignalKind::ALL {
            let sql = format!("SELECT COUNT(*) FROM {} WHERE created_at >= ?1", table(kind));
            let count: i64 = sqlx::query_scalar(&sql)
                .bind(&since)
                .fetch_one(&self.db)
                .await?;
            total += count;
        }
        Ok(total)
    }
}

#[async_trait]
impl SignalStore for SqliteSignalStore {
    async fn append(&self, signal: &Signal) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} (id, market, english_name, korean_name, trade_price, one_day_rate, subtype, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            table(signal.kind())
        );
        sqlx::query(&sql)
            .bind(&signal.id)
            .bind(&signal.market)
            .bind(&signal.english_name)
            .bind(&signal.korean_name)
            .bind(signal.trade_price)
            .bind(signal.one_day_change_rate)
            .bind(signal.subtype)
            .bind(timestamp(signal.created_at))
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

/// Fixed-width UTC timestamps so text ordering matches time ordering.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn table(kind: SignalKind) -> &'static str {
    match kind {
        SignalKind::Pump => "pump_signals",
        SignalKind::Cross => "cross_signals",
        SignalKind::Volatility => "volatility_signals",
    }
}
