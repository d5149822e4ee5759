use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

use common::{
    Candle, CandleFetcher, Error, InstrumentSnapshot, MarketInfo, Result, MINUTE_UNITS,
};

/// Client for Upbit's public quotation API. No credentials needed.
///
/// Market codes are checked against the last `/v1/market/all` listing
/// before any per-market request goes out.
pub struct UpbitClient {
    base_url: String,
    http: Client,
    markets: RwLock<HashSet<String>>,
}

impl UpbitClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            http,
            markets: RwLock::new(HashSet::new()),
        })
    }

    /// Fail with `Error::Exchange` on the first code missing from the
    /// listing. Fetches the listing first if it was never loaded.
    async fn ensure_listed(&self, codes: &[String]) -> Result<()> {
        let never_loaded = self.markets.read().await.is_empty();
        if never_loaded {
            self.list_all_markets().await?;
        }
        let known = self.markets.read().await;
        match codes.iter().find(|code| !known.contains(code.as_str())) {
            Some(unknown) => Err(Error::Exchange(format!("unknown market code: {unknown}"))),
            None => Ok(()),
        }
    }

    fn endpoint(&self, path: &str, params: &[(&str, String)]) -> Result<Url> {
        Url::parse_with_params(&format!("{}{path}", self.base_url), params)
            .map_err(|e| Error::Config(format!("invalid Upbit URL: {e}")))
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(%url, "Upbit GET");
        let resp = self
            .http
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Exchange(format!("HTTP {status}: {body}")));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl CandleFetcher for UpbitClient {
    async fn list_all_markets(&self) -> Result<Vec<MarketInfo>> {
        let url = self.endpoint("/v1/market/all", &[])?;
        let listing: Vec<MarketInfo> = self.get(url).await?;
        *self.markets.write().await = listing.iter().map(|m| m.market.clone()).collect();
        Ok(listing)
    }

    async fn get_ticker(&self, markets: &[String]) -> Result<Vec<InstrumentSnapshot>> {
        if markets.is_empty() {
            return Err(Error::Exchange("ticker request with no markets".into()));
        }
        self.ensure_listed(markets).await?;
        let url = self.endpoint("/v1/ticker", &[("markets", markets.join(","))])?;
        let raw: Vec<TickerResponse> = self.get(url).await?;
        raw.into_iter().map(TryInto::try_into).collect()
    }

    async fn get_minutes_candles(&self, unit: u32, market: &str, count: u32) -> Result<Vec<Candle>> {
        if !MINUTE_UNITS.contains(&unit) {
            return Err(Error::Exchange(format!("invalid minute candle unit: {unit}")));
        }
        self.ensure_listed(&[market.to_string()]).await?;
        let url = self.endpoint(
            &format!("/v1/candles/minutes/{unit}"),
            &[("market", market.to_string()), ("count", count.to_string())],
        )?;
        let raw: Vec<CandleResponse> = self.get(url).await?;
        raw.into_iter().map(TryInto::try_into).collect()
    }

    async fn get_days_candles(&self, market: &str, count: u32) -> Result<Vec<Candle>> {
        self.ensure_listed(&[market.to_string()]).await?;
        let url = self.endpoint(
            "/v1/candles/days",
            &[("market", market.to_string()), ("count", count.to_string())],
        )?;
        let raw: Vec<CandleResponse> = self.get(url).await?;
        raw.into_iter().map(TryInto::try_into).collect()
    }
}

// ─── Response types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct TickerResponse {
    market: String,
    trade_price: f64,
    signed_change_rate: f64,
    highest_52_week_price: f64,
    highest_52_week_date: String,
}

impl TryFrom<TickerResponse> for InstrumentSnapshot {
    type Error = Error;

    fn try_from(t: TickerResponse) -> Result<Self> {
        let highest_52_week_date = NaiveDate::parse_from_str(&t.highest_52_week_date, "%Y-%m-%d")
            .map_err(|e| {
                Error::Data(format!(
                    "{}: bad highest_52_week_date '{}': {e}",
                    t.market, t.highest_52_week_date
                ))
            })?;
        Ok(InstrumentSnapshot {
            market: t.market,
            trade_price: t.trade_price,
            signed_change_rate: t.signed_change_rate,
            highest_52_week_price: t.highest_52_week_price,
            highest_52_week_date,
        })
    }
}

#[derive(Deserialize)]
struct CandleResponse {
    market: String,
    candle_date_time_utc: String,
    opening_price: f64,
    high_price: f64,
    low_price: f64,
    trade_price: f64,
    candle_acc_trade_volume: f64,
}

impl TryFrom<CandleResponse> for Candle {
    type Error = Error;

    fn try_from(c: CandleResponse) -> Result<Self> {
        let timestamp = NaiveDateTime::parse_from_str(&c.candle_date_time_utc, "%Y-%m-%dT%H:%M:%S")
            .map_err(|e| {
                Error::Data(format!(
                    "{}: bad candle_date_time_utc '{}': {e}",
                    c.market, c.candle_date_time_utc
                ))
            })?
            .and_utc();
        Ok(Candle {
            market: c.market,
            timestamp,
            open: c.opening_price,
            high: c.high_price,
            low: c.low_price,
            close: c.trade_price,
            volume: c.candle_acc_trade_volume,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> UpbitClient {
        // Nothing listens here, so any request that does go out fails fast.
        UpbitClient::new("http://127.0.0.1:9").unwrap()
    }

    #[test]
    fn parses_minute_candles() {
        let body = r#"[
            {"market":"KRW-BTC","candle_date_time_utc":"2024-03-14T06:30:00",
             "candle_date_time_kst":"2024-03-14T15:30:00","opening_price":100.0,
             "high_price":110.0,"low_price":95.0,"trade_price":108.0,
             "timestamp":1710397800000,"candle_acc_trade_price":1.0,
             "candle_acc_trade_volume":42.5,"unit":30}
        ]"#;
        let raw: Vec<CandleResponse> = serde_json::from_str(body).unwrap();
        let candles: Vec<Candle> = raw.into_iter().map(|c| c.try_into().unwrap()).collect();

        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].close, 108.0);
        assert_eq!(candles[0].volume, 42.5);
        assert_eq!(candles[0].timestamp.to_rfc3339(), "2024-03-14T06:30:00+00:00");
    }

    #[test]
    fn parses_ticker_date() {
        let body = r#"[
            {"market":"KRW-ETH","trade_price":5000000.0,"signed_change_rate":-0.012,
             "highest_52_week_price":6000000.0,"highest_52_week_date":"2024-03-12",
             "lowest_52_week_price":2000000.0,"lowest_52_week_date":"2023-06-15"}
        ]"#;
        let raw: Vec<TickerResponse> = serde_json::from_str(body).unwrap();
        let snap: InstrumentSnapshot = raw.into_iter().next().unwrap().try_into().unwrap();

        assert_eq!(snap.highest_52_week_date, NaiveDate::from_ymd_opt(2024, 3, 12).unwrap());
        assert_eq!(snap.signed_change_rate, -0.012);
    }

    #[test]
    fn bad_ticker_date_is_a_data_error() {
        let raw = TickerResponse {
            market: "KRW-ETH".into(),
            trade_price: 1.0,
            signed_change_rate: 0.0,
            highest_52_week_price: 2.0,
            highest_52_week_date: "12/03/2024".into(),
        };
        let result: Result<InstrumentSnapshot> = raw.try_into();
        assert!(matches!(result, Err(Error::Data(_))));
    }

    #[test]
    fn market_list_deserializes_directly() {
        let body = r#"[{"market":"KRW-BTC","korean_name":"비트코인","english_name":"Bitcoin"}]"#;
        let markets: Vec<MarketInfo> = serde_json::from_str(body).unwrap();
        assert_eq!(markets[0].english_name, "Bitcoin");
    }

    #[tokio::test]
    async fn invalid_unit_is_rejected_before_request() {
        let err = client().get_minutes_candles(7, "KRW-BTC", 5).await.unwrap_err();
        assert!(matches!(err, Error::Exchange(msg) if msg.contains("unit")));
    }

    /// Client whose listing holds only `KRW-BTC`.
    async fn listed_client() -> UpbitClient {
        let client = client();
        client.markets.write().await.insert("KRW-BTC".to_string());
        client
    }

    #[tokio::test]
    async fn unknown_market_is_rejected_before_request() {
        let client = listed_client().await;

        let err = client.get_minutes_candles(30, "KRW-NOPE", 5).await.unwrap_err();
        assert!(matches!(err, Error::Exchange(msg) if msg.contains("KRW-NOPE")));

        let err = client.get_days_candles("KRW-NOPE", 2).await.unwrap_err();
        assert!(matches!(err, Error::Exchange(msg) if msg.contains("KRW-NOPE")));
    }

    #[tokio::test]
    async fn ticker_with_one_unknown_market_is_rejected() {
        let client = listed_client().await;
        let markets = vec!["KRW-BTC".to_string(), "KRW-GONE".to_string()];

        let err = client.get_ticker(&markets).await.unwrap_err();
        assert!(matches!(err, Error::Exchange(msg) if msg.contains("KRW-GONE")));
    }

    #[tokio::test]
    async fn unloaded_listing_is_fetched_first() {
        // Listing fetch hits the unroutable host, so the error is transport-level.
        let err = client().get_days_candles("KRW-BTC", 2).await.unwrap_err();
        assert!(matches!(err, Error::Http(_)));
    }

    #[tokio::test]
    async fn empty_ticker_request_is_rejected() {
        let err = client().get_ticker(&[]).await.unwrap_err();
        assert!(matches!(err, Error::Exchange(_)));
    }

    #[test]
    fn endpoint_encodes_query() {
        let url = client()
            .endpoint("/v1/ticker", &[("markets", "KRW-BTC,KRW-ETH".to_string())])
            .unwrap();
        assert_eq!(url.path(), "/v1/ticker");
        assert_eq!(url.query(), Some("markets=KRW-BTC%2CKRW-ETH"));
    }
}
