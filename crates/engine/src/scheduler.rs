use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as TimeDelta, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use common::{CandleFetcher, MarketInfo, Result, Signal, SignalStore};
use strategy::{
    build_detectors, quote_markets, select_candidates, CandleRequest, Detector, MarketStateStore,
    ScheduleConfig, ScreeningFileConfig,
};

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Outside every window, or the window already fired.
    Idle,
    /// Detector state was cleared.
    Reset,
    Cycle(CycleReport),
    /// The cycle hit an error and gave up; nothing after the failure ran.
    Aborted,
}

/// Summary of a completed screening cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub markets: usize,
    pub candidates: usize,
    pub signals: usize,
}

/// Wall-clock windows and their once-per-occurrence latches.
#[derive(Debug)]
struct Windows {
    cfg: ScheduleConfig,
    /// Minute (truncated) the last cycle started in.
    last_cycle: Option<NaiveDateTime>,
    /// Day of the last reset occurrence handled; `None` before the first tick.
    last_reset: Option<NaiveDate>,
}

impl Windows {
    fn new(cfg: ScheduleConfig) -> Self {
        Self {
            cfg,
            last_cycle: None,
            last_reset: None,
        }
    }

    fn in_blackout(&self, t: NaiveTime) -> bool {
        t >= self.cfg.blackout_start && t < self.cfg.blackout_end
    }

    /// True once per minute while inside the cycle window.
    fn take_cycle(&mut self, now: NaiveDateTime) -> bool {
        let t = now.time();
        if t.second() >= self.cfg.cycle_window_secs || self.in_blackout(t) {
            return false;
        }
        let minute = now.with_second(0).and_then(|m| m.with_nanosecond(0));
        if minute.is_none() || self.last_cycle == minute {
            return false;
        }
        self.last_cycle = minute;
        true
    }

    /// True once per reset occurrence. An occurrence starts at `reset_at`
    /// and belongs to the day it started on, even when it straddles
    /// midnight. A tick that lands after the window, because a cycle ran
    /// through it, still fires the missed reset. The very first tick only
    /// fires if it falls inside the window; otherwise it marks the latest
    /// occurrence as done.
    fn take_reset(&mut self, now: NaiveDateTime) -> bool {
        let today = now.date().and_time(self.cfg.reset_at);
        let occurrence = if today <= now {
            today
        } else {
            today - TimeDelta::days(1)
        };
        let day = occurrence.date();

        match self.last_reset {
            Some(done) if done >= day => false,
            None if now - occurrence >= TimeDelta::seconds(i64::from(self.cfg.reset_window_secs)) => {
                self.last_reset = Some(day);
                false
            }
            _ => {
                self.last_reset = Some(day);
                true
            }
        }
    }
}

/// Drives the screening loop.
///
/// The detector state lives here and is only touched from `tick`. Every
/// emitted signal is appended to the store and then published on `signal_tx`.
pub struct ScreeningScheduler {
    cfg: ScreeningFileConfig,
    fetcher: Arc<dyn CandleFetcher>,
    store: Arc<dyn SignalStore>,
    signal_tx: broadcast::Sender<Signal>,
    detectors: Vec<Box<dyn Detector>>,
    state: MarketStateStore,
    windows: Windows,
}

impl ScreeningScheduler {
    pub fn new(
        cfg: ScreeningFileConfig,
        fetcher: Arc<dyn CandleFetcher>,
        store: Arc<dyn SignalStore>,
        signal_tx: broadcast::Sender<Signal>,
    ) -> Self {
        Self {
            detectors: build_detectors(&cfg),
            windows: Windows::new(cfg.schedule.clone()),
            state: MarketStateStore::new(),
            cfg,
            fetcher,
            store,
            signal_tx,
        }
    }

    pub fn state(&self) -> &MarketStateStore {
        &self.state
    }

    /// Run the scheduler forever on a one-second tick. Call from `tokio::spawn`.
    pub async fn run(mut self) {
        info!(
            reset_at = %self.cfg.schedule.reset_at,
            blackout_start = %self.cfg.schedule.blackout_start,
            blackout_end = %self.cfg.schedule.blackout_end,
            "ScreeningScheduler running"
        );
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.tick(Local::now().naive_local()).await;
        }
    }

    /// Evaluate the windows at `now` and do whatever is due.
    pub async fn tick(&mut self, now: NaiveDateTime) -> TickOutcome {
        if self.windows.take_reset(now) {
            let cleared = self.state.len();
            self.state.clear();
            info!(cleared, "Daily reset: detector state cleared");
            return TickOutcome::Reset;
        }

        if !self.windows.take_cycle(now) {
            return TickOutcome::Idle;
        }

        match self.run_cycle(now).await {
            Ok(report) => {
                info!(
                    markets = report.markets,
                    candidates = report.candidates,
                    signals = report.signals,
                    "Screening cycle complete"
                );
                TickOutcome::Cycle(report)
            }
            Err(e) => {
                warn!(error = %e, "Screening cycle aborted");
                TickOutcome::Aborted
            }
        }
    }

    /// One full screening pass. The first error ends the pass; signals
    /// persisted before it stay persisted.
    pub async fn run_cycle(&mut self, now: NaiveDateTime) -> Result<CycleReport> {
        let all = self.fetcher.list_all_markets().await?;
        self.pace().await;

        let quoted = quote_markets(&all, &self.cfg.universe.quote_currency);
        let mut report = CycleReport {
            markets: quoted.len(),
            ..CycleReport::default()
        };
        if quoted.is_empty() {
            return Ok(report);
        }
        let names: HashMap<&str, &MarketInfo> =
            quoted.iter().map(|m| (m.market.as_str(), *m)).collect();
        let codes: Vec<String> = quoted.iter().map(|m| m.market.clone()).collect();

        let snapshots = self.fetcher.get_ticker(&codes).await?;
        self.pace().await;

        let candidates = select_candidates(&snapshots, &self.cfg.universe, now)?;
        report.candidates = candidates.len();
        debug!(candidates = candidates.len(), "Universe filtered");

        for snapshot in candidates {
            let market = snapshot.market.as_str();
            let Some(info) = names.get(market) else {
                debug!(market, "Ticker for unlisted market, skipping");
                continue;
            };

            for detector in &self.detectors {
                let candles = match detector.candles() {
                    CandleRequest::Minutes { unit, count } => {
                        self.fetcher.get_minutes_candles(unit, market, count).await?
                    }
                    CandleRequest::Days { count } => self.fetcher.get_days_candles(market, count).await?,
                };

                let state = self.state.entry(market);
                if let Some(subtype) = detector.evaluate(&candles, state)? {
                    let signal = Signal::new(info, snapshot, subtype);
                    info!(
                        market,
                        subtype = %subtype,
                        price = signal.trade_price,
                        detector = detector.name(),
                        "Signal"
                    );
                    self.store.append(&signal).await?;
                    // No subscribers is fine.
                    let _ = self.signal_tx.send(signal);
                    report.signals += 1;
                }

                self.pace().await;
            }
        }

        Ok(report)
    }

    async fn pace(&self) {
        if self.cfg.schedule.pacing_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.cfg.schedule.pacing_delay_ms)).await;
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
