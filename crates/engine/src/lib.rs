pub mod scheduler;
pub mod store;
pub mod upbit;

pub use scheduler::{CycleReport, ScreeningScheduler, TickOutcome};
pub use store::SqliteSignalStore;
pub use upbit::UpbitClient;
