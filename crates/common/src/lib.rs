pub mod config;
pub mod error;
pub mod exchange;
pub mod store;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use exchange::{CandleFetcher, MINUTE_UNITS};
pub use store::SignalStore;
pub use types::*;
