use async_trait::async_trait;

use crate::{Result, Signal};

/// Append-only sink for emitted signals.
///
/// Signals are routed to one collection per [`crate::SignalKind`].
/// `SqliteSignalStore` in `crates/engine` is the production implementation.
#[async_trait]
pub trait SignalStore: Send + Sync {
    async fn append(&self, signal: &Signal) -> Result<()>;
}
