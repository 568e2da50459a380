//! Fail-open utilities for best-effort deliveries
//!
//! Escalation notices, context-expiry notices and the error relay to the backup are
//! best-effort: a transport failure there must never take down a tick or a timer
//! firing. Wrap those calls with [`fail_open`].
//!
//! DO NOT use fail-open for:
//! - Store writes that record a state transition
//! - Replies the caller is waiting on

use std::future::Future;
use tracing::warn;

use crate::Result;

/// Execute an operation that should fail open
///
/// Logs the error via `tracing::warn!` on failure and returns `None`.
///
/// # Usage
///
/// ```no_run
/// use roost_core::fail_open::fail_open;
/// use roost_core::Result;
///
/// async fn notify_backup() -> Result<()> {
///     Ok(())
/// }
///
/// async fn example() {
///     let sent = fail_open("escalation", || notify_backup()).await;
///     // sent is None if the notice could not be delivered
/// }
/// ```
pub async fn fail_open<F, Fut, T>(operation_name: &str, f: F) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match f().await {
        Ok(val) => Some(val),
        Err(e) => {
            warn!("{} failed (fail-open): {}", operation_name, e);
            None
        }
    }
}
