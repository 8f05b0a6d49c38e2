// Failure isolation for spawned work.

use std::future::Future;

use tokio::task::JoinHandle;
use tracing::{error, warn};

use crate::Result;

/// Spawns a unit of work under the recovery boundary.
///
/// Every asynchronously spawned worker in this crate runs through here:
/// consumer-loop workers, dispatcher pumps and fan-out hook invocations. A
/// returned error is logged and dropped together with the item that caused
/// it; a panic is contained at the task boundary. Neither outcome reaches
/// the caller, so one module's defect stays that module's defect.
///
/// `operation` tags the log entry with the originating operation (and,
/// where applicable, module) identity.
pub fn spawn_supervised<F>(operation: impl Into<String>, work: F) -> JoinHandle<()>
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    let operation = operation.into();
    tokio::spawn(async move {
        // The inner spawn turns a panic into a JoinError instead of
        // unwinding through the supervisor.
        match tokio::spawn(work).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("{}: dropped item: {}", operation, e),
            Err(e) if e.is_panic() => error!("{}: worker panicked", operation),
            Err(_) => {}
        }
    })
}
