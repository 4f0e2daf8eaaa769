// Background task runner — one tokio task per grab, bounded by a
// semaphore permit acquired at request time.
//
// There is no cancellation and no overall timeout: once launched, a grab
// runs to its terminal status or process exit. A client that stops
// polling just leaves the worker writing to an orphaned record. Permits
// are acquired non-blockingly by the caller, so a saturated pool rejects
// new work instead of queueing it — unbounded concurrent crawls against
// third-party APIs get the operator's IP banned.

use tokio::sync::OwnedSemaphorePermit;
use tracing::debug;

use crate::grab::{run_chain, GrabContext, GrabTier};

/// Launch the fallback chain for one grab in a background tokio task.
/// Returns immediately; callers poll the task record to track progress.
///
/// The permit rides inside the task so the pool slot frees exactly when
/// the chain reaches a terminal status. Every failure mode inside the
/// chain is absorbed into the task record — nothing escapes the worker.
pub fn launch_grab(ctx: GrabContext, tiers: Vec<Box<dyn GrabTier>>, permit: OwnedSemaphorePermit) {
    tokio::spawn(async move {
        let _permit = permit;
        debug!(task_id = ctx.task.id(), platform = %ctx.platform, "grab worker started");
        run_chain(&ctx, &tiers).await;
    });
}
