//! Bounded scatter/gather.
//!
//! [`scatter_gather`] spawns one task per item, optionally gated by a
//! counting semaphore, and collects the results back into input order.
//! The first failure aborts every task still running, and dropping the
//! returned future aborts them too, so cancellation flows down through
//! nested fan-outs.

use crate::error::{Result, SyncError};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[cfg(test)]
mod tests;

/// Runs `task(index, item)` concurrently for every item and returns the
/// results in item order.
///
/// `limit` caps the number of tasks running at once; `None` runs them all.
///
/// # Errors
///
/// Returns the first error any task produces, or a task error if a task
/// panics. Remaining tasks are aborted and no partial results are returned.
///
/// # Examples
///
/// ```
/// use libimgsync::fanout::scatter_gather;
///
/// # #[tokio::main]
/// # async fn main() -> libimgsync::Result<()> {
/// let doubled = scatter_gather(vec![1, 2, 3], Some(2), |_, n| async move { Ok(n * 2) }).await?;
/// assert_eq!(doubled, vec![2, 4, 6]);
/// # Ok(())
/// # }
/// ```
pub async fn scatter_gather<T, R, F, Fut>(
    items: Vec<T>,
    limit: Option<usize>,
    task: F,
) -> Result<Vec<R>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(usize, T) -> Fut,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    let expected = items.len();
    let gate = limit.map(|n| Arc::new(Semaphore::new(n.max(1))));
    let mut set = JoinSet::new();

    for (index, item) in items.into_iter().enumerate() {
        let work = task(index, item);
        let gate = gate.clone();
        set.spawn(async move {
            let _permit = match gate {
                Some(gate) => Some(
                    gate.acquire_owned()
                        .await
                        .map_err(|_| SyncError::task("admission gate closed"))?,
                ),
                None => None,
            };
            let value = work.await?;
            Ok::<_, SyncError>((index, value))
        });
    }

    let mut slots: Vec<Option<R>> = (0..expected).map(|_| None).collect();

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Ok((index, value))) => {
                if let Some(slot) = slots.get_mut(index) {
                    *slot = Some(value);
                }
            }
            Ok(Err(e)) => {
                set.abort_all();
                return Err(e);
            }
            Err(join_error) => {
                set.abort_all();
                return Err(SyncError::task(format!("task failed: {}", join_error)));
            }
        }
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.ok_or_else(|| SyncError::task(format!("task {} produced no result", index)))
        })
        .collect()
}
