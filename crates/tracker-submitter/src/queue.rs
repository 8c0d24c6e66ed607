//! FIFO serialization of transaction submissions.
//!
//! The chain client does not guarantee safe ordering under concurrent
//! submission, so all writes funnel through a single drain task: operations
//! execute strictly in the order received, one at a time. Callers are not
//! blocked by `submit` itself; each gets a pending result that settles
//! when its own operation does.

use crate::SubmitError;
use futures::future::BoxFuture;
use tokio::sync::{mpsc, oneshot};
use tracker_types::TransactionReceipt;

type QueuedResult = Result<TransactionReceipt, SubmitError>;

/// A submission waiting its turn, with the channel to its caller.
struct QueuedTask {
	operation: BoxFuture<'static, QueuedResult>,
	respond: oneshot::Sender<QueuedResult>,
}

/// Serializes submission operations through one drain task.
///
/// Dropping the queue closes the channel; the drain task finishes whatever
/// is already enqueued and then exits.
pub struct SubmissionQueue {
	sender: mpsc::UnboundedSender<QueuedTask>,
}

impl SubmissionQueue {
	/// Creates the queue and spawns its drain task.
	///
	/// Must be called from within a tokio runtime.
	pub fn new() -> Self {
		let (sender, mut receiver) = mpsc::unbounded_channel::<QueuedTask>();

		tokio::spawn(async move {
			// Awaiting each operation to completion before taking the next
			// is what gives the at-most-one-in-flight guarantee.
			while let Some(task) = receiver.recv().await {
				let result = task.operation.await;

				if let Err(ref error) = result {
					tracing::debug!(%error, "Queued submission settled with failure");
				}

				// The caller may have gone away; its failure is its own
				let _ = task.respond.send(result);
			}
		});

		Self { sender }
	}

	/// Enqueues an operation and waits for its own result.
	///
	/// Returns immediately into a pending future; the operation does not
	/// start until every previously enqueued operation has settled. A
	/// failure of one operation never aborts the ones behind it.
	pub async fn submit(&self, operation: BoxFuture<'static, QueuedResult>) -> QueuedResult {
		let (respond, receiver) = oneshot::channel();

		self.sender
			.send(QueuedTask { operation, respond })
			.map_err(|_| SubmitError::QueueClosed)?;

		receiver.await.map_err(|_| SubmitError::QueueClosed)?
	}
}

impl Default for SubmissionQueue {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;
	use std::time::Duration;
	use tokio::sync::Mutex;
	use tracker_types::TransactionHash;

	fn receipt(tag: u8) -> TransactionReceipt {
		TransactionReceipt {
			hash: TransactionHash(vec![tag]),
			block_number: 1,
			gas_used: 21000,
			success: true,
		}
	}

	#[tokio::test(start_paused = true)]
	async fn test_operations_run_in_submission_order() {
		let queue = SubmissionQueue::new();
		let log: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));

		// Later operations finish faster; only serialization keeps order
		let ops: Vec<_> = (0u8..4)
			.map(|tag| {
				let log = log.clone();
				queue.submit(Box::pin(async move {
					tokio::time::sleep(Duration::from_millis(40 - 10 * tag as u64)).await;
					log.lock().await.push(tag);
					Ok(receipt(tag))
				}))
			})
			.collect();

		let results = futures::future::join_all(ops).await;

		assert!(results.iter().all(|r| r.is_ok()));
		assert_eq!(*log.lock().await, vec![0, 1, 2, 3]);
	}

	#[tokio::test]
	async fn test_failure_does_not_abort_later_operations() {
		let queue = SubmissionQueue::new();

		let failing = queue.submit(Box::pin(async {
			Err(SubmitError::Other("boom".to_string()))
		}));
		let succeeding = queue.submit(Box::pin(async { Ok(receipt(1)) }));

		let (first, second) = tokio::join!(failing, succeeding);

		assert!(matches!(first, Err(SubmitError::Other(_))));
		assert_eq!(second.unwrap().hash, TransactionHash(vec![1]));
	}

	#[tokio::test]
	async fn test_submit_does_not_block_on_earlier_operations() {
		let queue = SubmissionQueue::new();
		let (release, gate) = oneshot::channel::<()>();

		let blocked = queue.submit(Box::pin(async move {
			let _ = gate.await;
			Ok(receipt(0))
		}));

		// Enqueueing while the first operation is stuck must not hang
		let waiting = queue.submit(Box::pin(async { Ok(receipt(1)) }));

		release.send(()).unwrap();
		let (first, second) = tokio::join!(blocked, waiting);
		assert!(first.is_ok());
		assert!(second.is_ok());
	}
}
