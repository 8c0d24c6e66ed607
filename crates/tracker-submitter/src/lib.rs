//! Transaction submission module for the netbook tracker system.
//!
//! All contract writes go through [`TransactionSubmitter::submit`]: a FIFO
//! queue guarantees at most one transaction is in flight per process, a
//! per-account nonce coordinator reconciles the in-process view with the
//! network, and broadcast failures are classified into a closed set of
//! outcomes. Nonce conflicts, the one failure mode caused by our own stale
//! state, are retried with backoff; everything else surfaces immediately.
//!
//! One submitter instance is constructed at application start and shared;
//! its queue and nonce cache exist per instance, not as process globals.

pub mod classify;
pub mod nonce;
pub mod queue;

pub use classify::{ClassifiedError, ErrorClassifier, ErrorKind, SubstringClassifier};
pub use nonce::NonceCoordinator;
pub use queue::SubmissionQueue;

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracker_chain::{ChainError, ChainInterface};
use tracker_config::SubmitterConfig;
use tracker_types::{Transaction, TransactionReceipt};

/// Errors a submission can settle with.
///
/// Preserves the classifier's kind distinction so callers can act on the
/// outcome instead of a collapsed generic message.
#[derive(Debug, Error)]
pub enum SubmitError {
	/// The nonce was stale and the retry budget ran out.
	#[error("Max retries exceeded after {attempts} attempts: {last_error}")]
	MaxRetriesExceeded { attempts: u32, last_error: String },
	/// The user declined to sign the transaction.
	#[error("Transaction rejected by user")]
	UserRejected,
	/// The contract rejected the call.
	#[error("Transaction reverted on-chain: {0}")]
	ContractReverted(String),
	/// The account cannot cover gas for the transaction.
	#[error("Insufficient funds: {0}")]
	InsufficientFunds(String),
	/// A failure outside the recognized set.
	#[error("Submission failed: {0}")]
	Other(String),
	/// The submitter is shutting down and no longer accepts work.
	#[error("Submission queue is closed")]
	QueueClosed,
}

impl SubmitError {
	fn from_classified(classified: ClassifiedError) -> Self {
		match classified.kind {
			// Conflicts that exhaust the budget arrive via MaxRetriesExceeded
			ErrorKind::NonceConflict => Self::Other(classified.message),
			ErrorKind::UserRejected => Self::UserRejected,
			ErrorKind::ContractReverted => Self::ContractReverted(classified.message),
			ErrorKind::InsufficientFunds => Self::InsufficientFunds(classified.message),
			ErrorKind::Unknown => Self::Other(classified.message),
		}
	}

	/// Stable machine-readable name of the outcome kind.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::MaxRetriesExceeded { .. } => "max_retries_exceeded",
			Self::UserRejected => "user_rejected",
			Self::ContractReverted(_) => "contract_reverted",
			Self::InsufficientFunds(_) => "insufficient_funds",
			Self::Other(_) => "unknown",
			Self::QueueClosed => "queue_closed",
		}
	}
}

/// The public entry point for submitting contract writes.
///
/// Composes the serialization queue, the nonce coordinator and the retry
/// policy. Submissions for different accounts are still serialized relative
/// to each other; the queue has no per-account parallelism by design.
pub struct TransactionSubmitter {
	chain: Arc<dyn ChainInterface>,
	nonces: Arc<NonceCoordinator>,
	classifier: Arc<dyn ErrorClassifier>,
	queue: SubmissionQueue,
	max_attempts: u32,
	retry_backoff: Duration,
}

impl TransactionSubmitter {
	/// Creates a submitter with the default substring classifier.
	///
	/// Must be called from within a tokio runtime.
	pub fn new(chain: Arc<dyn ChainInterface>, config: &SubmitterConfig) -> Self {
		Self::with_classifier(chain, config, Arc::new(SubstringClassifier))
	}

	/// Creates a submitter with a custom error classifier.
	pub fn with_classifier(
		chain: Arc<dyn ChainInterface>,
		config: &SubmitterConfig,
		classifier: Arc<dyn ErrorClassifier>,
	) -> Self {
		Self {
			nonces: Arc::new(NonceCoordinator::new(chain.clone())),
			chain,
			classifier,
			queue: SubmissionQueue::new(),
			max_attempts: config.max_attempts,
			retry_backoff: Duration::from_millis(config.retry_backoff_ms),
		}
	}

	/// Submits a contract write and waits for its receipt.
	///
	/// Returns once the transaction is confirmed or has permanently failed.
	/// The call itself never blocks other submitters; the operation waits
	/// its turn in the queue.
	pub async fn submit(&self, tx: Transaction) -> Result<TransactionReceipt, SubmitError> {
		let chain = self.chain.clone();
		let nonces = self.nonces.clone();
		let classifier = self.classifier.clone();
		let max_attempts = self.max_attempts;
		let retry_backoff = self.retry_backoff;

		self.queue
			.submit(Box::pin(async move {
				submit_with_retry(chain, nonces, classifier, tx, max_attempts, retry_backoff).await
			}))
			.await
	}
}

/// One logical submission: nonce assignment, broadcast, receipt wait, and
/// bounded retry on nonce conflicts.
async fn submit_with_retry(
	chain: Arc<dyn ChainInterface>,
	nonces: Arc<NonceCoordinator>,
	classifier: Arc<dyn ErrorClassifier>,
	tx: Transaction,
	max_attempts: u32,
	retry_backoff: Duration,
) -> Result<TransactionReceipt, SubmitError> {
	let account = tx.from.clone();
	let mut attempt = 0u32;

	loop {
		attempt += 1;

		match attempt_once(&*chain, &nonces, &tx).await {
			Ok(receipt) => {
				tracing::info!(
					tx_hash = %receipt.hash,
					block_number = receipt.block_number,
					attempt,
					"Transaction confirmed"
				);
				return Ok(receipt);
			},
			Err(error) => {
				let classified = classifier.classify(&error.to_string());

				// Any failed attempt clears the cache so stale state cannot
				// corrupt the next submission for this account
				nonces.clear(&account).await;

				match classified.kind {
					kind if kind.is_retryable() && attempt < max_attempts => {
						let wait = retry_backoff * attempt;
						tracing::warn!(
							attempt,
							wait_ms = wait.as_millis() as u64,
							"Nonce conflict, retrying with fresh nonce"
						);
						tokio::time::sleep(wait).await;
					},
					kind if kind.is_retryable() => {
						tracing::error!(attempts = attempt, "Nonce conflict retries exhausted");
						return Err(SubmitError::MaxRetriesExceeded {
							attempts: attempt,
							last_error: classified.message,
						});
					},
					kind => {
						tracing::warn!(kind = ?kind, error = %classified.message, "Submission failed");
						return Err(SubmitError::from_classified(classified));
					},
				}
			},
		}
	}
}

/// A single broadcast attempt with an explicit nonce.
async fn attempt_once(
	chain: &dyn ChainInterface,
	nonces: &NonceCoordinator,
	tx: &Transaction,
) -> Result<TransactionReceipt, ChainError> {
	let nonce = nonces.next_nonce(&tx.from).await?;

	// Broadcast reserves the nonce, not confirmation: record it before the
	// send resolves so back-to-back submissions never reuse it
	nonces.record_used(&tx.from, nonce).await;

	let hash = chain.send_transaction(tx.clone().with_nonce(nonce)).await?;
	chain.wait_for_receipt(&hash).await
}

#[cfg(test)]
pub(crate) mod testing {
	//! Scripted chain used by the submitter tests.

	use async_trait::async_trait;
	use std::collections::VecDeque;
	use std::time::Duration;
	use tokio::sync::Mutex;
	use tracker_chain::{ChainError, ChainInterface};
	use tracker_types::{Address, Transaction, TransactionHash, TransactionReceipt};

	/// Chain stub with a programmable transaction count and send outcomes.
	///
	/// Transactions are tagged by their first calldata byte; the event log
	/// records `send:<tag>` / `receipt:<tag>` / `fail:<tag>` entries so tests
	/// can assert ordering and non-overlap.
	pub struct MockChain {
		pub transaction_count: Mutex<u64>,
		/// Errors for upcoming sends, consumed front to back. An empty
		/// queue means sends succeed.
		pub send_errors: Mutex<VecDeque<String>>,
		/// Nonces observed on broadcast, in order.
		pub sent_nonces: Mutex<Vec<u64>>,
		pub events: Mutex<Vec<String>>,
		receipt_delay: Duration,
	}

	impl MockChain {
		pub fn new(transaction_count: u64) -> Self {
			Self {
				transaction_count: Mutex::new(transaction_count),
				send_errors: Mutex::new(VecDeque::new()),
				sent_nonces: Mutex::new(Vec::new()),
				events: Mutex::new(Vec::new()),
				receipt_delay: Duration::from_millis(0),
			}
		}

		pub fn with_send_errors(self, errors: &[&str]) -> Self {
			Self {
				send_errors: Mutex::new(errors.iter().map(|e| e.to_string()).collect()),
				..self
			}
		}

		pub fn with_receipt_delay(self, delay: Duration) -> Self {
			Self {
				receipt_delay: delay,
				..self
			}
		}
	}

	#[async_trait]
	impl ChainInterface for MockChain {
		async fn get_transaction_count(&self, _account: &Address) -> Result<u64, ChainError> {
			Ok(*self.transaction_count.lock().await)
		}

		async fn send_transaction(&self, tx: Transaction) -> Result<TransactionHash, ChainError> {
			let tag = tx.data.first().copied().unwrap_or(0);
			self.sent_nonces
				.lock()
				.await
				.push(tx.nonce.expect("submitter must set an explicit nonce"));

			if let Some(message) = self.send_errors.lock().await.pop_front() {
				self.events.lock().await.push(format!("fail:{}", tag));
				return Err(ChainError::Transaction(message));
			}

			self.events.lock().await.push(format!("send:{}", tag));
			Ok(TransactionHash(vec![tag]))
		}

		async fn wait_for_receipt(
			&self,
			hash: &TransactionHash,
		) -> Result<TransactionReceipt, ChainError> {
			let tag = hash.0[0];

			// Stagger completions: earlier tags take longer, so only true
			// serialization keeps the event log in submission order
			let stagger = self.receipt_delay * (8 - tag.min(7)) as u32;
			tokio::time::sleep(stagger).await;

			self.events.lock().await.push(format!("receipt:{}", tag));
			Ok(TransactionReceipt {
				hash: hash.clone(),
				block_number: 100 + tag as u64,
				gas_used: 21000,
				success: true,
			})
		}

		async fn call(&self, _to: &Address, _data: Vec<u8>) -> Result<Vec<u8>, ChainError> {
			Ok(vec![0u8; 32])
		}

		async fn get_block_number(&self) -> Result<u64, ChainError> {
			Ok(1)
		}
	}
}
