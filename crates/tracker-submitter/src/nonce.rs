//! Per-account nonce coordination.
//!
//! The network's transaction count alone is not enough: several submissions
//! can be prepared within the same block window, before the network has
//! observed the previous one. The coordinator therefore keeps an in-process
//! "next expected" value per account and reconciles it with the live count
//! by taking the maximum: the cache can be stale-low after an external
//! wallet action, and the network can be behind our own broadcasts.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracker_chain::{ChainError, ChainInterface};
use tracker_types::Address;

/// Tracks the next nonce to use for each account.
///
/// The cache lives only for the lifetime of the process and is never
/// persisted. Invariant: a cached value is always at least one greater than
/// the last nonce actually broadcast for that account.
pub struct NonceCoordinator {
	/// Chain client for live transaction-count lookups.
	chain: Arc<dyn ChainInterface>,
	/// Next expected nonce per account, created lazily on first write.
	next: Mutex<HashMap<Address, u64>>,
}

impl NonceCoordinator {
	/// Creates a coordinator with an empty cache.
	pub fn new(chain: Arc<dyn ChainInterface>) -> Self {
		Self {
			chain,
			next: Mutex::new(HashMap::new()),
		}
	}

	/// Returns the nonce to use for the account's next transaction.
	///
	/// Fetches the live transaction count and returns the greater of it and
	/// the cached value. Must be called once per attempt, immediately before
	/// broadcasting.
	pub async fn next_nonce(&self, account: &Address) -> Result<u64, ChainError> {
		let live = self.chain.get_transaction_count(account).await?;
		let cache = self.next.lock().await;

		let nonce = match cache.get(account) {
			Some(&cached) => live.max(cached),
			None => live,
		};

		tracing::debug!(account = %account, live, nonce, "Selected nonce");
		Ok(nonce)
	}

	/// Records a nonce as taken, caching `nonce + 1` as the next expected.
	///
	/// Called when the nonce is chosen, not after confirmation: broadcast
	/// reserves the nonce, and waiting for the receipt would reintroduce
	/// the reuse race across rapid submissions.
	pub async fn record_used(&self, account: &Address, nonce: u64) {
		self.next.lock().await.insert(account.clone(), nonce + 1);
	}

	/// Discards the cached value for an account.
	///
	/// The next `next_nonce` call then relies solely on the live count.
	/// Called on every failed attempt so stale local state cannot poison
	/// subsequent submissions.
	pub async fn clear(&self, account: &Address) {
		if self.next.lock().await.remove(account).is_some() {
			tracing::debug!(account = %account, "Cleared cached nonce");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::MockChain;

	fn account() -> Address {
		"0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap()
	}

	#[tokio::test]
	async fn test_first_use_takes_live_count() {
		let chain = Arc::new(MockChain::new(7));
		let nonces = NonceCoordinator::new(chain);

		assert_eq!(nonces.next_nonce(&account()).await.unwrap(), 7);
	}

	#[tokio::test]
	async fn test_cache_advances_past_live_count() {
		let chain = Arc::new(MockChain::new(7));
		let nonces = NonceCoordinator::new(chain);

		let first = nonces.next_nonce(&account()).await.unwrap();
		nonces.record_used(&account(), first).await;

		// Live count unchanged, cache must carry the sequence forward
		assert_eq!(nonces.next_nonce(&account()).await.unwrap(), 8);
	}

	#[tokio::test]
	async fn test_live_count_wins_when_higher() {
		let chain = Arc::new(MockChain::new(0));
		let nonces = NonceCoordinator::new(chain.clone());

		nonces.record_used(&account(), 4).await; // cache now expects 5
		*chain.transaction_count.lock().await = 7;

		assert_eq!(nonces.next_nonce(&account()).await.unwrap(), 7);
	}

	#[tokio::test]
	async fn test_clear_falls_back_to_live_count() {
		let chain = Arc::new(MockChain::new(3));
		let nonces = NonceCoordinator::new(chain);

		nonces.record_used(&account(), 9).await;
		nonces.clear(&account()).await;

		assert_eq!(nonces.next_nonce(&account()).await.unwrap(), 3);
	}

	#[tokio::test]
	async fn test_accounts_are_tracked_independently() {
		let chain = Arc::new(MockChain::new(2));
		let nonces = NonceCoordinator::new(chain);
		let other: Address = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8"
			.parse()
			.unwrap();

		nonces.record_used(&account(), 6).await;

		assert_eq!(nonces.next_nonce(&account()).await.unwrap(), 7);
		assert_eq!(nonces.next_nonce(&other).await.unwrap(), 2);
	}
}
