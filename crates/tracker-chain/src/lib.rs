//! Chain client module for the netbook tracker system.
//!
//! This module defines the seam between the tracker and the underlying
//! blockchain: broadcasting writes with an explicit nonce, waiting for
//! receipts, and reading contract state. The submission layer depends only
//! on the [`ChainInterface`] trait, so tests can substitute a scripted
//! chain and the alloy-backed implementation stays swappable.

use async_trait::async_trait;
use thiserror::Error;
use tracker_types::{Address, Transaction, TransactionHash, TransactionReceipt};

/// Typed calldata builders and read helpers for the tracking contract.
pub mod contract;

/// Re-export implementations
pub mod implementations {
	pub mod alloy;
}

/// Errors that can occur during chain operations.
#[derive(Debug, Error)]
pub enum ChainError {
	/// Error that occurs during network communication.
	#[error("Network error: {0}")]
	Network(String),
	/// Error raised by the node or wallet while broadcasting a transaction.
	/// The message carries the upstream error text verbatim so the
	/// submission layer can classify it.
	#[error("Transaction failed: {0}")]
	Transaction(String),
	/// Error that occurs when decoding a contract response.
	#[error("Contract call error: {0}")]
	Contract(String),
}

/// Trait defining the interface to the tracking chain.
///
/// Implementations must accept an explicit nonce override on
/// [`send_transaction`](ChainInterface::send_transaction): the submission
/// layer manages nonces itself and never relies on the node's view alone.
#[async_trait]
pub trait ChainInterface: Send + Sync {
	/// Returns the network's transaction count for an account.
	///
	/// This is the authoritative next-nonce view of the chain.
	async fn get_transaction_count(&self, account: &Address) -> Result<u64, ChainError>;

	/// Broadcasts a transaction and returns its hash.
	///
	/// If the transaction carries an explicit nonce it must be used as-is.
	async fn send_transaction(&self, tx: Transaction) -> Result<TransactionHash, ChainError>;

	/// Waits for a broadcast transaction to be included in a block.
	async fn wait_for_receipt(
		&self,
		hash: &TransactionHash,
	) -> Result<TransactionReceipt, ChainError>;

	/// Executes a read-only contract call and returns the raw response.
	async fn call(&self, to: &Address, data: Vec<u8>) -> Result<Vec<u8>, ChainError>;

	/// Returns the latest block number.
	async fn get_block_number(&self) -> Result<u64, ChainError>;
}
