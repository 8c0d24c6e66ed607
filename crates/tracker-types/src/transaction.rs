//! Transaction and receipt types for chain interactions.

use crate::{Address, TransactionHash};
use serde::{Deserialize, Serialize};

/// A contract write prepared for submission.
///
/// The nonce is left unset by builders; the submission layer injects it
/// immediately before broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
	/// The account sending the transaction.
	pub from: Address,
	/// The contract being called.
	pub to: Address,
	/// ABI-encoded calldata.
	pub data: Vec<u8>,
	/// Explicit nonce override, set by the submission layer.
	pub nonce: Option<u64>,
}

impl Transaction {
	/// Creates a transaction with no nonce set.
	pub fn new(from: Address, to: Address, data: Vec<u8>) -> Self {
		Self {
			from,
			to,
			data,
			nonce: None,
		}
	}

	/// Returns the transaction with an explicit nonce set.
	pub fn with_nonce(mut self, nonce: u64) -> Self {
		self.nonce = Some(nonce);
		self
	}
}

/// Transaction receipt containing execution details.
///
/// Produced once a broadcast transaction has been included in a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
	/// The hash of the transaction.
	pub hash: TransactionHash,
	/// The block number where the transaction was included.
	pub block_number: u64,
	/// Gas consumed by the transaction.
	pub gas_used: u64,
	/// Whether the transaction executed successfully.
	pub success: bool,
}
