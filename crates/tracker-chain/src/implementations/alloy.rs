//! Alloy-backed chain client implementation.
//!
//! Submits and monitors transactions on the tracking chain using the Alloy
//! library. The provider's wallet handles signing; nonce selection stays
//! with the caller, which passes an explicit nonce on every write.

use alloy_network::EthereumWallet;
use alloy_primitives::{Address as AlloyAddress, FixedBytes};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_transport_http::Http;
use async_trait::async_trait;
use std::sync::Arc;
use tracker_config::NetworkConfig;
use tracker_types::{Address, SecretString, Transaction, TransactionHash, TransactionReceipt};

use crate::{ChainError, ChainInterface};

/// Alloy-based chain client over an HTTP provider.
pub struct AlloyChain {
	/// The provider used for all RPC traffic.
	provider: Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>,
	/// Address derived from the configured signing key.
	sender: Address,
	/// How long to poll for a receipt before giving up.
	receipt_timeout: std::time::Duration,
}

impl AlloyChain {
	/// Creates a new AlloyChain from network configuration and a signing key.
	pub fn new(
		network: &NetworkConfig,
		private_key: &SecretString,
		receipt_timeout_seconds: u64,
	) -> Result<Self, ChainError> {
		let url = network
			.rpc_url
			.parse()
			.map_err(|e| ChainError::Network(format!("Invalid RPC URL: {}", e)))?;

		let signer: PrivateKeySigner = private_key.with_exposed(|key| {
			key.parse()
				.map_err(|_| ChainError::Network("Invalid private key format".to_string()))
		})?;

		let sender = Address::from_bytes(signer.address().as_slice())
			.map_err(|e| ChainError::Network(e.to_string()))?;

		let chain_signer = signer.with_chain_id(Some(network.chain_id));
		let wallet = EthereumWallet::from(chain_signer);

		let provider = ProviderBuilder::new()
			.with_recommended_fillers()
			.wallet(wallet)
			.on_http(url);

		Ok(Self {
			provider: Arc::new(provider) as Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>,
			sender,
			receipt_timeout: std::time::Duration::from_secs(receipt_timeout_seconds),
		})
	}

	/// Returns the address of the configured signing account.
	pub fn sender(&self) -> &Address {
		&self.sender
	}
}

#[async_trait]
impl ChainInterface for AlloyChain {
	async fn get_transaction_count(&self, account: &Address) -> Result<u64, ChainError> {
		let address = AlloyAddress::from_slice(account.as_bytes());

		self.provider
			.get_transaction_count(address)
			.await
			.map_err(|e| ChainError::Network(format!("Failed to get transaction count: {}", e)))
	}

	async fn send_transaction(&self, tx: Transaction) -> Result<TransactionHash, ChainError> {
		let to = AlloyAddress::from_slice(tx.to.as_bytes());
		let from = AlloyAddress::from_slice(tx.from.as_bytes());

		let mut request = TransactionRequest::default()
			.to(to)
			.input(tx.data.clone().into());
		request.from = Some(from);
		// Explicit nonce: fillers only complete fields left unset
		request.nonce = tx.nonce;

		let pending_tx = self
			.provider
			.send_transaction(request)
			.await
			.map_err(|e| ChainError::Transaction(format!("{}", e)))?;

		let tx_hash = *pending_tx.tx_hash();
		tracing::info!(tx_hash = %format!("0x{}", hex::encode(tx_hash.0)), nonce = ?tx.nonce, "Submitted transaction");

		Ok(TransactionHash(tx_hash.0.to_vec()))
	}

	async fn wait_for_receipt(
		&self,
		hash: &TransactionHash,
	) -> Result<TransactionReceipt, ChainError> {
		let tx_hash = FixedBytes::<32>::from_slice(&hash.0);
		let poll_interval = tokio::time::Duration::from_secs(3);
		let start_time = tokio::time::Instant::now();

		loop {
			if start_time.elapsed() > self.receipt_timeout {
				return Err(ChainError::Network(format!(
					"Timeout waiting for receipt after {} seconds",
					self.receipt_timeout.as_secs()
				)));
			}

			match self.provider.get_transaction_receipt(tx_hash).await {
				Ok(Some(receipt)) => {
					return Ok(TransactionReceipt {
						hash: TransactionHash(receipt.transaction_hash.0.to_vec()),
						block_number: receipt.block_number.unwrap_or(0),
						gas_used: u64::try_from(receipt.gas_used).unwrap_or(u64::MAX),
						success: receipt.status(),
					});
				},
				Ok(None) => {
					// Not yet mined
					tracing::debug!(
						elapsed_secs = start_time.elapsed().as_secs(),
						"Waiting for transaction to be mined"
					);
				},
				Err(e) => {
					return Err(ChainError::Network(format!("Failed to get receipt: {}", e)));
				},
			}

			tokio::time::sleep(poll_interval).await;
		}
	}

	async fn call(&self, to: &Address, data: Vec<u8>) -> Result<Vec<u8>, ChainError> {
		let to_addr = AlloyAddress::from_slice(to.as_bytes());

		let request = TransactionRequest::default().to(to_addr).input(data.into());

		let result = self
			.provider
			.call(&request)
			.await
			.map_err(|e| ChainError::Network(format!("Contract call failed: {}", e)))?;

		Ok(result.to_vec())
	}

	async fn get_block_number(&self) -> Result<u64, ChainError> {
		self.provider
			.get_block_number()
			.await
			.map_err(|e| ChainError::Network(format!("Failed to get block number: {}", e)))
	}
}
