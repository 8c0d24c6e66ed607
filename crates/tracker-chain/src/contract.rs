//! Typed call encoding and read helpers for the tracking contract.
//!
//! The contract itself is an external collaborator; only its ABI surface is
//! known here. Write functions produce [`Transaction`] values for the
//! submission layer, reads go through `eth_call` and decode the single
//! 32-byte word the view functions return.

use alloy_primitives::Address as AlloyAddress;
use alloy_sol_types::{sol, SolCall};
use std::sync::Arc;
use tracker_types::{Address, DeviceState, DeviceTransition, Role, Transaction};

use crate::{ChainError, ChainInterface};

sol! {
	function registrarDispositivo(string numeroSerie, string modelo);
	function aprobarHardware(string numeroSerie);
	function validarSoftware(string numeroSerie);
	function distribuirDispositivo(string numeroSerie, address escuela);
	function otorgarRol(uint8 rol, address cuenta);
	function estadoDispositivo(string numeroSerie) external view returns (uint8);
	function tieneRol(uint8 rol, address cuenta) external view returns (bool);
}

/// Client for the on-chain device tracking contract.
pub struct TrackerContract {
	/// Deployed contract address.
	address: Address,
	/// Chain client used for reads.
	chain: Arc<dyn ChainInterface>,
}

impl TrackerContract {
	/// Creates a new contract client bound to a deployed address.
	pub fn new(address: Address, chain: Arc<dyn ChainInterface>) -> Self {
		Self { address, chain }
	}

	/// Returns the deployed contract address.
	pub fn address(&self) -> &Address {
		&self.address
	}

	/// Builds the write transaction for a device state transition.
	///
	/// The returned transaction has no nonce; the submission layer injects
	/// one immediately before broadcast.
	pub fn transition_transaction(
		&self,
		from: &Address,
		transition: &DeviceTransition,
	) -> Transaction {
		let data = match transition {
			DeviceTransition::Register { serial, model } => registrarDispositivoCall {
				numeroSerie: serial.clone(),
				modelo: model.clone(),
			}
			.abi_encode(),
			DeviceTransition::ApproveHardware { serial } => aprobarHardwareCall {
				numeroSerie: serial.clone(),
			}
			.abi_encode(),
			DeviceTransition::ValidateSoftware { serial } => validarSoftwareCall {
				numeroSerie: serial.clone(),
			}
			.abi_encode(),
			DeviceTransition::Distribute { serial, school } => distribuirDispositivoCall {
				numeroSerie: serial.clone(),
				escuela: AlloyAddress::from_slice(school.as_bytes()),
			}
			.abi_encode(),
		};

		Transaction::new(from.clone(), self.address.clone(), data)
	}

	/// Builds the write transaction that grants a role to an account.
	///
	/// The contract restricts this call to its admin; a submission from a
	/// non-admin account reverts on-chain.
	pub fn grant_role_transaction(
		&self,
		from: &Address,
		role: Role,
		account: &Address,
	) -> Transaction {
		let data = otorgarRolCall {
			rol: role.code(),
			cuenta: AlloyAddress::from_slice(account.as_bytes()),
		}
		.abi_encode();

		Transaction::new(from.clone(), self.address.clone(), data)
	}

	/// Reads the current lifecycle state of a device.
	pub async fn device_state(&self, serial: &str) -> Result<DeviceState, ChainError> {
		let data = estadoDispositivoCall {
			numeroSerie: serial.to_string(),
		}
		.abi_encode();

		let result = self.chain.call(&self.address, data).await?;
		let code = decode_word(&result)?;

		DeviceState::from_code(code)
			.ok_or_else(|| ChainError::Contract(format!("Unknown device state code: {}", code)))
	}

	/// Reads whether an account holds a role on the contract.
	pub async fn has_role(&self, role: Role, account: &Address) -> Result<bool, ChainError> {
		let data = tieneRolCall {
			rol: role.code(),
			cuenta: AlloyAddress::from_slice(account.as_bytes()),
		}
		.abi_encode();

		let result = self.chain.call(&self.address, data).await?;
		Ok(decode_word(&result)? != 0)
	}
}

/// Extracts the low byte of a single ABI-encoded 32-byte return word.
fn decode_word(result: &[u8]) -> Result<u8, ChainError> {
	if result.len() < 32 {
		return Err(ChainError::Contract(format!(
			"Response too short: {} bytes",
			result.len()
		)));
	}
	Ok(result[31])
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use tokio::sync::Mutex;
	use tracker_types::{TransactionHash, TransactionReceipt};

	/// Chain stub that answers every call with a fixed 32-byte word.
	struct StubChain {
		response: Vec<u8>,
		calls: Mutex<Vec<Vec<u8>>>,
	}

	impl StubChain {
		fn returning(value: u8) -> Self {
			let mut response = vec![0u8; 32];
			response[31] = value;
			Self {
				response,
				calls: Mutex::new(Vec::new()),
			}
		}
	}

	#[async_trait]
	impl ChainInterface for StubChain {
		async fn get_transaction_count(&self, _account: &Address) -> Result<u64, ChainError> {
			Ok(0)
		}

		async fn send_transaction(&self, _tx: Transaction) -> Result<TransactionHash, ChainError> {
			Ok(TransactionHash(vec![0u8; 32]))
		}

		async fn wait_for_receipt(
			&self,
			hash: &TransactionHash,
		) -> Result<TransactionReceipt, ChainError> {
			Ok(TransactionReceipt {
				hash: hash.clone(),
				block_number: 1,
				gas_used: 21000,
				success: true,
			})
		}

		async fn call(&self, _to: &Address, data: Vec<u8>) -> Result<Vec<u8>, ChainError> {
			self.calls.lock().await.push(data);
			Ok(self.response.clone())
		}

		async fn get_block_number(&self) -> Result<u64, ChainError> {
			Ok(1)
		}
	}

	fn contract_address() -> Address {
		"0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0".parse().unwrap()
	}

	fn caller() -> Address {
		"0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap()
	}

	#[test]
	fn test_transition_calldata_carries_distinct_selectors() {
		let contract = TrackerContract::new(
			contract_address(),
			Arc::new(StubChain::returning(0)),
		);

		let register = contract.transition_transaction(
			&caller(),
			&DeviceTransition::Register {
				serial: "NB-0001".to_string(),
				model: "EXO X352".to_string(),
			},
		);
		let approve = contract.transition_transaction(
			&caller(),
			&DeviceTransition::ApproveHardware {
				serial: "NB-0001".to_string(),
			},
		);

		assert_eq!(register.to, contract_address());
		assert_eq!(register.from, caller());
		assert!(register.nonce.is_none());
		assert!(register.data.len() > 4);
		assert_ne!(&register.data[..4], &approve.data[..4]);
	}

	#[test]
	fn test_grant_role_calldata_targets_contract() {
		let contract = TrackerContract::new(
			contract_address(),
			Arc::new(StubChain::returning(0)),
		);

		let grant = contract.grant_role_transaction(&caller(), Role::School, &caller());
		assert_eq!(grant.to, contract_address());
		assert!(grant.nonce.is_none());
		assert!(grant.data.len() > 4);
	}

	#[tokio::test]
	async fn test_device_state_decodes_code() {
		let contract = TrackerContract::new(
			contract_address(),
			Arc::new(StubChain::returning(2)),
		);

		let state = contract.device_state("NB-0001").await.unwrap();
		assert_eq!(state, DeviceState::SwValidado);
	}

	#[tokio::test]
	async fn test_device_state_rejects_unknown_code() {
		let contract = TrackerContract::new(
			contract_address(),
			Arc::new(StubChain::returning(9)),
		);

		let result = contract.device_state("NB-0001").await;
		assert!(matches!(result, Err(ChainError::Contract(_))));
	}

	#[tokio::test]
	async fn test_has_role_decodes_bool() {
		let contract = TrackerContract::new(
			contract_address(),
			Arc::new(StubChain::returning(1)),
		);

		let held = contract
			.has_role(Role::School, &caller())
			.await
			.unwrap();
		assert!(held);
	}
}
