//! Common types module for the netbook tracker system.
//!
//! This module defines the core data types shared by the tracker components:
//! account addresses, transactions and receipts, the read-only device state
//! machine, and the catalogue of contract transitions the service submits.

/// Account and transaction hash types.
pub mod address;
/// Device lifecycle, role and transition types.
pub mod device;
/// Secure string type for private keys.
pub mod secret;
/// Transaction and receipt types for chain interactions.
pub mod transaction;

pub use address::{Address, AddressError, TransactionHash};
pub use device::{DeviceState, DeviceTransition, Role};
pub use secret::SecretString;
pub use transaction::{Transaction, TransactionReceipt};
