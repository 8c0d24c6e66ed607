//! Account address and transaction hash types.
//!
//! Addresses are stored as raw bytes, so two textual spellings of the same
//! account ("0xAbC..." vs "0xabc...") always normalize to identical values.
//! This matters for the nonce cache, which is keyed by account.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced when parsing an address from its textual form.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
	/// The string was not valid hexadecimal.
	#[error("Invalid hex in address: {0}")]
	InvalidHex(String),
	/// The decoded byte length was not 20.
	#[error("Invalid address length: expected 20 bytes, got {0}")]
	InvalidLength(usize),
}

/// An account address on the tracking chain.
///
/// Stored as the raw 20 bytes. Displayed and serialized as lowercase
/// 0x-prefixed hex, which is the canonical form used throughout the system.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(pub Vec<u8>);

impl Address {
	/// Creates an address from raw bytes.
	///
	/// Returns an error if the slice is not exactly 20 bytes.
	pub fn from_bytes(bytes: &[u8]) -> Result<Self, AddressError> {
		if bytes.len() != 20 {
			return Err(AddressError::InvalidLength(bytes.len()));
		}
		Ok(Self(bytes.to_vec()))
	}

	/// Returns the raw address bytes.
	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}
}

impl FromStr for Address {
	type Err = AddressError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let stripped = s.strip_prefix("0x").unwrap_or(s);
		let bytes =
			hex::decode(stripped).map_err(|_| AddressError::InvalidHex(stripped.to_string()))?;
		Self::from_bytes(&bytes)
	}
}

impl fmt::Display for Address {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "0x{}", hex::encode(&self.0))
	}
}

impl Serialize for Address {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.to_string())
	}
}

impl<'de> Deserialize<'de> for Address {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		s.parse().map_err(serde::de::Error::custom)
	}
}

/// Blockchain transaction hash representation.
///
/// Stores transaction hashes as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionHash(pub Vec<u8>);

impl fmt::Display for TransactionHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "0x{}", hex::encode(&self.0))
	}
}
