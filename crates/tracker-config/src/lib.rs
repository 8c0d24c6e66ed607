//! Configuration module for the netbook tracker service.
//!
//! Loads configuration from a TOML file, resolving `${VAR_NAME}` environment
//! references (with `${VAR_NAME:-default}` fallbacks) before parsing, and
//! validates that all sections are coherent before the service starts.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracker_types::{Address, SecretString};

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message, drop the input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the tracker service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this tracker instance.
	pub tracker: TrackerConfig,
	/// Chain endpoint and tracking contract.
	pub network: NetworkConfig,
	/// Signing account configuration.
	pub account: AccountConfig,
	/// Submission queue and retry tuning.
	#[serde(default)]
	pub submitter: SubmitterConfig,
	/// HTTP API server configuration.
	pub api: Option<ApiConfig>,
}

/// Configuration specific to the tracker instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackerConfig {
	/// Unique identifier for this instance.
	pub id: String,
}

/// Configuration for the chain the tracking contract lives on.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
	/// Chain ID of the network.
	pub chain_id: u64,
	/// HTTP(S) RPC endpoint.
	pub rpc_url: String,
	/// Address of the tracking contract.
	pub contract_address: Address,
}

/// Configuration for the signing account.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
	/// Private key of the submitting account, hex with 0x prefix.
	pub private_key: SecretString,
}

/// Configuration for the transaction submission layer.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubmitterConfig {
	/// Maximum broadcast attempts per submission.
	/// Defaults to 3 if not specified.
	#[serde(default = "default_max_attempts")]
	pub max_attempts: u32,
	/// Base backoff between nonce-conflict retries, in milliseconds.
	/// The wait grows linearly with the attempt number.
	#[serde(default = "default_retry_backoff_ms")]
	pub retry_backoff_ms: u64,
	/// How long to wait for a receipt before giving up, in seconds.
	#[serde(default = "default_receipt_timeout_seconds")]
	pub receipt_timeout_seconds: u64,
}

impl Default for SubmitterConfig {
	fn default() -> Self {
		Self {
			max_attempts: default_max_attempts(),
			retry_backoff_ms: default_retry_backoff_ms(),
			receipt_timeout_seconds: default_receipt_timeout_seconds(),
		}
	}
}

/// Returns the default maximum attempt count per submission.
fn default_max_attempts() -> u32 {
	3
}

/// Returns the default retry backoff base in milliseconds.
fn default_retry_backoff_ms() -> u64 {
	1000
}

/// Returns the default receipt wait timeout in seconds.
fn default_receipt_timeout_seconds() -> u64 {
	300
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the API server is enabled.
	#[serde(default)]
	pub enabled: bool,
	/// Host address to bind the server to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_api_port")]
	pub port: u16,
}

/// Returns the default API host (localhost).
fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

/// Returns the default API port.
fn default_api_port() -> u16 {
	3000
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let full_match = cap.get(0).ok_or_else(|| {
			ConfigError::Parse("Malformed environment reference".to_string())
		})?;
		let var_name = &cap[1];
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name) {
			Ok(v) => v,
			Err(_) => match default_value {
				Some(default) => default.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name
					)));
				},
			},
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Apply in reverse so earlier offsets stay valid
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}

impl Config {
	/// Loads configuration from a TOML file.
	///
	/// Environment references are resolved before parsing and the result is
	/// validated; a service should never start with a half-usable config.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let content = std::fs::read_to_string(path)?;
		Self::from_toml_str(&content)
	}

	/// Parses and validates configuration from a TOML string.
	pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
		let resolved = resolve_env_vars(content)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}

	/// Validates the configuration.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.tracker.id.is_empty() {
			return Err(ConfigError::Validation("Tracker ID cannot be empty".into()));
		}

		if self.network.rpc_url.is_empty() {
			return Err(ConfigError::Validation("RPC URL cannot be empty".into()));
		}

		if self.account.private_key.is_empty() {
			return Err(ConfigError::Validation(
				"Account private key cannot be empty".into(),
			));
		}

		if self.submitter.max_attempts == 0 {
			return Err(ConfigError::Validation(
				"Submitter max_attempts must be at least 1".into(),
			));
		}
		if self.submitter.max_attempts > 10 {
			return Err(ConfigError::Validation(
				"Submitter max_attempts cannot exceed 10".into(),
			));
		}
		if self.submitter.receipt_timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"Submitter receipt_timeout_seconds must be greater than 0".into(),
			));
		}

		Ok(())
	}
}
