//! Main entry point for the netbook tracker service.
//!
//! This binary wires the chain client, the tracking contract bindings and
//! the transaction submitter together, then serves the device lifecycle
//! API over HTTP.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracker_chain::{contract::TrackerContract, implementations::alloy::AlloyChain, ChainInterface};
use tracker_config::Config;
use tracker_submitter::TransactionSubmitter;

mod server;

/// Command-line arguments for the tracker service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	let config = Config::from_file(&args.config)?;
	tracing::info!("Loaded configuration [{}]", config.tracker.id);

	let state = build_state(&config)?;
	tracing::info!(
		sender = %state.sender,
		contract = %state.contract.address(),
		chain_id = config.network.chain_id,
		"Tracker service initialized"
	);

	match config.api {
		Some(ref api_config) if api_config.enabled => {
			server::start_server(api_config.clone(), state).await?;
		},
		_ => {
			tracing::warn!("API server disabled in configuration, nothing to serve");
		},
	}

	tracing::info!("Stopped tracker service");
	Ok(())
}

/// Builds the shared application state from configuration.
///
/// One chain client, one contract binding and one submitter are created for
/// the process; every request goes through the same submission queue.
fn build_state(config: &Config) -> Result<server::AppState, Box<dyn std::error::Error>> {
	let chain = AlloyChain::new(
		&config.network,
		&config.account.private_key,
		config.submitter.receipt_timeout_seconds,
	)?;
	let sender = chain.sender().clone();
	let chain: Arc<dyn ChainInterface> = Arc::new(chain);

	let contract = Arc::new(TrackerContract::new(
		config.network.contract_address.clone(),
		chain.clone(),
	));
	let submitter = Arc::new(TransactionSubmitter::new(chain.clone(), &config.submitter));

	Ok(server::AppState {
		submitter,
		contract,
		chain,
		sender,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use tempfile::TempDir;

	#[test]
	fn test_args_default_values() {
		let args = Args {
			config: PathBuf::from("config.toml"),
			log_level: "info".to_string(),
		};

		assert_eq!(args.config, PathBuf::from("config.toml"));
		assert_eq!(args.log_level, "info");
	}

	#[tokio::test]
	async fn test_build_state_from_file_config() {
		let temp_dir = TempDir::new().unwrap();
		let config_path = temp_dir.path().join("config.toml");

		let config_content = r#"
[tracker]
id = "tracker-test"

[network]
chain_id = 31337
rpc_url = "http://localhost:8545"
contract_address = "0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0"

[account]
private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"

[submitter]
max_attempts = 2
retry_backoff_ms = 500
"#;
		fs::write(&config_path, config_content).unwrap();

		let config = Config::from_file(&config_path).unwrap();
		// State construction only parses the key and builds the provider;
		// no network traffic happens here
		let state = build_state(&config).unwrap();

		// The well-known Anvil dev key derives this address
		assert_eq!(
			state.sender.to_string(),
			"0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
		);
	}
}
