//! HTTP server for the netbook tracker API.
//!
//! Exposes the device lifecycle over a small JSON API: transition requests
//! are funneled into the transaction submitter, device and role reads go
//! straight to the contract.

use axum::{
	extract::{Path, State},
	http::StatusCode,
	response::{IntoResponse, Json, Response},
	routing::{get, post},
	Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracker_chain::{contract::TrackerContract, ChainError, ChainInterface};
use tracker_config::ApiConfig;
use tracker_submitter::{SubmitError, TransactionSubmitter};
use tracker_types::{Address, DeviceTransition, Role};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Serialized transaction submitter for all contract writes.
	pub submitter: Arc<TransactionSubmitter>,
	/// Typed client for the tracking contract.
	pub contract: Arc<TrackerContract>,
	/// Chain client, used directly by the health endpoint.
	pub chain: Arc<dyn ChainInterface>,
	/// Account the service signs and submits with.
	pub sender: Address,
}

/// A device transition request body.
///
/// The target serial comes from the URL path; the body carries the action
/// and its parameters.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum TransitionRequest {
	Register { model: String },
	ApproveHardware,
	ValidateSoftware,
	Distribute { school: Address },
}

impl TransitionRequest {
	fn into_transition(self, serial: String) -> DeviceTransition {
		match self {
			Self::Register { model } => DeviceTransition::Register { serial, model },
			Self::ApproveHardware => DeviceTransition::ApproveHardware { serial },
			Self::ValidateSoftware => DeviceTransition::ValidateSoftware { serial },
			Self::Distribute { school } => DeviceTransition::Distribute { serial, school },
		}
	}
}

/// JSON error response with the HTTP status it maps to.
struct ApiError {
	status: StatusCode,
	kind: &'static str,
	message: String,
}

impl ApiError {
	fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
		Self {
			status,
			kind,
			message: message.into(),
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		(
			self.status,
			Json(json!({
				"error": self.kind,
				"message": self.message,
			})),
		)
			.into_response()
	}
}

impl From<SubmitError> for ApiError {
	fn from(error: SubmitError) -> Self {
		let status = match &error {
			SubmitError::MaxRetriesExceeded { .. } => StatusCode::CONFLICT,
			SubmitError::UserRejected => StatusCode::BAD_REQUEST,
			SubmitError::ContractReverted(_) => StatusCode::UNPROCESSABLE_ENTITY,
			SubmitError::InsufficientFunds(_) => StatusCode::PAYMENT_REQUIRED,
			SubmitError::QueueClosed => StatusCode::SERVICE_UNAVAILABLE,
			SubmitError::Other(_) => StatusCode::BAD_GATEWAY,
		};
		Self::new(status, error.kind(), error.to_string())
	}
}

impl From<ChainError> for ApiError {
	fn from(error: ChainError) -> Self {
		let status = match &error {
			// Reads against unknown devices surface as contract errors
			ChainError::Contract(_) => StatusCode::NOT_FOUND,
			_ => StatusCode::BAD_GATEWAY,
		};
		Self::new(status, "chain_error", error.to_string())
	}
}

/// Starts the HTTP server for the API.
pub async fn start_server(
	api_config: ApiConfig,
	state: AppState,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/devices/{serial}/transitions", post(handle_transition))
				.route("/devices/{serial}", get(handle_get_device))
				.route(
					"/roles/{role}/{address}",
					get(handle_get_role).post(handle_grant_role),
				)
				.route("/health", get(handle_health)),
		)
		.layer(TraceLayer::new_for_http())
		.layer(CorsLayer::permissive())
		.with_state(state);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Tracker API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Handles POST /api/devices/{serial}/transitions requests.
///
/// Builds the contract write for the requested transition and submits it,
/// returning once the transaction is confirmed or has permanently failed.
async fn handle_transition(
	Path(serial): Path<String>,
	State(state): State<AppState>,
	Json(request): Json<TransitionRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
	let transition = request.into_transition(serial);
	tracing::info!(serial = transition.serial(), "Processing transition request");

	let tx = state.contract.transition_transaction(&state.sender, &transition);
	let receipt = state.submitter.submit(tx).await?;

	Ok(Json(json!({
		"status": "confirmed",
		"tx_hash": receipt.hash.to_string(),
		"block_number": receipt.block_number,
		"gas_used": receipt.gas_used,
	})))
}

/// Handles GET /api/devices/{serial} requests.
async fn handle_get_device(
	Path(serial): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
	let device_state = state.contract.device_state(&serial).await?;

	Ok(Json(json!({
		"serial": serial,
		"state": device_state.to_string(),
	})))
}

/// Handles GET /api/roles/{role}/{address} requests.
async fn handle_get_role(
	Path((role, address)): Path<(String, String)>,
	State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
	let role: Role = role
		.parse()
		.map_err(|e: String| ApiError::new(StatusCode::BAD_REQUEST, "invalid_role", e))?;
	let account: Address = address
		.parse()
		.map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, "invalid_address", format!("{}", e)))?;

	let held = state.contract.has_role(role, &account).await?;

	Ok(Json(json!({
		"role": role,
		"account": account.to_string(),
		"has_role": held,
	})))
}

/// Handles POST /api/roles/{role}/{address} requests.
///
/// Submits a role grant for the account. The contract enforces that only
/// its admin may grant roles; unauthorized grants revert on-chain.
async fn handle_grant_role(
	Path((role, address)): Path<(String, String)>,
	State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
	let role: Role = role
		.parse()
		.map_err(|e: String| ApiError::new(StatusCode::BAD_REQUEST, "invalid_role", e))?;
	let account: Address = address
		.parse()
		.map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, "invalid_address", format!("{}", e)))?;

	tracing::info!(?role, account = %account, "Processing role grant request");

	let tx = state
		.contract
		.grant_role_transaction(&state.sender, role, &account);
	let receipt = state.submitter.submit(tx).await?;

	Ok(Json(json!({
		"status": "confirmed",
		"role": role,
		"account": account.to_string(),
		"tx_hash": receipt.hash.to_string(),
		"block_number": receipt.block_number,
	})))
}

/// Handles GET /api/health requests.
///
/// Reports the chain connection by reading the current block number.
async fn handle_health(State(state): State<AppState>) -> Response {
	match state.chain.get_block_number().await {
		Ok(block_number) => Json(json!({
			"status": "ok",
			"block_number": block_number,
		}))
		.into_response(),
		Err(e) => {
			tracing::warn!("Health check failed: {}", e);
			(
				StatusCode::SERVICE_UNAVAILABLE,
				Json(json!({
					"status": "unavailable",
					"message": e.to_string(),
				})),
			)
				.into_response()
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_transition_request_takes_serial_from_path() {
		let body = r#"{"action":"register","model":"EXO X352"}"#;
		let request: TransitionRequest = serde_json::from_str(body).unwrap();
		let transition = request.into_transition("NB-0042".to_string());
		assert_eq!(
			transition,
			DeviceTransition::Register {
				serial: "NB-0042".to_string(),
				model: "EXO X352".to_string(),
			}
		);
	}

	#[test]
	fn test_submit_errors_map_to_distinct_statuses() {
		let rejected: ApiError = SubmitError::UserRejected.into();
		assert_eq!(rejected.status, StatusCode::BAD_REQUEST);

		let reverted: ApiError = SubmitError::ContractReverted("estado invalido".into()).into();
		assert_eq!(reverted.status, StatusCode::UNPROCESSABLE_ENTITY);

		let exhausted: ApiError = SubmitError::MaxRetriesExceeded {
			attempts: 3,
			last_error: "nonce too low".into(),
		}
		.into();
		assert_eq!(exhausted.status, StatusCode::CONFLICT);
		assert_eq!(exhausted.kind, "max_retries_exceeded");
	}

	#[test]
	fn test_rejects_unknown_action() {
		let body = r#"{"action":"recycle"}"#;
		let result: Result<TransitionRequest, _> = serde_json::from_str(body);
		assert!(result.is_err());
	}
}
