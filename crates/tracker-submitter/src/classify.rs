//! Classification of raw chain errors into actionable outcomes.
//!
//! The node and wallet report failures as free-form strings, so matching on
//! substrings is the only option. Matching is case-insensitive throughout:
//! the upstream casing is not under our control and has been observed to
//! vary for the same condition.

/// The closed set of failure kinds a submission can settle with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	/// The chosen nonce was already consumed. The only transient kind:
	/// caused by our own stale local state, so retrying with a fresh
	/// nonce is correct.
	NonceConflict,
	/// The user declined to sign the transaction.
	UserRejected,
	/// The contract rejected the call.
	ContractReverted,
	/// The account cannot cover gas for the transaction.
	InsufficientFunds,
	/// Anything not recognized above.
	Unknown,
}

impl ErrorKind {
	/// Whether a failure of this kind may be retried with a fresh nonce.
	pub fn is_retryable(&self) -> bool {
		matches!(self, ErrorKind::NonceConflict)
	}
}

/// A raw failure mapped onto a kind and a user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedError {
	pub kind: ErrorKind,
	pub message: String,
}

/// Trait for pluggable error classification.
///
/// Kept separate from the queue and retry logic so the matching rules can
/// be swapped without touching either.
pub trait ErrorClassifier: Send + Sync {
	/// Maps raw error text onto exactly one [`ClassifiedError`].
	///
	/// Must be total: every input produces a kind, defaulting to
	/// [`ErrorKind::Unknown`].
	fn classify(&self, error: &str) -> ClassifiedError;
}

/// Default classifier matching known substrings of node and wallet errors.
pub struct SubstringClassifier;

impl ErrorClassifier for SubstringClassifier {
	fn classify(&self, error: &str) -> ClassifiedError {
		let lowered = error.to_lowercase();

		let kind = if lowered.contains("nonce too low") {
			ErrorKind::NonceConflict
		} else if lowered.contains("user rejected") {
			ErrorKind::UserRejected
		} else if lowered.contains("reverted") {
			ErrorKind::ContractReverted
		} else if lowered.contains("insufficient funds") {
			ErrorKind::InsufficientFunds
		} else {
			ErrorKind::Unknown
		};

		let message = match kind {
			ErrorKind::NonceConflict => "nonce conflict with a pending transaction".to_string(),
			ErrorKind::UserRejected => "transaction rejected by user".to_string(),
			ErrorKind::ContractReverted => "transaction reverted on-chain".to_string(),
			ErrorKind::InsufficientFunds => {
				"insufficient funds to cover the transaction".to_string()
			},
			ErrorKind::Unknown => error.to_string(),
		};

		ClassifiedError { kind, message }
	}
}
