//! Error taxonomy for wallet session operations.
//!
//! Raw provider failures never cross the adapter boundary: they are wrapped
//! into a [`WalletError`] with a fixed [`ErrorKind`] first, so callers can
//! branch on the kind without knowing which provider produced it. Each kind
//! carries a fixed severity and retryability; optional structured context
//! (wallet id, operation, network, suggestion) travels with the error.

use serde::{Deserialize, Serialize};

use crate::types::Network;

/// What went wrong, independent of which provider was involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
	/// The expected provider object is absent from the environment.
	NotInstalled,
	/// The interactive connect handshake failed.
	ConnectionFailed,
	/// An operation required a connected adapter, or teardown failed.
	Disconnected,
	/// A network query or switch failed.
	NetworkFailed,
	/// Message or PSBT signing failed.
	SignatureFailed,
	/// Broadcasting or building a transaction failed.
	TransactionFailed,
	/// A raced operation did not complete in time.
	Timeout,
	/// Invalid caller-supplied configuration.
	ConfigurationInvalid,
	/// A required post-connect policy task failed; the session was rolled back.
	PolicyFailed,
	/// The manager was destroyed and accepts no further operations.
	ManagerDestroyed,
	/// The requested wallet id is not registered.
	NotFound,
	/// The active provider does not implement this optional capability.
	Unsupported,
}

impl ErrorKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			ErrorKind::NotInstalled => "not-installed",
			ErrorKind::ConnectionFailed => "connection-failed",
			ErrorKind::Disconnected => "disconnected",
			ErrorKind::NetworkFailed => "network-failed",
			ErrorKind::SignatureFailed => "signature-failed",
			ErrorKind::TransactionFailed => "transaction-failed",
			ErrorKind::Timeout => "timeout",
			ErrorKind::ConfigurationInvalid => "configuration-invalid",
			ErrorKind::PolicyFailed => "policy-failed",
			ErrorKind::ManagerDestroyed => "manager-destroyed",
			ErrorKind::NotFound => "not-found",
			ErrorKind::Unsupported => "unsupported",
		}
	}

	/// Fixed severity of this kind of failure.
	pub fn severity(&self) -> ErrorSeverity {
		match self {
			ErrorKind::NotInstalled => ErrorSeverity::High,
			ErrorKind::ConnectionFailed => ErrorSeverity::Medium,
			ErrorKind::Disconnected => ErrorSeverity::Medium,
			ErrorKind::NetworkFailed => ErrorSeverity::Medium,
			ErrorKind::SignatureFailed => ErrorSeverity::Medium,
			ErrorKind::TransactionFailed => ErrorSeverity::High,
			ErrorKind::Timeout => ErrorSeverity::Low,
			ErrorKind::ConfigurationInvalid => ErrorSeverity::Critical,
			ErrorKind::PolicyFailed => ErrorSeverity::High,
			ErrorKind::ManagerDestroyed => ErrorSeverity::Critical,
			ErrorKind::NotFound => ErrorSeverity::Medium,
			ErrorKind::Unsupported => ErrorSeverity::Low,
		}
	}

	/// Whether retrying the same operation can reasonably succeed.
	pub fn retryable(&self) -> bool {
		matches!(
			self,
			ErrorKind::ConnectionFailed
				| ErrorKind::Disconnected
				| ErrorKind::NetworkFailed
				| ErrorKind::Timeout
		)
	}
}

impl std::fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// How serious a failure is for the embedding application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
	Low,
	Medium,
	High,
	Critical,
}

/// Optional structured context attached to an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
	pub wallet_id: Option<String>,
	pub operation: Option<String>,
	pub network: Option<Network>,
	pub suggestion: Option<String>,
}

/// Error type for every fallible operation in this crate.
///
/// Cloneable so it can ride inside state snapshots and event payloads; the
/// original provider error is preserved as a message in `caused_by`.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct WalletError {
	pub kind: ErrorKind,
	pub message: String,
	pub context: ErrorContext,
	pub caused_by: Option<String>,
}

impl WalletError {
	pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
		Self {
			kind,
			message: message.into(),
			context: ErrorContext::default(),
			caused_by: None,
		}
	}

	pub fn not_installed(wallet_id: &str) -> Self {
		Self::new(
			ErrorKind::NotInstalled,
			format!("wallet {wallet_id} is not installed"),
		)
		.with_wallet(wallet_id)
		.with_suggestion("install the wallet extension and reload the page")
	}

	pub fn connection_failed(wallet_id: &str, message: impl Into<String>) -> Self {
		Self::new(ErrorKind::ConnectionFailed, message).with_wallet(wallet_id)
	}

	pub fn disconnected(wallet_id: &str) -> Self {
		Self::new(
			ErrorKind::Disconnected,
			format!("wallet {wallet_id} is not connected"),
		)
		.with_wallet(wallet_id)
	}

	pub fn network_failed(message: impl Into<String>) -> Self {
		Self::new(ErrorKind::NetworkFailed, message)
	}

	pub fn signature_failed(message: impl Into<String>) -> Self {
		Self::new(ErrorKind::SignatureFailed, message)
	}

	pub fn transaction_failed(message: impl Into<String>) -> Self {
		Self::new(ErrorKind::TransactionFailed, message)
	}

	pub fn timeout(operation: &str) -> Self {
		Self::new(ErrorKind::Timeout, format!("{operation} timed out")).with_operation(operation)
	}

	pub fn configuration_invalid(message: impl Into<String>) -> Self {
		Self::new(ErrorKind::ConfigurationInvalid, message)
	}

	pub fn policy_failed(message: impl Into<String>) -> Self {
		Self::new(ErrorKind::PolicyFailed, message)
	}

	pub fn manager_destroyed() -> Self {
		Self::new(ErrorKind::ManagerDestroyed, "wallet manager has been destroyed")
	}

	pub fn not_found(wallet_id: &str) -> Self {
		Self::new(
			ErrorKind::NotFound,
			format!("wallet {wallet_id} is not registered"),
		)
		.with_wallet(wallet_id)
	}

	pub fn unsupported(wallet_id: &str, operation: &str) -> Self {
		Self::new(
			ErrorKind::Unsupported,
			format!("wallet {wallet_id} does not support {operation}"),
		)
		.with_wallet(wallet_id)
		.with_operation(operation)
	}

	pub fn with_wallet(mut self, wallet_id: impl Into<String>) -> Self {
		self.context.wallet_id = Some(wallet_id.into());
		self
	}

	pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
		self.context.operation = Some(operation.into());
		self
	}

	pub fn with_network(mut self, network: Network) -> Self {
		self.context.network = Some(network);
		self
	}

	pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
		self.context.suggestion = Some(suggestion.into());
		self
	}

	/// Record the underlying provider error this one wraps.
	pub fn caused_by(mut self, cause: impl std::fmt::Display) -> Self {
		self.caused_by = Some(cause.to_string());
		self
	}

	pub fn severity(&self) -> ErrorSeverity {
		self.kind.severity()
	}

	pub fn retryable(&self) -> bool {
		self.kind.retryable()
	}
}
