//! Provider handle contract.
//!
//! Each browser wallet extension exposes a different, incompatible API. A
//! [`ProviderHandle`] wraps exactly one of them behind a uniform async
//! surface, injected into the adapter at construction. Optional operations
//! are declared up front through a [`CapabilitySet`] instead of probed at
//! runtime; the default implementations fail with an unsupported condition,
//! never with a silent placeholder. Implementations wrap raw provider
//! failures into [`WalletError`] before returning them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, WalletError};
use crate::types::{Balance, Network, SignatureKind};

/// Optional operations a provider may implement beyond the base contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
	/// `get_public_key`.
	PublicKey,
	/// `get_balance`.
	Balance,
	/// `sign_message_advanced` / `send_bitcoin_advanced`.
	AdvancedSigning,
	/// `send_inscription`.
	InscriptionTransfer,
	/// `push_tx` / `push_psbt`.
	RawPush,
	/// The provider's own event mechanism supports listener removal.
	ListenerRemoval,
}

/// Declared capability set of one provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet(std::collections::HashSet<Capability>);

impl CapabilitySet {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, capability: Capability) -> Self {
		self.0.insert(capability);
		self
	}

	pub fn contains(&self, capability: Capability) -> bool {
		self.0.contains(&capability)
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl FromIterator<Capability> for CapabilitySet {
	fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
		Self(iter.into_iter().collect())
	}
}

/// Options for advanced send operations (fee rate, memo).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SendOptions {
	pub fee_rate: Option<u64>,
	pub memo: Option<String>,
}

fn unsupported(operation: &str) -> WalletError {
	WalletError::new(
		ErrorKind::Unsupported,
		format!("provider does not support {operation}"),
	)
	.with_operation(operation)
}

/// Uniform async surface over one provider-specific wallet API.
///
/// `is_available` is a pure probe on the injected handle; it never touches
/// ambient global state, never throws, and never mutates anything. All other
/// operations are provider round-trips.
#[async_trait]
pub trait ProviderHandle: Send + Sync {
	/// Whether the expected provider object exists in the execution
	/// environment.
	fn is_available(&self) -> bool;

	/// Optional operations this provider declares.
	fn capabilities(&self) -> CapabilitySet {
		CapabilitySet::new()
	}

	/// Interactive connect handshake; may prompt the user.
	async fn request_accounts(&self) -> Result<Vec<String>, WalletError>;

	/// Silent account query; must not prompt. Used for resume probing.
	async fn get_accounts(&self) -> Result<Vec<String>, WalletError>;

	/// Provider-specific teardown. Many providers have none.
	async fn disconnect(&self) -> Result<(), WalletError> {
		Ok(())
	}

	async fn get_network(&self) -> Result<Network, WalletError>;

	async fn switch_network(&self, network: Network) -> Result<(), WalletError>;

	async fn sign_message(&self, message: &str) -> Result<String, WalletError>;

	async fn sign_psbt(&self, psbt_hex: &str) -> Result<String, WalletError>;

	/// Batch PSBT signing; falls back to signing one at a time.
	async fn sign_psbts(&self, psbt_hexes: &[String]) -> Result<Vec<String>, WalletError> {
		let mut signed = Vec::with_capacity(psbt_hexes.len());
		for psbt_hex in psbt_hexes {
			signed.push(self.sign_psbt(psbt_hex).await?);
		}
		Ok(signed)
	}

	async fn send_bitcoin(&self, to_address: &str, amount_sats: u64)
	-> Result<String, WalletError>;

	/// Requires [`Capability::PublicKey`].
	async fn get_public_key(&self) -> Result<String, WalletError> {
		Err(unsupported("get_public_key"))
	}

	/// Requires [`Capability::Balance`].
	async fn get_balance(&self) -> Result<Balance, WalletError> {
		Err(unsupported("get_balance"))
	}

	/// Requires [`Capability::AdvancedSigning`].
	async fn sign_message_advanced(
		&self,
		_message: &str,
		_kind: SignatureKind,
	) -> Result<String, WalletError> {
		Err(unsupported("sign_message_advanced"))
	}

	/// Requires [`Capability::AdvancedSigning`].
	async fn send_bitcoin_advanced(
		&self,
		_to_address: &str,
		_amount_sats: u64,
		_options: &SendOptions,
	) -> Result<String, WalletError> {
		Err(unsupported("send_bitcoin_advanced"))
	}

	/// Requires [`Capability::InscriptionTransfer`].
	async fn send_inscription(
		&self,
		_to_address: &str,
		_inscription_id: &str,
		_options: &SendOptions,
	) -> Result<String, WalletError> {
		Err(unsupported("send_inscription"))
	}

	/// Requires [`Capability::RawPush`].
	async fn push_tx(&self, _raw_tx: &str) -> Result<String, WalletError> {
		Err(unsupported("push_tx"))
	}

	/// Requires [`Capability::RawPush`].
	async fn push_psbt(&self, _psbt_hex: &str) -> Result<String, WalletError> {
		Err(unsupported("push_psbt"))
	}
}
