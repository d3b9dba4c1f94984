//! Core data types shared across the wallet session layer.
//!
//! These types form the uniform surface every provider adapter exposes,
//! regardless of how the underlying wallet extension shapes its own API.
//! Account and state values are immutable snapshots: callers receive clones
//! and never patch fields in place.

use serde::{Deserialize, Serialize};

use crate::error::WalletError;

/// Connection lifecycle of an adapter (and of the manager's active session).
///
/// Exactly one value holds at any instant. `Error` is reachable from
/// `Connecting` or `Connected`; `Disconnected` is the re-enterable terminal
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
	Disconnected,
	Connecting,
	Connected,
	Error,
}

/// Bitcoin network an account lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
	Mainnet,
	Testnet,
	Regtest,
}

impl Network {
	/// Normalize the heterogeneous network strings providers report.
	///
	/// Providers disagree on naming ("livenet" vs "mainnet"); unknown values
	/// fall back to mainnet rather than failing a read path.
	pub fn normalize(raw: &str) -> Network {
		match raw {
			"livenet" | "mainnet" => Network::Mainnet,
			"testnet" => Network::Testnet,
			"regtest" => Network::Regtest,
			_ => Network::Mainnet,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Network::Mainnet => "mainnet",
			Network::Testnet => "testnet",
			Network::Regtest => "regtest",
		}
	}
}

impl std::fmt::Display for Network {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Confirmed/unconfirmed balance split, in satoshis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
	pub confirmed: u64,
	pub unconfirmed: u64,
	pub total: u64,
}

/// Snapshot of one wallet account.
///
/// Replaced wholesale whenever the provider reports a change; never patched
/// field-by-field by outside callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
	pub address: String,
	pub public_key: Option<String>,
	pub balance: Option<Balance>,
	pub network: Option<Network>,
}

impl AccountInfo {
	pub fn new(address: impl Into<String>) -> Self {
		Self {
			address: address.into(),
			public_key: None,
			balance: None,
			network: None,
		}
	}
}

/// Observable state of one adapter.
///
/// Invariants: `Connected` implies a non-empty account list whose first entry
/// is `current_account`; `Disconnected` implies no accounts and no current
/// account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletState {
	pub status: ConnectionStatus,
	pub accounts: Vec<AccountInfo>,
	pub current_account: Option<AccountInfo>,
	pub network: Option<Network>,
	pub error: Option<WalletError>,
}

impl WalletState {
	/// The empty, disconnected state every adapter starts from and returns to.
	pub fn disconnected() -> Self {
		Self {
			status: ConnectionStatus::Disconnected,
			accounts: Vec::new(),
			current_account: None,
			network: None,
			error: None,
		}
	}
}

impl Default for WalletState {
	fn default() -> Self {
		Self::disconnected()
	}
}

/// Stable identity of an adapter, immutable for its lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletInfo {
	pub id: String,
	pub name: String,
	pub icon: String,
}

impl WalletInfo {
	pub fn new(id: impl Into<String>, name: impl Into<String>, icon: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			name: name.into(),
			icon: icon.into(),
		}
	}
}

/// Message signature scheme for providers with advanced signing support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignatureKind {
	Ecdsa,
	Bip322Simple,
}

impl SignatureKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			SignatureKind::Ecdsa => "ecdsa",
			SignatureKind::Bip322Simple => "bip322-simple",
		}
	}
}
