//! Adapter state machine over an injected provider handle.
//!
//! One [`WalletAdapter`] wraps one provider and exposes the uniform
//! account/network/signing surface the rest of the session layer relies on.
//! The adapter owns its [`WalletState`] exclusively; the session manager only
//! reads it, except when synthesizing a connected state during silent resume.
//! Provider-reported account/network changes are mirrored into this state and
//! re-emitted as adapter events, so collaborators never need provider-specific
//! listening.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::cache::{CacheOptions, CacheRegistry, MemoryCache, cache_key};
use crate::error::WalletError;
use crate::events::{EventBus, EventPayload};
use crate::types::{
	AccountInfo, Balance, ConnectionStatus, Network, SignatureKind, WalletInfo, WalletState,
};

use super::provider::{Capability, ProviderHandle, SendOptions};

/// Read caches shared with every other adapter through the registry.
struct AdapterCaches {
	balance: Arc<MemoryCache<Balance>>,
	network: Arc<MemoryCache<Network>>,
	accounts: Arc<MemoryCache<Vec<AccountInfo>>>,
	public_key: Arc<MemoryCache<String>>,
}

impl AdapterCaches {
	fn from_registry(registry: &CacheRegistry) -> Result<Self, WalletError> {
		Ok(Self {
			balance: registry.get_cache(
				"balance",
				CacheOptions {
					ttl: Duration::from_secs(10),
					max_size: 100,
				},
			)?,
			network: registry.get_cache(
				"network",
				CacheOptions {
					ttl: Duration::from_secs(60),
					max_size: 50,
				},
			)?,
			accounts: registry.get_cache(
				"accounts",
				CacheOptions {
					ttl: Duration::from_secs(30),
					max_size: 50,
				},
			)?,
			public_key: registry.get_cache(
				"public_key",
				CacheOptions {
					ttl: Duration::from_secs(30),
					max_size: 20,
				},
			)?,
		})
	}
}

/// Per-provider state machine: `disconnected → connecting → connected`, with
/// `error` reachable on any handshake or teardown failure.
pub struct WalletAdapter {
	info: WalletInfo,
	provider: Box<dyn ProviderHandle>,
	state: Mutex<WalletState>,
	events: EventBus,
	caches: AdapterCaches,
	destroyed: AtomicBool,
}

impl WalletAdapter {
	pub fn new(
		info: WalletInfo,
		provider: Box<dyn ProviderHandle>,
		registry: &CacheRegistry,
	) -> Result<Self, WalletError> {
		Ok(Self {
			info,
			provider,
			state: Mutex::new(WalletState::disconnected()),
			events: EventBus::new(),
			caches: AdapterCaches::from_registry(registry)?,
			destroyed: AtomicBool::new(false),
		})
	}

	pub fn id(&self) -> &str {
		&self.info.id
	}

	pub fn name(&self) -> &str {
		&self.info.name
	}

	pub fn info(&self) -> &WalletInfo {
		&self.info
	}

	/// Adapter-scoped event bus; the manager relays from here.
	pub fn events(&self) -> &EventBus {
		&self.events
	}

	pub fn capabilities(&self) -> super::provider::CapabilitySet {
		self.provider.capabilities()
	}

	/// Pure capability probe on the injected handle. Never mutates state.
	pub fn is_ready(&self) -> bool {
		self.provider.is_available()
	}

	pub fn get_state(&self) -> WalletState {
		self.state.lock().unwrap().clone()
	}

	pub fn is_connected(&self) -> bool {
		self.state.lock().unwrap().status == ConnectionStatus::Connected
	}

	/// Interactive connect handshake.
	///
	/// No-op returning the current accounts when already connected. Fails
	/// with a not-installed condition when the provider handle is absent.
	/// Any handshake failure moves the adapter to the error state, emits an
	/// error event and fails with a connection-failed condition wrapping the
	/// cause.
	pub async fn connect(&self) -> Result<Vec<AccountInfo>, WalletError> {
		{
			let state = self.state.lock().unwrap();
			if state.status == ConnectionStatus::Connected {
				return Ok(state.accounts.clone());
			}
		}
		if !self.is_ready() {
			return Err(WalletError::not_installed(self.id()));
		}

		self.state.lock().unwrap().status = ConnectionStatus::Connecting;
		info!(wallet = %self.id(), "connecting wallet");

		let addresses = match self.provider.request_accounts().await {
			Ok(addresses) if addresses.is_empty() => {
				let err = WalletError::connection_failed(
					self.id(),
					"provider authorized no accounts",
				)
				.with_operation("connect");
				return Err(self.record_failure(err));
			}
			Ok(addresses) => addresses,
			Err(cause) => {
				let err = WalletError::connection_failed(self.id(), "connect handshake failed")
					.with_operation("connect")
					.caused_by(&cause);
				return Err(self.record_failure(err));
			}
		};

		let accounts: Vec<AccountInfo> = addresses.into_iter().map(AccountInfo::new).collect();
		{
			let mut state = self.state.lock().unwrap();
			state.status = ConnectionStatus::Connected;
			state.accounts = accounts.clone();
			state.current_account = Some(accounts[0].clone());
			state.error = None;
		}
		info!(wallet = %self.id(), accounts = accounts.len(), "wallet connected");
		self.events.emit(&EventPayload::Connect {
			wallet_id: self.id().to_string(),
			accounts: accounts.clone(),
		});
		Ok(accounts)
	}

	/// Provider teardown plus state reset.
	///
	/// No-op when not connected. A teardown failure moves the adapter to the
	/// error state and fails with a disconnection condition; the adapter is
	/// unusable until reconnected.
	pub async fn disconnect(&self) -> Result<(), WalletError> {
		if !self.is_connected() {
			return Ok(());
		}
		if let Err(cause) = self.provider.disconnect().await {
			let err = WalletError::disconnected(self.id())
				.with_operation("disconnect")
				.caused_by(&cause);
			return Err(self.record_failure(err));
		}

		self.invalidate_account_caches();
		{
			let mut state = self.state.lock().unwrap();
			*state = WalletState::disconnected();
		}
		info!(wallet = %self.id(), "wallet disconnected");
		self.events.emit(&EventPayload::Disconnect {
			wallet_id: self.id().to_string(),
		});
		Ok(())
	}

	/// Silent account query. Permitted while disconnected so silent resume
	/// can probe for an existing authorization without prompting.
	///
	/// Results are cached per network once the network is known; an unknown
	/// network always hits the provider, so a fresh resume probe is never
	/// answered from a stale entry.
	pub async fn get_accounts(&self) -> Result<Vec<AccountInfo>, WalletError> {
		let key = self
			.known_network()
			.map(|network| cache_key::accounts(self.id(), network));
		if let Some(key) = &key {
			if let Some(accounts) = self.caches.accounts.get(key) {
				return Ok(accounts);
			}
		}
		let addresses = self
			.provider
			.get_accounts()
			.await
			.map_err(|e| e.with_wallet(self.id()).with_operation("get_accounts"))?;
		let accounts: Vec<AccountInfo> = addresses.into_iter().map(AccountInfo::new).collect();
		if let (Some(key), false) = (&key, accounts.is_empty()) {
			self.caches.accounts.set(key, accounts.clone(), None);
		}
		Ok(accounts)
	}

	/// Network query, cached. Permitted while disconnected.
	pub async fn get_network(&self) -> Result<Network, WalletError> {
		let network = self.probe_network().await?;
		self.state.lock().unwrap().network = Some(network);
		Ok(network)
	}

	/// Cache-backed network read that leaves adapter state untouched, for
	/// callers that must not mutate anything until they decide to commit.
	pub(crate) async fn probe_network(&self) -> Result<Network, WalletError> {
		let key = cache_key::network(self.id());
		if let Some(network) = self.caches.network.get(&key) {
			return Ok(network);
		}
		let network = self
			.provider
			.get_network()
			.await
			.map_err(|e| e.with_wallet(self.id()).with_operation("get_network"))?;
		self.caches.network.set(&key, network, None);
		Ok(network)
	}

	/// Switch the provider to another network. Requires a connected adapter.
	pub async fn switch_network(&self, network: Network) -> Result<(), WalletError> {
		self.require_connected("switch_network")?;
		self.provider.switch_network(network).await.map_err(|e| {
			e.with_wallet(self.id())
				.with_operation("switch_network")
				.with_network(network)
		})?;

		// Accounts can differ per network; drop anything derived from the
		// old one.
		self.caches.network.delete(&cache_key::network(self.id()));
		self.caches.accounts.clear();
		self.state.lock().unwrap().network = Some(network);
		self.events.emit(&EventPayload::NetworkChange {
			wallet_id: self.id().to_string(),
			network,
		});
		Ok(())
	}

	/// Public key of the current account, cached. Capability-gated.
	pub async fn get_public_key(&self) -> Result<String, WalletError> {
		self.require_connected("get_public_key")?;
		self.probe_public_key().await
	}

	/// Capability-gated public key read without the connected gate, so a
	/// silent probe can fetch it before any session exists.
	pub(crate) async fn probe_public_key(&self) -> Result<String, WalletError> {
		if !self.provider.capabilities().contains(Capability::PublicKey) {
			return Err(WalletError::unsupported(self.id(), "get_public_key"));
		}
		let key = cache_key::public_key(self.id());
		if let Some(public_key) = self.caches.public_key.get(&key) {
			return Ok(public_key);
		}
		let public_key = self
			.provider
			.get_public_key()
			.await
			.map_err(|e| e.with_wallet(self.id()).with_operation("get_public_key"))?;
		if !public_key.is_empty() {
			self.caches.public_key.set(&key, public_key.clone(), None);
		}
		Ok(public_key)
	}

	/// Balance of the current account, cached per address. Capability-gated.
	pub async fn get_balance(&self) -> Result<Balance, WalletError> {
		self.require_connected("get_balance")?;
		let Some(address) = self.current_address() else {
			return Err(WalletError::disconnected(self.id()).with_operation("get_balance"));
		};
		self.probe_balance(&address).await
	}

	/// Capability-gated balance read for an explicit address, without the
	/// connected gate.
	pub(crate) async fn probe_balance(&self, address: &str) -> Result<Balance, WalletError> {
		if !self.provider.capabilities().contains(Capability::Balance) {
			return Err(WalletError::unsupported(self.id(), "get_balance"));
		}
		let key = cache_key::balance(self.id(), address);
		if let Some(balance) = self.caches.balance.get(&key) {
			return Ok(balance);
		}
		let balance = self
			.provider
			.get_balance()
			.await
			.map_err(|e| e.with_wallet(self.id()).with_operation("get_balance"))?;
		self.caches.balance.set(&key, balance, None);
		Ok(balance)
	}

	pub async fn sign_message(&self, message: &str) -> Result<String, WalletError> {
		self.require_connected("sign_message")?;
		self.provider
			.sign_message(message)
			.await
			.map_err(|e| e.with_wallet(self.id()).with_operation("sign_message"))
	}

	/// Scheme-aware signing; falls back to [`Self::sign_message`] when the
	/// provider lacks advanced signing.
	pub async fn sign_message_advanced(
		&self,
		message: &str,
		kind: SignatureKind,
	) -> Result<String, WalletError> {
		self.require_connected("sign_message_advanced")?;
		if self
			.provider
			.capabilities()
			.contains(Capability::AdvancedSigning)
		{
			self.provider
				.sign_message_advanced(message, kind)
				.await
				.map_err(|e| {
					e.with_wallet(self.id())
						.with_operation("sign_message_advanced")
				})
		} else {
			self.provider
				.sign_message(message)
				.await
				.map_err(|e| e.with_wallet(self.id()).with_operation("sign_message"))
		}
	}

	pub async fn sign_psbt(&self, psbt_hex: &str) -> Result<String, WalletError> {
		self.require_connected("sign_psbt")?;
		self.provider
			.sign_psbt(psbt_hex)
			.await
			.map_err(|e| e.with_wallet(self.id()).with_operation("sign_psbt"))
	}

	pub async fn sign_psbts(&self, psbt_hexes: &[String]) -> Result<Vec<String>, WalletError> {
		self.require_connected("sign_psbts")?;
		self.provider
			.sign_psbts(psbt_hexes)
			.await
			.map_err(|e| e.with_wallet(self.id()).with_operation("sign_psbts"))
	}

	pub async fn send_bitcoin(
		&self,
		to_address: &str,
		amount_sats: u64,
	) -> Result<String, WalletError> {
		self.require_connected("send_bitcoin")?;
		if amount_sats == 0 {
			return Err(WalletError::transaction_failed("amount must be positive")
				.with_wallet(self.id())
				.with_operation("send_bitcoin"));
		}
		self.provider
			.send_bitcoin(to_address, amount_sats)
			.await
			.map_err(|e| e.with_wallet(self.id()).with_operation("send_bitcoin"))
	}

	/// Options-aware send; falls back to [`Self::send_bitcoin`] when the
	/// provider lacks advanced signing.
	pub async fn send_bitcoin_advanced(
		&self,
		to_address: &str,
		amount_sats: u64,
		options: &SendOptions,
	) -> Result<String, WalletError> {
		self.require_connected("send_bitcoin_advanced")?;
		if amount_sats == 0 {
			return Err(WalletError::transaction_failed("amount must be positive")
				.with_wallet(self.id())
				.with_operation("send_bitcoin_advanced"));
		}
		if self
			.provider
			.capabilities()
			.contains(Capability::AdvancedSigning)
		{
			self.provider
				.send_bitcoin_advanced(to_address, amount_sats, options)
				.await
				.map_err(|e| {
					e.with_wallet(self.id())
						.with_operation("send_bitcoin_advanced")
				})
		} else {
			self.provider
				.send_bitcoin(to_address, amount_sats)
				.await
				.map_err(|e| e.with_wallet(self.id()).with_operation("send_bitcoin"))
		}
	}

	/// Inscription transfer. Capability-gated, no fallback.
	pub async fn send_inscription(
		&self,
		to_address: &str,
		inscription_id: &str,
		options: &SendOptions,
	) -> Result<String, WalletError> {
		self.require_connected("send_inscription")?;
		if !self
			.provider
			.capabilities()
			.contains(Capability::InscriptionTransfer)
		{
			return Err(WalletError::unsupported(self.id(), "send_inscription"));
		}
		self.provider
			.send_inscription(to_address, inscription_id, options)
			.await
			.map_err(|e| e.with_wallet(self.id()).with_operation("send_inscription"))
	}

	/// Raw transaction broadcast. Capability-gated, no fallback.
	pub async fn push_tx(&self, raw_tx: &str) -> Result<String, WalletError> {
		self.require_connected("push_tx")?;
		if !self.provider.capabilities().contains(Capability::RawPush) {
			return Err(WalletError::unsupported(self.id(), "push_tx"));
		}
		self.provider
			.push_tx(raw_tx)
			.await
			.map_err(|e| e.with_wallet(self.id()).with_operation("push_tx"))
	}

	/// Finalized PSBT broadcast. Capability-gated, no fallback.
	pub async fn push_psbt(&self, psbt_hex: &str) -> Result<String, WalletError> {
		self.require_connected("push_psbt")?;
		if !self.provider.capabilities().contains(Capability::RawPush) {
			return Err(WalletError::unsupported(self.id(), "push_psbt"));
		}
		self.provider
			.push_psbt(psbt_hex)
			.await
			.map_err(|e| e.with_wallet(self.id()).with_operation("push_psbt"))
	}

	/// Mirror a provider-reported account change into this adapter's state
	/// and re-emit it as an adapter event.
	///
	/// Called even while the adapter is not the active one, so its next
	/// activation reflects reality; the manager relay decides whether the
	/// event is visible externally.
	pub fn notify_accounts_changed(&self, addresses: Vec<String>) {
		self.invalidate_account_caches();
		let accounts: Vec<AccountInfo> = addresses.into_iter().map(AccountInfo::new).collect();
		{
			let mut state = self.state.lock().unwrap();
			state.accounts = accounts.clone();
			state.current_account = accounts.first().cloned();
		}
		debug!(wallet = %self.id(), accounts = accounts.len(), "provider reported account change");
		self.events.emit(&EventPayload::AccountChange {
			wallet_id: self.id().to_string(),
			accounts,
		});
	}

	/// Mirror a provider-reported network change into this adapter's state
	/// and re-emit it as an adapter event.
	pub fn notify_network_changed(&self, network: Network) {
		self.caches.network.delete(&cache_key::network(self.id()));
		self.caches.accounts.clear();
		self.state.lock().unwrap().network = Some(network);
		debug!(wallet = %self.id(), network = %network, "provider reported network change");
		self.events.emit(&EventPayload::NetworkChange {
			wallet_id: self.id().to_string(),
			network,
		});
	}

	/// Synthesize a connected state from a silent probe, bypassing the
	/// interactive handshake. Silent-resume primitive; the caller must have
	/// verified the accounts are non-empty.
	pub(crate) fn adopt_connected(&self, accounts: Vec<AccountInfo>, network: Option<Network>) {
		let mut state = self.state.lock().unwrap();
		state.status = ConnectionStatus::Connected;
		state.current_account = accounts.first().cloned();
		state.accounts = accounts;
		if network.is_some() {
			state.network = network;
		}
		state.error = None;
	}

	/// Release listeners and reset state. Idempotent.
	pub fn destroy(&self) {
		if self.destroyed.swap(true, Ordering::SeqCst) {
			return;
		}
		self.invalidate_account_caches();
		self.caches.network.delete(&cache_key::network(self.id()));
		self.events.remove_all(None);
		*self.state.lock().unwrap() = WalletState::disconnected();
		debug!(wallet = %self.id(), "adapter destroyed");
	}

	pub fn is_destroyed(&self) -> bool {
		self.destroyed.load(Ordering::SeqCst)
	}

	fn known_network(&self) -> Option<Network> {
		self.state.lock().unwrap().network
	}

	fn current_address(&self) -> Option<String> {
		self.state
			.lock()
			.unwrap()
			.current_account
			.as_ref()
			.map(|account| account.address.clone())
	}

	fn require_connected(&self, operation: &str) -> Result<(), WalletError> {
		if self.is_connected() {
			Ok(())
		} else {
			Err(WalletError::disconnected(self.id()).with_operation(operation))
		}
	}

	/// Record an error state and emit an error event; returns the error for
	/// propagation so callers see the same information both ways.
	fn record_failure(&self, err: WalletError) -> WalletError {
		{
			let mut state = self.state.lock().unwrap();
			state.status = ConnectionStatus::Error;
			state.error = Some(err.clone());
		}
		self.events.emit(&EventPayload::Error {
			wallet_id: self.id().to_string(),
			error: err.clone(),
		});
		err
	}

	fn invalidate_account_caches(&self) {
		if let Some(address) = self.current_address() {
			self.caches
				.balance
				.delete(&cache_key::balance(self.id(), &address));
		}
		self.caches
			.public_key
			.delete(&cache_key::public_key(self.id()));
		self.caches.accounts.clear();
	}
}
