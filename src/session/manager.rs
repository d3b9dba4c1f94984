//! Central session coordinator.
//!
//! [`WalletManager`] owns the adapter registry and enforces the single
//! active session invariant: at most one adapter is active at a time, and
//! connecting to a different wallet always tears the previous session down
//! first. The manager relays events from whichever adapter is active onto
//! its own bus; emissions from inactive adapters are dropped at the relay,
//! so consumers subscribed to the manager never observe stale sessions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tracing::{debug, info, warn};

use crate::adapter::{ProviderHandle, WalletAdapter};
use crate::cache::CacheRegistry;
use crate::error::{ErrorKind, WalletError};
use crate::events::{EventBus, EventPayload, ListenerId, WalletEvent};
use crate::types::{AccountInfo, Balance, ConnectionStatus, Network, WalletInfo, WalletState};

/// Outcome of one best-effort enrichment fetch during silent resume.
#[derive(Debug, Clone)]
pub enum BestEffort<T> {
	Fetched(T),
	/// The provider does not implement this capability.
	Skipped,
	Failed(WalletError),
}

impl<T> BestEffort<T> {
	pub fn fetched(&self) -> Option<&T> {
		match self {
			BestEffort::Fetched(value) => Some(value),
			_ => None,
		}
	}
}

/// What silent resume managed to recover beyond the bare account list.
#[derive(Debug, Clone)]
pub struct ResumeEnrichment {
	pub network: BestEffort<Network>,
	pub public_key: BestEffort<String>,
	pub balance: BestEffort<Balance>,
}

/// Everything [`WalletManager::probe_resume`] read from the provider.
///
/// Handed back to [`WalletManager::commit_resume`] once the caller decides
/// the probe finished in time.
#[derive(Debug, Clone)]
pub struct ResumeProbe {
	accounts: Vec<AccountInfo>,
	enrichment: ResumeEnrichment,
}

impl ResumeProbe {
	pub fn accounts(&self) -> &[AccountInfo] {
		&self.accounts
	}

	pub fn enrichment(&self) -> &ResumeEnrichment {
		&self.enrichment
	}
}

/// Host application hooks invoked alongside manager events.
#[derive(Clone, Default)]
pub struct ManagerConfig {
	pub on_state_change: Option<Arc<dyn Fn(&WalletState) + Send + Sync>>,
	pub on_error: Option<Arc<dyn Fn(&WalletError) + Send + Sync>>,
}

impl ManagerConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn on_state_change<F>(mut self, callback: F) -> Self
	where
		F: Fn(&WalletState) + Send + Sync + 'static,
	{
		self.on_state_change = Some(Arc::new(callback));
		self
	}

	pub fn on_error<F>(mut self, callback: F) -> Self
	where
		F: Fn(&WalletError) + Send + Sync + 'static,
	{
		self.on_error = Some(Arc::new(callback));
		self
	}
}

struct ManagerInner {
	config: ManagerConfig,
	caches: CacheRegistry,
	adapters: Mutex<HashMap<String, Arc<WalletAdapter>>>,
	active: Mutex<Option<Arc<WalletAdapter>>>,
	events: EventBus,
	/// While set, external state reads are pinned to `connecting`.
	policy_gate: AtomicBool,
	destroyed: AtomicBool,
}

impl ManagerInner {
	fn active_adapter(&self) -> Option<Arc<WalletAdapter>> {
		self.active.lock().unwrap().clone()
	}

	fn current_state(&self) -> WalletState {
		if self.destroyed.load(Ordering::SeqCst) {
			return WalletState::disconnected();
		}
		if self.policy_gate.load(Ordering::SeqCst) {
			let mut state = WalletState::disconnected();
			state.status = ConnectionStatus::Connecting;
			return state;
		}
		self.active_adapter()
			.map(|adapter| adapter.get_state())
			.unwrap_or_else(WalletState::disconnected)
	}

	fn notify_state(&self) {
		if let Some(callback) = &self.config.on_state_change {
			callback(&self.current_state());
		}
	}

	fn notify_error(&self, error: &WalletError) {
		if let Some(callback) = &self.config.on_error {
			callback(error);
		}
	}
}

/// Adapter registry plus single-session lifecycle. Cheap to clone.
#[derive(Clone)]
pub struct WalletManager {
	inner: Arc<ManagerInner>,
}

impl WalletManager {
	pub fn new(config: ManagerConfig) -> Self {
		Self {
			inner: Arc::new(ManagerInner {
				config,
				caches: CacheRegistry::new(),
				adapters: Mutex::new(HashMap::new()),
				active: Mutex::new(None),
				events: EventBus::new(),
				policy_gate: AtomicBool::new(false),
				destroyed: AtomicBool::new(false),
			}),
		}
	}

	/// Shared cache registry backing every registered adapter.
	pub fn caches(&self) -> &CacheRegistry {
		&self.inner.caches
	}

	/// Register a wallet under its provider handle.
	///
	/// Re-registering an id replaces the previous adapter: the old one is
	/// destroyed exactly once, and loses active status if it held it.
	pub fn register(
		&self,
		info: WalletInfo,
		provider: Box<dyn ProviderHandle>,
	) -> Result<Arc<WalletAdapter>, WalletError> {
		self.ensure_alive()?;
		let adapter = Arc::new(WalletAdapter::new(info, provider, &self.inner.caches)?);
		self.subscribe_relay(&adapter);

		let previous = self
			.inner
			.adapters
			.lock()
			.unwrap()
			.insert(adapter.id().to_string(), adapter.clone());
		if let Some(previous) = previous {
			let mut active = self.inner.active.lock().unwrap();
			if active
				.as_ref()
				.is_some_and(|a| Arc::ptr_eq(a, &previous))
			{
				*active = None;
			}
			drop(active);
			previous.destroy();
			info!(wallet = %adapter.id(), "replaced existing adapter registration");
		} else {
			debug!(wallet = %adapter.id(), "registered adapter");
		}
		Ok(adapter)
	}

	/// Remove a wallet from the registry, disconnecting it first if active.
	pub async fn unregister(&self, wallet_id: &str) -> Result<(), WalletError> {
		self.ensure_alive()?;
		let adapter = self
			.inner
			.adapters
			.lock()
			.unwrap()
			.get(wallet_id)
			.cloned()
			.ok_or_else(|| WalletError::not_found(wallet_id))?;

		let was_active = self
			.inner
			.active
			.lock()
			.unwrap()
			.as_ref()
			.is_some_and(|a| Arc::ptr_eq(a, &adapter));
		if was_active {
			self.disconnect().await;
		}
		adapter.destroy();
		self.inner.adapters.lock().unwrap().remove(wallet_id);
		debug!(wallet = %wallet_id, "unregistered adapter");
		Ok(())
	}

	/// Interactive connect to a registered wallet.
	///
	/// A different active session is torn down before the new handshake
	/// begins. On failure the previous session is already gone and the
	/// manager holds no active adapter; the error is relayed to listeners
	/// and propagated unchanged.
	pub async fn connect(&self, wallet_id: &str) -> Result<Vec<AccountInfo>, WalletError> {
		self.ensure_alive()?;
		let adapter = self
			.get_adapter(wallet_id)
			.ok_or_else(|| WalletError::not_found(wallet_id))?;

		if let Some(active) = self.inner.active_adapter() {
			if active.id() == wallet_id {
				if active.is_connected() {
					return Ok(active.get_state().accounts);
				}
			} else {
				self.disconnect().await;
			}
		}

		match adapter.connect().await {
			Ok(accounts) => {
				*self.inner.active.lock().unwrap() = Some(adapter.clone());
				info!(wallet = %wallet_id, "session established");
				self.inner.events.emit(&EventPayload::Connect {
					wallet_id: wallet_id.to_string(),
					accounts: accounts.clone(),
				});
				self.inner.notify_state();
				Ok(accounts)
			}
			Err(err) => {
				self.inner.events.emit(&EventPayload::Error {
					wallet_id: wallet_id.to_string(),
					error: err.clone(),
				});
				self.inner.notify_error(&err);
				Err(err)
			}
		}
	}

	/// Tear down the active session, if any.
	///
	/// The manager always ends up with no active adapter and a disconnected
	/// state, even when provider teardown fails; the failure is logged and
	/// otherwise swallowed.
	pub async fn disconnect(&self) {
		let adapter = self.inner.active.lock().unwrap().take();
		let Some(adapter) = adapter else {
			return;
		};
		let wallet_id = adapter.id().to_string();
		if let Err(err) = adapter.disconnect().await {
			warn!(wallet = %wallet_id, "teardown failed, dropping session anyway: {err}");
		}
		info!(wallet = %wallet_id, "session ended");
		self.inner.events.emit(&EventPayload::Disconnect { wallet_id });
		self.inner.notify_state();
	}

	/// Disconnect the current wallet and connect another in one step.
	pub async fn switch_wallet(&self, wallet_id: &str) -> Result<Vec<AccountInfo>, WalletError> {
		self.connect(wallet_id).await
	}

	/// Resume a session silently, without the interactive handshake.
	///
	/// Probes the provider's silently readable accounts; any failure or an
	/// empty result yields `None` and leaves the manager untouched. On
	/// success the adapter adopts a connected state, becomes active, and is
	/// enriched best-effort with network, public key and balance.
	pub async fn assume_connected(&self, wallet_id: &str) -> Option<Vec<AccountInfo>> {
		let probe = self.probe_resume(wallet_id).await?;
		self.commit_resume(wallet_id, probe, true)
	}

	/// Read-only half of silent resume: the silent account query plus the
	/// best-effort enrichment fetches.
	///
	/// Touches no manager or adapter session state, so a caller can race it
	/// against a deadline and abandon it without leaving a half-built
	/// session behind. The result is applied by [`Self::commit_resume`].
	pub async fn probe_resume(&self, wallet_id: &str) -> Option<ResumeProbe> {
		if self.inner.destroyed.load(Ordering::SeqCst) {
			return None;
		}
		let adapter = self.get_adapter(wallet_id)?;
		let mut accounts = match adapter.get_accounts().await {
			Ok(accounts) if !accounts.is_empty() => accounts,
			Ok(_) => {
				debug!(wallet = %wallet_id, "no silently readable accounts, not resuming");
				return None;
			}
			Err(err) => {
				debug!(wallet = %wallet_id, "silent account probe failed, not resuming: {err}");
				return None;
			}
		};

		let network = best_effort(adapter.probe_network().await);
		let public_key = best_effort(adapter.probe_public_key().await);
		let balance = best_effort(adapter.probe_balance(&accounts[0].address).await);
		if let Some(first) = accounts.first_mut() {
			first.network = network.fetched().copied();
			first.public_key = public_key.fetched().cloned();
			first.balance = balance.fetched().copied();
		}
		Some(ResumeProbe {
			accounts,
			enrichment: ResumeEnrichment {
				network,
				public_key,
				balance,
			},
		})
	}

	/// Mutating half of silent resume: adopt the probed state on the adapter
	/// and make it the active session. Synchronous, so it either runs to
	/// completion or not at all.
	pub fn commit_resume(
		&self,
		wallet_id: &str,
		probe: ResumeProbe,
		emit_events: bool,
	) -> Option<Vec<AccountInfo>> {
		if self.inner.destroyed.load(Ordering::SeqCst) {
			return None;
		}
		let adapter = self.get_adapter(wallet_id)?;
		if let BestEffort::Failed(err) = &probe.enrichment.network {
			debug!(wallet = %wallet_id, "network enrichment failed: {err}");
		}
		if let BestEffort::Failed(err) = &probe.enrichment.public_key {
			debug!(wallet = %wallet_id, "public key enrichment failed: {err}");
		}
		if let BestEffort::Failed(err) = &probe.enrichment.balance {
			debug!(wallet = %wallet_id, "balance enrichment failed: {err}");
		}

		adapter.adopt_connected(
			probe.accounts.clone(),
			probe.enrichment.network.fetched().copied(),
		);
		*self.inner.active.lock().unwrap() = Some(adapter);
		info!(wallet = %wallet_id, "session resumed silently");
		if emit_events {
			self.inner.events.emit(&EventPayload::Connect {
				wallet_id: wallet_id.to_string(),
				accounts: probe.accounts.clone(),
			});
		}
		self.inner.notify_state();
		Some(probe.accounts)
	}

	/// Manager-level state snapshot.
	///
	/// While a connection policy is running, the state is pinned to
	/// `connecting` so consumers never observe the half-initialized session.
	pub fn get_state(&self) -> WalletState {
		self.inner.current_state()
	}

	pub fn is_connected(&self) -> bool {
		self.get_state().status == ConnectionStatus::Connected
	}

	pub fn current_wallet(&self) -> Option<WalletInfo> {
		self.inner
			.active_adapter()
			.map(|adapter| adapter.info().clone())
	}

	/// Registered wallets whose provider is currently present.
	pub fn available_wallets(&self) -> Vec<WalletInfo> {
		self.inner
			.adapters
			.lock()
			.unwrap()
			.values()
			.filter(|adapter| adapter.is_ready())
			.map(|adapter| adapter.info().clone())
			.collect()
	}

	pub fn registered_wallets(&self) -> Vec<WalletInfo> {
		self.inner
			.adapters
			.lock()
			.unwrap()
			.values()
			.map(|adapter| adapter.info().clone())
			.collect()
	}

	pub fn get_adapter(&self, wallet_id: &str) -> Option<Arc<WalletAdapter>> {
		self.inner.adapters.lock().unwrap().get(wallet_id).cloned()
	}

	pub fn active_adapter(&self) -> Option<Arc<WalletAdapter>> {
		self.inner.active_adapter()
	}

	/// Subscribe to relayed session events.
	pub fn on<F>(&self, event: WalletEvent, handler: F) -> ListenerId
	where
		F: Fn(&EventPayload) -> Result<(), WalletError> + Send + Sync + 'static,
	{
		self.inner.events.on(event, handler)
	}

	pub fn once<F>(&self, event: WalletEvent, handler: F) -> ListenerId
	where
		F: Fn(&EventPayload) -> Result<(), WalletError> + Send + Sync + 'static,
	{
		self.inner.events.once(event, handler)
	}

	pub fn off(&self, event: WalletEvent, id: ListenerId) -> bool {
		self.inner.events.off(event, id)
	}

	pub(crate) fn begin_policy_gate(&self) {
		self.inner.policy_gate.store(true, Ordering::SeqCst);
		self.inner.notify_state();
	}

	pub(crate) fn end_policy_gate(&self) {
		self.inner.policy_gate.store(false, Ordering::SeqCst);
		self.inner.notify_state();
	}

	/// Tear everything down. Later operations fail with a destroyed error.
	pub async fn destroy(&self) {
		if self.inner.destroyed.swap(true, Ordering::SeqCst) {
			return;
		}
		let adapter = self.inner.active.lock().unwrap().take();
		if let Some(adapter) = adapter {
			if let Err(err) = adapter.disconnect().await {
				warn!(wallet = %adapter.id(), "teardown failed during destroy: {err}");
			}
		}
		let adapters: Vec<Arc<WalletAdapter>> =
			self.inner.adapters.lock().unwrap().drain().map(|(_, a)| a).collect();
		for adapter in adapters {
			adapter.destroy();
		}
		self.inner.events.remove_all(None);
		self.inner.caches.clear_all();
		info!("wallet manager destroyed");
	}

	pub fn is_destroyed(&self) -> bool {
		self.inner.destroyed.load(Ordering::SeqCst)
	}

	fn ensure_alive(&self) -> Result<(), WalletError> {
		if self.is_destroyed() {
			Err(WalletError::manager_destroyed())
		} else {
			Ok(())
		}
	}

	/// Forward this adapter's events onto the manager bus, but only while it
	/// is the active one. Inactive adapters keep updating their own state
	/// through these same emissions; the relay just drops them here.
	fn subscribe_relay(&self, adapter: &Arc<WalletAdapter>) {
		for event in WalletEvent::ALL {
			let weak: Weak<ManagerInner> = Arc::downgrade(&self.inner);
			adapter.events().on(event, move |payload| {
				let Some(inner) = weak.upgrade() else {
					return Ok(());
				};
				let is_active = inner
					.active
					.lock()
					.unwrap()
					.as_ref()
					.is_some_and(|active| active.id() == payload.wallet_id());
				if !is_active {
					debug!(
						wallet = %payload.wallet_id(),
						event = %payload.event(),
						"dropping event from inactive adapter"
					);
					return Ok(());
				}
				inner.events.emit(payload);
				match payload {
					EventPayload::AccountChange { .. } | EventPayload::NetworkChange { .. } => {
						inner.notify_state();
					}
					EventPayload::Error { error, .. } => {
						inner.notify_error(error);
					}
					_ => {}
				}
				Ok(())
			});
		}
	}
}

impl Default for WalletManager {
	fn default() -> Self {
		Self::new(ManagerConfig::default())
	}
}

fn best_effort<T>(result: Result<T, WalletError>) -> BestEffort<T> {
	match result {
		Ok(value) => BestEffort::Fetched(value),
		Err(err) if err.kind == ErrorKind::Unsupported => BestEffort::Skipped,
		Err(err) => BestEffort::Failed(err),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::adapter::{Capability, CapabilitySet};
	use crate::testing::MockProvider;
	use std::sync::atomic::AtomicUsize;

	fn manager_with(providers: Vec<MockProvider>) -> WalletManager {
		crate::testing::init_tracing();
		let manager = WalletManager::default();
		for provider in providers {
			let id = provider.label().to_string();
			manager
				.register(
					WalletInfo::new(&id, &format!("Wallet {id}"), &format!("icon://{id}")),
					Box::new(provider),
				)
				.unwrap();
		}
		manager
	}

	#[tokio::test]
	async fn connect_unknown_wallet_leaves_manager_untouched() {
		let manager = manager_with(vec![MockProvider::new("w1").with_accounts(["a1"])]);
		let err = manager.connect("nope").await.unwrap_err();
		assert_eq!(err.kind, ErrorKind::NotFound);
		assert!(manager.current_wallet().is_none());
		assert_eq!(manager.get_state().status, ConnectionStatus::Disconnected);
	}

	#[tokio::test]
	async fn connect_establishes_single_active_session() {
		let manager = manager_with(vec![MockProvider::new("w1").with_accounts(["a1"])]);
		let accounts = manager.connect("w1").await.unwrap();
		assert_eq!(accounts[0].address, "a1");
		assert_eq!(manager.current_wallet().unwrap().id, "w1");
		assert!(manager.is_connected());
	}

	#[tokio::test]
	async fn switching_wallets_tears_old_session_down_first() {
		let log = Arc::new(Mutex::new(Vec::new()));
		let manager = manager_with(vec![
			MockProvider::new("w1").with_accounts(["a1"]).with_call_log(log.clone()),
			MockProvider::new("w2").with_accounts(["a2"]).with_call_log(log.clone()),
		]);

		manager.connect("w1").await.unwrap();
		manager.connect("w2").await.unwrap();

		assert_eq!(manager.current_wallet().unwrap().id, "w2");
		let log = log.lock().unwrap();
		let teardown = log.iter().position(|c| c == "w1:disconnect").unwrap();
		let handshake = log.iter().position(|c| c == "w2:request_accounts").unwrap();
		assert!(teardown < handshake);
	}

	#[tokio::test]
	async fn reconnecting_the_active_wallet_is_a_noop() {
		let provider = MockProvider::new("w1").with_accounts(["a1"]);
		let calls = provider.calls();
		let manager = manager_with(vec![provider]);

		manager.connect("w1").await.unwrap();
		manager.connect("w1").await.unwrap();
		let handshakes = calls
			.lock()
			.unwrap()
			.iter()
			.filter(|c| c.ends_with("request_accounts"))
			.count();
		assert_eq!(handshakes, 1);
	}

	#[tokio::test]
	async fn failed_connect_relays_error_and_keeps_no_session() {
		let errors = Arc::new(AtomicUsize::new(0));
		let errors_in = errors.clone();
		let manager = WalletManager::new(ManagerConfig::new().on_error(move |_| {
			errors_in.fetch_add(1, Ordering::SeqCst);
		}));
		manager
			.register(
				WalletInfo::new("w1", "Wallet w1", "icon://w1"),
				Box::new(MockProvider::new("w1").failing_connect()),
			)
			.unwrap();

		let err = manager.connect("w1").await.unwrap_err();
		assert_eq!(err.kind, ErrorKind::ConnectionFailed);
		assert!(manager.current_wallet().is_none());
		assert_eq!(errors.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn disconnect_resets_even_when_teardown_fails() {
		let manager = manager_with(vec![
			MockProvider::new("w1").with_accounts(["a1"]).failing_disconnect(),
		]);
		manager.connect("w1").await.unwrap();
		manager.disconnect().await;

		assert!(manager.current_wallet().is_none());
		assert_eq!(manager.get_state().status, ConnectionStatus::Disconnected);
	}

	#[tokio::test]
	async fn relay_drops_events_from_inactive_adapters() {
		let manager = manager_with(vec![
			MockProvider::new("w1").with_accounts(["a1"]),
			MockProvider::new("w2").with_accounts(["a2"]),
		]);
		let seen = Arc::new(Mutex::new(Vec::new()));
		let seen_in = seen.clone();
		manager.on(WalletEvent::AccountChange, move |payload| {
			seen_in.lock().unwrap().push(payload.wallet_id().to_string());
			Ok(())
		});

		manager.connect("w1").await.unwrap();
		manager
			.get_adapter("w2")
			.unwrap()
			.notify_accounts_changed(vec!["a2b".to_string()]);
		manager
			.get_adapter("w1")
			.unwrap()
			.notify_accounts_changed(vec!["a1b".to_string()]);

		assert_eq!(*seen.lock().unwrap(), vec!["w1".to_string()]);
		// The inactive adapter still tracked its own change.
		let w2_state = manager.get_adapter("w2").unwrap().get_state();
		assert_eq!(w2_state.accounts[0].address, "a2b");
	}

	#[tokio::test]
	async fn reregistering_destroys_the_old_adapter_once() {
		let manager = manager_with(vec![MockProvider::new("w1").with_accounts(["a1"])]);
		manager.connect("w1").await.unwrap();
		let old = manager.get_adapter("w1").unwrap();

		manager
			.register(
				WalletInfo::new("w1", "Wallet w1", "icon://w1"),
				Box::new(MockProvider::new("w1").with_accounts(["a1b"])),
			)
			.unwrap();

		assert!(old.is_destroyed());
		assert!(manager.current_wallet().is_none());
		let replacement = manager.get_adapter("w1").unwrap();
		assert!(!Arc::ptr_eq(&old, &replacement));
	}

	#[tokio::test]
	async fn unregister_disconnects_active_wallet() {
		let manager = manager_with(vec![MockProvider::new("w1").with_accounts(["a1"])]);
		manager.connect("w1").await.unwrap();
		manager.unregister("w1").await.unwrap();

		assert!(manager.get_adapter("w1").is_none());
		assert!(manager.current_wallet().is_none());
		let err = manager.connect("w1").await.unwrap_err();
		assert_eq!(err.kind, ErrorKind::NotFound);
	}

	#[tokio::test]
	async fn assume_connected_skips_interactive_handshake() {
		let provider = MockProvider::new("w1").with_accounts(["a1"]);
		let calls = provider.calls();
		let manager = manager_with(vec![provider]);

		let accounts = manager.assume_connected("w1").await.unwrap();
		assert_eq!(accounts[0].address, "a1");
		assert_eq!(manager.current_wallet().unwrap().id, "w1");
		assert!(manager.is_connected());
		assert!(
			!calls
				.lock()
				.unwrap()
				.iter()
				.any(|c| c.ends_with("request_accounts"))
		);
	}

	#[tokio::test]
	async fn assume_connected_enriches_best_effort() {
		let provider = MockProvider::new("w1")
			.with_accounts(["a1"])
			.with_network(Network::Testnet)
			.with_capabilities(
				CapabilitySet::new()
					.with(Capability::PublicKey)
					.with(Capability::Balance),
			)
			.with_public_key("02abc")
			.with_balance(Balance {
				confirmed: 500,
				unconfirmed: 0,
				total: 500,
			});
		let manager = manager_with(vec![provider]);

		let accounts = manager.assume_connected("w1").await.unwrap();
		assert_eq!(accounts[0].public_key.as_deref(), Some("02abc"));
		assert_eq!(accounts[0].balance.unwrap().total, 500);
		assert_eq!(manager.get_state().network, Some(Network::Testnet));
	}

	#[tokio::test]
	async fn probe_resume_leaves_the_manager_untouched_until_committed() {
		let manager = manager_with(vec![MockProvider::new("w1").with_accounts(["a1"])]);

		let probe = manager.probe_resume("w1").await.unwrap();
		assert!(manager.current_wallet().is_none());
		assert_eq!(manager.get_state().status, ConnectionStatus::Disconnected);

		let accounts = manager.commit_resume("w1", probe, true).unwrap();
		assert_eq!(accounts[0].address, "a1");
		assert!(manager.is_connected());
	}

	#[tokio::test]
	async fn enrichment_distinguishes_unsupported_from_failures() {
		let provider = MockProvider::new("w1")
			.with_accounts(["a1"])
			.with_capabilities(CapabilitySet::new().with(Capability::Balance))
			.failing_balance();
		let manager = manager_with(vec![provider]);

		let probe = manager.probe_resume("w1").await.unwrap();
		assert!(matches!(probe.enrichment().network, BestEffort::Fetched(_)));
		assert!(matches!(probe.enrichment().public_key, BestEffort::Skipped));
		assert!(matches!(probe.enrichment().balance, BestEffort::Failed(_)));
	}

	#[tokio::test]
	async fn assume_connected_without_authorization_yields_none() {
		let manager = manager_with(vec![MockProvider::new("w1")]);
		assert!(manager.assume_connected("w1").await.is_none());
		assert!(manager.current_wallet().is_none());

		let manager = manager_with(vec![MockProvider::new("w1").failing_accounts()]);
		assert!(manager.assume_connected("w1").await.is_none());
		assert!(manager.current_wallet().is_none());
	}

	#[tokio::test]
	async fn policy_gate_pins_state_to_connecting() {
		let manager = manager_with(vec![MockProvider::new("w1").with_accounts(["a1"])]);
		manager.connect("w1").await.unwrap();

		manager.begin_policy_gate();
		assert_eq!(manager.get_state().status, ConnectionStatus::Connecting);
		assert!(manager.get_state().accounts.is_empty());
		manager.end_policy_gate();
		assert_eq!(manager.get_state().status, ConnectionStatus::Connected);
	}

	#[tokio::test]
	async fn destroy_rejects_further_operations() {
		let manager = manager_with(vec![MockProvider::new("w1").with_accounts(["a1"])]);
		manager.connect("w1").await.unwrap();
		manager.destroy().await;
		manager.destroy().await;

		let err = manager.connect("w1").await.unwrap_err();
		assert_eq!(err.kind, ErrorKind::ManagerDestroyed);
		assert_eq!(manager.get_state().status, ConnectionStatus::Disconnected);
		assert!(manager.assume_connected("w1").await.is_none());
	}
}
