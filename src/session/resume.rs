//! Silent session resume and the top-level connect facade.
//!
//! [`BtcWalletConnect`] ties the manager, an optional connection policy and
//! a [`LastWalletStore`] together: explicit connects persist the wallet id
//! after the full policy succeeds, explicit disconnects clear it, and
//! [`BtcWalletConnect::try_resume`] replays the remembered wallet silently
//! on startup. Resume never surfaces an error; every failure path collapses
//! to `None` so application startup cannot be broken by a wallet.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::WalletError;
use crate::types::AccountInfo;
use crate::utils::race_timeout;

use super::manager::WalletManager;
use super::policy::{ConnectionPolicy, PolicyEngine, PolicyMode};

/// Storage key under which the last connected wallet id is persisted.
pub const LAST_WALLET_KEY: &str = "btc-connect:last-wallet-id";

/// Default deadline for the whole silent resume probe.
pub const DEFAULT_RESUME_TIMEOUT: Duration = Duration::from_secs(3);

/// Persistence seam for the last connected wallet id.
///
/// Implementations are keyed storage adapters (browser local storage, a
/// config file, a keychain); they store under [`LAST_WALLET_KEY`]. Failures
/// should be swallowed internally where possible, resume treats a `None`
/// load as "nothing to resume".
pub trait LastWalletStore: Send + Sync {
	fn load(&self) -> Option<String>;
	fn store(&self, wallet_id: &str);
	fn clear(&self);
}

/// In-process store, the default. Useful for tests and non-persistent hosts.
#[derive(Default)]
pub struct MemoryLastWalletStore {
	value: Mutex<Option<String>>,
}

impl MemoryLastWalletStore {
	pub fn new() -> Self {
		Self::default()
	}
}

impl LastWalletStore for MemoryLastWalletStore {
	fn load(&self) -> Option<String> {
		self.value.lock().unwrap().clone()
	}

	fn store(&self, wallet_id: &str) {
		*self.value.lock().unwrap() = Some(wallet_id.to_string());
	}

	fn clear(&self) {
		*self.value.lock().unwrap() = None;
	}
}

/// Top-level facade: manager plus policy plus last-wallet persistence.
pub struct BtcWalletConnect {
	manager: WalletManager,
	policy: Option<ConnectionPolicy>,
	store: Arc<dyn LastWalletStore>,
	resume_timeout: Duration,
}

impl BtcWalletConnect {
	pub fn new(manager: WalletManager) -> Self {
		Self {
			manager,
			policy: None,
			store: Arc::new(MemoryLastWalletStore::new()),
			resume_timeout: DEFAULT_RESUME_TIMEOUT,
		}
	}

	pub fn with_policy(mut self, policy: ConnectionPolicy) -> Self {
		self.policy = Some(policy);
		self
	}

	pub fn with_store(mut self, store: Arc<dyn LastWalletStore>) -> Self {
		self.store = store;
		self
	}

	pub fn with_resume_timeout(mut self, timeout: Duration) -> Self {
		self.resume_timeout = timeout;
		self
	}

	pub fn manager(&self) -> &WalletManager {
		&self.manager
	}

	pub fn state(&self) -> crate::types::WalletState {
		self.manager.get_state()
	}

	/// Explicit, user-initiated connect.
	///
	/// Runs the connection policy after the handshake; the wallet id is
	/// persisted only once the whole sequence has succeeded, so a rolled
	/// back session is never resumed on the next startup.
	pub async fn connect(&self, wallet_id: &str) -> Result<Vec<AccountInfo>, WalletError> {
		let accounts = self.manager.connect(wallet_id).await?;
		if let Some(policy) = &self.policy {
			PolicyEngine::run(&self.manager, policy, PolicyMode::Explicit).await?;
		}
		self.store.store(wallet_id);
		Ok(accounts)
	}

	/// Explicit disconnect; forgets the remembered wallet.
	pub async fn disconnect(&self) {
		self.manager.disconnect().await;
		self.store.clear();
	}

	pub async fn switch_wallet(&self, wallet_id: &str) -> Result<Vec<AccountInfo>, WalletError> {
		self.connect(wallet_id).await
	}

	/// Attempt to resume the remembered wallet silently.
	///
	/// Returns the resumed accounts, or `None` when there is nothing to
	/// resume or any step fails: no remembered id, probe timeout, missing
	/// authorization, or a failed auto-connect policy run (which also rolls
	/// the session back). Errors are logged, never propagated.
	pub async fn try_resume(&self) -> Option<Vec<AccountInfo>> {
		let wallet_id = self.store.load()?;
		debug!(wallet = %wallet_id, "attempting silent resume");

		let emit_events = self
			.policy
			.as_ref()
			.map(|policy| policy.emit_events_on_auto_connect)
			.unwrap_or(true);

		// Only the read-only probe races the deadline; a timeout drops a
		// future that has not touched any session state yet.
		let probe = self.manager.probe_resume(&wallet_id);
		let probe = match race_timeout(probe, self.resume_timeout, "silent resume").await {
			Ok(Some(probe)) => probe,
			Ok(None) => {
				debug!(wallet = %wallet_id, "silent resume found no authorization");
				return None;
			}
			Err(err) => {
				warn!(wallet = %wallet_id, "silent resume timed out: {err}");
				return None;
			}
		};
		let accounts = self.manager.commit_resume(&wallet_id, probe, emit_events)?;

		if let Some(policy) = &self.policy {
			if let Err(err) =
				PolicyEngine::run(&self.manager, policy, PolicyMode::AutoConnect).await
			{
				warn!(wallet = %wallet_id, "auto-connect policy failed, session rolled back: {err}");
				return None;
			}
		}

		self.store.store(&wallet_id);
		info!(wallet = %wallet_id, "silent resume succeeded");
		Some(accounts)
	}
}
