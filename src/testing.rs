//! Test doubles shared across unit tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::adapter::{CapabilitySet, ProviderHandle, SendOptions};
use crate::error::WalletError;
use crate::types::{Balance, Network, SignatureKind};

/// Route tracing output through the test harness, filtered by `RUST_LOG`.
pub fn init_tracing() {
	static INIT: std::sync::Once = std::sync::Once::new();
	INIT.call_once(|| {
		let _ = tracing_subscriber::fmt()
			.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
			.with_test_writer()
			.try_init();
	});
}

/// Scriptable in-memory provider.
///
/// Every provider round-trip is appended to the call log as
/// `"<label>:<operation>"`; sharing one log between providers lets tests
/// assert cross-wallet ordering.
pub struct MockProvider {
	label: String,
	accounts: Mutex<Vec<String>>,
	network: Mutex<Network>,
	balance: Balance,
	public_key: String,
	capabilities: CapabilitySet,
	available: bool,
	fail_connect: bool,
	fail_disconnect: bool,
	fail_accounts: bool,
	fail_balance: bool,
	delay: Option<Duration>,
	network_delay: Option<Duration>,
	calls: Arc<Mutex<Vec<String>>>,
}

impl MockProvider {
	pub fn new(label: &str) -> Self {
		Self {
			label: label.to_string(),
			accounts: Mutex::new(Vec::new()),
			network: Mutex::new(Network::Mainnet),
			balance: Balance::default(),
			public_key: "02deadbeef".to_string(),
			capabilities: CapabilitySet::new(),
			available: true,
			fail_connect: false,
			fail_disconnect: false,
			fail_accounts: false,
			fail_balance: false,
			delay: None,
			network_delay: None,
			calls: Arc::new(Mutex::new(Vec::new())),
		}
	}

	pub fn label(&self) -> &str {
		&self.label
	}

	pub fn with_accounts<'a>(self, addresses: impl IntoIterator<Item = &'a str>) -> Self {
		*self.accounts.lock().unwrap() = addresses.into_iter().map(String::from).collect();
		self
	}

	pub fn with_network(self, network: Network) -> Self {
		*self.network.lock().unwrap() = network;
		self
	}

	pub fn with_balance(mut self, balance: Balance) -> Self {
		self.balance = balance;
		self
	}

	pub fn with_public_key(mut self, public_key: &str) -> Self {
		self.public_key = public_key.to_string();
		self
	}

	pub fn with_capabilities(mut self, capabilities: CapabilitySet) -> Self {
		self.capabilities = capabilities;
		self
	}

	pub fn unavailable(mut self) -> Self {
		self.available = false;
		self
	}

	pub fn failing_connect(mut self) -> Self {
		self.fail_connect = true;
		self
	}

	pub fn failing_disconnect(mut self) -> Self {
		self.fail_disconnect = true;
		self
	}

	pub fn failing_accounts(mut self) -> Self {
		self.fail_accounts = true;
		self
	}

	pub fn failing_balance(mut self) -> Self {
		self.fail_balance = true;
		self
	}

	/// Sleep before every async operation.
	pub fn with_delay(mut self, delay: Duration) -> Self {
		self.delay = Some(delay);
		self
	}

	/// Sleep before answering network queries only.
	pub fn with_network_delay(mut self, delay: Duration) -> Self {
		self.network_delay = Some(delay);
		self
	}

	pub fn with_call_log(mut self, calls: Arc<Mutex<Vec<String>>>) -> Self {
		self.calls = calls;
		self
	}

	pub fn calls(&self) -> Arc<Mutex<Vec<String>>> {
		self.calls.clone()
	}

	async fn trace(&self, operation: &str) {
		self.calls
			.lock()
			.unwrap()
			.push(format!("{}:{}", self.label, operation));
		if let Some(delay) = self.delay {
			tokio::time::sleep(delay).await;
		}
	}
}

#[async_trait]
impl ProviderHandle for MockProvider {
	fn is_available(&self) -> bool {
		self.available
	}

	fn capabilities(&self) -> CapabilitySet {
		self.capabilities.clone()
	}

	async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
		self.trace("request_accounts").await;
		if self.fail_connect {
			return Err(WalletError::connection_failed(
				&self.label,
				"user rejected the request",
			));
		}
		Ok(self.accounts.lock().unwrap().clone())
	}

	async fn get_accounts(&self) -> Result<Vec<String>, WalletError> {
		self.trace("get_accounts").await;
		if self.fail_accounts {
			return Err(WalletError::network_failed("provider unreachable"));
		}
		Ok(self.accounts.lock().unwrap().clone())
	}

	async fn disconnect(&self) -> Result<(), WalletError> {
		self.trace("disconnect").await;
		if self.fail_disconnect {
			return Err(WalletError::network_failed("provider teardown failed"));
		}
		Ok(())
	}

	async fn get_network(&self) -> Result<Network, WalletError> {
		self.trace("get_network").await;
		if let Some(delay) = self.network_delay {
			tokio::time::sleep(delay).await;
		}
		Ok(*self.network.lock().unwrap())
	}

	async fn switch_network(&self, network: Network) -> Result<(), WalletError> {
		self.trace("switch_network").await;
		*self.network.lock().unwrap() = network;
		Ok(())
	}

	async fn sign_message(&self, message: &str) -> Result<String, WalletError> {
		self.trace("sign_message").await;
		Ok(format!("signed:{message}"))
	}

	async fn sign_psbt(&self, psbt_hex: &str) -> Result<String, WalletError> {
		self.trace("sign_psbt").await;
		Ok(format!("signed-psbt:{psbt_hex}"))
	}

	async fn send_bitcoin(
		&self,
		to_address: &str,
		amount_sats: u64,
	) -> Result<String, WalletError> {
		self.trace("send_bitcoin").await;
		Ok(format!("txid:{to_address}:{amount_sats}"))
	}

	async fn get_public_key(&self) -> Result<String, WalletError> {
		self.trace("get_public_key").await;
		Ok(self.public_key.clone())
	}

	async fn get_balance(&self) -> Result<Balance, WalletError> {
		self.trace("get_balance").await;
		if self.fail_balance {
			return Err(WalletError::network_failed("balance backend unreachable"));
		}
		Ok(self.balance)
	}

	async fn sign_message_advanced(
		&self,
		message: &str,
		kind: SignatureKind,
	) -> Result<String, WalletError> {
		self.trace("sign_message_advanced").await;
		Ok(format!("signed:{kind:?}:{message}"))
	}

	async fn send_bitcoin_advanced(
		&self,
		to_address: &str,
		amount_sats: u64,
		_options: &SendOptions,
	) -> Result<String, WalletError> {
		self.trace("send_bitcoin_advanced").await;
		Ok(format!("txid:{to_address}:{amount_sats}"))
	}

	async fn send_inscription(
		&self,
		to_address: &str,
		inscription_id: &str,
		_options: &SendOptions,
	) -> Result<String, WalletError> {
		self.trace("send_inscription").await;
		Ok(format!("txid:{to_address}:{inscription_id}"))
	}

	async fn push_tx(&self, raw_tx: &str) -> Result<String, WalletError> {
		self.trace("push_tx").await;
		Ok(format!("txid:{raw_tx}"))
	}

	async fn push_psbt(&self, psbt_hex: &str) -> Result<String, WalletError> {
		self.trace("push_psbt").await;
		Ok(format!("txid:{psbt_hex}"))
	}
}
