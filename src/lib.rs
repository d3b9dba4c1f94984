//! Session management for browser Bitcoin wallets.
//!
//! Providers are injected behind the [`adapter::ProviderHandle`] trait and
//! wrapped in per-wallet [`adapter::WalletAdapter`] state machines. The
//! [`session::WalletManager`] coordinates them under a single active session,
//! relaying events from the active adapter only. On top of that sit the
//! connection policy engine for post-connect tasks and the
//! [`session::BtcWalletConnect`] facade with silent startup resume.

pub mod adapter;
pub mod cache;
pub mod error;
pub mod events;
pub mod session;
pub mod types;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use adapter::{Capability, CapabilitySet, ProviderHandle, SendOptions, WalletAdapter};
pub use cache::{CacheOptions, CacheRegistry, CacheStats, MemoryCache};
pub use error::{ErrorContext, ErrorKind, ErrorSeverity, WalletError};
pub use events::{EventBus, EventPayload, ListenerId, WalletEvent, DEFAULT_MAX_LISTENERS};
pub use session::{
	AutoBehavior, BestEffort, BtcWalletConnect, ConnectionPolicy, LastWalletStore, ManagerConfig,
	MemoryLastWalletStore, PolicyEngine, PolicyMode, PolicyReport, PolicyTask, ResumeEnrichment,
	ResumeProbe, TaskOutcome, TaskResult, TaskStatus, WalletManager, DEFAULT_RESUME_TIMEOUT,
	LAST_WALLET_KEY,
};
pub use types::{
	AccountInfo, Balance, ConnectionStatus, Network, SignatureKind, WalletInfo, WalletState,
};
