//! Session lifecycle: manager, connection policy and silent resume.

pub mod manager;
pub mod policy;
pub mod resume;

pub use manager::{BestEffort, ManagerConfig, ResumeEnrichment, ResumeProbe, WalletManager};
pub use policy::{
	AutoBehavior, ConnectionPolicy, PolicyEngine, PolicyMode, PolicyReport, PolicyTask,
	TaskOutcome, TaskResult, TaskStatus,
};
pub use resume::{
	BtcWalletConnect, LastWalletStore, MemoryLastWalletStore, DEFAULT_RESUME_TIMEOUT,
	LAST_WALLET_KEY,
};
