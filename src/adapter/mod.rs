//! Wallet adapters.
//!
//! The [`ProviderHandle`] trait is the seam between this crate and each
//! provider-specific wallet API; [`WalletAdapter`] is the uniform state
//! machine built on top of one handle.

pub mod base;
pub mod provider;

pub use base::WalletAdapter;
pub use provider::{Capability, CapabilitySet, ProviderHandle, SendOptions};
