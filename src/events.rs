//! Event bus for adapter and manager notifications.
//!
//! A small registration-ordered publish/subscribe primitive. Handlers are
//! fault-isolated: a failing handler is logged and never prevents later
//! handlers in the same emission from running. Emission iterates over a
//! defensive copy of the listener list, so a handler removing itself or
//! another handler mid-emission neither skips nor duplicates calls.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tracing::{error, warn};

use crate::error::WalletError;
use crate::types::{AccountInfo, Network};

/// Default listener threshold before a one-time leak warning is logged.
pub const DEFAULT_MAX_LISTENERS: usize = 100;

/// Events an adapter (and the manager, by relay) can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalletEvent {
	Connect,
	Disconnect,
	AccountChange,
	NetworkChange,
	Error,
}

impl WalletEvent {
	/// Every event kind, in relay subscription order.
	pub const ALL: [WalletEvent; 5] = [
		WalletEvent::Connect,
		WalletEvent::Disconnect,
		WalletEvent::AccountChange,
		WalletEvent::NetworkChange,
		WalletEvent::Error,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			WalletEvent::Connect => "connect",
			WalletEvent::Disconnect => "disconnect",
			WalletEvent::AccountChange => "account-change",
			WalletEvent::NetworkChange => "network-change",
			WalletEvent::Error => "error",
		}
	}
}

impl std::fmt::Display for WalletEvent {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Payload delivered to listeners, tagged with the emitting wallet id.
#[derive(Debug, Clone)]
pub enum EventPayload {
	Connect {
		wallet_id: String,
		accounts: Vec<AccountInfo>,
	},
	Disconnect {
		wallet_id: String,
	},
	AccountChange {
		wallet_id: String,
		accounts: Vec<AccountInfo>,
	},
	NetworkChange {
		wallet_id: String,
		network: Network,
	},
	Error {
		wallet_id: String,
		error: WalletError,
	},
}

impl EventPayload {
	/// The event kind this payload belongs to.
	pub fn event(&self) -> WalletEvent {
		match self {
			EventPayload::Connect { .. } => WalletEvent::Connect,
			EventPayload::Disconnect { .. } => WalletEvent::Disconnect,
			EventPayload::AccountChange { .. } => WalletEvent::AccountChange,
			EventPayload::NetworkChange { .. } => WalletEvent::NetworkChange,
			EventPayload::Error { .. } => WalletEvent::Error,
		}
	}

	pub fn wallet_id(&self) -> &str {
		match self {
			EventPayload::Connect { wallet_id, .. }
			| EventPayload::Disconnect { wallet_id }
			| EventPayload::AccountChange { wallet_id, .. }
			| EventPayload::NetworkChange { wallet_id, .. }
			| EventPayload::Error { wallet_id, .. } => wallet_id,
		}
	}
}

/// Handle returned by `on`/`once`, used to remove the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Handler = Arc<dyn Fn(&EventPayload) -> Result<(), WalletError> + Send + Sync>;

#[derive(Clone)]
struct Listener {
	id: ListenerId,
	handler: Handler,
	once: bool,
}

struct BusInner {
	listeners: HashMap<WalletEvent, Vec<Listener>>,
	next_id: u64,
	max_listeners: usize,
	warned: HashSet<WalletEvent>,
}

/// Registration-ordered listener registry with once-semantics and leak warnings.
pub struct EventBus {
	inner: Mutex<BusInner>,
}

impl EventBus {
	pub fn new() -> Self {
		Self::with_max_listeners(DEFAULT_MAX_LISTENERS)
	}

	pub fn with_max_listeners(max_listeners: usize) -> Self {
		Self {
			inner: Mutex::new(BusInner {
				listeners: HashMap::new(),
				next_id: 0,
				max_listeners,
				warned: HashSet::new(),
			}),
		}
	}

	/// Register a listener; it stays registered until removed.
	pub fn on<F>(&self, event: WalletEvent, handler: F) -> ListenerId
	where
		F: Fn(&EventPayload) -> Result<(), WalletError> + Send + Sync + 'static,
	{
		self.add_listener(event, Arc::new(handler), false)
	}

	/// Register a listener that fires at most once.
	pub fn once<F>(&self, event: WalletEvent, handler: F) -> ListenerId
	where
		F: Fn(&EventPayload) -> Result<(), WalletError> + Send + Sync + 'static,
	{
		self.add_listener(event, Arc::new(handler), true)
	}

	/// Remove a previously registered listener. Returns whether it was found.
	pub fn off(&self, event: WalletEvent, id: ListenerId) -> bool {
		let mut inner = self.inner.lock().unwrap();
		let Some(listeners) = inner.listeners.get_mut(&event) else {
			return false;
		};
		let before = listeners.len();
		listeners.retain(|listener| listener.id != id);
		let removed = listeners.len() != before;
		if listeners.is_empty() {
			inner.listeners.remove(&event);
		}
		removed
	}

	/// Remove all listeners for one event, or for every event.
	pub fn remove_all(&self, event: Option<WalletEvent>) {
		let mut inner = self.inner.lock().unwrap();
		match event {
			Some(event) => {
				inner.listeners.remove(&event);
			}
			None => inner.listeners.clear(),
		}
	}

	/// Deliver a payload to every listener registered for its event kind.
	///
	/// Once-listeners are unregistered before their handler runs, so they fire
	/// exactly once even if a handler re-emits. Returns whether at least one
	/// listener existed.
	pub fn emit(&self, payload: &EventPayload) -> bool {
		let event = payload.event();
		let snapshot: Vec<Listener> = {
			let mut inner = self.inner.lock().unwrap();
			let Some(listeners) = inner.listeners.get_mut(&event) else {
				return false;
			};
			if listeners.is_empty() {
				return false;
			}
			let snapshot = listeners.clone();
			listeners.retain(|listener| !listener.once);
			if listeners.is_empty() {
				inner.listeners.remove(&event);
			}
			snapshot
		};

		for listener in &snapshot {
			if let Err(e) = (listener.handler)(payload) {
				error!(event = %event, "event listener failed: {e}");
			}
		}
		true
	}

	/// Number of listeners currently registered for an event.
	pub fn listener_count(&self, event: WalletEvent) -> usize {
		self.inner
			.lock()
			.unwrap()
			.listeners
			.get(&event)
			.map(|listeners| listeners.len())
			.unwrap_or(0)
	}

	/// Events that currently have at least one listener.
	pub fn event_names(&self) -> Vec<WalletEvent> {
		self.inner.lock().unwrap().listeners.keys().copied().collect()
	}

	pub fn set_max_listeners(&self, max_listeners: usize) {
		self.inner.lock().unwrap().max_listeners = max_listeners;
	}

	fn add_listener(&self, event: WalletEvent, handler: Handler, once: bool) -> ListenerId {
		let mut inner = self.inner.lock().unwrap();
		let id = ListenerId(inner.next_id);
		inner.next_id += 1;

		let count = inner.listeners.get(&event).map(Vec::len).unwrap_or(0);
		if count >= inner.max_listeners && inner.warned.insert(event) {
			warn!(
				event = %event,
				listeners = count + 1,
				"possible listener leak: max listener threshold exceeded"
			);
		}

		inner
			.listeners
			.entry(event)
			.or_default()
			.push(Listener { id, handler, once });
		id
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};

	fn disconnect_payload() -> EventPayload {
		EventPayload::Disconnect {
			wallet_id: "w1".to_string(),
		}
	}

	#[test]
	fn on_then_off_leaves_no_listeners() {
		let bus = EventBus::new();
		let calls = Arc::new(AtomicUsize::new(0));
		let calls_in = calls.clone();
		let id = bus.on(WalletEvent::Disconnect, move |_| {
			calls_in.fetch_add(1, Ordering::SeqCst);
			Ok(())
		});

		assert!(bus.off(WalletEvent::Disconnect, id));
		assert_eq!(bus.listener_count(WalletEvent::Disconnect), 0);
		assert!(!bus.emit(&disconnect_payload()));
		assert_eq!(calls.load(Ordering::SeqCst), 0);
	}

	#[test]
	fn once_fires_exactly_once() {
		let bus = EventBus::new();
		let calls = Arc::new(AtomicUsize::new(0));
		let calls_in = calls.clone();
		bus.once(WalletEvent::Disconnect, move |_| {
			calls_in.fetch_add(1, Ordering::SeqCst);
			Ok(())
		});

		assert!(bus.emit(&disconnect_payload()));
		assert!(!bus.emit(&disconnect_payload()));
		assert!(!bus.emit(&disconnect_payload()));
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn emit_reports_whether_listeners_existed() {
		let bus = EventBus::new();
		assert!(!bus.emit(&disconnect_payload()));
		bus.on(WalletEvent::Disconnect, |_| Ok(()));
		assert!(bus.emit(&disconnect_payload()));
	}

	#[test]
	fn failing_listener_does_not_block_later_listeners() {
		let bus = EventBus::new();
		let calls = Arc::new(AtomicUsize::new(0));
		bus.on(WalletEvent::Disconnect, |_| {
			Err(WalletError::network_failed("listener blew up"))
		});
		let calls_in = calls.clone();
		bus.on(WalletEvent::Disconnect, move |_| {
			calls_in.fetch_add(1, Ordering::SeqCst);
			Ok(())
		});

		bus.emit(&disconnect_payload());
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn removal_during_emission_neither_skips_nor_duplicates() {
		let bus = Arc::new(EventBus::new());
		let calls = Arc::new(Mutex::new(Vec::new()));

		// The first listener removes itself mid-emission; the emission still
		// delivers to every listener of the defensive copy exactly once.
		let self_id = Arc::new(Mutex::new(None::<ListenerId>));
		let self_id_in = self_id.clone();
		let bus_in = bus.clone();
		let calls_a = calls.clone();
		let id = bus.on(WalletEvent::Disconnect, move |_| {
			calls_a.lock().unwrap().push("a");
			if let Some(id) = *self_id_in.lock().unwrap() {
				bus_in.off(WalletEvent::Disconnect, id);
			}
			Ok(())
		});
		*self_id.lock().unwrap() = Some(id);
		let calls_b = calls.clone();
		bus.on(WalletEvent::Disconnect, move |_| {
			calls_b.lock().unwrap().push("b");
			Ok(())
		});

		bus.emit(&disconnect_payload());
		assert_eq!(*calls.lock().unwrap(), vec!["a", "b"]);
		assert_eq!(bus.listener_count(WalletEvent::Disconnect), 1);

		bus.emit(&disconnect_payload());
		assert_eq!(*calls.lock().unwrap(), vec!["a", "b", "b"]);
	}

	#[test]
	fn listeners_run_in_registration_order() {
		let bus = EventBus::new();
		let order = Arc::new(Mutex::new(Vec::new()));
		for tag in ["a", "b", "c"] {
			let order_in = order.clone();
			bus.on(WalletEvent::Disconnect, move |_| {
				order_in.lock().unwrap().push(tag);
				Ok(())
			});
		}
		bus.emit(&disconnect_payload());
		assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
	}

	#[test]
	fn remove_all_clears_listeners() {
		let bus = EventBus::new();
		bus.on(WalletEvent::Connect, |_| Ok(()));
		bus.on(WalletEvent::Disconnect, |_| Ok(()));
		bus.remove_all(Some(WalletEvent::Connect));
		assert_eq!(bus.listener_count(WalletEvent::Connect), 0);
		assert_eq!(bus.listener_count(WalletEvent::Disconnect), 1);
		bus.remove_all(None);
		assert!(bus.event_names().is_empty());
	}

	#[test]
	fn threshold_warning_does_not_break_registration() {
		let bus = EventBus::with_max_listeners(2);
		for _ in 0..5 {
			bus.on(WalletEvent::Error, |_| Ok(()));
		}
		assert_eq!(bus.listener_count(WalletEvent::Error), 5);
	}
}
