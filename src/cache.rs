//! TTL + LRU caches behind a named registry.
//!
//! Adapters use these caches to avoid re-querying a provider on every read
//! (balance, network, accounts, public key). A registry hands out the same
//! cache instance to every caller asking for the same name, so all balance
//! reads across the session share one bounded cache. The registry is an
//! explicit instance passed by reference, not a process-wide singleton, so
//! tests can use isolated registries.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::WalletError;

/// Capacity and default TTL of one named cache.
#[derive(Debug, Clone, Copy)]
pub struct CacheOptions {
	pub ttl: Duration,
	pub max_size: usize,
}

impl Default for CacheOptions {
	fn default() -> Self {
		Self {
			ttl: Duration::from_secs(60),
			max_size: 100,
		}
	}
}

/// Size snapshot of one cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
	pub size: usize,
	pub max_size: usize,
}

struct Entry<T> {
	value: T,
	created_at: Instant,
	ttl: Duration,
}

impl<T> Entry<T> {
	fn expired(&self, now: Instant) -> bool {
		now.duration_since(self.created_at) > self.ttl
	}
}

struct CacheState<T> {
	map: HashMap<String, Entry<T>>,
	/// Keys from least to most recently used.
	access: Vec<String>,
	max_size: usize,
	default_ttl: Duration,
}

impl<T> CacheState<T> {
	fn touch(&mut self, key: &str) {
		self.access.retain(|k| k != key);
		self.access.push(key.to_string());
	}

	fn forget(&mut self, key: &str) {
		self.access.retain(|k| k != key);
	}
}

/// Fixed-capacity mapping with per-entry TTL and LRU eviction.
///
/// Expired entries are removed lazily on access and by [`MemoryCache::cleanup`];
/// a `get` of an expired key is indistinguishable from a key never set.
pub struct MemoryCache<T> {
	state: Mutex<CacheState<T>>,
}

impl<T: Clone> MemoryCache<T> {
	pub fn new(options: CacheOptions) -> Self {
		Self {
			state: Mutex::new(CacheState {
				map: HashMap::new(),
				access: Vec::new(),
				max_size: options.max_size.max(1),
				default_ttl: options.ttl,
			}),
		}
	}

	/// Insert or update an entry. Inserting a new key at capacity evicts the
	/// least-recently-used entry first; updating an existing key never evicts.
	pub fn set(&self, key: &str, value: T, ttl: Option<Duration>) {
		let mut state = self.state.lock().unwrap();
		if !state.map.contains_key(key) && state.map.len() >= state.max_size {
			if let Some(lru) = state.access.first().cloned() {
				state.map.remove(&lru);
				state.forget(&lru);
			}
		}
		let entry = Entry {
			value,
			created_at: Instant::now(),
			ttl: ttl.unwrap_or(state.default_ttl),
		};
		state.map.insert(key.to_string(), entry);
		state.touch(key);
	}

	/// Fetch an entry, refreshing its recency. Expired entries are deleted.
	pub fn get(&self, key: &str) -> Option<T> {
		let mut state = self.state.lock().unwrap();
		let now = Instant::now();
		match state.map.get(key) {
			Some(entry) if entry.expired(now) => {
				state.map.remove(key);
				state.forget(key);
				None
			}
			Some(entry) => {
				let value = entry.value.clone();
				state.touch(key);
				Some(value)
			}
			None => None,
		}
	}

	/// Whether an unexpired entry exists; refreshes recency like `get`.
	pub fn has(&self, key: &str) -> bool {
		self.get(key).is_some()
	}

	pub fn delete(&self, key: &str) -> bool {
		let mut state = self.state.lock().unwrap();
		let removed = state.map.remove(key).is_some();
		if removed {
			state.forget(key);
		}
		removed
	}

	pub fn clear(&self) {
		let mut state = self.state.lock().unwrap();
		state.map.clear();
		state.access.clear();
	}

	pub fn len(&self) -> usize {
		self.state.lock().unwrap().map.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn keys(&self) -> Vec<String> {
		self.state.lock().unwrap().map.keys().cloned().collect()
	}

	/// Purge every expired entry, independent of access. Returns the number
	/// of entries removed.
	pub fn cleanup(&self) -> usize {
		let mut state = self.state.lock().unwrap();
		let now = Instant::now();
		let expired: Vec<String> = state
			.map
			.iter()
			.filter(|(_, entry)| entry.expired(now))
			.map(|(key, _)| key.clone())
			.collect();
		for key in &expired {
			state.map.remove(key);
			state.forget(key);
		}
		expired.len()
	}

	pub fn stats(&self) -> CacheStats {
		let state = self.state.lock().unwrap();
		CacheStats {
			size: state.map.len(),
			max_size: state.max_size,
		}
	}
}

/// Object-safe view of a cache, letting the registry sweep and report on
/// caches of differing value types.
trait AnyCache: Send + Sync {
	fn cleanup(&self) -> usize;
	fn clear(&self);
	fn stats(&self) -> CacheStats;
	fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Clone + Send + Sync + 'static> AnyCache for MemoryCache<T> {
	fn cleanup(&self) -> usize {
		MemoryCache::cleanup(self)
	}

	fn clear(&self) {
		MemoryCache::clear(self)
	}

	fn stats(&self) -> CacheStats {
		MemoryCache::stats(self)
	}

	fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
		self
	}
}

/// Named cache registry shared across the session.
///
/// The same name always resolves to the same cache instance; asking for an
/// existing name with a different value type is a configuration error.
pub struct CacheRegistry {
	caches: Mutex<HashMap<String, Arc<dyn AnyCache>>>,
}

impl CacheRegistry {
	pub fn new() -> Self {
		Self {
			caches: Mutex::new(HashMap::new()),
		}
	}

	/// Create or fetch the cache registered under `name`. `options` only
	/// applies when the cache does not exist yet.
	pub fn get_cache<T: Clone + Send + Sync + 'static>(
		&self,
		name: &str,
		options: CacheOptions,
	) -> Result<Arc<MemoryCache<T>>, WalletError> {
		let mut caches = self.caches.lock().unwrap();
		if let Some(existing) = caches.get(name) {
			return existing
				.clone()
				.as_any_arc()
				.downcast::<MemoryCache<T>>()
				.map_err(|_| {
					WalletError::configuration_invalid(format!(
						"cache {name} already registered with a different value type"
					))
				});
		}
		let cache = Arc::new(MemoryCache::<T>::new(options));
		caches.insert(name.to_string(), cache.clone());
		Ok(cache)
	}

	/// Drop a named cache entirely. Returns whether it existed.
	pub fn remove_cache(&self, name: &str) -> bool {
		let mut caches = self.caches.lock().unwrap();
		if let Some(cache) = caches.remove(name) {
			cache.clear();
			true
		} else {
			false
		}
	}

	/// Clear the contents of every registered cache.
	pub fn clear_all(&self) {
		let caches = self.caches.lock().unwrap();
		for cache in caches.values() {
			cache.clear();
		}
	}

	/// Purge expired entries from every registered cache.
	pub fn cleanup_all(&self) -> usize {
		let caches: Vec<Arc<dyn AnyCache>> =
			self.caches.lock().unwrap().values().cloned().collect();
		caches.iter().map(|cache| cache.cleanup()).sum()
	}

	/// Size statistics per registered cache name.
	pub fn stats(&self) -> HashMap<String, CacheStats> {
		let caches = self.caches.lock().unwrap();
		caches
			.iter()
			.map(|(name, cache)| (name.clone(), cache.stats()))
			.collect()
	}

	/// Run a periodic expiry sweep on a background task. The task stops on
	/// its own once the registry is dropped.
	pub fn spawn_cleanup(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
		let registry: Weak<CacheRegistry> = Arc::downgrade(self);
		tokio::spawn(async move {
			let mut ticker = tokio::time::interval(interval);
			ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
			loop {
				ticker.tick().await;
				let Some(registry) = registry.upgrade() else {
					break;
				};
				let purged = registry.cleanup_all();
				if purged > 0 {
					debug!(purged, "purged expired cache entries");
				}
			}
		})
	}
}

impl Default for CacheRegistry {
	fn default() -> Self {
		Self::new()
	}
}

/// Cache key conventions shared by all adapters.
pub mod cache_key {
	use crate::types::Network;

	pub fn balance(wallet_id: &str, address: &str) -> String {
		format!("balance:{wallet_id}:{address}")
	}

	pub fn network(wallet_id: &str) -> String {
		format!("network:{wallet_id}")
	}

	pub fn accounts(wallet_id: &str, network: Network) -> String {
		format!("accounts:{wallet_id}:{network}")
	}

	pub fn public_key(wallet_id: &str) -> String {
		format!("public_key:{wallet_id}")
	}
}
