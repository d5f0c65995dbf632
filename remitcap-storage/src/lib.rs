//! RemitCap Storage - In-Process Cache
//!
//! A time-bounded, size-bounded cache in front of the compliance authority:
//!
//! - [`store`]: the generic TTL store with oldest-first eviction and prefix
//!   invalidation.
//! - [`keys`]: the canonical key space; every cached concept has one template.
//! - [`invalidation`]: named recipes mapping a mutation to every scope it stales.
//! - [`sweep`]: the background task reclaiming expired entries.
//!
//! The store is constructed explicitly and shared through `Arc`; nothing in
//! this crate is a process-wide singleton.

pub mod clock;
pub mod invalidation;
pub mod keys;
pub mod store;
pub mod sweep;

pub use clock::{Clock, ManualClock, SystemClock};
pub use invalidation::{InvalidationReport, Invalidator, Mutation};
pub use keys::{CacheKey, Namespace, SEPARATOR};
pub use store::{CacheStats, CacheStore, CacheStoreConfig, EvictionHook, EvictionReason};
pub use sweep::{SweepHandle, SweepSnapshot};
