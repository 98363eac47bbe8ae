//! togi-cache: content-addressed memoization for the togi pipeline.
//!
//! Wraps pure functions so that repeated calls with argument sets that
//! hash identically skip recomputation. Keys are derived from content —
//! a hash of each raster's shape and bytes, and of each configuration's
//! canonical serialization — never from externally supplied
//! identifiers.
//!
//! Two flavors share the one [`MemoCache`] mechanism, differing only in
//! what `Clone` means for the stored type:
//!
//! - **Value cache** — store owned buffers ([`ProcessCache`] stores
//!   [`togi_pipeline::Raster`]). Every return, fresh or cached, is a
//!   defensive deep copy; callers can never mutate cached state.
//! - **Handle cache** — store [`Arc`](std::sync::Arc)-wrapped handles
//!   ([`HandleCache`]). Returns share the handle without copying, which
//!   is what a stateful recognition-engine handle wants: built once,
//!   treated as an opaque, effectively-immutable resource.
//!
//! Eviction is FIFO by insertion order with a fixed maximum entry
//! count; see [`MemoCache`] for the exact semantics. Nothing here is
//! internally synchronized — a multithreaded host wraps the cache in a
//! `Mutex` or keeps it on a single thread.

pub mod key;
pub mod memo;
pub mod process;

pub use key::{CacheKey, KeyBuilder};
pub use memo::MemoCache;
pub use process::ProcessCache;

/// Handle-flavored cache: stored values are shared on return instead of
/// copied. Suitable for expensive-to-construct, effectively-immutable
/// resources such as recognition-engine handles.
pub type HandleCache<T> = MemoCache<std::sync::Arc<T>>;
