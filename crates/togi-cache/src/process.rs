//! The memoized pipeline front end.
//!
//! [`ProcessCache`] owns its map and capacity and is handed to whatever
//! invokes the pipeline — there is no module-level singleton. Keys
//! derive from the content of the input raster and the full
//! configuration, so interactively re-running the pipeline with
//! unchanged inputs costs one lookup and one buffer copy.

use togi_pipeline::{Config, PipelineError, Raster};

use crate::key::KeyBuilder;
use crate::memo::MemoCache;

/// Content-addressed memoization around [`togi_pipeline::process`].
///
/// Stored buffers are owned by the cache; every return — fresh or
/// cached — is an independent copy, so callers can never mutate cached
/// state. Errors from the pipeline propagate unchanged and are never
/// cached.
///
/// Not internally synchronized: share across threads behind a `Mutex`.
#[derive(Debug)]
pub struct ProcessCache {
    cache: MemoCache<Raster>,
}

impl ProcessCache {
    /// Default entry capacity of the pipeline cache.
    pub const DEFAULT_CAPACITY: usize = 128;

    /// Create a cache with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a cache bounded to `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cache: MemoCache::new(capacity),
        }
    }

    /// Run the pipeline, reusing a cached result when the same image
    /// and configuration have been processed before.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] from the underlying pipeline run; a
    /// failing run leaves the cache untouched.
    pub fn process(&mut self, image: &Raster, config: &Config) -> Result<Raster, PipelineError> {
        let key = KeyBuilder::new("process")
            .raster(image)
            .config(config)
            .build();
        self.cache
            .get_or_insert_with(key, || togi_pipeline::process(image, config))
    }

    /// Number of cached results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Maximum number of cached results.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.cache.capacity()
    }

    /// Drop every cached result.
    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

impl Default for ProcessCache {
    fn default() -> Self {
        Self::new()
    }
}
