//! Compiled pattern caching
//!
//! Compiling a route pattern builds a regular expression, which is the most
//! expensive step of route registration. Routers that share a pattern reuse
//! the compiled matcher through this LRU cache.

use crate::compiler::CompiledPattern;
use crate::trace_log;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Cache performance statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub invalidations: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Compiled pattern cache with LRU eviction
///
/// Default capacity: 256 patterns.
#[derive(Debug)]
pub struct PatternCache {
    patterns: LruCache<String, Arc<CompiledPattern>>,
    stats: CacheStats,
}

impl PatternCache {
    const DEFAULT_CAPACITY: usize = 256;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            patterns: LruCache::new(cap),
            stats: CacheStats::default(),
        }
    }

    pub fn get(&mut self, pattern: &str) -> Option<Arc<CompiledPattern>> {
        if let Some(compiled) = self.patterns.get(pattern) {
            self.stats.hits += 1;
            trace_log!("Pattern cache hit for '{}'", pattern);
            Some(Arc::clone(compiled))
        } else {
            self.stats.misses += 1;
            trace_log!("Pattern cache miss for '{}'", pattern);
            None
        }
    }

    pub fn insert(&mut self, pattern: String, compiled: Arc<CompiledPattern>) {
        self.patterns.push(pattern, compiled);
    }

    pub fn clear(&mut self) {
        trace_log!("Clearing pattern cache");
        self.patterns.clear();
        self.stats.invalidations += 1;
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for PatternCache {
    fn default() -> Self {
        Self::new()
    }
}
