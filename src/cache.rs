//! Parse cache.
//!
//! A bounded LRU keyed by the exact source text of the builder lambda.
//! Values are immutable parsed plans behind `Arc`, so concurrent readers
//! keep their entry alive even if it is evicted underneath them. One
//! process-wide instance serves the one-shot entry points; tests construct
//! their own.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;

use crate::ir::OpTree;
use crate::lowering::VisitorContext;
use crate::params::{AutoParamInfo, ParamValue};

/// Cache behaviour knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseCacheConfig {
    /// Disables both reads and writes when false.
    pub enabled: bool,
    /// Maximum number of cached plans; the least recently used entry is
    /// evicted on insert.
    pub capacity: usize,
}

impl Default for ParseCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 1024,
        }
    }
}

/// An immutable parsed plan: the normalised operation tree, the
/// auto-parameters it produced, and the visitor-context snapshot plan
/// handles restore from. Contains only values; nothing borrowed from the
/// caller.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedPlan {
    pub tree: OpTree,
    pub auto_params: std::collections::BTreeMap<String, ParamValue>,
    pub auto_param_infos: std::collections::BTreeMap<String, AutoParamInfo>,
    pub snapshot: VisitorContext,
}

struct CacheInner {
    entries: HashMap<String, Arc<CachedPlan>>,
    /// Recency order, least recently used at the front.
    order: VecDeque<String>,
    config: ParseCacheConfig,
}

/// Bounded LRU of parsed plans.
pub struct ParseCache {
    inner: Mutex<CacheInner>,
}

impl ParseCache {
    pub fn new(config: ParseCacheConfig) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
                config,
            }),
        }
    }

    /// Look up a plan by lambda source text, refreshing its recency.
    pub fn get(&self, source: &str) -> Option<Arc<CachedPlan>> {
        let mut inner = self.inner.lock().expect("parse cache poisoned");
        if !inner.config.enabled {
            return None;
        }
        let plan = inner.entries.get(source)?.clone();
        touch(&mut inner.order, source);
        Some(plan)
    }

    /// Insert a plan, evicting the least recently used entry when full.
    pub fn insert(&self, source: String, plan: CachedPlan) {
        let mut inner = self.inner.lock().expect("parse cache poisoned");
        if !inner.config.enabled || inner.config.capacity == 0 {
            return;
        }
        if inner.entries.contains_key(&source) {
            touch(&mut inner.order, &source);
            inner.entries.insert(source, Arc::new(plan));
            return;
        }
        while inner.entries.len() >= inner.config.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
        }
        inner.order.push_back(source.clone());
        inner.entries.insert(source, Arc::new(plan));
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("parse cache poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("parse cache poisoned");
        inner.entries.clear();
        inner.order.clear();
    }

    pub fn config(&self) -> ParseCacheConfig {
        self.inner.lock().expect("parse cache poisoned").config
    }

    /// Replace the configuration. Shrinking the capacity evicts the oldest
    /// entries immediately.
    pub fn set_config(&self, config: ParseCacheConfig) {
        let mut inner = self.inner.lock().expect("parse cache poisoned");
        inner.config = config;
        while inner.entries.len() > inner.config.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
        }
    }
}

fn touch(order: &mut VecDeque<String>, source: &str) {
    if let Some(pos) = order.iter().position(|s| s == source) {
        if let Some(key) = order.remove(pos) {
            order.push_back(key);
        }
    }
}

// =============================================================================
// Process-wide instance
// =============================================================================

static GLOBAL_CACHE: Lazy<ParseCache> = Lazy::new(|| ParseCache::new(ParseCacheConfig::default()));

/// The process-wide parse cache used by the one-shot entry points.
pub fn global() -> &'static ParseCache {
    &GLOBAL_CACHE
}

/// Empty the process-wide parse cache.
pub fn clear_parse_cache() {
    global().clear();
}

/// Reconfigure the process-wide parse cache.
pub fn set_parse_cache_config(config: ParseCacheConfig) {
    global().set_config(config);
}

/// Current configuration of the process-wide parse cache.
pub fn get_parse_cache_config() -> ParseCacheConfig {
    global().config()
}
