//! Tool-call cache manager.
//!
//! Caches tool results in an LRU keyed by tool name and canonical
//! arguments, tracks a call quota independent of the cache, and keeps
//! running call statistics.

use std::collections::HashMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::Digest as _;
use tracing::debug;

use crate::config::CacheConfig;
use crate::models::{ToolCallData, ToolResultData};

/// Running statistics of the cache manager.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCallStatistics {
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub cached_hits: u64,
    pub cache_misses: u64,
    pub total_execution_time_ms: f64,
}

impl ToolCallStatistics {
    /// Mean execution time over registered calls.
    pub fn avg_execution_time_ms(&self) -> f64 {
        if self.total_calls == 0 {
            0.0
        } else {
            self.total_execution_time_ms / self.total_calls as f64
        }
    }
}

/// Statistics snapshot including derived and cache state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheReport {
    #[serde(flatten)]
    pub statistics: ToolCallStatistics,
    pub avg_execution_time_ms: f64,
    pub cache_entries: usize,
    pub cache_capacity: usize,
    pub remaining_calls: usize,
}

#[derive(Debug)]
struct CacheEntry {
    result: ToolResultData,
    last_access: u64,
}

/// LRU result cache with a call quota.
#[derive(Debug)]
pub struct ToolCallManager {
    entries: HashMap<String, CacheEntry>,
    capacity: usize,
    max_calls: usize,
    call_count: usize,
    /// Monotonic counter for LRU tracking
    access_counter: u64,
    statistics: ToolCallStatistics,
}

impl ToolCallManager {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: HashMap::with_capacity(config.cache_size),
            capacity: config.cache_size.max(1),
            max_calls: config.max_calls,
            call_count: 0,
            access_counter: 0,
            statistics: ToolCallStatistics::default(),
        }
    }

    /// Whether the call quota allows another call.
    pub fn can_execute(&self) -> bool {
        self.call_count < self.max_calls
    }

    /// Count one call against the quota.
    pub fn register_call(&mut self) {
        self.call_count += 1;
        self.statistics.total_calls += 1;
    }

    pub fn remaining_calls(&self) -> usize {
        self.max_calls.saturating_sub(self.call_count)
    }

    /// Look up a cached result.
    ///
    /// A hit is promoted to most recently used and returned with
    /// `from_cache` set.
    pub fn get_cached_result(&mut self, call: &ToolCallData) -> Option<ToolResultData> {
        self.lookup(&call.tool_name, &call.arguments)
    }

    /// Look up by tool name and arguments without a full call.
    pub fn lookup(&mut self, tool_name: &str, arguments: &Map<String, Value>) -> Option<ToolResultData> {
        let key = cache_key(tool_name, arguments);
        self.access_counter += 1;
        match self.entries.get_mut(&key) {
            Some(entry) => {
                entry.last_access = self.access_counter;
                entry.result.from_cache = true;
                self.statistics.cached_hits += 1;
                debug!(tool = %tool_name, "Tool cache hit");
                Some(entry.result.clone())
            }
            None => {
                self.statistics.cache_misses += 1;
                None
            }
        }
    }

    /// Store a result, evicting the least recently used entry when full.
    pub fn cache_result(&mut self, call: &ToolCallData, result: ToolResultData) {
        let key = cache_key(&call.tool_name, &call.arguments);
        self.access_counter += 1;

        if let Some(entry) = self.entries.get_mut(&key) {
            entry.result = result;
            entry.last_access = self.access_counter;
            return;
        }

        while self.entries.len() >= self.capacity {
            self.evict_lru();
        }
        self.entries.insert(
            key,
            CacheEntry {
                result,
                last_access: self.access_counter,
            },
        );
    }

    /// Fold a result into the statistics.
    pub fn record_result(&mut self, result: &ToolResultData) {
        if result.success {
            self.statistics.successful_calls += 1;
        } else {
            self.statistics.failed_calls += 1;
        }
        if let Some(ms) = result.execution_time_ms {
            self.statistics.total_execution_time_ms += ms;
        }
    }

    pub fn statistics(&self) -> &ToolCallStatistics {
        &self.statistics
    }

    /// Snapshot of statistics, cache occupancy and quota.
    pub fn report(&self) -> CacheReport {
        CacheReport {
            statistics: self.statistics.clone(),
            avg_execution_time_ms: self.statistics.avg_execution_time_ms(),
            cache_entries: self.entries.len(),
            cache_capacity: self.capacity,
            remaining_calls: self.remaining_calls(),
        }
    }

    pub fn cache_len(&self) -> usize {
        self.entries.len()
    }

    /// Clear the cache, the call count and the statistics.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.call_count = 0;
        self.access_counter = 0;
        self.statistics = ToolCallStatistics::default();
    }

    fn evict_lru(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(key, _)| key.clone());

        match oldest {
            Some(key) => {
                self.entries.remove(&key);
                debug!(key = %key, "Evicted tool cache entry");
            }
            None => self.entries.clear(),
        }
    }
}

/// Cache key: `"{tool_name}:{sha256 of canonical arguments}"`.
pub fn cache_key(tool_name: &str, arguments: &Map<String, Value>) -> String {
    let mut canonical = String::new();
    write_canonical(&Value::Object(arguments.clone()), &mut canonical);

    let digest = sha2::Sha256::digest(canonical.as_bytes());
    let mut out = String::with_capacity(tool_name.len() + 65);
    out.push_str(tool_name);
    out.push(':');
    for b in digest {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// JSON text with object keys sorted at every level.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(fields) => {
            let mut keys: Vec<&String> = fields.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                if let Some(v) = fields.get(key) {
                    write_canonical(v, out);
                }
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
