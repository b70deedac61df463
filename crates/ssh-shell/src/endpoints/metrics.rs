//! In-process metrics.
//!
//! Counters and gauges are identified by a name and a set of tags. The
//! endpoint lists names, or aggregates every series of one name whose tags
//! include the requested ones.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use super::{Endpoint, EndpointRequest, ids};
use crate::error::{CommandError, CommandResult};

/// Sessions opened since start.
pub const SESSIONS_OPENED: &str = "ssh.sessions.opened";
/// Sessions currently open.
pub const SESSIONS_ACTIVE: &str = "ssh.sessions.active";
/// Commands run, tagged with `command` and `outcome`.
pub const COMMANDS: &str = "ssh.commands";
/// Rejected logins.
pub const AUTH_FAILURES: &str = "ssh.auth.failures";

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    /// Create a new counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment by 1.
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment by n.
    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    /// Get current value.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// A gauge metric.
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicU64,
}

impl Gauge {
    /// Create a new gauge.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value.
    pub fn set(&self, value: u64) {
        self.value.store(value, Ordering::Relaxed);
    }

    /// Increment by 1.
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrement by 1, stopping at zero.
    pub fn dec(&self) {
        let _ = self
            .value
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(1)));
    }

    /// Get current value.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

type Tags = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct SeriesKey {
    name: String,
    tags: Tags,
}

impl SeriesKey {
    fn new(name: &str, tags: &[(&str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            tags: tags
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        }
    }
}

/// Aggregated view of one metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricResponse {
    /// Metric name.
    pub name: String,
    /// Sum of the matching counters.
    pub count: Option<u64>,
    /// Sum of the matching gauges.
    pub value: Option<u64>,
    /// Tag values seen on matching series, excluding the requested tags.
    pub available_tags: BTreeMap<String, BTreeSet<String>>,
}

impl MetricResponse {
    /// JSON shape returned by the endpoint.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut measurements = Vec::new();
        if let Some(count) = self.count {
            measurements.push(json!({ "statistic": "COUNT", "value": count }));
        }
        if let Some(value) = self.value {
            measurements.push(json!({ "statistic": "VALUE", "value": value }));
        }
        let tags: Vec<Value> = self
            .available_tags
            .iter()
            .map(|(tag, values)| json!({ "tag": tag, "values": values }))
            .collect();
        json!({
            "name": self.name,
            "measurements": measurements,
            "availableTags": tags,
        })
    }
}

/// Metrics registry.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    counters: Mutex<BTreeMap<SeriesKey, Arc<Counter>>>,
    gauges: Mutex<BTreeMap<SeriesKey, Arc<Gauge>>>,
}

impl MetricsRegistry {
    /// Create a new registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a counter.
    #[must_use]
    pub fn counter(&self, name: &str, tags: &[(&str, &str)]) -> Arc<Counter> {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters
            .entry(SeriesKey::new(name, tags))
            .or_insert_with(|| Arc::new(Counter::new()))
            .clone()
    }

    /// Get or create a gauge.
    #[must_use]
    pub fn gauge(&self, name: &str, tags: &[(&str, &str)]) -> Arc<Gauge> {
        let mut gauges = self.gauges.lock().unwrap_or_else(|e| e.into_inner());
        gauges
            .entry(SeriesKey::new(name, tags))
            .or_insert_with(|| Arc::new(Gauge::new()))
            .clone()
    }

    /// Every metric name, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        let gauges = self.gauges.lock().unwrap_or_else(|e| e.into_inner());
        counters
            .keys()
            .chain(gauges.keys())
            .map(|k| k.name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Aggregate the series of `name` carrying all of `filter`.
    ///
    /// Returns `None` when no series matches.
    #[must_use]
    pub fn metric(&self, name: &str, filter: &Tags) -> Option<MetricResponse> {
        let matches = |key: &SeriesKey| {
            key.name == name && filter.iter().all(|(k, v)| key.tags.get(k) == Some(v))
        };
        let mut available_tags: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut note_tags = |key: &SeriesKey| {
            for (k, v) in &key.tags {
                if !filter.contains_key(k) {
                    available_tags.entry(k.clone()).or_default().insert(v.clone());
                }
            }
        };

        let mut count = None;
        for (key, counter) in self.counters.lock().unwrap_or_else(|e| e.into_inner()).iter() {
            if matches(key) {
                note_tags(key);
                *count.get_or_insert(0) += counter.get();
            }
        }
        let mut value = None;
        for (key, gauge) in self.gauges.lock().unwrap_or_else(|e| e.into_inner()).iter() {
            if matches(key) {
                note_tags(key);
                *value.get_or_insert(0) += gauge.get();
            }
        }

        if count.is_none() && value.is_none() {
            return None;
        }
        Some(MetricResponse {
            name: name.to_string(),
            count,
            value,
            available_tags,
        })
    }
}

/// Parse `key=value,key=value` tag filters.
pub fn parse_tags(tags: &str) -> CommandResult<Tags> {
    tags.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|tag| {
            tag.split_once('=')
                .filter(|(k, _)| !k.is_empty())
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| {
                    CommandError::invalid_argument(format!("Invalid tag '{tag}', expected key=value"))
                })
        })
        .collect()
}

/// Serves a [`MetricsRegistry`].
#[derive(Debug, Clone)]
pub struct MetricsEndpoint {
    registry: Arc<MetricsRegistry>,
}

impl MetricsEndpoint {
    /// Serve `registry`.
    #[must_use]
    pub const fn new(registry: Arc<MetricsRegistry>) -> Self {
        Self { registry }
    }
}

impl Endpoint for MetricsEndpoint {
    fn id(&self) -> &str {
        ids::METRICS
    }

    fn invoke(&self, request: &EndpointRequest) -> CommandResult<Value> {
        let Some(name) = request.get("name") else {
            return Ok(json!({ "names": self.registry.names() }));
        };
        let filter = request.get("tags").map(parse_tags).transpose()?.unwrap_or_default();
        Ok(self
            .registry
            .metric(name, &filter)
            .map_or(Value::Null, |m| m.to_json()))
    }
}
