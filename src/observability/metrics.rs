//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Hold named instrumentation variables (counters, gauges, histograms, functions)
//! - Render them as one flat JSON object for the admin `/metrics` view
//! - Act as a `metrics` recorder so `metrics::counter!` and friends land here
//! - Periodically log a snapshot when reporting is enabled
//!
//! # Metrics
//! - `http.requests` (counter): application requests served
//! - `http.request_duration_ms` (histogram): application request latency
//! - `cmdline` (function): process arguments
//! - `memstats` (function): allocator statistics
//!
//! # Design Decisions
//! - The registry is injected by reference, not ambient; installing it as the
//!   global recorder is a separate, explicit step
//! - Iteration order is sorted by name
//! - Low-overhead metric updates (atomic operations)

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::{
    Counter, Gauge, Histogram, HistogramFn, Key, KeyName, Metadata, Recorder, SharedString, Unit,
};
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use crate::config::MetricsConfig;
use crate::environment::Environment;
use crate::error::BoxError;
use crate::lifecycle::Managed;

type ValueFn = dyn Fn() -> Value + Send + Sync;

/// Running count/sum/min/max of recorded values.
#[derive(Debug, Default)]
pub struct Summary {
    inner: Mutex<SummaryState>,
}

#[derive(Debug, Default, Clone, Copy)]
struct SummaryState {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
}

impl Summary {
    fn to_json(&self) -> Value {
        let state = *self.inner.lock();
        json!({
            "count": state.count,
            "sum": state.sum,
            "min": state.min,
            "max": state.max,
        })
    }
}

impl HistogramFn for Summary {
    fn record(&self, value: f64) {
        let mut state = self.inner.lock();
        if state.count == 0 {
            state.min = value;
            state.max = value;
        } else {
            state.min = state.min.min(value);
            state.max = state.max.max(value);
        }
        state.count += 1;
        state.sum += value;
    }
}

#[derive(Clone)]
enum Variable {
    Counter(Arc<AtomicU64>),
    /// f64 stored as bits, the representation `metrics` uses for `AtomicU64` gauges.
    Gauge(Arc<AtomicU64>),
    Histogram(Arc<Summary>),
    Func(Arc<ValueFn>),
}

impl Variable {
    fn to_json(&self) -> Value {
        match self {
            Variable::Counter(c) => json!(c.load(Ordering::Relaxed)),
            Variable::Gauge(g) => json!(f64::from_bits(g.load(Ordering::Relaxed))),
            Variable::Histogram(h) => h.to_json(),
            Variable::Func(f) => f(),
        }
    }
}

/// Named instrumentation variables.
#[derive(Default)]
pub struct MetricsRegistry {
    vars: RwLock<BTreeMap<String, Variable>>,
}

impl MetricsRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Publish a variable whose value is computed on every read.
    pub fn publish<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        let name = name.into();
        if self.vars.write().insert(name.clone(), Variable::Func(Arc::new(f))).is_some() {
            tracing::warn!(name = %name, "Replaced published metric variable");
        }
    }

    /// Get or create a counter.
    pub fn counter(&self, name: &str) -> Counter {
        match self.get_or_insert(name, || Variable::Counter(Arc::default())) {
            Variable::Counter(c) => Counter::from_arc(c),
            _ => {
                kind_mismatch(name);
                Counter::noop()
            }
        }
    }

    /// Get or create a gauge.
    pub fn gauge(&self, name: &str) -> Gauge {
        match self.get_or_insert(name, || Variable::Gauge(Arc::default())) {
            Variable::Gauge(g) => Gauge::from_arc(g),
            _ => {
                kind_mismatch(name);
                Gauge::noop()
            }
        }
    }

    /// Get or create a histogram summary.
    pub fn histogram(&self, name: &str) -> Histogram {
        match self.get_or_insert(name, || Variable::Histogram(Arc::default())) {
            Variable::Histogram(h) => Histogram::from_arc(h),
            _ => {
                kind_mismatch(name);
                Histogram::noop()
            }
        }
    }

    fn get_or_insert(&self, name: &str, make: impl FnOnce() -> Variable) -> Variable {
        if let Some(var) = self.vars.read().get(name) {
            return var.clone();
        }
        self.vars
            .write()
            .entry(name.to_string())
            .or_insert_with(make)
            .clone()
    }

    /// Names of all variables, sorted.
    pub fn names(&self) -> Vec<String> {
        self.vars.read().keys().cloned().collect()
    }

    /// Render every variable as one flat JSON object, sorted by name.
    pub fn to_json(&self) -> String {
        let vars: Vec<(String, Variable)> = self
            .vars
            .read()
            .iter()
            .map(|(name, var)| (name.clone(), var.clone()))
            .collect();

        let mut out = String::from("{");
        for (i, (name, var)) in vars.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            let _ = write!(out, "{}: {}", Value::from(name.as_str()), var.to_json());
        }
        out.push('}');
        out
    }
}

fn kind_mismatch(name: &str) {
    tracing::warn!(name = %name, "Metric already registered with a different kind");
}

/// Flatten a `metrics` key into a registry name, labels in braces.
fn key_name(key: &Key) -> String {
    let mut name = key.name().to_string();
    let mut labels = key.labels().peekable();
    if labels.peek().is_some() {
        let rendered: Vec<String> = labels.map(|l| format!("{}={}", l.key(), l.value())).collect();
        let _ = write!(name, "{{{}}}", rendered.join(","));
    }
    name
}

/// `metrics` recorder writing into a [`MetricsRegistry`].
#[derive(Clone)]
pub struct RegistryRecorder(pub Arc<MetricsRegistry>);

impl Recorder for RegistryRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        self.0.counter(&key_name(key))
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        self.0.gauge(&key_name(key))
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        self.0.histogram(&key_name(key))
    }
}

/// Install the registry as the process-wide `metrics` recorder.
///
/// Only the first call in a process succeeds; later registries stay usable
/// through explicit injection.
pub fn install(registry: &Arc<MetricsRegistry>) {
    if metrics::set_global_recorder(RegistryRecorder(registry.clone())).is_err() {
        tracing::debug!("Global metrics recorder already installed");
    }
}

/// Managed object logging a metrics snapshot at a fixed interval.
pub struct MetricsReporter {
    registry: Arc<MetricsRegistry>,
    interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl MetricsReporter {
    pub fn new(registry: Arc<MetricsRegistry>, interval: Duration) -> Self {
        Self {
            registry,
            interval,
            task: Mutex::new(None),
        }
    }

    /// Register a reporter with the environment when reporting is enabled.
    pub fn configure(config: &MetricsConfig, environment: &mut Environment) {
        if config.frequency_secs == 0 {
            return;
        }
        let reporter = MetricsReporter::new(
            environment.metrics.clone(),
            Duration::from_secs(config.frequency_secs),
        );
        if let Err(e) = environment.lifecycle.manage(Arc::new(reporter)) {
            tracing::warn!(error = %e, "Metrics reporter not registered");
        }
    }
}

#[async_trait]
impl Managed for MetricsReporter {
    fn name(&self) -> &str {
        "metrics-reporter"
    }

    async fn start(&self) -> Result<(), BoxError> {
        let registry = self.registry.clone();
        let mut ticker = tokio::time::interval(self.interval);
        let handle = tokio::spawn(async move {
            // First tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                tracing::info!(metrics = %registry.to_json(), "Metrics snapshot");
            }
        });
        *self.task.lock() = Some(handle);
        Ok(())
    }

    async fn stop(&self) -> Result<(), BoxError> {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_is_sorted_and_flat() {
        let registry = MetricsRegistry::new();
        registry.counter("requests").increment(3);
        registry.gauge("connections").set(2.0);
        registry.publish("cmdline", || json!(["gantry", "server"]));

        assert_eq!(
            registry.to_json(),
            r#"{"cmdline": ["gantry","server"],"connections": 2.0,"requests": 3}"#
        );
    }

    #[test]
    fn test_empty_registry() {
        assert_eq!(MetricsRegistry::new().to_json(), "{}");
    }

    #[test]
    fn test_histogram_summary() {
        let registry = MetricsRegistry::new();
        let histogram = registry.histogram("latency");
        histogram.record(4.0);
        histogram.record(1.0);
        histogram.record(7.0);

        let value: Value = serde_json::from_str(&registry.to_json()).unwrap();
        assert_eq!(value["latency"], json!({"count": 3, "sum": 12.0, "min": 1.0, "max": 7.0}));
    }

    #[test]
    fn test_recorder_feeds_registry() {
        let registry = MetricsRegistry::new();
        let recorder = RegistryRecorder(registry.clone());

        metrics::with_local_recorder(&recorder, || {
            metrics::counter!("jobs").increment(1);
            metrics::counter!("jobs").increment(1);
            metrics::counter!("errors", "kind" => "io").increment(5);
        });

        let value: Value = serde_json::from_str(&registry.to_json()).unwrap();
        assert_eq!(value["jobs"], json!(2));
        assert_eq!(value["errors{kind=io}"], json!(5));
    }

    #[test]
    fn test_kind_mismatch_keeps_existing() {
        let registry = MetricsRegistry::new();
        registry.counter("x").increment(1);
        registry.gauge("x").set(9.0);
        assert_eq!(registry.to_json(), r#"{"x": 1}"#);
    }
}
