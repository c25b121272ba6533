//! A simple in-memory metrics recorder for testing.

use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

type CounterKey = (String, Vec<(String, String)>);

#[derive(Debug, Clone, Default)]
pub struct TestMetrics {
    counters: Arc<Mutex<HashMap<CounterKey, u64>>>,
}

impl TestMetrics {
    pub fn new() -> Self {
        Default::default()
    }

    /// Sum of a counter across all of its label sets.
    pub fn get_counter(&self, name: &str) -> u64 {
        self.counters
            .lock()
            .unwrap()
            .iter()
            .filter(|((counter, _), _)| counter == name)
            .map(|(_, value)| *value)
            .sum()
    }

    /// Value of a counter recorded with exactly `labels`.
    pub fn get_labelled_counter(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        let mut labels: Vec<(String, String)> = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        labels.sort();
        self.counters
            .lock()
            .unwrap()
            .get(&(name.to_string(), labels))
            .cloned()
            .unwrap_or(0)
    }
}

impl Recorder for TestMetrics {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        let mut labels: Vec<(String, String)> = key
            .labels()
            .map(|label| (label.key().to_string(), label.value().to_string()))
            .collect();
        labels.sort();
        Counter::from_arc(Arc::new(MetricCounter {
            key: (key.name().to_string(), labels),
            counters: self.counters.clone(),
        }))
    }

    fn register_gauge(&self, _key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::noop()
    }

    fn register_histogram(&self, _key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::noop()
    }
}

#[derive(Debug)]
struct MetricCounter {
    key: CounterKey,
    counters: Arc<Mutex<HashMap<CounterKey, u64>>>,
}

impl metrics::CounterFn for MetricCounter {
    fn increment(&self, value: u64) {
        let mut counters = self.counters.lock().unwrap();
        *counters.entry(self.key.clone()).or_insert(0) += value;
    }

    fn absolute(&self, value: u64) {
        let mut counters = self.counters.lock().unwrap();
        let entry = counters.entry(self.key.clone()).or_insert(0);
        *entry = (*entry).max(value);
    }
}

/// Runs `test` on a single-threaded runtime with `recorder` installed for
/// that thread, so parallel tests never share counters.
pub fn run_with_metrics<F>(recorder: &TestMetrics, paused: bool, test: F)
where
    F: std::future::Future<Output = ()>,
{
    let mut builder = tokio::runtime::Builder::new_current_thread();
    builder.enable_all();
    if paused {
        builder.start_paused(true);
    }
    let runtime = builder.build().unwrap();
    metrics::with_local_recorder(recorder, || runtime.block_on(test));
}
