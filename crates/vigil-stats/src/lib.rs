//! Internal metrics: lock-free counters and gauges behind an explicit
//! registry.
//!
//! Components create their instruments through a shared [`Registry`] under
//! stable dotted names; the [`reporter::Reporter`] walks the registry on a
//! fixed interval and pushes `(name, value, timestamp)` samples to a carbon
//! endpoint.

pub mod config;
pub mod reporter;


pub use config::StatsConfig;
pub use reporter::Reporter;

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use vigil_graphite::Metric;

/// Monotone event counter.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn load(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Signed point-in-time value.
#[derive(Debug, Default)]
pub struct Gauge(AtomicI64);

impl Gauge {
    pub fn set(&self, n: i64) {
        self.0.store(n, Ordering::Relaxed);
    }

    pub fn add(&self, n: i64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc(&self) {
        self.add(1);
    }

    pub fn dec(&self) {
        self.add(-1);
    }

    pub fn load(&self) -> i64 {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Clone)]
enum Instrument {
    Counter(Arc<Counter>),
    Gauge(Arc<Gauge>),
}

/// Registry of named instruments. Registration happens once at component
/// construction; sampling walks the list without touching the hot path.
#[derive(Clone, Default)]
pub struct Registry {
    entries: Arc<Mutex<Vec<(String, Instrument)>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or returns the already-registered) counter under `name`.
    pub fn counter(&self, name: &str) -> Arc<Counter> {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        for (existing, instrument) in entries.iter() {
            if existing == name {
                if let Instrument::Counter(counter) = instrument {
                    return counter.clone();
                }
            }
        }
        let counter = Arc::new(Counter::default());
        entries.push((name.to_string(), Instrument::Counter(counter.clone())));
        counter
    }

    /// Registers (or returns the already-registered) gauge under `name`.
    pub fn gauge(&self, name: &str) -> Arc<Gauge> {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        for (existing, instrument) in entries.iter() {
            if existing == name {
                if let Instrument::Gauge(gauge) = instrument {
                    return gauge.clone();
                }
            }
        }
        let gauge = Arc::new(Gauge::default());
        entries.push((name.to_string(), Instrument::Gauge(gauge.clone())));
        gauge
    }

    /// Snapshots every instrument at `timestamp` (unix seconds).
    pub fn sample(&self, timestamp: i64) -> Vec<Metric> {
        let entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries
            .iter()
            .map(|(name, instrument)| Metric {
                name: name.clone(),
                value: match instrument {
                    Instrument::Counter(c) => c.load() as f64,
                    Instrument::Gauge(g) => g.load() as f64,
                },
                timestamp,
            })
            .collect()
    }
}
