//! Minimal run‑time metrics sink and logging bootstrap.
//!
//! No exporter ships with the crate; instead the host process may register
//! a plain callback that receives name/value pairs for every counter,
//! gauge and histogram update emitted through the `metrics` facade.

use crate::errors::Error;
use metrics::{
    Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit,
};
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Signature for external collectors.
pub type StatsCallback = fn(name: &str, value: u64);

static CALLBACK: OnceCell<StatsCallback> = OnceCell::new();

/// Install `env_logger` once per process (timestamps off). Later calls, or
/// calls after the host installed its own logger, are no-ops.
pub fn init_logging() {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_init(|| {
        let _ = env_logger::builder()
            .format_timestamp(None)
            .is_test(std::env::var("RUST_TEST_THREADS").is_ok())
            .try_init();
    });
}

/// Register `cb` and install the forwarding recorder as the global
/// `metrics` recorder.
///
/// Only the first registration in a process takes effect; later callbacks
/// are ignored. Fails with [`Error::RecorderInstalled`] when some other
/// recorder owns the global slot.
pub fn register_stats_callback(cb: StatsCallback) -> Result<(), Error> {
    static INSTALLED: OnceCell<bool> = OnceCell::new();
    let first = CALLBACK.set(cb).is_ok();
    let installed =
        *INSTALLED.get_or_init(|| metrics::set_global_recorder(CallbackRecorder).is_ok());
    if !installed {
        return Err(Error::RecorderInstalled);
    }
    if !first {
        log::debug!("[TELEMETRY] stats callback already registered; keeping the first one");
    }
    Ok(())
}

#[inline]
fn forward(key: &Key, value: u64) {
    if let Some(cb) = CALLBACK.get() {
        cb(key.name(), value);
    }
}

/// Forwarding recorder. Uses the callback **if** it was registered.
struct CallbackRecorder;

#[derive(Clone)]
struct CallbackHandle {
    key: Key,
}

impl Recorder for CallbackRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(Arc::new(CallbackHandle { key: key.clone() }))
    }
    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::from_arc(Arc::new(CallbackHandle { key: key.clone() }))
    }
    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::from_arc(Arc::new(CallbackHandle { key: key.clone() }))
    }
}

impl metrics::CounterFn for CallbackHandle {
    fn increment(&self, value: u64) {
        forward(&self.key, value);
    }
    fn absolute(&self, value: u64) {
        forward(&self.key, value);
    }
}

impl metrics::GaugeFn for CallbackHandle {
    fn set(&self, value: f64) {
        forward(&self.key, value as u64);
    }
    fn increment(&self, value: f64) {
        forward(&self.key, value as u64);
    }
    fn decrement(&self, value: f64) {
        forward(&self.key, value as u64);
    }
}

impl metrics::HistogramFn for CallbackHandle {
    fn record(&self, value: f64) {
        forward(&self.key, value as u64);
    }
}
