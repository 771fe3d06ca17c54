//! Mock sensor sources
//!
//! Implement `SensorSource` without sensor hardware: [`MockSensorSource`]
//! generates samples at a fixed rate in a background thread,
//! [`ScriptedSensorSource`] emits exactly what a test tells it to.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use contracts::{Clock, SampleCallback, SensorKind, SensorSample, SensorSource, TaggedSample};
use parking_lot::Mutex;
use tracing::{debug, trace};

/// Mock sensor configuration
#[derive(Debug, Clone)]
pub struct MockSensorConfig {
    /// Send frequency (Hz)
    pub frequency_hz: f64,
    /// Resting heart rate (HeartRate only)
    pub base_bpm: i32,
    /// Ambient temperature in °C (AmbientTemperature only)
    pub base_temperature: f32,
}

impl Default for MockSensorConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 50.0,
            base_bpm: 62,
            base_temperature: 21.5,
        }
    }
}

/// Mock sensor
///
/// Generates samples at the configured frequency in a background thread,
/// stamped with the injected clock. Restartable: `stop` ends the current
/// thread and a later `listen` starts a new one.
pub struct MockSensorSource {
    kind: SensorKind,
    config: MockSensorConfig,
    clock: Arc<dyn Clock>,
    listening: Arc<AtomicBool>,
    /// Bumped on every stop so a sleeping thread notices it was replaced
    generation: Arc<AtomicU64>,
}

impl MockSensorSource {
    pub fn new(kind: SensorKind, config: MockSensorConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            kind,
            config,
            clock,
            listening: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Create a mock with default values at `frequency_hz`
    pub fn with_frequency(kind: SensorKind, frequency_hz: f64, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            kind,
            MockSensorConfig {
                frequency_hz,
                ..Default::default()
            },
            clock,
        )
    }

    /// Generate the `seq`-th sample
    fn generate_sample(
        kind: SensorKind,
        config: &MockSensorConfig,
        seq: u64,
        timestamp_nanos: i64,
    ) -> SensorSample {
        let phase = seq as f32 * 0.1;
        match kind {
            SensorKind::Accelerometer => {
                SensorSample::three_axis(0.2 * phase.sin(), 0.1 * phase.cos(), 9.81, timestamp_nanos)
            }
            SensorKind::LinearAcceleration => {
                SensorSample::three_axis(0.2 * phase.sin(), 0.1 * phase.cos(), 0.0, timestamp_nanos)
            }
            SensorKind::Gyroscope => {
                SensorSample::three_axis(0.05 * phase.cos(), 0.0, 0.02 * phase.sin(), timestamp_nanos)
            }
            SensorKind::Gravity => SensorSample::three_axis(0.0, 0.0, 9.81, timestamp_nanos),
            SensorKind::AmbientTemperature => SensorSample::scalar(
                config.base_temperature + 0.1 * (phase * 0.1).sin(),
                timestamp_nanos,
            ),
            SensorKind::HeartRate => {
                SensorSample::heart_rate(config.base_bpm + (seq % 5) as i32, timestamp_nanos)
            }
        }
    }
}

impl SensorSource for MockSensorSource {
    fn kind(&self) -> SensorKind {
        self.kind
    }

    fn listen(&self, callback: SampleCallback) {
        // Idempotent: if already listening, don't start again
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let kind = self.kind;
        let config = self.config.clone();
        let clock = self.clock.clone();
        let listening = self.listening.clone();
        let generation = self.generation.clone();
        let my_generation = generation.load(Ordering::SeqCst);

        let interval = Duration::from_secs_f64(1.0 / config.frequency_hz.max(f64::EPSILON));

        thread::spawn(move || {
            let mut seq: u64 = 0;

            debug!(
                kind = %kind,
                frequency_hz = config.frequency_hz,
                "mock sensor started"
            );

            while listening.load(Ordering::Relaxed)
                && generation.load(Ordering::Relaxed) == my_generation
            {
                let timestamp_nanos = clock.now_nanos();
                let sample = Self::generate_sample(kind, &config, seq, timestamp_nanos);
                seq += 1;

                callback(TaggedSample::new(kind, sample));
                trace!(kind = %kind, seq, timestamp_nanos, "mock sample emitted");

                thread::sleep(interval);
            }

            debug!(kind = %kind, samples = seq, "mock sensor stopped");
        });
    }

    fn stop(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.listening.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}

/// Source driven by hand; clones share the subscription
#[derive(Clone)]
pub struct ScriptedSensorSource {
    kind: SensorKind,
    callback: Arc<Mutex<Option<SampleCallback>>>,
}

impl ScriptedSensorSource {
    pub fn new(kind: SensorKind) -> Self {
        Self {
            kind,
            callback: Arc::new(Mutex::new(None)),
        }
    }

    /// Deliver one sample; returns false when nobody is subscribed
    pub fn emit(&self, sample: SensorSample) -> bool {
        // clone out so the callback runs without the lock held
        let callback = self.callback.lock().clone();
        match callback {
            Some(cb) => {
                cb(TaggedSample::new(self.kind, sample));
                true
            }
            None => false,
        }
    }
}

impl SensorSource for ScriptedSensorSource {
    fn kind(&self) -> SensorKind {
        self.kind
    }

    fn listen(&self, callback: SampleCallback) {
        let mut slot = self.callback.lock();
        if slot.is_none() {
            *slot = Some(callback);
        }
    }

    fn stop(&self) {
        self.callback.lock().take();
    }

    fn is_listening(&self) -> bool {
        self.callback.lock().is_some()
    }
}
