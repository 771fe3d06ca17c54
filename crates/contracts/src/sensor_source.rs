//! SensorSource trait - Sensor data source abstraction
//!
//! Stands in for the platform sensor framework and the heart-rate SDK: a
//! push source that can be subscribed, unsubscribed and subscribed again.

use std::sync::Arc;

use crate::{SensorKind, TaggedSample};

/// Sensor sample callback type
///
/// Uses `Arc` to allow callback sharing across multiple sources.
pub type SampleCallback = Arc<dyn Fn(TaggedSample) + Send + Sync>;

/// Sensor data source trait
///
/// # Example
///
/// ```ignore
/// let source: Box<dyn SensorSource> = get_sensor_source();
/// source.listen(Arc::new(|tagged| {
///     println!("{} at {}", tagged.kind, tagged.sample.timestamp_nanos());
/// }));
/// // ... stream ...
/// source.stop();
/// ```
pub trait SensorSource: Send + Sync {
    /// Kind of samples produced
    fn kind(&self) -> SensorKind;

    /// Register data callback
    ///
    /// Repeated calls while listening are idempotent (the first callback
    /// stays registered).
    fn listen(&self, callback: SampleCallback);

    /// Stop producing samples; `listen` may be called again afterwards
    fn stop(&self);

    /// Check if currently listening
    fn is_listening(&self) -> bool;
}
