//! Sensor capability contract.
//!
//! The runtime depends only on this trait: anything that can be
//! initialized and polled for a timestamped reading can join the network.
//! Simulated implementations live in [`simulated`]; hardware-backed ones
//! plug in from outside the crate.

pub mod simulated;
pub mod types;

pub use simulated::SimulatedSensor;
pub use types::{fields, Reading};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::error::SensorError;

/// Static description of a registered sensor.
///
/// The id is stable for the descriptor's lifetime; unregistering a sensor
/// removes its reading history together with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorDescriptor {
    /// Unique id, generated as `<kind>-<uuid8>` when not supplied.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Type identifier (e.g. `"temperature"`).
    pub kind: String,
    /// Interval between successive polls of this sensor.
    #[serde(with = "crate::config::duration_serde")]
    pub poll_interval: Duration,
    /// Open metadata mapping for deployment-specific details.
    pub metadata: HashMap<String, serde_json::Value>,
}

impl SensorDescriptor {
    /// Create a descriptor with a generated id.
    pub fn new(name: impl Into<String>, kind: impl Into<String>, poll_interval: Duration) -> Self {
        let kind = kind.into();
        let id = format!("{kind}-{}", &Uuid::new_v4().simple().to_string()[..8]);
        Self {
            id,
            name: name.into(),
            kind,
            poll_interval,
            metadata: HashMap::new(),
        }
    }

    /// Replace the generated id, builder style.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Attach a metadata entry, builder style.
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A source of readings that the scheduler can poll.
///
/// Implementations own their connection state. `initialize` is called once
/// by the polling task before the first read; a failed initialization ends
/// that sensor's task without affecting the rest of the network.
#[async_trait]
pub trait Sensor: Send + Sync {
    /// Static descriptor: identity, kind, poll interval.
    fn descriptor(&self) -> &SensorDescriptor;

    /// Establish the connection to the underlying source.
    async fn initialize(&mut self) -> Result<(), SensorError>;

    /// Acquire one reading.
    async fn read(&mut self) -> Result<Reading, SensorError>;
}

/// Shared handle to a registered sensor.
///
/// Only the sensor's own polling task locks this during a run, so reads
/// stay single-writer per sensor id.
pub type SharedSensor = Arc<tokio::sync::Mutex<Box<dyn Sensor>>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_id_generation() {
        let d = SensorDescriptor::new("Greenhouse", "temperature", Duration::from_secs(2));
        assert!(d.id.starts_with("temperature-"));
        assert_eq!(d.id.len(), "temperature-".len() + 8);

        let other = SensorDescriptor::new("Greenhouse", "temperature", Duration::from_secs(2));
        assert_ne!(d.id, other.id);
    }

    #[test]
    fn test_descriptor_builders() {
        let d = SensorDescriptor::new("Cellar", "humidity", Duration::from_secs(5))
            .with_id("cellar-hum")
            .with_metadata("location", "basement");
        assert_eq!(d.id, "cellar-hum");
        assert_eq!(d.metadata["location"], "basement");
    }
}
