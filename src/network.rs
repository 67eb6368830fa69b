//! Network orchestration: sensor registry, alert wiring, lifecycle.
//!
//! [`SensorNetwork`] composes the reading store, the alert engine, and the
//! polling scheduler behind one registration/lifecycle surface. All
//! operations return synchronously from the caller's perspective; polling
//! itself runs concurrently underneath.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::alert::{AlertEngine, AlertInfo, AlertSpec};
use crate::error::ValidationError;
use crate::scheduler::{PollScheduler, TaskState};
use crate::sensor::types::Reading;
use crate::sensor::{Sensor, SensorDescriptor, SharedSensor};
use crate::store::{ReadingQuery, ReadingStore};

struct SensorEntry {
    descriptor: SensorDescriptor,
    sensor: SharedSensor,
}

/// Point-in-time summary of the network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkStatus {
    pub name: String,
    pub running: bool,
    pub sensor_count: usize,
    pub alert_count: usize,
    /// Default poll interval for sensors that do not set their own.
    pub update_interval_secs: f64,
    pub sensors: Vec<SensorStatus>,
}

/// Per-sensor slice of [`NetworkStatus`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorStatus {
    pub id: String,
    pub name: String,
    pub kind: String,
    /// `None` until the sensor's polling task has been created.
    pub task_state: Option<TaskState>,
}

/// Central orchestrator for a network of sensors.
pub struct SensorNetwork {
    name: String,
    update_interval: Duration,
    sensors: RwLock<HashMap<String, SensorEntry>>,
    store: Arc<ReadingStore>,
    engine: Arc<AlertEngine>,
    scheduler: PollScheduler,
}

impl SensorNetwork {
    /// Create an empty, stopped network.
    pub fn new(name: impl Into<String>, update_interval: Duration) -> Self {
        let name = name.into();
        let store = Arc::new(ReadingStore::new());
        let engine = Arc::new(AlertEngine::new());
        let scheduler = PollScheduler::new(store.clone(), engine.clone());

        tracing::info!(
            name = %name,
            interval_secs = update_interval.as_secs_f64(),
            "initialized sensor network"
        );

        Self {
            name,
            update_interval,
            sensors: RwLock::new(HashMap::new()),
            store,
            engine,
            scheduler,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a sensor and return its id.
    ///
    /// An existing sensor with the same id is replaced (with a warning)
    /// and its old polling task cancelled. If the network is running, the
    /// new sensor's task starts immediately without disturbing the rest.
    pub async fn add_sensor(&self, sensor: Box<dyn Sensor>) -> String {
        let descriptor = sensor.descriptor().clone();
        let id = descriptor.id.clone();
        let shared: SharedSensor = Arc::new(tokio::sync::Mutex::new(sensor));

        let replaced = {
            let mut sensors = self.sensors.write().await;
            sensors
                .insert(
                    id.clone(),
                    SensorEntry {
                        descriptor: descriptor.clone(),
                        sensor: shared.clone(),
                    },
                )
                .is_some()
        };

        if replaced {
            tracing::warn!(sensor_id = %id, "sensor id already registered, replacing");
            self.scheduler.remove_task(&id).await;
        }

        if self.scheduler.is_running() {
            self.scheduler.spawn_task(descriptor.clone(), shared).await;
        }

        tracing::info!(
            sensor_id = %id,
            name = %descriptor.name,
            kind = %descriptor.kind,
            "added sensor"
        );
        id
    }

    /// Remove a sensor, cancelling its polling task and dropping its
    /// reading history. Returns `false` for unknown ids, a routine case
    /// rather than an error.
    pub async fn remove_sensor(&self, sensor_id: &str) -> bool {
        let removed = self.sensors.write().await.remove(sensor_id);
        match removed {
            Some(entry) => {
                self.scheduler.remove_task(sensor_id).await;
                self.store.remove(sensor_id).await;
                tracing::info!(
                    sensor_id,
                    name = %entry.descriptor.name,
                    "removed sensor"
                );
                true
            }
            None => {
                tracing::warn!(sensor_id, "attempted to remove unknown sensor");
                false
            }
        }
    }

    /// Descriptors of every registered sensor.
    pub async fn sensors(&self) -> Vec<SensorDescriptor> {
        self.sensors
            .read()
            .await
            .values()
            .map(|entry| entry.descriptor.clone())
            .collect()
    }

    /// Descriptor for one sensor id.
    pub async fn get_sensor(&self, sensor_id: &str) -> Option<SensorDescriptor> {
        self.sensors
            .read()
            .await
            .get(sensor_id)
            .map(|entry| entry.descriptor.clone())
    }

    /// Create an alert against a registered sensor and return its id.
    ///
    /// Fails with a validation error, touching nothing, when the sensor
    /// id is unknown or the condition is malformed. The sensor id
    /// is checked at creation time only; removing the sensor later leaves
    /// the alert in place, it simply stops seeing readings.
    pub async fn add_alert(&self, spec: AlertSpec) -> Result<String, ValidationError> {
        if !self
            .sensors
            .read()
            .await
            .contains_key(&spec.condition.sensor_id)
        {
            return Err(ValidationError::UnknownSensor(
                spec.condition.sensor_id.clone(),
            ));
        }
        self.engine.register(spec).await
    }

    /// Remove an alert by id. Returns whether it existed.
    pub async fn remove_alert(&self, alert_id: &str) -> bool {
        self.engine.remove(alert_id).await
    }

    /// Snapshots of every registered alert.
    pub async fn alerts(&self) -> Vec<AlertInfo> {
        self.engine.list().await
    }

    /// Query a sensor's reading history.
    pub async fn readings(&self, sensor_id: &str, query: &ReadingQuery) -> Vec<Reading> {
        self.store.query(sensor_id, query).await
    }

    /// The most recent reading for a sensor.
    pub async fn latest_reading(&self, sensor_id: &str) -> Option<Reading> {
        self.store.latest(sensor_id).await
    }

    /// Start polling every registered sensor. No-op if already running.
    pub async fn start(&self) {
        if self.scheduler.is_running() {
            tracing::warn!(name = %self.name, "network already running");
            return;
        }

        let entries: Vec<(SensorDescriptor, SharedSensor)> = self
            .sensors
            .read()
            .await
            .values()
            .map(|entry| (entry.descriptor.clone(), entry.sensor.clone()))
            .collect();

        self.scheduler.start(entries).await;
        tracing::info!(name = %self.name, "sensor network started");
    }

    /// Stop polling and wait for every task to be reaped.
    ///
    /// No task is left running once this returns. A second stop while
    /// already stopped is a no-op.
    pub async fn stop(&self) {
        if !self.scheduler.is_running() {
            return;
        }
        self.scheduler.stop().await;
        tracing::info!(name = %self.name, "sensor network stopped");
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Counts, lifecycle flag, and per-sensor task states.
    pub async fn status(&self) -> NetworkStatus {
        let sensors = self.sensors.read().await;
        let states = self.scheduler.task_states();

        NetworkStatus {
            name: self.name.clone(),
            running: self.scheduler.is_running(),
            sensor_count: sensors.len(),
            alert_count: self.engine.count().await,
            update_interval_secs: self.update_interval.as_secs_f64(),
            sensors: sensors
                .values()
                .map(|entry| SensorStatus {
                    id: entry.descriptor.id.clone(),
                    name: entry.descriptor.name.clone(),
                    kind: entry.descriptor.kind.clone(),
                    task_state: states.get(&entry.descriptor.id).copied(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::{AlertCondition, CompareOp, Threshold};
    use crate::sensor::SimulatedSensor;

    fn temp_sensor(id: &str) -> Box<dyn Sensor> {
        Box::new(
            SimulatedSensor::temperature("Test Temp", Duration::from_millis(10)).with_id(id),
        )
    }

    #[tokio::test]
    async fn test_add_alert_requires_known_sensor() {
        let network = SensorNetwork::new("test", Duration::from_secs(1));
        network.add_sensor(temp_sensor("t1")).await;

        let ok = AlertSpec::new(AlertCondition::new(
            "t1",
            "temperature",
            CompareOp::Gt,
            Threshold::Value(25.0),
        ));
        assert!(network.add_alert(ok).await.is_ok());

        let unknown = AlertSpec::new(AlertCondition::new(
            "ghost",
            "temperature",
            CompareOp::Gt,
            Threshold::Value(25.0),
        ));
        let err = network.add_alert(unknown).await.unwrap_err();
        assert!(matches!(err, ValidationError::UnknownSensor(_)));

        // the failed registration mutated nothing
        assert_eq!(network.alerts().await.len(), 1);
    }

    #[tokio::test]
    async fn test_alert_ids_are_unique_across_operators() {
        let network = SensorNetwork::new("test", Duration::from_secs(1));
        network.add_sensor(temp_sensor("t1")).await;

        let mut ids = Vec::new();
        for (operator, threshold) in [
            (CompareOp::Gt, Threshold::Value(25.0)),
            (CompareOp::Lt, Threshold::Value(5.0)),
            (CompareOp::Eq, Threshold::Value(20.0)),
            (CompareOp::Neq, Threshold::Value(20.0)),
            (CompareOp::Between, Threshold::Range(18.0, 26.0)),
        ] {
            let spec = AlertSpec::new(AlertCondition::new(
                "t1",
                "temperature",
                operator,
                threshold,
            ));
            ids.push(network.add_alert(spec).await.unwrap());
        }

        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 5);
    }

    #[tokio::test]
    async fn test_remove_sensor_reports_unknown() {
        let network = SensorNetwork::new("test", Duration::from_secs(1));
        network.add_sensor(temp_sensor("t1")).await;

        assert!(network.remove_sensor("t1").await);
        assert!(!network.remove_sensor("t1").await);
    }

    #[tokio::test]
    async fn test_status_counts() {
        let network = SensorNetwork::new("greenhouse", Duration::from_secs(2));
        network.add_sensor(temp_sensor("t1")).await;
        network.add_sensor(temp_sensor("t2")).await;

        let status = network.status().await;
        assert_eq!(status.name, "greenhouse");
        assert!(!status.running);
        assert_eq!(status.sensor_count, 2);
        assert_eq!(status.alert_count, 0);
        assert_eq!(status.update_interval_secs, 2.0);
        // tasks have never been created
        assert!(status.sensors.iter().all(|s| s.task_state.is_none()));
    }
}
