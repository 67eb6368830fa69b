//! Concurrent polling: one task per sensor plus a supervisor loop.
//!
//! Each polling task runs the cycle read → store append → alert evaluation
//! → interval sleep, and exits promptly once the network stops. Failures
//! are isolated: a sensor whose initialization fails, or whose reads keep
//! failing, ends its own task in [`TaskState::Failed`] without disturbing
//! any other sensor or the network itself.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::alert::AlertEngine;
use crate::sensor::{SensorDescriptor, SharedSensor};
use crate::store::ReadingStore;

/// Consecutive read failures tolerated before a task gives up.
const MAX_CONSECUTIVE_FAILURES: u32 = 3;

/// How often the supervisor sweeps for finished tasks.
const SUPERVISOR_SWEEP_INTERVAL: Duration = Duration::from_millis(500);

/// Lifecycle of one sensor's polling task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Idle,
    Initializing,
    Polling,
    Stopping,
    Stopped,
    Failed,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Initializing => write!(f, "initializing"),
            Self::Polling => write!(f, "polling"),
            Self::Stopping => write!(f, "stopping"),
            Self::Stopped => write!(f, "stopped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

type StateMap = Arc<StdMutex<HashMap<String, TaskState>>>;
type TaskMap = Arc<Mutex<HashMap<String, JoinHandle<()>>>>;

/// Owns the per-sensor polling tasks and their stop signal.
pub(crate) struct PollScheduler {
    store: Arc<ReadingStore>,
    engine: Arc<AlertEngine>,
    /// `true` while the network runs; every task watches this.
    running: watch::Sender<bool>,
    tasks: TaskMap,
    states: StateMap,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl PollScheduler {
    pub(crate) fn new(store: Arc<ReadingStore>, engine: Arc<AlertEngine>) -> Self {
        let (running, _) = watch::channel(false);
        Self {
            store,
            engine,
            running,
            tasks: Arc::new(Mutex::new(HashMap::new())),
            states: Arc::new(StdMutex::new(HashMap::new())),
            supervisor: Mutex::new(None),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    /// Start a polling task for every given sensor plus the supervisor.
    pub(crate) async fn start(&self, sensors: Vec<(SensorDescriptor, SharedSensor)>) {
        self.running.send_replace(true);

        for (descriptor, sensor) in sensors {
            self.spawn_task(descriptor, sensor).await;
        }

        let supervisor = tokio::spawn(supervise(
            self.tasks.clone(),
            self.states.clone(),
            self.running.subscribe(),
        ));
        *self.supervisor.lock().await = Some(supervisor);
    }

    /// Begin polling one sensor. Safe to call while running; an existing
    /// task for the same id is aborted first.
    pub(crate) async fn spawn_task(&self, descriptor: SensorDescriptor, sensor: SharedSensor) {
        let sensor_id = descriptor.id.clone();
        set_state(&self.states, &sensor_id, TaskState::Idle);

        let handle = tokio::spawn(poll_sensor(
            descriptor,
            sensor,
            self.store.clone(),
            self.engine.clone(),
            self.running.subscribe(),
            self.states.clone(),
        ));

        if let Some(old) = self.tasks.lock().await.insert(sensor_id.clone(), handle) {
            old.abort();
        }
        tracing::debug!(sensor_id = %sensor_id, "started polling task");
    }

    /// Cancel one sensor's task and forget its state.
    pub(crate) async fn remove_task(&self, sensor_id: &str) {
        if let Some(handle) = self.tasks.lock().await.remove(sensor_id) {
            handle.abort();
            if let Err(e) = handle.await {
                if e.is_panic() {
                    tracing::error!(sensor_id, "polling task panicked before removal");
                }
            }
            tracing::debug!(sensor_id, "cancelled polling task");
        }
        self.states
            .lock()
            .expect("task state lock poisoned")
            .remove(sensor_id);
    }

    /// Signal every task to stop and wait for each one to finish.
    ///
    /// Returns only after all tasks are reaped; a second call while
    /// already stopped is a no-op.
    pub(crate) async fn stop(&self) {
        let was_running = self.running.send_replace(false);
        if !was_running {
            return;
        }

        if let Some(supervisor) = self.supervisor.lock().await.take() {
            let _ = supervisor.await;
        }

        let handles: Vec<(String, JoinHandle<()>)> =
            self.tasks.lock().await.drain().collect();
        for (sensor_id, handle) in handles {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    tracing::error!(sensor_id = %sensor_id, "polling task panicked during shutdown");
                    set_state(&self.states, &sensor_id, TaskState::Failed);
                }
            }
        }

        tracing::info!("all polling tasks stopped");
    }

    /// Current task state per sensor id.
    pub(crate) fn task_states(&self) -> HashMap<String, TaskState> {
        self.states
            .lock()
            .expect("task state lock poisoned")
            .clone()
    }
}

fn set_state(states: &StateMap, sensor_id: &str, state: TaskState) {
    states
        .lock()
        .expect("task state lock poisoned")
        .insert(sensor_id.to_string(), state);
}

/// Reap finished polling tasks and surface their outcome.
///
/// A task that ends on its own (failed initialization, repeated read
/// failures, panic) is removed from the registry here so the rest of the
/// network keeps running undisturbed.
async fn supervise(tasks: TaskMap, states: StateMap, mut running: watch::Receiver<bool>) {
    let mut sweep = tokio::time::interval(SUPERVISOR_SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = sweep.tick() => {
                let finished: Vec<(String, JoinHandle<()>)> = {
                    let mut tasks = tasks.lock().await;
                    let ids: Vec<String> = tasks
                        .iter()
                        .filter(|(_, handle)| handle.is_finished())
                        .map(|(id, _)| id.clone())
                        .collect();
                    ids.into_iter()
                        .filter_map(|id| tasks.remove(&id).map(|handle| (id, handle)))
                        .collect()
                };

                for (sensor_id, handle) in finished {
                    match handle.await {
                        Ok(()) => {
                            tracing::debug!(sensor_id = %sensor_id, "polling task finished")
                        }
                        Err(e) if e.is_panic() => {
                            tracing::error!(sensor_id = %sensor_id, "polling task panicked");
                            set_state(&states, &sensor_id, TaskState::Failed);
                        }
                        Err(_) => {}
                    }
                }
            }
            changed = running.changed() => {
                if changed.is_err() || !*running.borrow() {
                    break;
                }
            }
        }
    }
}

/// The per-sensor polling loop.
async fn poll_sensor(
    descriptor: SensorDescriptor,
    sensor: SharedSensor,
    store: Arc<ReadingStore>,
    engine: Arc<AlertEngine>,
    mut running: watch::Receiver<bool>,
    states: StateMap,
) {
    let sensor_id = descriptor.id.clone();

    set_state(&states, &sensor_id, TaskState::Initializing);
    {
        let mut sensor = sensor.lock().await;
        if let Err(error) = sensor.initialize().await {
            tracing::error!(sensor_id = %sensor_id, %error, "sensor initialization failed");
            set_state(&states, &sensor_id, TaskState::Failed);
            return;
        }
    }

    set_state(&states, &sensor_id, TaskState::Polling);
    tracing::info!(
        sensor_id = %sensor_id,
        name = %descriptor.name,
        interval_ms = descriptor.poll_interval.as_millis() as u64,
        "polling started"
    );

    let mut consecutive_failures: u32 = 0;

    loop {
        if !*running.borrow() {
            break;
        }

        // An in-flight read is allowed to finish; only the sleep below is
        // interrupted by the stop signal.
        let result = { sensor.lock().await.read().await };

        match result {
            Ok(reading) => {
                consecutive_failures = 0;
                store.append(reading.clone()).await;
                engine.evaluate(&sensor_id, &reading).await;

                let total = store.count(&sensor_id).await;
                if total % 100 == 0 {
                    tracing::info!(sensor_id = %sensor_id, total, "collected readings");
                } else {
                    tracing::debug!(sensor_id = %sensor_id, "new reading");
                }
            }
            Err(error) => {
                consecutive_failures += 1;
                tracing::warn!(
                    sensor_id = %sensor_id,
                    %error,
                    consecutive_failures,
                    "sensor read failed, skipping cycle"
                );
                if consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                    tracing::error!(
                        sensor_id = %sensor_id,
                        "giving up after {MAX_CONSECUTIVE_FAILURES} consecutive read failures"
                    );
                    set_state(&states, &sensor_id, TaskState::Failed);
                    return;
                }
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(descriptor.poll_interval) => {}
            _ = running.changed() => {}
        }
    }

    set_state(&states, &sensor_id, TaskState::Stopping);
    tracing::debug!(sensor_id = %sensor_id, "polling task stopping");
    set_state(&states, &sensor_id, TaskState::Stopped);
}
