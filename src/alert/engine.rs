//! Alert evaluation: edge-triggered transitions with cooldown gating.
//!
//! The engine owns every registered [`Alert`] and evaluates the ones
//! watching a given sensor each time that sensor produces a reading. A
//! fresh trigger edge requires the condition newly met AND an elapsed
//! cooldown; clearing is immediate and unconditional once the condition
//! goes false. While triggered, an alert never re-fires; it must clear
//! first.

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::alert::{Alert, AlertInfo, AlertSpec};
use crate::error::ValidationError;
use crate::sensor::types::Reading;

/// Outcome of one evaluation step for one alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    /// Trigger edge: flip to triggered, stamp the time, run actions.
    Fire,
    /// Condition went false while triggered: flip back, run nothing.
    Clear,
    /// No state change.
    Hold,
}

/// Edge-triggered transition table over
/// `(condition_met, triggered, cooldown_ok)`.
///
/// A suppressed edge (condition met, cleared state, cooldown still
/// running) holds: `triggered` stays false and the alert fires on the
/// first evaluation after the cooldown elapses while the condition still
/// holds.
fn transition(condition_met: bool, triggered: bool, cooldown_ok: bool) -> Transition {
    match (condition_met, triggered, cooldown_ok) {
        (true, false, true) => Transition::Fire,
        (false, true, _) => Transition::Clear,
        _ => Transition::Hold,
    }
}

/// Registry and evaluator for alerts.
///
/// One engine-level lock serializes evaluation, so no two evaluations of
/// the same alert ever race on its state.
#[derive(Debug, Default)]
pub struct AlertEngine {
    alerts: Mutex<Vec<Alert>>,
}

impl AlertEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new alert and return its generated id.
    ///
    /// Validates the condition's operator/threshold shape; the caller is
    /// responsible for checking that the sensor id exists. No state is
    /// touched on a validation failure.
    pub async fn register(&self, spec: AlertSpec) -> Result<String, ValidationError> {
        spec.condition.validate()?;

        let id = format!("alert-{}", &Uuid::new_v4().simple().to_string()[..8]);
        let name = spec.name.unwrap_or_else(|| {
            format!(
                "Alert for {}.{}",
                spec.condition.sensor_id, spec.condition.field
            )
        });

        tracing::info!(
            alert_id = %id,
            name = %name,
            sensor_id = %spec.condition.sensor_id,
            field = %spec.condition.field,
            operator = %spec.condition.operator,
            "registered alert"
        );

        self.alerts.lock().await.push(Alert {
            id: id.clone(),
            name,
            condition: spec.condition,
            actions: spec.actions,
            triggered: false,
            last_triggered: None,
            cooldown: spec.cooldown,
        });

        Ok(id)
    }

    /// Remove an alert by id. Returns whether it existed.
    pub async fn remove(&self, id: &str) -> bool {
        let mut alerts = self.alerts.lock().await;
        let len_before = alerts.len();
        alerts.retain(|a| a.id != id);
        let removed = alerts.len() < len_before;
        if removed {
            tracing::info!(alert_id = %id, "removed alert");
        }
        removed
    }

    /// Snapshots of every registered alert.
    pub async fn list(&self) -> Vec<AlertInfo> {
        self.alerts.lock().await.iter().map(AlertInfo::from).collect()
    }

    pub async fn count(&self) -> usize {
        self.alerts.lock().await.len()
    }

    /// Evaluate every alert watching `sensor_id` against a new reading.
    pub async fn evaluate(&self, sensor_id: &str, reading: &Reading) {
        self.evaluate_at(sensor_id, reading, Utc::now()).await;
    }

    /// Evaluation with an explicit clock, for deterministic tests.
    pub async fn evaluate_at(&self, sensor_id: &str, reading: &Reading, now: DateTime<Utc>) {
        let mut alerts = self.alerts.lock().await;

        for alert in alerts.iter_mut() {
            if alert.condition.sensor_id != sensor_id {
                continue;
            }

            let value = match reading.field(&alert.condition.field) {
                Some(value) => value,
                None => {
                    tracing::warn!(
                        alert_id = %alert.id,
                        sensor_id,
                        field = %alert.condition.field,
                        "field missing from reading, skipping alert"
                    );
                    continue;
                }
            };

            let condition_met = alert.condition.is_met(value);
            let cooldown_ok = alert.last_triggered.map_or(true, |last| {
                now.signed_duration_since(last)
                    .to_std()
                    .map_or(false, |elapsed| elapsed > alert.cooldown)
            });

            match transition(condition_met, alert.triggered, cooldown_ok) {
                Transition::Fire => {
                    alert.triggered = true;
                    alert.last_triggered = Some(now);
                    tracing::warn!(
                        alert_id = %alert.id,
                        name = %alert.name,
                        field = %alert.condition.field,
                        value,
                        "alert triggered"
                    );

                    for action in &alert.actions {
                        match action.invoke(reading) {
                            Ok(()) => tracing::info!(
                                alert_id = %alert.id,
                                action = %action.name,
                                "executed alert action"
                            ),
                            Err(error) => tracing::error!(
                                alert_id = %alert.id,
                                action = %action.name,
                                %error,
                                "alert action failed"
                            ),
                        }
                    }
                }
                Transition::Clear => {
                    alert.triggered = false;
                    tracing::info!(
                        alert_id = %alert.id,
                        name = %alert.name,
                        value,
                        "alert cleared"
                    );
                }
                Transition::Hold => {
                    if condition_met && !alert.triggered {
                        tracing::debug!(
                            alert_id = %alert.id,
                            "trigger edge suppressed by cooldown"
                        );
                    }
                }
            }
        }
    }
}
