//! Alert data model: conditions, thresholds, and actions.
//!
//! An alert binds one condition over one field of one sensor's readings to
//! an ordered list of actions. The [`engine::AlertEngine`] evaluates
//! registered alerts against incoming readings and drives the
//! triggered/cleared state machine.

pub mod engine;

pub use engine::AlertEngine;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ValidationError;
use crate::sensor::types::Reading;

/// Comparison operator applied to one reading field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    Gt,
    Lt,
    Eq,
    Neq,
    Between,
}

impl FromStr for CompareOp {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gt" => Ok(Self::Gt),
            "lt" => Ok(Self::Lt),
            "eq" => Ok(Self::Eq),
            "neq" => Ok(Self::Neq),
            "between" => Ok(Self::Between),
            _ => Err(ValidationError::InvalidOperator(s.to_string())),
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gt => write!(f, "gt"),
            Self::Lt => write!(f, "lt"),
            Self::Eq => write!(f, "eq"),
            Self::Neq => write!(f, "neq"),
            Self::Between => write!(f, "between"),
        }
    }
}

/// Threshold a field value is compared against.
///
/// Serializes untagged, so a bare number and a `[low, high]` pair both
/// parse directly from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Threshold {
    /// Single comparison value for `gt`/`lt`/`eq`/`neq`.
    Value(f64),
    /// Inclusive `(low, high)` pair for `between`.
    Range(f64, f64),
}

/// One condition over one field of one sensor's readings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertCondition {
    /// Sensor whose readings this condition watches.
    pub sensor_id: String,
    /// Field name looked up in each reading.
    pub field: String,
    pub operator: CompareOp,
    pub threshold: Threshold,
    /// Tolerance window for `eq`/`neq`, to avoid flapping on noisy values.
    pub hysteresis: f64,
}

impl AlertCondition {
    pub fn new(
        sensor_id: impl Into<String>,
        field: impl Into<String>,
        operator: CompareOp,
        threshold: Threshold,
    ) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            field: field.into(),
            operator,
            threshold,
            hysteresis: 0.0,
        }
    }

    /// Set the hysteresis buffer, builder style.
    pub fn with_hysteresis(mut self, buffer: f64) -> Self {
        self.hysteresis = buffer;
        self
    }

    /// Reject operator/threshold combinations that cannot be evaluated.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.hysteresis < 0.0 {
            return Err(ValidationError::NegativeHysteresis(self.hysteresis));
        }
        match (self.operator, self.threshold) {
            (CompareOp::Between, Threshold::Range(low, high)) => {
                if low <= high {
                    Ok(())
                } else {
                    Err(ValidationError::InvalidThreshold {
                        operator: self.operator.to_string(),
                        reason: format!("low bound {low} exceeds high bound {high}"),
                    })
                }
            }
            (CompareOp::Between, Threshold::Value(_)) => Err(ValidationError::InvalidThreshold {
                operator: self.operator.to_string(),
                reason: "requires a (low, high) range".to_string(),
            }),
            (op, Threshold::Range(..)) => Err(ValidationError::InvalidThreshold {
                operator: op.to_string(),
                reason: "range threshold is only valid for between".to_string(),
            }),
            (_, Threshold::Value(_)) => Ok(()),
        }
    }

    /// Whether a field value satisfies this condition.
    ///
    /// `between` bounds are inclusive; `eq`/`neq` apply the hysteresis
    /// buffer. Assumes [`validate`](Self::validate) has passed.
    pub fn is_met(&self, value: f64) -> bool {
        match (self.operator, self.threshold) {
            (CompareOp::Gt, Threshold::Value(t)) => value > t,
            (CompareOp::Lt, Threshold::Value(t)) => value < t,
            (CompareOp::Eq, Threshold::Value(t)) => (value - t).abs() <= self.hysteresis,
            (CompareOp::Neq, Threshold::Value(t)) => (value - t).abs() > self.hysteresis,
            (CompareOp::Between, Threshold::Range(low, high)) => low <= value && value <= high,
            _ => false,
        }
    }
}

/// Callback invoked when an alert fires.
pub type ActionFn = Arc<dyn Fn(&Reading) -> anyhow::Result<()> + Send + Sync>;

/// A named action attached to an alert.
///
/// Action failures are isolated: a failing callback is logged and the
/// remaining actions on the same trigger event still run.
#[derive(Clone)]
pub struct AlertAction {
    pub name: String,
    callback: ActionFn,
}

impl AlertAction {
    pub fn new(
        name: impl Into<String>,
        callback: impl Fn(&Reading) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            callback: Arc::new(callback),
        }
    }

    pub(crate) fn invoke(&self, reading: &Reading) -> anyhow::Result<()> {
        (self.callback)(reading)
    }
}

impl fmt::Debug for AlertAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertAction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Registration request for a new alert.
#[derive(Debug)]
pub struct AlertSpec {
    pub condition: AlertCondition,
    pub actions: Vec<AlertAction>,
    /// Optional display name; derived from the condition when absent.
    pub name: Option<String>,
    /// Minimum elapsed time between action-firing triggers.
    pub cooldown: Duration,
}

impl AlertSpec {
    pub fn new(condition: AlertCondition) -> Self {
        Self {
            condition,
            actions: Vec::new(),
            name: None,
            cooldown: Duration::ZERO,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_action(mut self, action: AlertAction) -> Self {
        self.actions.push(action);
        self
    }
}

/// A registered alert with its trigger state.
///
/// State is mutated only by the engine's evaluation step; alerts are never
/// destroyed automatically, only by explicit removal.
#[derive(Debug)]
pub struct Alert {
    pub id: String,
    pub name: String,
    pub condition: AlertCondition,
    pub actions: Vec<AlertAction>,
    pub triggered: bool,
    pub last_triggered: Option<DateTime<Utc>>,
    pub cooldown: Duration,
}

/// Serializable snapshot of an alert, with callbacks omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertInfo {
    pub id: String,
    pub name: String,
    pub condition: AlertCondition,
    pub action_names: Vec<String>,
    pub triggered: bool,
    pub last_triggered: Option<DateTime<Utc>>,
    pub cooldown_secs: f64,
}

impl From<&Alert> for AlertInfo {
    fn from(alert: &Alert) -> Self {
        Self {
            id: alert.id.clone(),
            name: alert.name.clone(),
            condition: alert.condition.clone(),
            action_names: alert.actions.iter().map(|a| a.name.clone()).collect(),
            triggered: alert.triggered,
            last_triggered: alert.last_triggered,
            cooldown_secs: alert.cooldown.as_secs_f64(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_parsing() {
        assert_eq!("gt".parse::<CompareOp>().unwrap(), CompareOp::Gt);
        assert_eq!("between".parse::<CompareOp>().unwrap(), CompareOp::Between);
        assert_eq!(CompareOp::Neq.to_string(), "neq");

        let err = "approximately".parse::<CompareOp>().unwrap_err();
        assert!(matches!(err, ValidationError::InvalidOperator(_)));
    }

    #[test]
    fn test_condition_validation() {
        let ok = AlertCondition::new("s1", "temperature", CompareOp::Gt, Threshold::Value(25.0));
        assert!(ok.validate().is_ok());

        let ok = AlertCondition::new(
            "s1",
            "temperature",
            CompareOp::Between,
            Threshold::Range(18.0, 26.0),
        );
        assert!(ok.validate().is_ok());

        // between needs a range
        let bad = AlertCondition::new("s1", "temperature", CompareOp::Between, Threshold::Value(25.0));
        assert!(matches!(
            bad.validate(),
            Err(ValidationError::InvalidThreshold { .. })
        ));

        // inverted range
        let bad = AlertCondition::new(
            "s1",
            "temperature",
            CompareOp::Between,
            Threshold::Range(26.0, 18.0),
        );
        assert!(bad.validate().is_err());

        // range only works with between
        let bad = AlertCondition::new("s1", "temperature", CompareOp::Gt, Threshold::Range(1.0, 2.0));
        assert!(bad.validate().is_err());

        let bad = AlertCondition::new("s1", "temperature", CompareOp::Eq, Threshold::Value(25.0))
            .with_hysteresis(-0.5);
        assert!(matches!(
            bad.validate(),
            Err(ValidationError::NegativeHysteresis(_))
        ));
    }

    #[test]
    fn test_between_is_inclusive() {
        let cond = AlertCondition::new(
            "s1",
            "temperature",
            CompareOp::Between,
            Threshold::Range(18.0, 26.0),
        );
        assert!(cond.is_met(20.0));
        assert!(cond.is_met(18.0));
        assert!(cond.is_met(26.0));
        assert!(!cond.is_met(26.01));
        assert!(!cond.is_met(17.99));
    }

    #[test]
    fn test_eq_neq_use_hysteresis_buffer() {
        let eq = AlertCondition::new("s1", "humidity", CompareOp::Eq, Threshold::Value(50.0))
            .with_hysteresis(1.0);
        assert!(eq.is_met(50.9));
        assert!(eq.is_met(49.0));
        assert!(!eq.is_met(51.5));

        let neq = AlertCondition::new("s1", "humidity", CompareOp::Neq, Threshold::Value(50.0))
            .with_hysteresis(1.0);
        assert!(!neq.is_met(50.9));
        assert!(neq.is_met(51.5));
    }

    #[test]
    fn test_threshold_serde_shapes() {
        let value: Threshold = serde_json::from_str("25.5").unwrap();
        assert_eq!(value, Threshold::Value(25.5));

        let range: Threshold = serde_json::from_str("[18.0, 26.0]").unwrap();
        assert_eq!(range, Threshold::Range(18.0, 26.0));
    }
}
