//! Configuration for the terrasense runtime.
//!
//! A JSON file describes the network name, the default poll interval, the
//! simulated sensors to create at startup, and alert rules to seed. Alert
//! rules reference sensors by their configured name; the binary attaches a
//! console action to each when it builds the network.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::alert::Threshold;
use crate::sensor::SimulatedSensor;

/// Main configuration for a sensor network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Human-readable network name
    pub name: String,

    /// Default interval between polls, for sensors without their own
    #[serde(with = "duration_serde")]
    pub poll_interval: Duration,

    /// Simulated sensors to create at startup
    #[serde(default)]
    pub sensors: Vec<SensorSpec>,

    /// Alert rules to register once the sensors exist
    #[serde(default)]
    pub alerts: Vec<AlertRuleSpec>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            name: "terrasense".to_string(),
            poll_interval: Duration::from_secs(1),
            sensors: Vec::new(),
            alerts: Vec::new(),
        }
    }
}

impl NetworkConfig {
    /// Load configuration from the default location, or defaults if the
    /// file does not exist yet.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
            let config: NetworkConfig =
                serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::Io(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("terrasense")
            .join("config.json")
    }

    /// A ready-made indoor monitoring setup for demos and first runs.
    pub fn demo() -> Self {
        Self {
            name: "Demo Network".to_string(),
            poll_interval: Duration::from_secs(1),
            sensors: vec![
                SensorSpec {
                    name: "Living Room Temperature".to_string(),
                    kind: SensorKind::Temperature,
                    interval_secs: Some(2.0),
                    min_value: Some(18.0),
                    max_value: Some(26.0),
                    noise_level: Some(0.2),
                },
                SensorSpec {
                    name: "Outdoor Temperature".to_string(),
                    kind: SensorKind::Temperature,
                    interval_secs: Some(5.0),
                    min_value: Some(10.0),
                    max_value: Some(35.0),
                    noise_level: Some(0.5),
                },
                SensorSpec {
                    name: "Living Room Humidity".to_string(),
                    kind: SensorKind::Humidity,
                    interval_secs: Some(3.0),
                    min_value: Some(30.0),
                    max_value: Some(60.0),
                    noise_level: Some(0.5),
                },
            ],
            alerts: vec![AlertRuleSpec {
                sensor: "Outdoor Temperature".to_string(),
                field: "temperature".to_string(),
                operator: "gt".to_string(),
                threshold: Threshold::Value(30.0),
                hysteresis: 0.0,
                cooldown_secs: 60,
                name: Some("Outdoor heat warning".to_string()),
            }],
        }
    }
}

/// Supported simulated sensor kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    Temperature,
    Humidity,
    Pressure,
    Light,
}

/// One simulated sensor entry in the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorSpec {
    pub name: String,
    pub kind: SensorKind,
    /// Poll interval override in seconds
    #[serde(default)]
    pub interval_secs: Option<f64>,
    #[serde(default)]
    pub min_value: Option<f64>,
    #[serde(default)]
    pub max_value: Option<f64>,
    #[serde(default)]
    pub noise_level: Option<f64>,
}

impl SensorSpec {
    /// Build the simulated sensor this entry describes.
    pub fn build(&self, default_interval: Duration) -> SimulatedSensor {
        let interval = self
            .interval_secs
            .map(Duration::from_secs_f64)
            .unwrap_or(default_interval);

        let mut sensor = match self.kind {
            SensorKind::Temperature => SimulatedSensor::temperature(&self.name, interval),
            SensorKind::Humidity => SimulatedSensor::humidity(&self.name, interval),
            SensorKind::Pressure => SimulatedSensor::pressure(&self.name, interval),
            SensorKind::Light => SimulatedSensor::light(&self.name, interval),
        };

        if let (Some(min), Some(max)) = (self.min_value, self.max_value) {
            sensor = sensor.with_range(min, max);
        }
        if let Some(noise) = self.noise_level {
            sensor = sensor.with_noise(noise);
        }
        sensor
    }
}

/// One alert rule entry in the configuration file.
///
/// `sensor` references a [`SensorSpec`] by name; `threshold` accepts a
/// bare number or a `[low, high]` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRuleSpec {
    pub sensor: String,
    pub field: String,
    pub operator: String,
    pub threshold: Threshold,
    #[serde(default)]
    pub hysteresis: f64,
    #[serde(default)]
    pub cooldown_secs: u64,
    #[serde(default)]
    pub name: Option<String>,
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Serialize error: {0}")]
    Serialize(String),
}

/// Serde support for Duration as fractional seconds.
pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::Sensor;

    #[test]
    fn test_default_config() {
        let config = NetworkConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert!(config.sensors.is_empty());
        assert!(config.alerts.is_empty());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = NetworkConfig::demo();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: NetworkConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.name, config.name);
        assert_eq!(parsed.poll_interval, config.poll_interval);
        assert_eq!(parsed.sensors.len(), 3);
        assert_eq!(parsed.alerts.len(), 1);
        assert_eq!(parsed.alerts[0].threshold, Threshold::Value(30.0));
    }

    #[test]
    fn test_range_threshold_parses_from_config() {
        let json = r#"{
            "sensor": "Living Room Temperature",
            "field": "temperature",
            "operator": "between",
            "threshold": [18.0, 26.0]
        }"#;
        let rule: AlertRuleSpec = serde_json::from_str(json).unwrap();
        assert_eq!(rule.threshold, Threshold::Range(18.0, 26.0));
        assert_eq!(rule.cooldown_secs, 0);
    }

    #[test]
    fn test_sensor_spec_build_applies_overrides() {
        let spec = SensorSpec {
            name: "Cellar".to_string(),
            kind: SensorKind::Humidity,
            interval_secs: Some(0.5),
            min_value: Some(40.0),
            max_value: Some(80.0),
            noise_level: None,
        };

        let sensor = spec.build(Duration::from_secs(1));
        let descriptor = sensor.descriptor();
        assert_eq!(descriptor.kind, "humidity");
        assert_eq!(descriptor.poll_interval, Duration::from_millis(500));
    }
}
