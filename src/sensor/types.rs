//! Reading types shared by every sensor capability.
//!
//! A reading carries its values in a field map so alert conditions can look
//! them up by name at evaluation time; a field missing from a reading is a
//! skip, not an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ValidationError;

/// Field names used by the built-in environmental reading kinds.
pub mod fields {
    /// Temperature in degrees Celsius.
    pub const TEMPERATURE: &str = "temperature";
    /// Relative humidity percentage (0-100).
    pub const HUMIDITY: &str = "humidity";
    /// Atmospheric pressure in hPa.
    pub const PRESSURE: &str = "pressure";
    /// Light level in lux.
    pub const LIGHT_LEVEL: &str = "light_level";
}

/// A single timestamped measurement produced by a sensor.
///
/// Readings are immutable once created; the store that receives one owns
/// it from then on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reading {
    /// Id of the sensor that produced this reading.
    pub sensor_id: String,
    /// When the reading was taken.
    pub timestamp: DateTime<Utc>,
    /// Measured values, keyed by field name.
    pub fields: HashMap<String, f64>,
}

impl Reading {
    /// Create an empty reading stamped with the current time.
    pub fn new(sensor_id: impl Into<String>) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            timestamp: Utc::now(),
            fields: HashMap::new(),
        }
    }

    /// Add a field value, builder style.
    pub fn with_field(mut self, name: impl Into<String>, value: f64) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Replace the timestamp, builder style.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Look up a field value by name.
    pub fn field(&self, name: &str) -> Option<f64> {
        self.fields.get(name).copied()
    }

    /// Temperature reading in degrees Celsius.
    pub fn temperature(sensor_id: impl Into<String>, degrees_c: f64) -> Self {
        Self::new(sensor_id).with_field(fields::TEMPERATURE, degrees_c)
    }

    /// Relative humidity reading. Rejects values outside 0-100%.
    pub fn humidity(sensor_id: impl Into<String>, percent: f64) -> Result<Self, ValidationError> {
        if !(0.0..=100.0).contains(&percent) {
            return Err(ValidationError::OutOfRange {
                field: fields::HUMIDITY,
                value: percent,
                min: 0.0,
                max: 100.0,
            });
        }
        Ok(Self::new(sensor_id).with_field(fields::HUMIDITY, percent))
    }

    /// Atmospheric pressure reading in hPa.
    pub fn pressure(sensor_id: impl Into<String>, hpa: f64) -> Self {
        Self::new(sensor_id).with_field(fields::PRESSURE, hpa)
    }

    /// Light level reading in lux.
    pub fn light(sensor_id: impl Into<String>, lux: f64) -> Self {
        Self::new(sensor_id).with_field(fields::LIGHT_LEVEL, lux)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_lookup() {
        let reading = Reading::temperature("temp-1", 21.5);
        assert_eq!(reading.field(fields::TEMPERATURE), Some(21.5));
        assert_eq!(reading.field(fields::HUMIDITY), None);
    }

    #[test]
    fn test_humidity_range_validation() {
        assert!(Reading::humidity("hum-1", 55.0).is_ok());
        assert!(Reading::humidity("hum-1", 0.0).is_ok());
        assert!(Reading::humidity("hum-1", 100.0).is_ok());

        let err = Reading::humidity("hum-1", 104.2).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { .. }));
        assert!(Reading::humidity("hum-1", -1.0).is_err());
    }

    #[test]
    fn test_builder_accumulates_fields() {
        let reading = Reading::new("multi-1")
            .with_field("temperature", 20.0)
            .with_field("humidity", 40.0);
        assert_eq!(reading.fields.len(), 2);
        assert_eq!(reading.sensor_id, "multi-1");
    }
}
