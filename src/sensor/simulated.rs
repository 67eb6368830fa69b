//! Simulated sensors producing random-walk values.
//!
//! Each simulated sensor wanders within a configured band, adding uniform
//! noise and a small drift on every read. Useful for development and tests
//! when physical hardware is unavailable.

use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;

use crate::error::SensorError;
use crate::sensor::types::{fields, Reading};
use crate::sensor::{Sensor, SensorDescriptor};

/// A virtual sensor that generates simulated data.
pub struct SimulatedSensor {
    descriptor: SensorDescriptor,
    field: String,
    min_value: f64,
    max_value: f64,
    noise_level: f64,
    current: f64,
    initialized: bool,
}

impl SimulatedSensor {
    /// Create a simulated sensor emitting `field` values in `[min, max]`.
    pub fn new(
        name: impl Into<String>,
        kind: impl Into<String>,
        field: impl Into<String>,
        poll_interval: Duration,
        min_value: f64,
        max_value: f64,
        noise_level: f64,
    ) -> Self {
        Self {
            descriptor: SensorDescriptor::new(name, kind, poll_interval),
            field: field.into(),
            min_value,
            max_value,
            noise_level,
            current: (min_value + max_value) / 2.0,
            initialized: false,
        }
    }

    /// Indoor temperature profile: 15-30 C with light noise.
    pub fn temperature(name: impl Into<String>, poll_interval: Duration) -> Self {
        Self::new(
            name,
            "temperature",
            fields::TEMPERATURE,
            poll_interval,
            15.0,
            30.0,
            0.2,
        )
    }

    /// Indoor humidity profile: 30-70% relative humidity.
    pub fn humidity(name: impl Into<String>, poll_interval: Duration) -> Self {
        Self::new(
            name,
            "humidity",
            fields::HUMIDITY,
            poll_interval,
            30.0,
            70.0,
            0.5,
        )
    }

    /// Atmospheric pressure profile: 980-1040 hPa.
    pub fn pressure(name: impl Into<String>, poll_interval: Duration) -> Self {
        Self::new(
            name,
            "pressure",
            fields::PRESSURE,
            poll_interval,
            980.0,
            1040.0,
            0.8,
        )
    }

    /// Ambient light profile: 100-900 lux.
    pub fn light(name: impl Into<String>, poll_interval: Duration) -> Self {
        Self::new(
            name,
            "light",
            fields::LIGHT_LEVEL,
            poll_interval,
            100.0,
            900.0,
            25.0,
        )
    }

    /// Override the value band, builder style. Resets the walk to the
    /// midpoint of the new band.
    pub fn with_range(mut self, min_value: f64, max_value: f64) -> Self {
        self.min_value = min_value;
        self.max_value = max_value;
        self.current = (min_value + max_value) / 2.0;
        self
    }

    /// Override the noise amplitude, builder style.
    pub fn with_noise(mut self, noise_level: f64) -> Self {
        self.noise_level = noise_level;
        self
    }

    /// Override the generated id, builder style.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.descriptor = self.descriptor.with_id(id);
        self
    }
}

#[async_trait]
impl Sensor for SimulatedSensor {
    fn descriptor(&self) -> &SensorDescriptor {
        &self.descriptor
    }

    async fn initialize(&mut self) -> Result<(), SensorError> {
        tracing::debug!(sensor_id = %self.descriptor.id, "initializing simulated sensor");
        self.initialized = true;
        Ok(())
    }

    async fn read(&mut self) -> Result<Reading, SensorError> {
        if !self.initialized {
            self.initialize().await?;
        }

        let (noise, drift) = {
            let mut rng = rand::thread_rng();
            (
                rng.gen_range(-self.noise_level..=self.noise_level),
                rng.gen_range(-0.1..=0.1),
            )
        };

        self.current = (self.current + noise + drift).clamp(self.min_value, self.max_value);

        Ok(Reading::new(self.descriptor.id.clone()).with_field(self.field.clone(), self.current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_readings_stay_within_band() {
        let mut sensor = SimulatedSensor::temperature("Test Temp", Duration::from_millis(10));
        sensor.initialize().await.unwrap();

        for _ in 0..200 {
            let reading = sensor.read().await.unwrap();
            let value = reading.field(fields::TEMPERATURE).unwrap();
            assert!((15.0..=30.0).contains(&value), "out of band: {value}");
        }
    }

    #[tokio::test]
    async fn test_read_initializes_lazily() {
        let mut sensor = SimulatedSensor::humidity("Test Hum", Duration::from_millis(10));
        let reading = sensor.read().await.unwrap();
        assert!(reading.field(fields::HUMIDITY).is_some());
    }

    #[tokio::test]
    async fn test_range_override() {
        let mut sensor = SimulatedSensor::light("Test Light", Duration::from_millis(10))
            .with_range(0.0, 10.0)
            .with_noise(0.5);
        for _ in 0..50 {
            let value = sensor.read().await.unwrap().field(fields::LIGHT_LEVEL).unwrap();
            assert!((0.0..=10.0).contains(&value));
        }
    }
}
