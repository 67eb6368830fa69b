//! Terrasense - concurrent environmental sensor-network runtime.
//!
//! This library monitors a fleet of environmental sensors, retains their
//! readings in memory, and evaluates alert conditions against incoming
//! data in near real time. Polling runs one task per sensor; a slow or
//! failing sensor never blocks the others.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       SensorNetwork                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐    ┌───────────────┐    ┌───────────────┐   │
//! │  │  Sensor   │───▶│ PollScheduler │───▶│ ReadingStore  │   │
//! │  │  (trait)  │    │ (task/sensor) │    │ (per-sensor   │   │
//! │  └───────────┘    └───────┬───────┘    │  logs)        │   │
//! │                           │            └───────────────┘   │
//! │                           ▼                                │
//! │                   ┌──────────────┐                         │
//! │                   │  AlertEngine │───▶ actions             │
//! │                   │ (hysteresis, │                         │
//! │                   │   cooldown)  │                         │
//! │                   └──────────────┘                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use terrasense::{
//!     AlertAction, AlertCondition, AlertSpec, CompareOp, SensorNetwork,
//!     SimulatedSensor, Threshold,
//! };
//!
//! # async fn example() {
//! let network = SensorNetwork::new("home", Duration::from_secs(1));
//!
//! let sensor_id = network
//!     .add_sensor(Box::new(SimulatedSensor::temperature(
//!         "Living Room",
//!         Duration::from_secs(2),
//!     )))
//!     .await;
//!
//! let condition = AlertCondition::new(
//!     &sensor_id,
//!     "temperature",
//!     CompareOp::Gt,
//!     Threshold::Value(28.0),
//! );
//! network
//!     .add_alert(
//!         AlertSpec::new(condition)
//!             .with_cooldown(Duration::from_secs(60))
//!             .with_action(AlertAction::new("console", |reading| {
//!                 println!("too hot: {:?}", reading.fields);
//!                 Ok(())
//!             })),
//!     )
//!     .await
//!     .unwrap();
//!
//! network.start().await;
//! // ... later
//! network.stop().await;
//! # }
//! ```

pub mod alert;
pub mod config;
pub mod error;
pub mod network;
pub mod scheduler;
pub mod sensor;
pub mod store;

// Re-export key types at crate root for convenience
pub use alert::{
    AlertAction, AlertCondition, AlertEngine, AlertInfo, AlertSpec, CompareOp, Threshold,
};
pub use config::{AlertRuleSpec, NetworkConfig, SensorKind, SensorSpec};
pub use error::{SensorError, ValidationError};
pub use network::{NetworkStatus, SensorNetwork, SensorStatus};
pub use scheduler::TaskState;
pub use sensor::{fields, Reading, Sensor, SensorDescriptor, SharedSensor, SimulatedSensor};
pub use store::{ReadingQuery, ReadingStore};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
