//! Demonstration of the terrasense sensor-network runtime.
//!
//! This example shows how to:
//! 1. Create simulated environmental sensors
//! 2. Register them with a network
//! 3. Configure an alert with hysteresis and cooldown
//! 4. Start polling and watch readings accumulate
//! 5. Query history and stop cleanly
//!
//! Run with: cargo run --example demo

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use terrasense::{
    AlertAction, AlertCondition, AlertSpec, CompareOp, ReadingQuery, SensorNetwork,
    SimulatedSensor, Threshold, VERSION,
};

#[tokio::main]
async fn main() {
    println!("Terrasense Demo v{VERSION}");
    println!("=========================");
    println!();

    let network = SensorNetwork::new("Demo Network", Duration::from_secs(1));

    // Simulated sensors with different cadences; a slow sensor never
    // blocks a fast one.
    let temp_id = network
        .add_sensor(Box::new(
            SimulatedSensor::temperature("Living Room Temperature", Duration::from_millis(500))
                .with_range(18.0, 32.0),
        ))
        .await;
    let hum_id = network
        .add_sensor(Box::new(SimulatedSensor::humidity(
            "Living Room Humidity",
            Duration::from_millis(800),
        )))
        .await;

    println!("Registered sensors:");
    for descriptor in network.sensors().await {
        println!("  {:<22} {}", descriptor.id, descriptor.name);
    }
    println!();

    // Heat alert: fires on the edge where temperature first exceeds 25,
    // then stays quiet until it has cleared and the cooldown has passed.
    let fired = Arc::new(AtomicUsize::new(0));
    let fired_in_action = fired.clone();

    let condition = AlertCondition::new(
        &temp_id,
        "temperature",
        CompareOp::Gt,
        Threshold::Value(25.0),
    );
    let alert_id = network
        .add_alert(
            AlertSpec::new(condition)
                .with_name("Heat warning")
                .with_cooldown(Duration::from_secs(5))
                .with_action(AlertAction::new("console", |reading| {
                    println!(
                        "  !! heat warning: {:?} at {}",
                        reading.fields,
                        reading.timestamp.format("%H:%M:%S")
                    );
                    Ok(())
                }))
                .with_action(AlertAction::new("counter", move |_| {
                    fired_in_action.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })),
        )
        .await
        .expect("valid alert spec");

    println!("Registered alert {alert_id} (temperature > 25.0, cooldown 5s)");
    println!();
    println!("Polling for 10 seconds...");
    println!();

    network.start().await;
    tokio::time::sleep(Duration::from_secs(10)).await;
    network.stop().await;

    println!();
    println!("Results");
    println!("-------");

    for (sensor_id, label) in [(&temp_id, "temperature"), (&hum_id, "humidity")] {
        let history = network.readings(sensor_id, &ReadingQuery::default()).await;
        let last_three = network.readings(sensor_id, &ReadingQuery::last(3)).await;
        println!("{label}: {} readings collected", history.len());
        for reading in last_three {
            println!(
                "  [{}] {:?}",
                reading.timestamp.format("%H:%M:%S%.3f"),
                reading.fields
            );
        }
    }

    println!();
    println!("Heat warnings fired: {}", fired.load(Ordering::SeqCst));

    let status = network.status().await;
    println!(
        "Final status: running={}, sensors={}, alerts={}",
        status.running, status.sensor_count, status.alert_count
    );
}
