//! Terrasense CLI
//!
//! Runs an environmental sensor network of simulated sensors from
//! configuration. All runtime behavior lives in the library; this binary
//! is bootstrap and display only.

use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use terrasense::{
    AlertAction, AlertCondition, AlertSpec, NetworkConfig, ReadingQuery, SensorNetwork, VERSION,
};

#[derive(Parser)]
#[command(name = "terrasense")]
#[command(version = VERSION)]
#[command(about = "Environmental sensor-network runtime", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sensor network until Ctrl+C
    Run {
        /// Path to a configuration file (defaults to the user config dir)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Stop automatically after this many seconds
        #[arg(long)]
        duration: Option<u64>,

        /// Seconds between status summaries
        #[arg(long, default_value = "10")]
        status_interval: u64,
    },

    /// Write the demo configuration to the default location
    Init,

    /// Show the stored configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("terrasense=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            duration,
            status_interval,
        } => cmd_run(config, duration, status_interval).await,
        Commands::Init => cmd_init(),
        Commands::Config => cmd_config(),
    }
}

async fn cmd_run(
    config_path: Option<PathBuf>,
    duration: Option<u64>,
    status_interval: u64,
) -> anyhow::Result<()> {
    println!("Terrasense v{VERSION}");
    println!();

    let mut config = match &config_path {
        Some(path) => NetworkConfig::load_from(path)?,
        None => NetworkConfig::load()?,
    };
    if config.sensors.is_empty() {
        println!("No sensors configured, using the demo network.");
        config = NetworkConfig::demo();
    }

    let network = SensorNetwork::new(&config.name, config.poll_interval);

    // Register sensors, remembering config-name -> id for the alert rules
    let mut ids_by_name: HashMap<String, String> = HashMap::new();
    for spec in &config.sensors {
        let id = network.add_sensor(Box::new(spec.build(config.poll_interval))).await;
        println!("  sensor    {:<14} {}", id, spec.name);
        ids_by_name.insert(spec.name.clone(), id);
    }

    for rule in &config.alerts {
        let sensor_id = ids_by_name
            .get(&rule.sensor)
            .ok_or_else(|| anyhow::anyhow!("alert references unknown sensor: {}", rule.sensor))?;

        let condition =
            AlertCondition::new(sensor_id, &rule.field, rule.operator.parse()?, rule.threshold)
                .with_hysteresis(rule.hysteresis);

        let mut spec = AlertSpec::new(condition)
            .with_cooldown(Duration::from_secs(rule.cooldown_secs))
            .with_action(AlertAction::new("console", |reading| {
                println!(
                    "  !! alert fired by {} at {}: {:?}",
                    reading.sensor_id,
                    reading.timestamp.format("%H:%M:%S"),
                    reading.fields
                );
                Ok(())
            }));
        if let Some(name) = &rule.name {
            spec = spec.with_name(name);
        }

        let id = network.add_alert(spec).await?;
        println!("  alert     {:<14} {} {} {:?}", id, rule.field, rule.operator, rule.threshold);
    }

    network.start().await;
    println!();
    println!(
        "Polling {} sensor(s). Press Ctrl+C to stop.",
        config.sensors.len()
    );
    println!();

    let mut status_timer = tokio::time::interval(Duration::from_secs(status_interval.max(1)));
    status_timer.tick().await; // consume the immediate first tick

    let deadline = async {
        match duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                println!("Stopping...");
                break;
            }
            _ = &mut deadline => {
                println!("Duration elapsed, stopping...");
                break;
            }
            _ = status_timer.tick() => {
                print_status(&network).await;
            }
        }
    }

    network.stop().await;

    println!();
    println!("Collected readings:");
    let status = network.status().await;
    for sensor in &status.sensors {
        let count = network.readings(&sensor.id, &ReadingQuery::default()).await.len();
        println!("  {:<14} {:>6} readings", sensor.id, count);
    }

    Ok(())
}

async fn print_status(network: &SensorNetwork) {
    let status = network.status().await;
    println!(
        "[{}] {} sensor(s), {} alert(s)",
        chrono::Utc::now().format("%H:%M:%S"),
        status.sensor_count,
        status.alert_count
    );
    for sensor in &status.sensors {
        let latest = network
            .latest_reading(&sensor.id)
            .await
            .map(|r| format!("{:?}", r.fields))
            .unwrap_or_else(|| "no readings yet".to_string());
        let state = sensor
            .task_state
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("  {:<14} [{}] {}", sensor.id, state, latest);
    }
}

fn cmd_init() -> anyhow::Result<()> {
    let config = NetworkConfig::demo();
    config.save()?;
    println!("Wrote demo configuration to {:?}", NetworkConfig::config_path());
    Ok(())
}

fn cmd_config() -> anyhow::Result<()> {
    let config = NetworkConfig::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", NetworkConfig::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
    Ok(())
}
