use anyhow::Result;
use hestia::config::Config;
use hestia::driver::HeaterDriver;
use hestia::mqtt::MqttCommander;
use hestia::telemetry::MysqlTelemetry;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Optional explicit config path as the only argument
    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    hestia::logging::init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Hestia boiler heater steering starting up, version {}",
        env!("APP_VERSION")
    );

    let telemetry = MysqlTelemetry::new(&config.telemetry)
        .map_err(|e| anyhow::anyhow!("Failed to set up telemetry: {}", e))?;
    let (commander, mqtt_task) = MqttCommander::connect(&config.mqtt)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to set up MQTT client: {}", e))?;

    let mut driver = HeaterDriver::new(config, Box::new(telemetry), Box::new(commander));

    // Interrupt handling: the only external event that preempts the loop
    let shutdown = driver.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, requesting shutdown");
            shutdown.request_shutdown();
        }
    });

    let result = driver.run().await;
    mqtt_task.abort();

    match result {
        Ok(()) => {
            info!("Driver shutdown complete");
            Ok(())
        }
        Err(e) => {
            error!("Driver failed with error: {}", e);
            Err(anyhow::anyhow!("Driver error: {}", e))
        }
    }
}
