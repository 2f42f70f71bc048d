//! Core driver logic for Hestia
//!
//! This module contains the control loop that ties the components
//! together: once per polling interval it pulls telemetry, evaluates the
//! safety and power-mode selection logic, drives the element rotation, and
//! emits relay commands.

use crate::config::Config;
use crate::controls::{self, ControlState};
use crate::error::Result;
use crate::logging::get_logger;
use crate::mqtt::RelayCommander;
use crate::relay::{self, PowerLevel};
use crate::telemetry::TelemetrySource;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::interval;

/// Telemetry snapshot evaluated in one control cycle
#[derive(Debug, Clone, Copy)]
struct CycleInputs {
    /// Boiler at or above the configured maximum temperature
    safety_tripped: bool,

    /// Boiler top temperature, degrees Celsius
    boiler_temp_celsius: i64,

    /// Grid import, watts (zero when the safety trip short-circuits the
    /// power queries)
    power_in_watts: i64,

    /// Grid export, watts
    power_out_watts: i64,

    /// PV production, watts (display only)
    pv_watts: i64,

    /// Export plus the heater's own commanded draw
    net_excess_watts: i64,
}

/// Handle for requesting driver shutdown from another task
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: mpsc::UnboundedSender<()>,
}

impl ShutdownHandle {
    /// Request a graceful shutdown; the driver finishes the current
    /// iteration, forces the heater off and exits
    pub fn request_shutdown(&self) {
        self.tx.send(()).ok();
    }
}

/// Main driver for Hestia
pub struct HeaterDriver {
    /// Configuration
    config: Config,

    /// Control-loop state, single writer
    state: ControlState,

    /// Telemetry readings source
    telemetry: Box<dyn TelemetrySource>,

    /// Relay command sink
    commander: Box<dyn RelayCommander>,

    /// Logger with context
    logger: crate::logging::StructuredLogger,

    /// Shutdown signal
    shutdown_tx: mpsc::UnboundedSender<()>,

    /// Shutdown receiver
    shutdown_rx: mpsc::UnboundedReceiver<()>,
}

impl HeaterDriver {
    /// Create a new driver instance
    pub fn new(
        config: Config,
        telemetry: Box<dyn TelemetrySource>,
        commander: Box<dyn RelayCommander>,
    ) -> Self {
        let logger = get_logger("driver");
        let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel();

        Self {
            config,
            state: ControlState::new(Instant::now()),
            telemetry,
            commander,
            logger,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Handle for requesting shutdown from another task (e.g. a signal
    /// watcher)
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    /// Currently commanded power level
    pub fn current_level(&self) -> PowerLevel {
        self.state.current_level()
    }

    /// Nominal draw of the commanded level, watts
    pub fn heater_power_watts(&self) -> i64 {
        self.state.heater_power_watts()
    }

    /// Active wiring configuration index for a level
    pub fn rotation_index(&self, level: PowerLevel) -> usize {
        self.state.rotation_index(level)
    }

    /// Run the driver main loop
    ///
    /// Starts with all relays de-energized and a short settle period so
    /// the first power measurement reflects heater-off conditions, then
    /// polls until shutdown is requested, at which point one final off
    /// drive is emitted before the command channel is released.
    pub async fn run(&mut self) -> Result<()> {
        self.logger.info("Starting heater steering main loop");

        // Establish the known-off initial state before making decisions
        self.drive_relays(PowerLevel::Off, self.state.rotation_index(PowerLevel::Off))
            .await?;
        tokio::time::sleep(Duration::from_secs(self.config.controls.settle_secs)).await;

        let mut poll_interval =
            interval(Duration::from_secs(self.config.controls.poll_interval_secs));

        loop {
            tokio::select! {
                _ = poll_interval.tick() => {
                    if let Err(e) = self.poll_once(Instant::now()).await {
                        self.logger.error(&format!("Poll cycle failed: {}", e));
                        // Continue polling even on errors
                    }
                }
                _ = self.shutdown_rx.recv() => {
                    self.logger.info("Shutdown signal received");
                    break;
                }
            }
        }

        self.shutdown().await
    }

    /// Execute a single control cycle at the given instant
    ///
    /// Telemetry failures do not propagate: operating blind is answered by
    /// forcing the heater off and retrying next tick.
    pub async fn poll_once(&mut self, now: Instant) -> Result<()> {
        let inputs = match self.read_inputs().await {
            Ok(inputs) => inputs,
            Err(e) => {
                self.logger
                    .error(&format!("Telemetry unavailable, forcing heater off: {}", e));
                return self.force_off(now).await;
            }
        };

        self.steer(inputs, now).await
    }

    /// Gather and validate the cycle's telemetry
    async fn read_inputs(&self) -> Result<CycleInputs> {
        let temperature = self.telemetry.boiler_temperature().await?;
        let safety_tripped =
            temperature.celsius >= self.config.controls.max_boiler_temp_celsius;

        if safety_tripped {
            // No point querying the meters; the trip overrides everything
            return Ok(CycleInputs {
                safety_tripped,
                boiler_temp_celsius: temperature.celsius,
                power_in_watts: 0,
                power_out_watts: 0,
                pv_watts: 0,
                net_excess_watts: 0,
            });
        }

        let grid = self.telemetry.grid_power().await?;
        let pv = self.telemetry.pv_power().await?;

        // What export would be if the heater were off
        let net_excess_watts = grid.power_out_watts + self.state.heater_power_watts();

        Ok(CycleInputs {
            safety_tripped,
            boiler_temp_celsius: temperature.celsius,
            power_in_watts: grid.power_in_watts,
            power_out_watts: grid.power_out_watts,
            pv_watts: pv.power_watts,
            net_excess_watts,
        })
    }

    /// Apply the selection and rotation logic to one telemetry snapshot
    async fn steer(&mut self, inputs: CycleInputs, now: Instant) -> Result<()> {
        if inputs.safety_tripped {
            self.logger.info(&format!(
                "Boiler temp on max ({} >= {} C), stop heating if needed",
                inputs.boiler_temp_celsius, self.config.controls.max_boiler_temp_celsius
            ));
        } else {
            let power_use = inputs.power_in_watts - inputs.power_out_watts;
            let net_power_use = power_use - self.state.heater_power_watts();
            self.logger.info(&format!(
                "Power use {} W ({} in - {} out), PV {} W",
                power_use, inputs.power_in_watts, inputs.power_out_watts, inputs.pv_watts
            ));
            self.logger.info(&format!(
                "Net power use {} W ({} used by heater), net excess power {} W",
                net_power_use,
                self.state.heater_power_watts(),
                inputs.net_excess_watts
            ));
        }

        let current = self.state.current_level();
        let selected =
            controls::select_level(inputs.net_excess_watts, current, inputs.safety_tripped);

        if selected != current {
            self.logger
                .info(&format!("Setting heater to {}", selected));
            self.state.apply_level_change(selected, now);
            self.drive_relays(selected, self.state.rotation_index(selected))
                .await?;
        } else {
            let dwell = Duration::from_secs(self.config.controls.rotation_dwell_secs);
            let outcome = controls::tick_rotation(&mut self.state, now, dwell);
            if outcome.rotated {
                self.logger.info(&format!(
                    "Changing heating elements, level {} now at configuration {}",
                    current, outcome.index
                ));
                self.drive_relays(current, outcome.index).await?;
            } else {
                let remaining = self
                    .state
                    .time_until_rotation(now, dwell)
                    .as_secs();
                self.logger.debug(&format!(
                    "Level {} unchanged, next element rotation in {} s",
                    current, remaining
                ));
            }
        }

        Ok(())
    }

    /// Force the heater off after a telemetry failure
    async fn force_off(&mut self, now: Instant) -> Result<()> {
        if self.state.current_level() != PowerLevel::Off {
            self.state.apply_level_change(PowerLevel::Off, now);
        }
        // Re-assert the off state even if it was already commanded;
        // commands are idempotent absolute states
        self.drive_relays(PowerLevel::Off, self.state.rotation_index(PowerLevel::Off))
            .await
    }

    /// Map and emit one relay drive
    ///
    /// Publish failures are logged and swallowed; the next drive for the
    /// level re-asserts the correct state. Only a broken table invariant
    /// propagates.
    async fn drive_relays(&self, level: PowerLevel, index: usize) -> Result<()> {
        let pattern = relay::pattern_for(level, index)?;

        if let Err(e) = self.commander.drive(pattern).await {
            self.logger
                .error(&format!("Relay command publish failed: {}", e));
        }

        let describe = |on: bool| if on { "on" } else { "off" };
        self.logger.info(&format!(
            "Relays: L1 {} L2 {} L3 {} N {}",
            describe(pattern.l1),
            describe(pattern.l2),
            describe(pattern.l3),
            describe(pattern.neutral)
        ));
        Ok(())
    }

    /// Final forced-off drive and command channel release
    ///
    /// Invoked by [`run`](Self::run) on any shutdown trigger; public so an
    /// embedding caller can tear down without running the loop.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.logger.info("Shutting down, switching heater off");

        self.state
            .apply_level_change(PowerLevel::Off, Instant::now());
        self.drive_relays(PowerLevel::Off, self.state.rotation_index(PowerLevel::Off))
            .await?;

        self.commander.close().await?;
        self.logger.info("Driver shutdown complete");
        Ok(())
    }
}
