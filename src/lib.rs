//! # Hestia - Solar-Excess Boiler Heater Controller
//!
//! A Rust implementation of the boiler heater steering service: it watches
//! locally metered solar excess, picks one of a small set of discrete
//! heater power levels, rotates among electrically-equivalent heating
//! element wirings, and drives the relays over MQTT.
//!
//! ## Features
//!
//! - **Threshold steering**: excess-power ladder mapping to 0/1.8/2.7/3.6/5.4 kW
//! - **Safety override**: boiler over-temperature always forces off
//! - **Element rotation**: equivalent wirings cycled to spread element wear
//! - **Idempotent commands**: absolute relay states over MQTT, self-healing
//! - **Telemetry**: MySQL-backed boiler, grid meter and PV readings
//! - **Configuration**: YAML-based configuration with validation
//!
//! ## Architecture
//!
//! The application follows a modular architecture with clear separation of concerns:
//!
//! - `config`: Configuration management and validation
//! - `logging`: Structured logging and tracing
//! - `relay`: Power levels, wiring configuration table and relay mapper
//! - `controls`: Power mode selection and element rotation scheduling
//! - `telemetry`: Telemetry database readers
//! - `mqtt`: Relay command channel
//! - `driver`: Control loop orchestration

pub mod config;
pub mod controls;
pub mod driver;
pub mod error;
pub mod logging;
pub mod mqtt;
pub mod relay;
pub mod telemetry;

// Re-export commonly used types
pub use config::Config;
pub use driver::HeaterDriver;
pub use error::{HestiaError, Result};
pub use relay::{PowerLevel, RelayPattern};
