//! Telemetry acquisition for Hestia
//!
//! Readings come from three MySQL stores fed by the metering setup: the
//! solar logger (which carries the boiler temperature probes), the PV
//! inverter logger, and the P1 grid meter logger. The driver consumes them
//! through the [`TelemetrySource`] trait so tests can substitute a scripted
//! source.
//!
//! A reading is only trusted when it exists, carries a timestamp, and is
//! non-negative; anything else is a telemetry error for the control loop
//! to handle at the iteration boundary.

use crate::config::TelemetryConfig;
use crate::error::{HestiaError, Result};
use crate::logging::get_logger;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::Row;
use std::time::Duration;

/// Label of the boiler top temperature column group in the solar logger
const BOILER_TOP_LABEL: &str = "Boiler Top Temperature";

/// Boiler water temperature reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemperatureReading {
    /// Temperature in whole degrees Celsius
    pub celsius: i64,

    /// When the logger recorded the value (UTC)
    pub recorded_at: NaiveDateTime,
}

/// P1 grid meter reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridReading {
    /// Power currently imported from the grid, watts
    pub power_in_watts: i64,

    /// Power currently exported to the grid, watts
    pub power_out_watts: i64,

    /// When the meter recorded the values (UTC)
    pub recorded_at: NaiveDateTime,
}

/// PV inverter production reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolarReading {
    /// Current production, watts
    pub power_watts: i64,

    /// When the inverter recorded the value (UTC)
    pub recorded_at: NaiveDateTime,
}

/// Source of the three telemetry readings the control loop consumes
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Current boiler top temperature
    async fn boiler_temperature(&self) -> Result<TemperatureReading>;

    /// Current grid import/export power
    async fn grid_power(&self) -> Result<GridReading>;

    /// Current PV production (display/logging only)
    async fn pv_power(&self) -> Result<SolarReading>;
}

/// Telemetry source backed by the three MySQL logger databases
pub struct MysqlTelemetry {
    solar: MySqlPool,
    pv: MySqlPool,
    p1: MySqlPool,
    logger: crate::logging::StructuredLogger,
}

impl MysqlTelemetry {
    /// Create lazy connection pools for the three stores
    ///
    /// Connections are established on first use, so the databases do not
    /// have to be reachable at startup.
    pub fn new(config: &TelemetryConfig) -> Result<Self> {
        let logger = get_logger("telemetry");
        let connect = |url: &str| -> std::result::Result<MySqlPool, sqlx::Error> {
            MySqlPoolOptions::new()
                .max_connections(2)
                .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
                .connect_lazy(url)
        };

        Ok(Self {
            solar: connect(&config.solar_url)?,
            pv: connect(&config.pv_url)?,
            p1: connect(&config.p1_url)?,
            logger,
        })
    }
}

#[async_trait]
impl TelemetrySource for MysqlTelemetry {
    async fn boiler_temperature(&self) -> Result<TemperatureReading> {
        let row = sqlx::query(
            "SELECT * FROM mx_log WHERE DATE(`timestamp`) = UTC_DATE() \
             ORDER BY `timestamp` DESC LIMIT 1",
        )
        .fetch_optional(&self.solar)
        .await?
        .ok_or_else(|| HestiaError::telemetry("no boiler temperature recorded today"))?;

        let recorded_at = timestamp_at(&row, "timestamp")
            .ok_or_else(|| HestiaError::telemetry("boiler temperature row has no timestamp"))?;

        // The logger stores labeled value groups: the column holding the
        // label string sits two columns after the value itself.
        let mut celsius: Option<i64> = None;
        for index in 2..row.columns().len() {
            if let Ok(label) = row.try_get::<String, _>(index)
                && label == BOILER_TOP_LABEL
            {
                celsius = numeric_at(&row, index - 2).map(|v| v as i64);
                break;
            }
        }

        let celsius = celsius.ok_or_else(|| {
            HestiaError::telemetry("boiler top temperature not present in latest row")
        })?;
        if celsius < 0 {
            return Err(HestiaError::telemetry(format!(
                "boiler temperature {} out of range",
                celsius
            )));
        }

        self.logger.debug(&format!(
            "Boiler top temp = {} C (recorded {})",
            celsius, recorded_at
        ));
        Ok(TemperatureReading {
            celsius,
            recorded_at,
        })
    }

    async fn grid_power(&self) -> Result<GridReading> {
        let row = sqlx::query(
            "SELECT `p1_timestamp`, `p1_current_power_in`, `p1_current_power_out` \
             FROM p1_log ORDER BY `p1_timestamp` DESC LIMIT 1",
        )
        .fetch_optional(&self.p1)
        .await?
        .ok_or_else(|| HestiaError::telemetry("no P1 meter reading recorded"))?;

        let recorded_at = timestamp_at(&row, "p1_timestamp")
            .ok_or_else(|| HestiaError::telemetry("P1 reading has no timestamp"))?;

        // Meter logs kilowatts; the control loop works in watts
        let power_in_watts = numeric_at(&row, 1)
            .map(|kw| (kw * 1000.0) as i64)
            .ok_or_else(|| HestiaError::telemetry("P1 import power missing"))?;
        let power_out_watts = numeric_at(&row, 2)
            .map(|kw| (kw * 1000.0) as i64)
            .ok_or_else(|| HestiaError::telemetry("P1 export power missing"))?;

        if power_in_watts < 0 || power_out_watts < 0 {
            return Err(HestiaError::telemetry(format!(
                "P1 reading out of range (in={} W, out={} W)",
                power_in_watts, power_out_watts
            )));
        }

        self.logger.debug(&format!(
            "P1 power in {} W, out {} W (recorded {})",
            power_in_watts, power_out_watts, recorded_at
        ));
        Ok(GridReading {
            power_in_watts,
            power_out_watts,
            recorded_at,
        })
    }

    async fn pv_power(&self) -> Result<SolarReading> {
        let row = sqlx::query(
            "SELECT `DateTime`, `Value` FROM `LiveData` \
             WHERE `Description` = 'Total Power' ORDER BY `DateTime` DESC LIMIT 1",
        )
        .fetch_optional(&self.pv)
        .await?
        .ok_or_else(|| HestiaError::telemetry("no PV production recorded"))?;

        let recorded_at = timestamp_at(&row, "DateTime")
            .ok_or_else(|| HestiaError::telemetry("PV reading has no timestamp"))?;
        let power_watts = numeric_at(&row, 1)
            .map(|v| v as i64)
            .ok_or_else(|| HestiaError::telemetry("PV production value missing"))?;

        if power_watts < 0 {
            return Err(HestiaError::telemetry(format!(
                "PV production {} W out of range",
                power_watts
            )));
        }

        self.logger.debug(&format!(
            "PV power {} W (recorded {})",
            power_watts, recorded_at
        ));
        Ok(SolarReading {
            power_watts,
            recorded_at,
        })
    }
}

/// Read a numeric column that may be stored as double, float, integer or
/// decimal-as-string depending on the logger's schema version
fn numeric_at(row: &MySqlRow, index: usize) -> Option<f64> {
    if let Ok(v) = row.try_get::<f64, _>(index) {
        return Some(v);
    }
    if let Ok(v) = row.try_get::<f32, _>(index) {
        return Some(f64::from(v));
    }
    if let Ok(v) = row.try_get::<i64, _>(index) {
        return Some(v as f64);
    }
    if let Ok(v) = row.try_get::<String, _>(index) {
        return v.trim().parse().ok();
    }
    None
}

/// Read a timestamp column stored as either DATETIME or TIMESTAMP
fn timestamp_at(row: &MySqlRow, name: &str) -> Option<NaiveDateTime> {
    if let Ok(v) = row.try_get::<NaiveDateTime, _>(name) {
        return Some(v);
    }
    if let Ok(v) = row.try_get::<DateTime<Utc>, _>(name) {
        return Some(v.naive_utc());
    }
    None
}
