//! Heater steering control algorithms for Hestia
//!
//! This module contains the pure decision logic of the controller: the
//! power mode selector mapping net excess power to a heater level, and the
//! element rotation scheduler cycling through equivalent relay wirings.
//! Both operate on an explicit [`ControlState`] owned by the driver, so
//! they carry no hidden state of their own.

use crate::relay::{self, PowerLevel};
use std::time::{Duration, Instant};

/// Minimum net excess power for the 1.8 kW step (watts)
pub const THRESHOLD_P18_W: i64 = 2000;
/// Minimum net excess power for the 2.7 kW step (watts)
pub const THRESHOLD_P27_W: i64 = 3000;
/// Minimum net excess power for the 3.6 kW step (watts)
pub const THRESHOLD_P36_W: i64 = 4000;
/// Minimum net excess power for the 5.4 kW step (watts)
pub const THRESHOLD_P54_W: i64 = 5500;

/// Mutable control-loop state, single-writer, owned by the driver
#[derive(Debug, Clone)]
pub struct ControlState {
    /// Currently commanded power level
    current_level: PowerLevel,

    /// Active wiring configuration per level, advanced independently
    rotation_index: [usize; PowerLevel::ALL.len()],

    /// Start of the current dwell window for the active level
    rotation_window_start: Instant,

    /// Nominal draw of the commanded level, netted out of the meter
    /// readings on the next poll
    heater_power_watts: i64,
}

impl ControlState {
    /// Fresh state: heater off, every level at its first configuration
    pub fn new(now: Instant) -> Self {
        Self {
            current_level: PowerLevel::Off,
            rotation_index: [0; PowerLevel::ALL.len()],
            rotation_window_start: now,
            heater_power_watts: 0,
        }
    }

    pub fn current_level(&self) -> PowerLevel {
        self.current_level
    }

    pub fn heater_power_watts(&self) -> i64 {
        self.heater_power_watts
    }

    /// Active configuration index for a level
    pub fn rotation_index(&self, level: PowerLevel) -> usize {
        self.rotation_index[level.index()]
    }

    /// Switch to a new level: restart the dwell window without advancing
    /// any rotation counter, and track the new nominal draw
    pub fn apply_level_change(&mut self, level: PowerLevel, now: Instant) {
        self.current_level = level;
        self.rotation_window_start = now;
        self.heater_power_watts = level.watts();
    }

    /// Time remaining in the current dwell window, zero once elapsed
    pub fn time_until_rotation(&self, now: Instant, dwell: Duration) -> Duration {
        dwell.saturating_sub(now.duration_since(self.rotation_window_start))
    }
}

/// Select the heater power level for the current conditions
///
/// The safety trip wins over everything: a boiler at or above the maximum
/// temperature forces off no matter how much excess there is. Otherwise a
/// single-pass threshold ladder over the net excess power picks the level;
/// bands are closed on the low end and open on the high end. There is no
/// hysteresis: a reading sitting exactly on a boundary may flap between
/// adjacent levels across polls. The current level does not influence the
/// outcome; detecting "no change" is the control loop's job.
pub fn select_level(
    net_excess_watts: i64,
    _current: PowerLevel,
    safety_tripped: bool,
) -> PowerLevel {
    if safety_tripped {
        return PowerLevel::Off;
    }

    if net_excess_watts < THRESHOLD_P18_W {
        PowerLevel::Off
    } else if net_excess_watts < THRESHOLD_P27_W {
        PowerLevel::P18
    } else if net_excess_watts < THRESHOLD_P36_W {
        PowerLevel::P27
    } else if net_excess_watts < THRESHOLD_P54_W {
        PowerLevel::P36
    } else {
        PowerLevel::P54
    }
}

/// Result of a rotation scheduler tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationOutcome {
    /// Configuration index to drive after the tick
    pub index: usize,

    /// Whether the index advanced this tick
    pub rotated: bool,
}

/// Advance the element rotation for the active level if its dwell window
/// has elapsed
///
/// Only called by the control loop when the selector left the level
/// unchanged. Wraps to the first configuration after the last one. Levels
/// with a single wiring (off, 5.4 kW) never rotate.
pub fn tick_rotation(state: &mut ControlState, now: Instant, dwell: Duration) -> RotationOutcome {
    let level = state.current_level;
    let slot = level.index();
    let patterns = relay::patterns_for(level);
    let index = state.rotation_index[slot];

    if patterns.len() <= 1 {
        return RotationOutcome {
            index,
            rotated: false,
        };
    }

    if now.duration_since(state.rotation_window_start) >= dwell {
        let next = (index + 1) % patterns.len();
        state.rotation_index[slot] = next;
        state.rotation_window_start = now;
        return RotationOutcome {
            index: next,
            rotated: true,
        };
    }

    RotationOutcome {
        index,
        rotated: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safety_trip_forces_off() {
        for level in PowerLevel::ALL {
            assert_eq!(select_level(100_000, level, true), PowerLevel::Off);
        }
    }

    #[test]
    fn test_ladder_boundaries() {
        let cur = PowerLevel::Off;
        assert_eq!(select_level(1999, cur, false), PowerLevel::Off);
        assert_eq!(select_level(2000, cur, false), PowerLevel::P18);
        assert_eq!(select_level(2999, cur, false), PowerLevel::P18);
        assert_eq!(select_level(3000, cur, false), PowerLevel::P27);
        assert_eq!(select_level(3999, cur, false), PowerLevel::P27);
        assert_eq!(select_level(4000, cur, false), PowerLevel::P36);
        assert_eq!(select_level(5499, cur, false), PowerLevel::P36);
        assert_eq!(select_level(5500, cur, false), PowerLevel::P54);
    }

    #[test]
    fn test_level_change_resets_window_and_watts() {
        let t0 = Instant::now();
        let mut state = ControlState::new(t0);
        state.apply_level_change(PowerLevel::P27, t0 + Duration::from_secs(100));
        assert_eq!(state.current_level(), PowerLevel::P27);
        assert_eq!(state.heater_power_watts(), 2700);
        // Window restarted at t=100, so a full dwell must pass from there
        let outcome = tick_rotation(
            &mut state,
            t0 + Duration::from_secs(150),
            Duration::from_secs(60),
        );
        assert!(!outcome.rotated);
        let outcome = tick_rotation(
            &mut state,
            t0 + Duration::from_secs(160),
            Duration::from_secs(60),
        );
        assert!(outcome.rotated);
        assert_eq!(outcome.index, 1);
    }

    #[test]
    fn test_rotation_noop_for_off() {
        let t0 = Instant::now();
        let mut state = ControlState::new(t0);
        let outcome = tick_rotation(
            &mut state,
            t0 + Duration::from_secs(10_000),
            Duration::from_secs(60),
        );
        assert!(!outcome.rotated);
        assert_eq!(outcome.index, 0);
    }
}
