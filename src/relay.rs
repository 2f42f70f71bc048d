//! Relay wiring configurations for the boiler heater
//!
//! The heater has three resistive elements wired across three line phases
//! and neutral. Each discrete power step can be realized through one or
//! more electrically-equivalent relay combinations; the table below lists
//! them all so the rotation scheduler can spread wear across elements.
//!
//! There are 4 power steps, with each some possible configurations (123N):
//! * 1.8 kW (L-N:   1001, 0101, or 0011)
//! * 2.7 kW (L-L:   1100, 0110, or 1010)
//! * 3.6 kW (2xL-N: 1101, 1011, or 0111)
//! * 5.4 kW (L-L-L: 1110)

use crate::error::{HestiaError, Result};

/// Discrete heater power levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PowerLevel {
    /// All relays open, heater drawing nothing
    Off,

    /// 1.8 kW - one element, line to neutral
    P18,

    /// 2.7 kW - one element, line to line
    P27,

    /// 3.6 kW - two elements, two lines to neutral
    P36,

    /// 5.4 kW - three elements, line to line to line
    P54,
}

impl PowerLevel {
    /// All levels in ascending wattage order
    pub const ALL: [PowerLevel; 5] = [
        PowerLevel::Off,
        PowerLevel::P18,
        PowerLevel::P27,
        PowerLevel::P36,
        PowerLevel::P54,
    ];

    /// Nominal heater draw at this level in watts
    pub fn watts(self) -> i64 {
        match self {
            PowerLevel::Off => 0,
            PowerLevel::P18 => 1800,
            PowerLevel::P27 => 2700,
            PowerLevel::P36 => 3600,
            PowerLevel::P54 => 5400,
        }
    }

    /// Index into per-level state arrays
    pub fn index(self) -> usize {
        match self {
            PowerLevel::Off => 0,
            PowerLevel::P18 => 1,
            PowerLevel::P27 => 2,
            PowerLevel::P36 => 3,
            PowerLevel::P54 => 4,
        }
    }
}

impl std::fmt::Display for PowerLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PowerLevel::Off => "off",
            PowerLevel::P18 => "1.8kW",
            PowerLevel::P27 => "2.7kW",
            PowerLevel::P36 => "3.6kW",
            PowerLevel::P54 => "5.4kW",
        };
        write!(f, "{}", s)
    }
}

/// Energize/de-energize state for the four relay terminals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayPattern {
    pub l1: bool,
    pub l2: bool,
    pub l3: bool,
    pub neutral: bool,
}

impl RelayPattern {
    /// All relays open
    pub const OPEN: RelayPattern = RelayPattern::new(false, false, false, false);

    pub const fn new(l1: bool, l2: bool, l3: bool, neutral: bool) -> Self {
        Self {
            l1,
            l2,
            l3,
            neutral,
        }
    }

    /// Number of energized terminals
    pub fn energized_count(self) -> usize {
        [self.l1, self.l2, self.l3, self.neutral]
            .iter()
            .filter(|on| **on)
            .count()
    }

    /// Terminal states paired with their logical relay names, in command
    /// emission order
    pub fn terminals(self) -> [(&'static str, bool); 4] {
        [
            ("relayL1", self.l1),
            ("relayL2", self.l2),
            ("relayL3", self.l3),
            ("relayN", self.neutral),
        ]
    }
}

static OFF_PATTERNS: [RelayPattern; 1] = [RelayPattern::OPEN];
static P18_PATTERNS: [RelayPattern; 3] = [
    RelayPattern::new(true, false, false, true),
    RelayPattern::new(false, true, false, true),
    RelayPattern::new(false, false, true, true),
];
static P27_PATTERNS: [RelayPattern; 3] = [
    RelayPattern::new(true, true, false, false),
    RelayPattern::new(false, true, true, false),
    RelayPattern::new(true, false, true, false),
];
static P36_PATTERNS: [RelayPattern; 3] = [
    RelayPattern::new(true, true, false, true),
    RelayPattern::new(true, false, true, true),
    RelayPattern::new(false, true, true, true),
];
static P54_PATTERNS: [RelayPattern; 1] = [RelayPattern::new(true, true, true, false)];

/// Equivalent wiring configurations for a power level
pub fn patterns_for(level: PowerLevel) -> &'static [RelayPattern] {
    match level {
        PowerLevel::Off => &OFF_PATTERNS,
        PowerLevel::P18 => &P18_PATTERNS,
        PowerLevel::P27 => &P27_PATTERNS,
        PowerLevel::P36 => &P36_PATTERNS,
        PowerLevel::P54 => &P54_PATTERNS,
    }
}

/// Map a power level and configuration index to concrete relay states
///
/// An out-of-range index means a broken rotation invariant, never a valid
/// runtime condition, and is reported as a validation error.
pub fn pattern_for(level: PowerLevel, index: usize) -> Result<RelayPattern> {
    let patterns = patterns_for(level);
    patterns.get(index).copied().ok_or_else(|| {
        HestiaError::Validation {
            field: "rotation_index".to_string(),
            message: format!(
                "index {} out of range for level {} ({} patterns)",
                index,
                level,
                patterns.len()
            ),
        }
    })
}
