use hestia::relay::{PowerLevel, RelayPattern, pattern_for, patterns_for};

#[test]
fn off_maps_to_single_all_open_pattern() {
    assert_eq!(patterns_for(PowerLevel::Off).len(), 1);
    let pattern = pattern_for(PowerLevel::Off, 0).unwrap();
    assert_eq!(pattern, RelayPattern::OPEN);
    assert_eq!(pattern.energized_count(), 0);
}

#[test]
fn every_level_has_at_least_one_pattern() {
    for level in PowerLevel::ALL {
        assert!(!patterns_for(level).is_empty(), "no patterns for {}", level);
    }
}

#[test]
fn p18_patterns_are_distinct_line_to_neutral() {
    let a = pattern_for(PowerLevel::P18, 0).unwrap();
    let b = pattern_for(PowerLevel::P18, 1).unwrap();
    let c = pattern_for(PowerLevel::P18, 2).unwrap();
    assert_ne!(a, b);
    assert_ne!(b, c);
    assert_ne!(a, c);
    for pattern in [a, b, c] {
        // One line phase plus neutral
        assert!(pattern.neutral);
        assert_eq!(pattern.energized_count(), 2);
    }
}

#[test]
fn energized_counts_match_wiring_scheme() {
    // L-N single element
    for pattern in patterns_for(PowerLevel::P18) {
        assert_eq!(pattern.energized_count(), 2);
    }
    // L-L single element, no neutral
    for pattern in patterns_for(PowerLevel::P27) {
        assert_eq!(pattern.energized_count(), 2);
        assert!(!pattern.neutral);
    }
    // Two elements line to neutral
    for pattern in patterns_for(PowerLevel::P36) {
        assert_eq!(pattern.energized_count(), 3);
        assert!(pattern.neutral);
    }
    // All three lines, no neutral
    for pattern in patterns_for(PowerLevel::P54) {
        assert_eq!(pattern.energized_count(), 3);
        assert!(!pattern.neutral);
    }
}

#[test]
fn patterns_within_a_level_are_pairwise_distinct() {
    for level in PowerLevel::ALL {
        let patterns = patterns_for(level);
        for (i, a) in patterns.iter().enumerate() {
            for b in patterns.iter().skip(i + 1) {
                assert_ne!(a, b, "duplicate pattern for {}", level);
            }
        }
    }
}

#[test]
fn out_of_range_index_is_an_error() {
    for level in PowerLevel::ALL {
        let count = patterns_for(level).len();
        assert!(pattern_for(level, count - 1).is_ok());
        assert!(pattern_for(level, count).is_err());
        assert!(pattern_for(level, usize::MAX).is_err());
    }
}

#[test]
fn terminal_order_matches_command_emission() {
    let pattern = pattern_for(PowerLevel::P36, 0).unwrap();
    let names: Vec<&str> = pattern.terminals().iter().map(|(name, _)| *name).collect();
    assert_eq!(names, ["relayL1", "relayL2", "relayL3", "relayN"]);
}
