use hestia::controls::{ControlState, tick_rotation};
use hestia::relay::PowerLevel;
use std::time::{Duration, Instant};

const DWELL: Duration = Duration::from_secs(3600);

fn state_at_level(level: PowerLevel, t0: Instant) -> ControlState {
    let mut state = ControlState::new(t0);
    state.apply_level_change(level, t0);
    state
}

#[test]
fn rotation_waits_for_full_dwell() {
    let t0 = Instant::now();
    let mut state = state_at_level(PowerLevel::P18, t0);

    let outcome = tick_rotation(&mut state, t0 + Duration::from_secs(3599), DWELL);
    assert!(!outcome.rotated);
    assert_eq!(outcome.index, 0);

    let outcome = tick_rotation(&mut state, t0 + Duration::from_secs(3600), DWELL);
    assert!(outcome.rotated);
    assert_eq!(outcome.index, 1);

    // The window restarted; the very next tick must not advance again
    let outcome = tick_rotation(&mut state, t0 + Duration::from_secs(3601), DWELL);
    assert!(!outcome.rotated);
    assert_eq!(outcome.index, 1);
}

#[test]
fn rotation_wraps_to_first_configuration() {
    let t0 = Instant::now();
    let mut state = state_at_level(PowerLevel::P27, t0);

    let mut now = t0;
    for expected in [1, 2, 0, 1] {
        now += DWELL;
        let outcome = tick_rotation(&mut state, now, DWELL);
        assert!(outcome.rotated);
        assert_eq!(outcome.index, expected);
    }
}

#[test]
fn level_change_restarts_dwell_window() {
    let t0 = Instant::now();
    let mut state = state_at_level(PowerLevel::P18, t0);

    // Window nearly elapsed when the level moves at t=3599
    let change_at = t0 + Duration::from_secs(3599);
    state.apply_level_change(PowerLevel::P36, change_at);
    assert_eq!(state.rotation_index(PowerLevel::P36), 0);

    // The old window does not carry over
    let outcome = tick_rotation(&mut state, t0 + Duration::from_secs(3600), DWELL);
    assert!(!outcome.rotated);

    let outcome = tick_rotation(&mut state, change_at + DWELL, DWELL);
    assert!(outcome.rotated);
    assert_eq!(outcome.index, 1);
}

#[test]
fn per_level_indices_advance_independently() {
    let t0 = Instant::now();
    let mut state = state_at_level(PowerLevel::P18, t0);

    let t1 = t0 + DWELL;
    let outcome = tick_rotation(&mut state, t1, DWELL);
    assert!(outcome.rotated);
    assert_eq!(state.rotation_index(PowerLevel::P18), 1);

    // Moving to another level leaves the P18 counter where it was
    state.apply_level_change(PowerLevel::P27, t1);
    assert_eq!(state.rotation_index(PowerLevel::P27), 0);
    assert_eq!(state.rotation_index(PowerLevel::P18), 1);

    let outcome = tick_rotation(&mut state, t1 + DWELL, DWELL);
    assert!(outcome.rotated);
    assert_eq!(state.rotation_index(PowerLevel::P27), 1);
    assert_eq!(state.rotation_index(PowerLevel::P18), 1);
}

#[test]
fn off_never_rotates() {
    let t0 = Instant::now();
    let mut state = ControlState::new(t0);

    for hours in 1..=5u32 {
        let outcome = tick_rotation(&mut state, t0 + DWELL * hours, DWELL);
        assert!(!outcome.rotated);
        assert_eq!(outcome.index, 0);
    }
}
