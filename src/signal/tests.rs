use super::*;
use crate::detector::VehicleCount;
use crate::lane::LaneId;
use std::time::{Duration, Instant};

const STEP: Duration = Duration::from_millis(500);

fn counts(lane1: usize, lane2: usize) -> [VehicleCount; 2] {
    [VehicleCount::saturating(lane1), VehicleCount::saturating(lane2)]
}

/// Tick at a fixed step until the phase changes, returning the elapsed time
fn run_until_transition(
    machine: &mut SignalStateMachine,
    clock: &ManualClock,
    demand: [VehicleCount; 2],
    limit: Duration,
) -> Option<Duration> {
    let started = clock.now();
    while clock.now().duration_since(started) <= limit {
        if machine.tick(clock.now(), demand).is_some() {
            return Some(clock.now().duration_since(started));
        }
        clock.advance(STEP);
    }
    None
}

#[test]
fn test_starts_in_lane1_green() {
    let now = Instant::now();
    let machine = SignalStateMachine::new(SignalTiming::default(), now);

    let status = machine.status(now);
    assert_eq!(status.phase, SignalPhase::Lane1Green);
    assert_eq!(status.lights, [LightColor::Green, LightColor::Red]);
    assert_eq!(status.timers, [15, 0]);
}

#[test]
fn test_green_holds_until_max_without_opposing_demand() {
    let clock = ManualClock::new();
    let mut machine = SignalStateMachine::new(SignalTiming::default(), clock.now());

    let elapsed = run_until_transition(&mut machine, &clock, counts(4, 0), Duration::from_secs(30));
    assert_eq!(elapsed, Some(Duration::from_secs(15)));
    assert_eq!(machine.phase(), SignalPhase::Lane1Yellow);
}

#[test]
fn test_green_cut_short_after_minimum_with_opposing_demand() {
    let clock = ManualClock::new();
    let mut machine = SignalStateMachine::new(SignalTiming::default(), clock.now());

    let elapsed = run_until_transition(&mut machine, &clock, counts(0, 2), Duration::from_secs(30));
    // First tick strictly past 5s at a 500ms cadence
    assert_eq!(elapsed, Some(Duration::from_millis(5500)));
    assert_eq!(machine.phase(), SignalPhase::Lane1Yellow);
}

#[test]
fn test_green_never_ends_at_exactly_minimum() {
    let timing = SignalTiming::default();
    let at_minimum = timing.green_min;

    assert!(!phase_expired(SignalPhase::Lane1Green, at_minimum, counts(0, 9), &timing));
    assert!(!phase_expired(SignalPhase::Lane2Green, at_minimum, counts(9, 0), &timing));
    assert!(phase_expired(
        SignalPhase::Lane1Green,
        at_minimum + Duration::from_millis(1),
        counts(0, 1),
        &timing
    ));
}

#[test]
fn test_own_demand_does_not_shorten_green() {
    let timing = SignalTiming::default();
    let elapsed = Duration::from_secs(10);

    assert!(!phase_expired(SignalPhase::Lane1Green, elapsed, counts(9, 0), &timing));
    assert!(!phase_expired(SignalPhase::Lane2Green, elapsed, counts(0, 9), &timing));
}

#[test]
fn test_yellow_lasts_fixed_budget_regardless_of_demand() {
    let timing = SignalTiming::default();
    for phase in [SignalPhase::Lane1Yellow, SignalPhase::Lane2Yellow] {
        assert!(!phase_expired(phase, Duration::from_millis(1999), counts(9, 9), &timing));
        assert!(phase_expired(phase, Duration::from_secs(2), counts(0, 0), &timing));
    }
}

#[test]
fn test_full_cycle_order() {
    let clock = ManualClock::new();
    let mut machine = SignalStateMachine::new(SignalTiming::default(), clock.now());
    let expected = [
        SignalPhase::Lane1Yellow,
        SignalPhase::Lane2Green,
        SignalPhase::Lane2Yellow,
        SignalPhase::Lane1Green,
        SignalPhase::Lane1Yellow,
    ];

    let mut seen = Vec::new();
    for _ in 0..200 {
        clock.advance(STEP);
        if let Some(transition) = machine.tick(clock.now(), counts(1, 1)) {
            assert_eq!(transition.to, transition.from.next());
            seen.push(transition.to);
        }
        if seen.len() == expected.len() {
            break;
        }
    }

    assert_eq!(seen, expected);
}

#[test]
fn test_transition_happens_once_per_tick() {
    let clock = ManualClock::new();
    let mut machine = SignalStateMachine::new(SignalTiming::default(), clock.now());

    // A long stall still advances a single phase
    clock.advance(Duration::from_secs(60));
    let transition = machine.tick(clock.now(), counts(0, 0));
    assert_eq!(
        transition,
        Some(Transition {
            from: SignalPhase::Lane1Green,
            to: SignalPhase::Lane1Yellow
        })
    );
    assert_eq!(machine.phase(), SignalPhase::Lane1Yellow);
}

#[test]
fn test_no_conflicting_lights_in_any_phase() {
    for phase in [
        SignalPhase::Lane1Green,
        SignalPhase::Lane1Yellow,
        SignalPhase::Lane2Green,
        SignalPhase::Lane2Yellow,
    ] {
        let [lane1, lane2] = phase.colors();
        if lane1 == LightColor::Green {
            assert_eq!(lane2, LightColor::Red, "{}", phase);
        }
        if lane2 == LightColor::Green {
            assert_eq!(lane1, LightColor::Red, "{}", phase);
        }
    }
}

#[test]
fn test_lane2_yellow_shows_yellow_on_both_lanes() {
    assert_eq!(
        SignalPhase::Lane2Yellow.colors(),
        [LightColor::Yellow, LightColor::Yellow]
    );
    assert_eq!(
        SignalPhase::Lane1Yellow.colors(),
        [LightColor::Yellow, LightColor::Red]
    );
}

#[test]
fn test_timer_counts_down_for_timed_lane_only() {
    let clock = ManualClock::new();
    let mut machine = SignalStateMachine::new(SignalTiming::default(), clock.now());

    clock.advance(Duration::from_millis(3700));
    machine.tick(clock.now(), counts(0, 0));
    let status = machine.status(clock.now());
    assert_eq!(status.timer(LaneId::Lane1), 11);
    assert_eq!(status.timer(LaneId::Lane2), 0);

    clock.advance(Duration::from_millis(11300));
    machine.tick(clock.now(), counts(0, 0));
    let status = machine.status(clock.now());
    assert_eq!(status.phase, SignalPhase::Lane1Yellow);
    assert_eq!(status.timers, [2, 0]);

    clock.advance(Duration::from_secs(2));
    machine.tick(clock.now(), counts(0, 0));
    let status = machine.status(clock.now());
    assert_eq!(status.phase, SignalPhase::Lane2Green);
    assert_eq!(status.timers, [0, 15]);
    assert_eq!(status.light(LaneId::Lane2), LightColor::Green);
}

#[test]
fn test_remaining_seconds_floors_and_saturates() {
    let budget = Duration::from_secs(15);
    assert_eq!(remaining_seconds(budget, Duration::from_millis(14100)), 0);
    assert_eq!(remaining_seconds(budget, Duration::from_millis(13900)), 1);
    assert_eq!(remaining_seconds(budget, Duration::from_secs(40)), 0);
    assert_eq!(remaining_seconds(budget, Duration::ZERO), 15);
}

#[test]
fn test_timing_from_config() {
    let config = crate::config::SignalConfig {
        green_max_seconds: 20,
        green_min_seconds: 8,
        yellow_seconds: 3,
    };
    let timing = SignalTiming::from_config(&config);
    assert_eq!(timing.green_max, Duration::from_secs(20));
    assert_eq!(timing.budget(SignalPhase::Lane2Green), Duration::from_secs(20));
    assert_eq!(timing.budget(SignalPhase::Lane2Yellow), Duration::from_secs(3));
}

#[test]
fn test_phase_serializes_screaming_snake_case() {
    assert_eq!(
        serde_json::to_string(&SignalPhase::Lane2Yellow).unwrap(),
        "\"LANE2_YELLOW\""
    );
    assert_eq!(serde_json::to_string(&LightColor::Green).unwrap(), "\"green\"");
}
