use hyacinth_river::clock::{Cadence, MAX_FRAME_DELTA, MAX_SPEED, MIN_SPEED};
use hyacinth_river::{CalendarUnit, Clock, ClockState};
use std::{cell::RefCell, rc::Rc};

#[test]
fn advance_is_gated_by_state() {
    let mut clock = Clock::new(1.0, CalendarUnit::Day);
    assert_eq!(clock.state(), ClockState::Stopped);
    assert_eq!(clock.advance(0.5), None);

    clock.play();
    assert_eq!(clock.advance(0.5), Some(0.5));

    clock.pause();
    assert_eq!(clock.state(), ClockState::Paused);
    for _ in 0..10 {
        assert_eq!(clock.advance(0.5), None);
    }
    assert_eq!(clock.ticks(), 1);
    assert_eq!(clock.elapsed(), 0.5);
}

#[test]
fn pause_only_applies_while_running() {
    let mut clock = Clock::new(1.0, CalendarUnit::Day);
    clock.pause();
    assert_eq!(clock.state(), ClockState::Stopped);

    clock.toggle();
    assert_eq!(clock.state(), ClockState::Running);
    clock.toggle();
    assert_eq!(clock.state(), ClockState::Paused);
    clock.toggle();
    assert_eq!(clock.state(), ClockState::Running);
}

#[test]
fn speed_scales_time_and_is_clamped() {
    let mut clock = Clock::new(4.0, CalendarUnit::Week);
    clock.play();
    assert_eq!(clock.advance(0.25), Some(1.0));
    assert_eq!(clock.days(), 1);

    clock.set_speed(100.0);
    assert_eq!(clock.speed(), MAX_SPEED);
    clock.set_speed(0.0);
    assert_eq!(clock.speed(), MIN_SPEED);
    clock.set_speed(f64::NAN);
    assert_eq!(clock.speed(), 1.0);
}

#[test]
fn day_counter_is_floor_of_elapsed_time() {
    let mut clock = Clock::new(1.0, CalendarUnit::Day);
    clock.play();
    for _ in 0..25 {
        clock.advance(0.1);
    }
    assert_eq!(clock.ticks(), 25);
    assert_eq!(clock.days(), 2);
}

#[test]
fn reset_zeroes_counters_but_keeps_speed() {
    let mut clock = Clock::new(1.0, CalendarUnit::Day);
    clock.set_speed(3.0);
    clock.play();
    for _ in 0..40 {
        clock.advance(0.1);
    }
    assert!(clock.days() > 0);

    clock.reset();
    assert_eq!(clock.state(), ClockState::Stopped);
    assert_eq!(clock.elapsed(), 0.0);
    assert_eq!(clock.ticks(), 0);
    assert_eq!(clock.days(), 0);
    assert_eq!(clock.speed(), 3.0);
}

#[test]
fn listeners_see_every_change() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut clock = Clock::new(1.0, CalendarUnit::Day);
    let sink = Rc::clone(&seen);
    clock.subscribe(move |snapshot| sink.borrow_mut().push(*snapshot));

    clock.play();
    clock.advance(0.5);
    clock.pause();
    clock.advance(0.5);
    clock.reset();

    let seen = seen.borrow();
    let states: Vec<_> = seen.iter().map(|snapshot| snapshot.state).collect();
    assert_eq!(
        states,
        [
            ClockState::Running,
            ClockState::Running,
            ClockState::Paused,
            ClockState::Stopped,
        ]
    );
    assert_eq!(seen[1].ticks, 1);
}

#[test]
fn cadence_counts_whole_seconds() {
    let mut cadence = Cadence::new();
    assert_eq!(cadence.tick(0.6), 0);
    assert_eq!(cadence.tick(0.6), 1);
    assert_eq!(cadence.tick(2.5), 2);
    assert_eq!(cadence.tick(-1.0), 0);

    let mut cadence = Cadence::with_offset(0.9);
    assert_eq!(cadence.tick(0.1), 1);
}

#[test]
fn frames_are_finite_and_capped() {
    let mut clock = Clock::new(MAX_SPEED, CalendarUnit::Day).with_max_frame_delta(0.5);
    clock.play();

    assert_eq!(clock.advance(f64::INFINITY), Some(0.0));
    assert_eq!(clock.advance(f64::NAN), Some(0.0));
    assert_eq!(clock.elapsed(), 0.0);
    assert_eq!(clock.ticks(), 2);

    assert_eq!(clock.advance(1e12), Some(0.5 * MAX_SPEED));
    assert_eq!(clock.days(), 10);

    let clock = Clock::new(1.0, CalendarUnit::Day);
    assert_eq!(clock.max_frame_delta(), MAX_FRAME_DELTA);
    assert_eq!(clock.with_max_frame_delta(-1.0).max_frame_delta(), MAX_FRAME_DELTA);
}

#[test]
fn cadence_counts_huge_steps_without_iterating() {
    let mut cadence = Cadence::new();
    assert_eq!(cadence.tick(f64::INFINITY), 0);
    assert_eq!(cadence.tick(f64::NAN), 0);
    assert_eq!(cadence.tick(1e6 + 0.5), 1_000_000);
    assert_eq!(cadence.tick(0.5), 1);
    assert_eq!(cadence.tick(1e12), u32::MAX);
    assert_eq!(cadence.tick(0.25), 0);
}
