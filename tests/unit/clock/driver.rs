use super::*;

#[test]
fn tick_length_truncates() {
    assert_eq!(VirtualClock::for_fps(25).tick_ms(), 40);
    assert_eq!(VirtualClock::for_fps(24).tick_ms(), 41);
    assert_eq!(VirtualClock::for_fps(60).tick_ms(), 16);
    assert_eq!(VirtualClock::for_fps(1000).tick_ms(), 1);
}

#[test]
fn install_resets_and_advance_steps() {
    let mut clock = VirtualClock::for_fps(25);
    assert!(!clock.is_installed());

    clock.install();
    assert!(clock.is_installed());
    assert_eq!(clock.elapsed_ms(), 0);

    clock.advance();
    clock.advance();
    assert_eq!(clock.elapsed_ms(), 80);

    clock.advance_by(760);
    assert_eq!(clock.elapsed_ms(), 840);

    clock.install();
    assert_eq!(clock.elapsed_ms(), 0);
}

#[test]
fn handles_observe_advances_immediately() {
    let mut clock = VirtualClock::new(10);
    let a = clock.handle();
    let b = a.clone();
    clock.install();
    clock.advance();
    assert_eq!(a.elapsed_ms(), 10);
    assert_eq!(b.elapsed_ms(), 10);
    assert!(b.is_installed());
}

#[test]
fn handle_release_uninstalls_once() {
    let mut clock = VirtualClock::new(10);
    let handle = clock.handle();
    clock.install();
    assert!(handle.release());
    assert!(!handle.release());
    assert!(!clock.is_installed());
    // Uninstalling an already released clock is harmless.
    clock.uninstall();
    assert!(!clock.is_installed());
}

#[test]
fn uninstall_keeps_elapsed() {
    let mut clock = VirtualClock::new(40);
    clock.install();
    clock.advance();
    clock.uninstall();
    assert_eq!(clock.elapsed_ms(), 40);
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "virtual clock advanced while not installed")]
fn advance_before_install_panics_in_debug() {
    let mut clock = VirtualClock::new(40);
    clock.advance();
}

#[cfg(not(debug_assertions))]
#[test]
fn advance_before_install_is_ignored_in_release() {
    let mut clock = VirtualClock::new(40);
    clock.advance();
    assert_eq!(clock.elapsed_ms(), 0);
}
