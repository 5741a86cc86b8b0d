//! Debounce behaviour of the restart scheduler.

use std::path::Path;
use std::time::Duration;

use hotwire::supervisor::{ChangeNotice, RestartScheduler, CHANGED_PATH_PRINT_LIMIT};
use tokio::time::Instant;

const DEBOUNCE: Duration = Duration::from_millis(1000);

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Drive one scheduler per generation with changes at the given offsets and
/// count the restarts that fire.
fn restarts_for(offsets: &[u64]) -> usize {
    let t0 = Instant::now();
    let mut scheduler = RestartScheduler::new(DEBOUNCE);
    let mut restarts = 0;

    for &offset in offsets {
        let now = t0 + ms(offset);
        if scheduler.poll(now) {
            restarts += 1;
            scheduler = RestartScheduler::new(DEBOUNCE);
        }
        scheduler.on_change(Path::new("/p/a.js"), now);
    }
    if let Some(deadline) = scheduler.deadline() {
        if scheduler.poll(deadline) {
            restarts += 1;
        }
    }
    restarts
}

#[test]
fn burst_within_window_restarts_once() {
    assert_eq!(restarts_for(&[0, 100, 300, 900, 1800]), 1);
}

#[test]
fn spaced_changes_restart_each_time() {
    assert_eq!(restarts_for(&[0, 1500, 3000, 4500]), 4);
}

#[test]
fn changes_after_start_do_not_count() {
    let t0 = Instant::now();
    let mut scheduler = RestartScheduler::new(DEBOUNCE);
    scheduler.on_change(Path::new("/p/a.js"), t0);
    assert!(scheduler.poll(t0 + DEBOUNCE));

    for i in 1..5 {
        assert!(scheduler
            .on_change(Path::new("/p/b.js"), t0 + DEBOUNCE + ms(i))
            .is_none());
        assert!(!scheduler.poll(t0 + DEBOUNCE * 3));
    }
    assert!(scheduler.is_started());
}

#[test]
fn notices_are_capped_with_a_single_marker() {
    let t0 = Instant::now();
    let mut scheduler = RestartScheduler::new(DEBOUNCE);
    let mut paths = 0;
    let mut markers = 0;

    for i in 0..25 {
        let path = format!("/p/file{i}.js");
        let outcome = scheduler.on_change(Path::new(&path), t0).unwrap();
        match outcome.notice {
            Some(ChangeNotice::Path(_)) => paths += 1,
            Some(ChangeNotice::Overflow) => markers += 1,
            None => {}
        }
    }

    assert_eq!(paths, CHANGED_PATH_PRINT_LIMIT);
    assert_eq!(markers, 1);
    assert_eq!(scheduler.changed_count(), 25);
}
