//! Watch-set and restart behaviour of a single generation.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use hotwire::ipc::{write_report_file, ChildMessage};
use hotwire::supervisor::{ChangeNotice, Generation, GenerationExit, GenerationFiles};
use hotwire::watcher::{guess_real_path, ChangeEvent, PathFilter, WatchSet};
use tempfile::TempDir;
use tokio::time::Instant;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    fn real(&self, rel: &str) -> PathBuf {
        guess_real_path(&self.path(rel))
    }

    fn generation(&self, ordinal: u64, seed: BTreeSet<PathBuf>, dependency_trees: bool) -> Generation {
        let filter = PathFilter::new(Path::new("/opt/hotwire"), self.dir.path(), dependency_trees);
        let watch_set = WatchSet::new(filter, [self.path("app.js")], seed);
        Generation::new(
            ordinal,
            watch_set,
            Duration::from_millis(1000),
            GenerationFiles::new(self.dir.path()),
        )
    }

    fn report(&self, paths: &[&str], initial: bool) -> ChildMessage {
        ChildMessage::AddPaths {
            paths: paths.iter().map(|p| self.path(p)).collect(),
            initial,
        }
    }
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn incremental_reports_union_in_any_order() {
    let fx = Fixture::new();
    let batches: [&[&str]; 3] = [&["a.js", "b.js"], &["c.js"], &["a.js", "d/e.js"]];

    let mut forward = fx.generation(0, BTreeSet::new(), false);
    for batch in batches {
        forward.handle_message(fx.report(batch, false));
    }
    let mut backward = fx.generation(0, BTreeSet::new(), false);
    for batch in batches.iter().rev() {
        backward.handle_message(fx.report(batch, false));
    }

    let expected: BTreeSet<PathBuf> = ["a.js", "b.js", "c.js", "d/e.js"]
        .iter()
        .map(|p| fx.real(p))
        .collect();
    assert_eq!(forward.watch_set().reported(), &expected);
    assert_eq!(backward.watch_set().reported(), &expected);
}

#[test]
fn initial_report_clears_seed_idempotently() {
    let fx = Fixture::new();
    let seed: BTreeSet<PathBuf> = [fx.path("old.js")].into_iter().collect();
    let mut generation = fx.generation(1, seed, false);

    generation.handle_message(fx.report(&["a.js"], true));
    generation.handle_message(fx.report(&["a.js"], true));

    assert!(generation.watch_set().seed().is_empty());
    assert_eq!(generation.watch_set().reported().len(), 1);
    assert!(generation.discovery_complete());
}

#[test]
fn debounced_change_restarts_once_and_prints_path_once() {
    let fx = Fixture::new();
    let mut generation = fx.generation(0, BTreeSet::new(), false);
    let t0 = Instant::now();

    let added = generation.handle_message(fx.report(&["lib/a.js"], true));
    assert_eq!(added, vec![fx.real("lib/a.js")]);

    let event = ChangeEvent::Modified(fx.path("lib/a.js"));
    let mut transcript = Vec::new();

    let first = generation.handle_change(&event, t0 + ms(200)).unwrap();
    assert!(first.newly_scheduled);
    transcript.extend(first.notice);
    assert!(!generation.poll_restart(t0 + ms(400)));

    let second = generation.handle_change(&event, t0 + ms(500)).unwrap();
    assert!(!second.newly_scheduled);
    transcript.extend(second.notice);

    // The first deadline has passed but the second change pushed it out
    assert!(!generation.poll_restart(t0 + ms(1200)));
    assert!(generation.poll_restart(t0 + ms(1500)));
    assert!(!generation.poll_restart(t0 + ms(3000)));

    assert_eq!(transcript, vec![ChangeNotice::Path(fx.real("lib/a.js"))]);
}

#[test]
fn rename_away_from_watched_path_schedules_restart() {
    let fx = Fixture::new();
    let mut generation = fx.generation(0, BTreeSet::new(), false);
    generation.handle_message(fx.report(&["lib/a.js"], true));

    let event = ChangeEvent::Renamed {
        from: fx.path("lib/a.js"),
        to: fx.path("lib/a.js~"),
    };
    assert!(generation.handle_change(&event, Instant::now()).is_some());
}

#[test]
fn unrelated_change_is_ignored() {
    let fx = Fixture::new();
    let mut generation = fx.generation(0, BTreeSet::new(), false);

    let event = ChangeEvent::Modified(fx.path("README.md"));
    assert!(generation.handle_change(&event, Instant::now()).is_none());
    assert_eq!(generation.restart_deadline(), None);
}

#[test]
fn dependency_tree_path_never_triggers_restart() {
    let fx = Fixture::new();
    let mut generation = fx.generation(0, BTreeSet::new(), false);

    let added = generation.handle_message(fx.report(&["node_modules/x/index.js"], true));
    assert!(added.is_empty());

    let event = ChangeEvent::Modified(fx.path("node_modules/x/index.js"));
    assert!(generation.handle_change(&event, Instant::now()).is_none());
}

#[test]
fn dependency_tree_path_watched_when_enabled() {
    let fx = Fixture::new();
    let mut generation = fx.generation(0, BTreeSet::new(), true);

    let added = generation.handle_message(fx.report(&["node_modules/x/index.js"], true));
    assert_eq!(added.len(), 1);
}

#[test]
fn clean_exit_seeds_only_reported_paths() {
    let fx = Fixture::new();
    let seed: BTreeSet<PathBuf> = [fx.path("old.js")].into_iter().collect();
    let mut generation = fx.generation(1, seed, false);

    generation.handle_message(fx.report(&["a.js"], false));
    generation.record_exit(GenerationExit::Clean);

    let next: BTreeSet<PathBuf> = [fx.real("a.js")].into_iter().collect();
    assert_eq!(generation.next_seed(), next);
}

#[test]
fn crash_with_report_file_extends_seed() {
    let fx = Fixture::new();
    let seed: BTreeSet<PathBuf> = [fx.path("app.js"), fx.path("old.js")].into_iter().collect();
    let mut generation = fx.generation(1, seed.clone(), false);

    write_report_file(
        &generation.files().report_file,
        [fx.path("x.js"), fx.path("y.js"), fx.path("z/w.js")],
    )
    .unwrap();
    generation.record_exit(GenerationExit::Error(1));
    let added = generation.consume_report_file();
    assert_eq!(added.len(), 3);

    let expected: BTreeSet<PathBuf> = seed
        .iter()
        .map(|p| guess_real_path(p))
        .chain(["x.js", "y.js", "z/w.js"].iter().map(|p| fx.real(p)))
        .collect();
    assert!(generation.exited_with_error());
    assert_eq!(generation.next_seed(), expected);
}

#[test]
fn missing_report_file_adds_nothing() {
    let fx = Fixture::new();
    let mut generation = fx.generation(0, BTreeSet::new(), false);

    generation.record_exit(GenerationExit::Clean);
    assert!(generation.consume_report_file().is_empty());
}

#[test]
fn garbage_report_file_is_ignored() {
    let fx = Fixture::new();
    let mut generation = fx.generation(0, BTreeSet::new(), false);
    std::fs::write(&generation.files().report_file, "not json").unwrap();

    assert!(generation.consume_report_file().is_empty());
}
