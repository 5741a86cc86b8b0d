//! Integration tests for the report channel between child and supervisor.

use std::path::PathBuf;
use std::time::Duration;

use hotwire::ipc::{take_report_file, ChildMessage, ReportServer, Reporter};
use tempfile::TempDir;

async fn next_message(
    rx: &mut tokio::sync::mpsc::UnboundedReceiver<ChildMessage>,
) -> ChildMessage {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for report")
        .expect("channel closed")
}

/// The first report is initial and later reports carry only new paths.
#[tokio::test]
async fn reporter_round_trip() {
    let dir = TempDir::new().unwrap();
    let socket_path = dir.path().join("report.sock");

    let (handle, mut rx) = ReportServer::new(&socket_path)
        .start()
        .expect("Failed to start server");

    let mut reporter = Reporter::new(Some(socket_path.clone()), None);
    assert!(reporter.is_supervised());

    reporter.report_paths(["/p/a.js", "/p/b.js"]).await.unwrap();
    reporter.report_paths(["/p/b.js", "/p/c.js"]).await.unwrap();
    reporter.report_paths(["/p/a.js"]).await.unwrap();

    assert_eq!(
        next_message(&mut rx).await,
        ChildMessage::AddPaths {
            paths: vec![PathBuf::from("/p/a.js"), PathBuf::from("/p/b.js")],
            initial: true,
        }
    );
    assert_eq!(
        next_message(&mut rx).await,
        ChildMessage::AddPaths {
            paths: vec![PathBuf::from("/p/c.js")],
            initial: false,
        }
    );

    handle.shutdown();
}

/// Paths reported while the supervisor was unreachable are included in the
/// initial report once it is.
#[tokio::test]
async fn initial_report_carries_paths_from_failed_attempts() {
    let dir = TempDir::new().unwrap();
    let socket_path = dir.path().join("late.sock");

    let mut reporter = Reporter::new(Some(socket_path.clone()), None)
        .with_timeout(Duration::from_millis(200));
    assert!(reporter.report_paths(["/p/early.js"]).await.is_err());

    let (handle, mut rx) = ReportServer::new(&socket_path).start().unwrap();
    reporter.report_paths(["/p/late.js"]).await.unwrap();

    assert_eq!(
        next_message(&mut rx).await,
        ChildMessage::AddPaths {
            paths: vec![PathBuf::from("/p/early.js"), PathBuf::from("/p/late.js")],
            initial: true,
        }
    );

    handle.shutdown();
}

/// The report file written on exit is consumed exactly once.
#[tokio::test]
async fn report_file_hand_off() {
    let dir = TempDir::new().unwrap();
    let report_file = dir.path().join("report.json");

    let mut reporter = Reporter::new(None, Some(report_file.clone()));
    reporter.report_paths(["/p/a.js", "/p/b.js"]).await.unwrap();
    reporter.write_report_file().unwrap();

    let paths = take_report_file(&report_file).unwrap();
    assert_eq!(
        paths,
        Some(vec![PathBuf::from("/p/a.js"), PathBuf::from("/p/b.js")])
    );
    assert_eq!(take_report_file(&report_file).unwrap(), None);
}
