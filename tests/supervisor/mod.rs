//! Supervisor module tests.

mod generation_test;
mod scheduler_test;

/// Verify the public supervisor types are exported from the library.
#[test]
fn test_all_supervisor_types_exported() {
    use hotwire::config::SupervisorConfig;
    use hotwire::supervisor::{
        ChangeNotice, GenerationExit, RestartScheduler, RestartState, Supervisor, SupervisorError,
        SupervisorState, SupervisorStateMachine, DEFAULT_DEBOUNCE,
    };
    use tokio_util::sync::CancellationToken;

    let _ = RestartScheduler::new(DEFAULT_DEBOUNCE);
    let _ = SupervisorStateMachine::new();
    let _ = Supervisor::new(SupervisorConfig::new("app.js", "/p"), CancellationToken::new());

    let _: fn(std::io::Error) -> SupervisorError = SupervisorError::Signal;

    let _ = ChangeNotice::Overflow;
    let _ = RestartState::Idle;
    let _ = SupervisorState::Stopped;
    let _ = GenerationExit::Clean;
}
