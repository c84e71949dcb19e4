mod workflow_tests;

use crate::platforms::memory::MemoryTree;
use crate::workflow::{Orchestrator, WorkflowOptions};
use std::sync::Arc;
use std::time::Duration;

// Initialize tracing for tests
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_test_writer()
        .try_init();
}

/// Short polls, a short invoke cap and no fixed pauses.
pub fn fast_options() -> WorkflowOptions {
    WorkflowOptions {
        poll_interval: Duration::from_millis(10),
        invoke_timeout: Duration::from_millis(200),
        pause_scale: 0.0,
        ..WorkflowOptions::default()
    }
}

pub fn orchestrator(tree: &MemoryTree) -> Orchestrator {
    Orchestrator::new(Arc::new(tree.engine()), Arc::new(tree.input())).with_options(fast_options())
}
