use tracing::{debug, instrument, trace};

use crate::element::UIElement;
use crate::errors::AutomationError;
use crate::selector::{Selector, StructuralPath};
use std::time::{Duration, Instant};
use tokio::task;

/// Fixed pause between two lookup attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

// Default timeout if none is specified on the locator itself
const DEFAULT_LOCATOR_TIMEOUT: Duration = Duration::from_secs(60);

/// Single attempt at walking `path` from `root`.
///
/// Returns `Ok(None)` as soon as one segment has fewer matching children
/// than its index requires.
pub fn resolve_path_once(
    root: &UIElement,
    path: &StructuralPath,
) -> Result<Option<UIElement>, AutomationError> {
    let mut current = root.clone();
    for segment in path.segments() {
        let matching = current.children_of_kind(segment.kind)?;
        match matching.into_iter().nth(segment.index - 1) {
            Some(next) => current = next,
            None => {
                trace!("segment {segment} missing under {:?}", current.name());
                return Ok(None);
            }
        }
    }
    Ok(Some(current))
}

/// Resolves a structural path, restarting from `root` after every miss.
///
/// Intermediate nodes may not exist yet while the application populates a
/// window, so a failed segment never resumes mid-path.
#[instrument(level = "debug", skip(root, path), fields(path = %path))]
pub fn locate_by_path(
    root: &UIElement,
    path: &StructuralPath,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<UIElement, AutomationError> {
    poll_until(timeout, poll_interval, || resolve_path_once(root, path))
        .map_err(|e| not_found(e, &format!("path '{path}'"), timeout))
}

/// Exact-name search among the descendants of `root`, on the same poll/timeout discipline.
#[instrument(level = "debug", skip(root))]
pub fn locate_by_name(
    root: &UIElement,
    name: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<UIElement, AutomationError> {
    poll_until(timeout, poll_interval, || root.find_descendant_by_name(name))
        .map_err(|e| not_found(e, &format!("name '{name}'"), timeout))
}

/// Dispatches on the selector kind.
pub fn locate(
    root: &UIElement,
    selector: &Selector,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<UIElement, AutomationError> {
    match selector {
        Selector::Path(path) => locate_by_path(root, path, timeout, poll_interval),
        Selector::Name(name) => locate_by_name(root, name, timeout, poll_interval),
        Selector::Invalid(reason) => Err(AutomationError::InvalidSelector(reason.clone())),
    }
}

fn poll_until<F>(
    timeout: Duration,
    poll_interval: Duration,
    mut attempt: F,
) -> Result<UIElement, AutomationError>
where
    F: FnMut() -> Result<Option<UIElement>, AutomationError>,
{
    let started = Instant::now();
    let mut attempts = 0u32;
    let mut last_error = None;
    loop {
        attempts += 1;
        match attempt() {
            Ok(Some(found)) => {
                debug!(attempts, elapsed = ?started.elapsed(), "element located");
                return Ok(found);
            }
            Ok(None) => {}
            // The tree can change between enumerating and reading a node;
            // a provider error on one attempt is just another miss.
            Err(e @ AutomationError::InvalidSelector(_)) => return Err(e),
            Err(e) => {
                trace!("lookup attempt {attempts} failed: {e}");
                last_error = Some(e);
            }
        }
        let elapsed = started.elapsed();
        if elapsed >= timeout {
            return Err(AutomationError::ElementNotFound(format!(
                "{attempts} attempts in {elapsed:?}{}",
                last_error
                    .map(|e| format!(", last provider error: {e}"))
                    .unwrap_or_default()
            )));
        }
        std::thread::sleep(poll_interval.min(timeout - elapsed));
    }
}

fn not_found(error: AutomationError, what: &str, timeout: Duration) -> AutomationError {
    match error {
        AutomationError::ElementNotFound(detail) => AutomationError::ElementNotFound(format!(
            "no element matched {what} within {timeout:?} ({detail})"
        )),
        other => other,
    }
}

/// A selector bound to a scope root, waited on from async code.
#[derive(Clone, Debug)]
pub struct Locator {
    selector: Selector,
    root: UIElement,
    timeout: Duration,
    poll_interval: Duration,
}

impl Locator {
    pub fn new(root: UIElement, selector: impl Into<Selector>) -> Self {
        Self {
            selector: selector.into(),
            root,
            timeout: DEFAULT_LOCATOR_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set a default timeout for waiting operations on this locator instance.
    pub fn set_default_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Wait for an element matching the locator to appear, up to the specified timeout.
    /// If no timeout is provided, uses the locator's default timeout.
    #[instrument(level = "debug", skip(self, timeout), fields(selector = %self.selector))]
    pub async fn wait(&self, timeout: Option<Duration>) -> Result<UIElement, AutomationError> {
        let effective_timeout = timeout.unwrap_or(self.timeout);
        let root = self.root.clone();
        let selector = self.selector.clone();
        let poll_interval = self.poll_interval;

        // The lookup blocks between attempts; keep it off the async workers.
        task::spawn_blocking(move || locate(&root, &selector, effective_timeout, poll_interval))
            .await
            .map_err(|e| AutomationError::PlatformError(format!("Task join error: {e}")))?
            .map_err(|e| {
                if let AutomationError::ElementNotFound(inner_msg) = e {
                    AutomationError::Timeout(format!(
                        "Timed out after {effective_timeout:?} waiting for element {}. Original error: {inner_msg}",
                        self.selector
                    ))
                } else {
                    e
                }
            })
    }
}
