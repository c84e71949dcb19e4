use crate::element::{ControlType, UIElement};
use crate::errors::RobotError;
use crate::locator::{Locator, DEFAULT_POLL_INTERVAL};
use crate::selector::Selector;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, warn};

/// Logged when an error window has no text child.
pub const MISSING_DIALOG_MESSAGE: &str = "Сообщение не найдено";

const OK_BUTTON_NAME: &str = "&ОК";

/// What an application error window said.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDialog {
    pub window: String,
    pub message: String,
    pub has_ok_button: bool,
}

/// Finds the error window named `window_name` under `root` and reads its message.
pub async fn inspect_error_dialog(
    root: &UIElement,
    window_name: &str,
    timeout: Duration,
) -> Result<ErrorDialog, RobotError> {
    let window = Locator::new(root.clone(), Selector::name(window_name))
        .set_default_timeout(timeout)
        .poll_interval(DEFAULT_POLL_INTERVAL.min(timeout))
        .wait(None)
        .await
        .map_err(|e| RobotError::NotFound(format!("error window '{window_name}': {e}")))?;

    let message = window
        .children_of_kind(ControlType::Text)?
        .into_iter()
        .next()
        .and_then(|text| text.name())
        .unwrap_or_else(|| MISSING_DIALOG_MESSAGE.to_string());
    error!("application reported an error in '{window_name}': {message}");

    let has_ok_button = Locator::new(window, Selector::name(OK_BUTTON_NAME))
        .set_default_timeout(timeout)
        .poll_interval(DEFAULT_POLL_INTERVAL.min(timeout))
        .wait(None)
        .await
        .is_ok();
    if !has_ok_button {
        warn!("error window '{window_name}' has no '{OK_BUTTON_NAME}' button");
    }

    Ok(ErrorDialog {
        window: window_name.to_string(),
        message,
        has_ok_button,
    })
}
