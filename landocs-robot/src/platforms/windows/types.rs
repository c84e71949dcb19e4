use crate::AutomationError;
use std::sync::Arc;

/// Thread-safe wrapper for the UIAutomation client object
#[derive(Clone)]
pub(crate) struct ThreadSafeWinUIAutomation(pub(crate) Arc<uiautomation::UIAutomation>);

// Safety: the client is created on an MTA thread and only used through COM
unsafe impl Send for ThreadSafeWinUIAutomation {}
unsafe impl Sync for ThreadSafeWinUIAutomation {}

/// Thread-safe wrapper for UIElement
#[derive(Clone)]
pub(crate) struct ThreadSafeWinUIElement(pub(crate) Arc<uiautomation::UIElement>);

// Safety: UIElement is thread-safe when wrapped properly
unsafe impl Send for ThreadSafeWinUIElement {}
unsafe impl Sync for ThreadSafeWinUIElement {}

impl From<uiautomation::Error> for AutomationError {
    fn from(error: uiautomation::Error) -> Self {
        AutomationError::PlatformError(format!("UIAutomation error: {error}"))
    }
}
