use super::element::WindowsUIElement;
use super::types::ThreadSafeWinUIAutomation;
use super::utils::create_ui_automation_with_com_init;
use crate::platforms::AccessibilityEngine;
use crate::{AutomationError, UIElement};
use std::sync::Arc;

pub struct WindowsEngine {
    automation: ThreadSafeWinUIAutomation,
}

impl WindowsEngine {
    pub fn new() -> Result<Self, AutomationError> {
        let automation = create_ui_automation_with_com_init()?;
        Ok(Self {
            automation: ThreadSafeWinUIAutomation(Arc::new(automation)),
        })
    }
}

impl AccessibilityEngine for WindowsEngine {
    fn get_root_element(&self) -> Result<UIElement, AutomationError> {
        let root = self
            .automation
            .0
            .get_root_element()
            .map_err(|e| AutomationError::PlatformError(format!("Failed to get desktop: {e}")))?;
        Ok(WindowsUIElement::wrap(root))
    }

    fn get_focused_element(&self) -> Result<UIElement, AutomationError> {
        let element = self
            .automation
            .0
            .get_focused_element()
            .map_err(|e| AutomationError::ElementNotFound(e.to_string()))?;
        Ok(WindowsUIElement::wrap(element))
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
