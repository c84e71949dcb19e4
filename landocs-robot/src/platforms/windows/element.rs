use super::types::ThreadSafeWinUIElement;
use super::utils::{create_ui_automation_with_com_init, element_id};
use crate::element::{Capability, ControlType, ExpandCollapseState, ToggleState, UIElementImpl};
use crate::{AutomationError, UIElement};
use std::sync::Arc;
use tracing::debug;
use uiautomation::controls::ControlType as UiaControlType;
use uiautomation::patterns;
use uiautomation::types::{ScrollAmount, TreeScope, UIProperty};

/// `SELFLAG_TAKEFOCUS` and `SELFLAG_TAKESELECTION` of `IAccessible::accSelect`.
const SELFLAG_TAKEFOCUS: i32 = 0x1;
const SELFLAG_TAKESELECTION: i32 = 0x2;

/// `UIA_ScrollPatternNoScroll`.
const NO_SCROLL: f64 = -1.0;

#[derive(Clone)]
pub struct WindowsUIElement {
    pub(crate) element: ThreadSafeWinUIElement,
}

impl std::fmt::Debug for WindowsUIElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowsUIElement")
            .field("name", &self.element.0.get_name().unwrap_or_default())
            .finish()
    }
}

impl WindowsUIElement {
    pub(crate) fn wrap(element: uiautomation::UIElement) -> UIElement {
        #[allow(clippy::arc_with_non_send_sync)]
        UIElement::new(Box::new(WindowsUIElement {
            element: ThreadSafeWinUIElement(Arc::new(element)),
        }))
    }

    fn pattern<P: patterns::UIPattern>(&self, what: &str) -> Result<P, AutomationError> {
        self.element.0.get_pattern::<P>().map_err(|e| {
            let error_str = e.to_string();
            if error_str.contains("not support") || error_str.contains("UIA_E_ELEMENTNOTAVAILABLE")
            {
                AutomationError::UnsupportedOperation(format!(
                    "element '{}' does not support {what}: {error_str}",
                    self.element.0.get_name().unwrap_or_default()
                ))
            } else {
                AutomationError::PlatformError(format!("Failed to get {what}: {e}"))
            }
        })
    }

    fn has_pattern<P: patterns::UIPattern>(&self) -> bool {
        self.element.0.get_pattern::<P>().is_ok()
    }
}

fn map_control_type(control_type: UiaControlType) -> ControlType {
    match control_type {
        UiaControlType::Pane => ControlType::Pane,
        UiaControlType::Table => ControlType::Table,
        UiaControlType::Tab => ControlType::Tab,
        UiaControlType::TabItem => ControlType::TabItem,
        UiaControlType::Button => ControlType::Button,
        UiaControlType::Group => ControlType::Group,
        UiaControlType::CheckBox => ControlType::CheckBox,
        UiaControlType::ComboBox => ControlType::ComboBox,
        UiaControlType::Edit => ControlType::Edit,
        UiaControlType::Text => ControlType::Text,
        UiaControlType::Window => ControlType::Window,
        UiaControlType::Custom => ControlType::Custom,
        UiaControlType::Tree => ControlType::Tree,
        UiaControlType::ToolBar => ControlType::ToolBar,
        UiaControlType::DataItem => ControlType::DataItem,
        _ => ControlType::Other,
    }
}

impl UIElementImpl for WindowsUIElement {
    fn object_id(&self) -> usize {
        element_id(&self.element.0)
    }

    fn control_type(&self) -> Result<ControlType, AutomationError> {
        let control_type = self
            .element
            .0
            .get_control_type()
            .map_err(|e| AutomationError::ElementNotFound(e.to_string()))?;
        Ok(map_control_type(control_type))
    }

    fn name(&self) -> Option<String> {
        self.element.0.get_name().ok()
    }

    fn children(&self) -> Result<Vec<UIElement>, AutomationError> {
        // The tree is read live; cached children would hide LanDocs' own updates.
        let automation = create_ui_automation_with_com_init()?;
        let true_condition = automation.create_true_condition().map_err(|e| {
            AutomationError::PlatformError(format!("Failed to create true condition: {e}"))
        })?;
        let children = self
            .element
            .0
            .find_all(TreeScope::Children, &true_condition)
            .map_err(|e| AutomationError::PlatformError(format!("Failed to get children: {e}")))?;
        Ok(children.into_iter().map(WindowsUIElement::wrap).collect())
    }

    fn bounds(&self) -> Result<(f64, f64, f64, f64), AutomationError> {
        let rect = self
            .element
            .0
            .get_bounding_rectangle()
            .map_err(|e| AutomationError::ElementNotFound(e.to_string()))?;
        Ok((
            rect.get_left() as f64,
            rect.get_top() as f64,
            rect.get_width() as f64,
            rect.get_height() as f64,
        ))
    }

    fn is_enabled(&self) -> Result<bool, AutomationError> {
        self.element
            .0
            .is_enabled()
            .map_err(|e| AutomationError::ElementNotFound(e.to_string()))
    }

    fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Invokable => self.has_pattern::<patterns::UIInvokePattern>(),
            Capability::ValueEditable => self.has_pattern::<patterns::UIValuePattern>(),
            Capability::Expandable => self.has_pattern::<patterns::UIExpandCollapsePattern>(),
            Capability::Toggleable => self.has_pattern::<patterns::UITogglePattern>(),
            Capability::Selectable => self.has_pattern::<patterns::UISelectionItemPattern>(),
            Capability::Scrollable => self.has_pattern::<patterns::UIScrollPattern>(),
            Capability::ScrollItem => self.has_pattern::<patterns::UIScrollItemPattern>(),
            Capability::LegacyAccessible => {
                self.has_pattern::<patterns::UILegacyIAccessiblePattern>()
            }
        }
    }

    fn focus(&self) -> Result<(), AutomationError> {
        self.element
            .0
            .set_focus()
            .map_err(|e| AutomationError::PlatformError(format!("Failed to set focus: {e}")))
    }

    fn clone_box(&self) -> Box<dyn UIElementImpl> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn value(&self) -> Result<Option<String>, AutomationError> {
        let value = self
            .pattern::<patterns::UIValuePattern>("ValuePattern")?
            .get_value()?;
        Ok(Some(value))
    }

    fn invoke(&self) -> Result<(), AutomationError> {
        self.pattern::<patterns::UIInvokePattern>("InvokePattern")?
            .invoke()
            .map_err(|e| AutomationError::PlatformError(e.to_string()))
    }

    fn set_value(&self, value: &str) -> Result<(), AutomationError> {
        debug!("setting value {value:?} on {:?}", self);
        self.pattern::<patterns::UIValuePattern>("ValuePattern")?
            .set_value(value)
            .map_err(|e| AutomationError::PlatformError(e.to_string()))
    }

    fn expand_collapse_state(&self) -> Result<ExpandCollapseState, AutomationError> {
        self.pattern::<patterns::UIExpandCollapsePattern>("ExpandCollapsePattern")?;
        let state_variant = self
            .element
            .0
            .get_property_value(UIProperty::ExpandCollapseExpandCollapseState)
            .map_err(|e| AutomationError::PlatformError(e.to_string()))?;
        let state: i32 = state_variant.try_into().map_err(|_| {
            AutomationError::PlatformError(
                "Failed to convert expand/collapse state variant to i32".to_string(),
            )
        })?;
        Ok(match state {
            0 => ExpandCollapseState::Collapsed,
            1 => ExpandCollapseState::Expanded,
            2 => ExpandCollapseState::PartiallyExpanded,
            3 => ExpandCollapseState::LeafNode,
            other => ExpandCollapseState::Unknown(other),
        })
    }

    fn expand(&self) -> Result<(), AutomationError> {
        self.pattern::<patterns::UIExpandCollapsePattern>("ExpandCollapsePattern")?
            .expand()
            .map_err(|e| AutomationError::PlatformError(format!("Failed to expand: {e}")))
    }

    fn collapse(&self) -> Result<(), AutomationError> {
        self.pattern::<patterns::UIExpandCollapsePattern>("ExpandCollapsePattern")?
            .collapse()
            .map_err(|e| AutomationError::PlatformError(format!("Failed to collapse: {e}")))
    }

    fn toggle_state(&self) -> Result<ToggleState, AutomationError> {
        let state = self
            .pattern::<patterns::UITogglePattern>("TogglePattern")?
            .get_toggle_state()?;
        Ok(match state {
            uiautomation::types::ToggleState::On => ToggleState::On,
            uiautomation::types::ToggleState::Off => ToggleState::Off,
            _ => ToggleState::Indeterminate,
        })
    }

    fn toggle(&self) -> Result<(), AutomationError> {
        self.pattern::<patterns::UITogglePattern>("TogglePattern")?
            .toggle()
            .map_err(|e| AutomationError::PlatformError(format!("Failed to toggle: {e}")))
    }

    fn select(&self) -> Result<(), AutomationError> {
        self.pattern::<patterns::UISelectionItemPattern>("SelectionItemPattern")?
            .select()
            .map_err(|e| AutomationError::PlatformError(format!("Failed to select: {e}")))
    }

    fn scroll_into_view(&self) -> Result<(), AutomationError> {
        self.pattern::<patterns::UIScrollItemPattern>("ScrollItemPattern")?
            .scroll_into_view()
            .map_err(|e| AutomationError::ScrollFailed(e.to_string()))
    }

    fn vertical_scroll_percent(&self) -> Result<Option<f64>, AutomationError> {
        let percent = self
            .pattern::<patterns::UIScrollPattern>("ScrollPattern")?
            .get_vertical_scroll_percent()?;
        Ok((percent != NO_SCROLL).then_some(percent))
    }

    fn scroll_down_large(&self) -> Result<(), AutomationError> {
        self.pattern::<patterns::UIScrollPattern>("ScrollPattern")?
            .scroll(ScrollAmount::NoAmount, ScrollAmount::LargeIncrement)
            .map_err(|e| AutomationError::ScrollFailed(e.to_string()))
    }

    fn legacy_name(&self) -> Result<Option<String>, AutomationError> {
        match self.element.0.get_pattern::<patterns::UILegacyIAccessiblePattern>() {
            Ok(legacy) => Ok(legacy.get_name().ok()),
            Err(_) => Ok(self.name()),
        }
    }

    fn legacy_select(&self) -> Result<(), AutomationError> {
        let legacy =
            self.pattern::<patterns::UILegacyIAccessiblePattern>("LegacyIAccessiblePattern")?;
        legacy.select(SELFLAG_TAKESELECTION)?;
        legacy.select(SELFLAG_TAKEFOCUS)?;
        Ok(())
    }
}
