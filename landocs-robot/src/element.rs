use crate::errors::AutomationError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::str::FromStr;
use tracing::instrument;

/// Control kinds addressable from a structural path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlType {
    Pane,
    Table,
    Tab,
    TabItem,
    Button,
    Group,
    CheckBox,
    ComboBox,
    Edit,
    Text,
    Window,
    Custom,
    Tree,
    ToolBar,
    DataItem,
    /// Any kind the provider reports that paths cannot name (tree items, scroll bars, ...).
    Other,
}

impl ControlType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlType::Pane => "Pane",
            ControlType::Table => "Table",
            ControlType::Tab => "Tab",
            ControlType::TabItem => "TabItem",
            ControlType::Button => "Button",
            ControlType::Group => "Group",
            ControlType::CheckBox => "CheckBox",
            ControlType::ComboBox => "ComboBox",
            ControlType::Edit => "Edit",
            ControlType::Text => "Text",
            ControlType::Window => "Window",
            ControlType::Custom => "Custom",
            ControlType::Tree => "Tree",
            ControlType::ToolBar => "ToolBar",
            ControlType::DataItem => "DataItem",
            ControlType::Other => "Other",
        }
    }
}

impl fmt::Display for ControlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ControlType {
    type Err = AutomationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pane" => Ok(ControlType::Pane),
            "table" => Ok(ControlType::Table),
            "tab" => Ok(ControlType::Tab),
            "tabitem" => Ok(ControlType::TabItem),
            "button" => Ok(ControlType::Button),
            "group" => Ok(ControlType::Group),
            "checkbox" => Ok(ControlType::CheckBox),
            "combobox" => Ok(ControlType::ComboBox),
            "edit" => Ok(ControlType::Edit),
            "text" => Ok(ControlType::Text),
            "window" => Ok(ControlType::Window),
            "custom" => Ok(ControlType::Custom),
            "tree" => Ok(ControlType::Tree),
            "toolbar" => Ok(ControlType::ToolBar),
            "dataitem" => Ok(ControlType::DataItem),
            other => Err(AutomationError::InvalidSelector(format!(
                "unknown control kind '{other}'"
            ))),
        }
    }
}

/// Interaction patterns a node may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    Invokable,
    ValueEditable,
    Expandable,
    Toggleable,
    Selectable,
    Scrollable,
    ScrollItem,
    LegacyAccessible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpandCollapseState {
    Collapsed,
    Expanded,
    PartiallyExpanded,
    LeafNode,
    /// A raw provider value outside the four documented states.
    Unknown(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToggleState {
    Off,
    On,
    Indeterminate,
}

/// Point-in-time copy of the attributes the robot reads from a node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UIElementAttributes {
    pub control_type: Option<ControlType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<(f64, f64, f64, f64)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

/// Provider-specific node behind a [`UIElement`].
///
/// Pattern methods default to `UnsupportedOperation` so providers only
/// implement what their nodes actually expose.
pub trait UIElementImpl: Send + Sync + Debug {
    fn object_id(&self) -> usize;
    fn control_type(&self) -> Result<ControlType, AutomationError>;
    fn name(&self) -> Option<String>;
    fn children(&self) -> Result<Vec<UIElement>, AutomationError>;
    fn bounds(&self) -> Result<(f64, f64, f64, f64), AutomationError>; // x, y, width, height
    fn is_enabled(&self) -> Result<bool, AutomationError>;
    fn supports(&self, capability: Capability) -> bool;
    fn focus(&self) -> Result<(), AutomationError>;
    fn clone_box(&self) -> Box<dyn UIElementImpl>;
    fn as_any(&self) -> &dyn std::any::Any;

    /// First descendant (depth-first, document order) whose name equals `name`.
    fn find_descendant_by_name(&self, name: &str) -> Result<Option<UIElement>, AutomationError> {
        let mut stack: Vec<UIElement> = self.children()?.into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            if node.name().as_deref() == Some(name) {
                return Ok(Some(node));
            }
            let mut children = node.children()?;
            children.reverse();
            stack.extend(children);
        }
        Ok(None)
    }

    fn value(&self) -> Result<Option<String>, AutomationError> {
        Err(self.unsupported("value"))
    }
    fn invoke(&self) -> Result<(), AutomationError> {
        Err(self.unsupported("invoke"))
    }
    fn set_value(&self, _value: &str) -> Result<(), AutomationError> {
        Err(self.unsupported("set_value"))
    }
    fn expand_collapse_state(&self) -> Result<ExpandCollapseState, AutomationError> {
        Err(self.unsupported("expand_collapse_state"))
    }
    fn expand(&self) -> Result<(), AutomationError> {
        Err(self.unsupported("expand"))
    }
    fn collapse(&self) -> Result<(), AutomationError> {
        Err(self.unsupported("collapse"))
    }
    fn toggle_state(&self) -> Result<ToggleState, AutomationError> {
        Err(self.unsupported("toggle_state"))
    }
    fn toggle(&self) -> Result<(), AutomationError> {
        Err(self.unsupported("toggle"))
    }
    fn select(&self) -> Result<(), AutomationError> {
        Err(self.unsupported("select"))
    }
    fn scroll_into_view(&self) -> Result<(), AutomationError> {
        Err(self.unsupported("scroll_into_view"))
    }
    /// Vertical scroll position in percent, `None` when not vertically scrollable.
    fn vertical_scroll_percent(&self) -> Result<Option<f64>, AutomationError> {
        Err(self.unsupported("vertical_scroll_percent"))
    }
    fn scroll_down_large(&self) -> Result<(), AutomationError> {
        Err(self.unsupported("scroll_down_large"))
    }
    /// Name as reported by the legacy accessibility bridge.
    fn legacy_name(&self) -> Result<Option<String>, AutomationError> {
        Ok(self.name())
    }
    /// Legacy select with take-selection then take-focus.
    fn legacy_select(&self) -> Result<(), AutomationError> {
        Err(self.unsupported("legacy_select"))
    }

    fn unsupported(&self, operation: &str) -> AutomationError {
        AutomationError::UnsupportedOperation(format!(
            "'{operation}' is not supported by element '{}'",
            self.name().unwrap_or_default()
        ))
    }
}

/// A live node of the accessibility tree.
///
/// Handles are only valid until the application mutates its tree; callers
/// re-locate instead of caching them across steps.
#[derive(Debug)]
pub struct UIElement {
    inner: Box<dyn UIElementImpl>,
}

impl Clone for UIElement {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_box(),
        }
    }
}

impl UIElement {
    /// Create a new UI element from a platform-specific implementation
    pub fn new(impl_: Box<dyn UIElementImpl>) -> Self {
        Self { inner: impl_ }
    }

    pub fn object_id(&self) -> usize {
        self.inner.object_id()
    }

    pub fn control_type(&self) -> Result<ControlType, AutomationError> {
        self.inner.control_type()
    }

    pub fn name(&self) -> Option<String> {
        self.inner.name()
    }

    pub fn children(&self) -> Result<Vec<UIElement>, AutomationError> {
        self.inner.children()
    }

    /// Direct children of the given control kind, in provider order.
    pub fn children_of_kind(&self, kind: ControlType) -> Result<Vec<UIElement>, AutomationError> {
        Ok(self
            .children()?
            .into_iter()
            .filter(|child| child.control_type().map(|t| t == kind).unwrap_or(false))
            .collect())
    }

    pub fn find_descendant_by_name(
        &self,
        name: &str,
    ) -> Result<Option<UIElement>, AutomationError> {
        self.inner.find_descendant_by_name(name)
    }

    /// Get element bounds (x, y, width, height)
    pub fn bounds(&self) -> Result<(f64, f64, f64, f64), AutomationError> {
        self.inner.bounds()
    }

    pub fn is_enabled(&self) -> Result<bool, AutomationError> {
        self.inner.is_enabled()
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.inner.supports(capability)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn focus(&self) -> Result<(), AutomationError> {
        self.inner.focus()
    }

    #[instrument(level = "debug", skip(self))]
    pub fn invoke(&self) -> Result<(), AutomationError> {
        self.inner.invoke()
    }

    pub fn value(&self) -> Result<Option<String>, AutomationError> {
        self.inner.value()
    }

    #[instrument(level = "debug", skip(self))]
    pub fn set_value(&self, value: &str) -> Result<(), AutomationError> {
        self.inner.set_value(value)
    }

    pub fn expand_collapse_state(&self) -> Result<ExpandCollapseState, AutomationError> {
        self.inner.expand_collapse_state()
    }

    pub fn expand(&self) -> Result<(), AutomationError> {
        self.inner.expand()
    }

    pub fn collapse(&self) -> Result<(), AutomationError> {
        self.inner.collapse()
    }

    pub fn toggle_state(&self) -> Result<ToggleState, AutomationError> {
        self.inner.toggle_state()
    }

    pub fn toggle(&self) -> Result<(), AutomationError> {
        self.inner.toggle()
    }

    pub fn select(&self) -> Result<(), AutomationError> {
        self.inner.select()
    }

    pub fn scroll_into_view(&self) -> Result<(), AutomationError> {
        self.inner.scroll_into_view()
    }

    pub fn vertical_scroll_percent(&self) -> Result<Option<f64>, AutomationError> {
        self.inner.vertical_scroll_percent()
    }

    pub fn scroll_down_large(&self) -> Result<(), AutomationError> {
        self.inner.scroll_down_large()
    }

    pub fn legacy_name(&self) -> Result<Option<String>, AutomationError> {
        self.inner.legacy_name()
    }

    pub fn legacy_select(&self) -> Result<(), AutomationError> {
        self.inner.legacy_select()
    }

    pub fn attributes(&self) -> UIElementAttributes {
        UIElementAttributes {
            control_type: self.control_type().ok(),
            name: self.name(),
            value: self.value().ok().flatten(),
            bounds: self.bounds().ok(),
            enabled: self.is_enabled().ok(),
        }
    }

    pub(crate) fn as_any(&self) -> &dyn std::any::Any {
        self.inner.as_any()
    }
}

impl PartialEq for UIElement {
    fn eq(&self, other: &Self) -> bool {
        self.object_id() == other.object_id()
    }
}

impl Eq for UIElement {}
