//! In-process accessibility tree.
//!
//! Backs the locator and workflow tests and dry runs: nodes can be added,
//! removed and re-enabled from another thread while a lookup is polling,
//! which is how the real application behaves while it populates windows.

use super::{AccessibilityEngine, InputSimulator, KeyChord};
use crate::element::{
    Capability, ControlType, ExpandCollapseState, ToggleState, UIElement, UIElementImpl,
};
use crate::errors::AutomationError;
use crate::selector::StructuralPath;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

type Hook = Arc<dyn Fn(&MemoryTree) + Send + Sync>;

/// Everything observable that happened to the tree, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeEvent {
    Invoked(NodeId),
    Focused(NodeId),
    ValueSet(NodeId, String),
    Expanded(NodeId),
    Collapsed(NodeId),
    Toggled(NodeId),
    Selected(NodeId),
    LegacySelected(NodeId),
    ScrolledIntoView(NodeId),
    ScrolledDown(NodeId),
    Clicked(NodeId),
    CursorMoved(i32, i32),
    Chord(String),
    Typed(String),
}

/// Builder for a node's initial attributes.
#[derive(Debug, Clone)]
pub struct NodeSpec {
    kind: ControlType,
    name: Option<String>,
    value: Option<String>,
    bounds: Option<(f64, f64, f64, f64)>,
    enabled: bool,
    capabilities: Vec<Capability>,
    expand_state: Option<ExpandCollapseState>,
    toggle_state: Option<ToggleState>,
}

impl NodeSpec {
    pub fn new(kind: ControlType) -> Self {
        Self {
            kind,
            name: None,
            value: None,
            bounds: None,
            enabled: true,
            capabilities: Vec::new(),
            expand_state: None,
            toggle_state: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the value and marks the node value-editable.
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self.with(Capability::ValueEditable)
    }

    pub fn bounds(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.bounds = Some((x, y, width, height));
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with(mut self, capability: Capability) -> Self {
        if !self.capabilities.contains(&capability) {
            self.capabilities.push(capability);
        }
        self
    }

    pub fn expand_state(mut self, state: ExpandCollapseState) -> Self {
        self.expand_state = Some(state);
        self.with(Capability::Expandable)
    }

    pub fn toggle_state(mut self, state: ToggleState) -> Self {
        self.toggle_state = Some(state);
        self.with(Capability::Toggleable)
    }
}

#[derive(Debug)]
struct NodeData {
    spec: NodeSpec,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attached: bool,
    invoke_delay: Option<Duration>,
    // (offset, page) window over the children for scrollable containers
    scroll: Option<(usize, usize)>,
}

#[derive(Default)]
struct TreeState {
    nodes: Vec<NodeData>,
    focused: Option<NodeId>,
    cursor: (i32, i32),
    events: Vec<TreeEvent>,
    invoke_hooks: HashMap<NodeId, Hook>,
    click_hooks: HashMap<NodeId, Hook>,
    chord_hooks: HashMap<String, Hook>,
}

/// Shared handle to an in-memory tree. Clones see the same nodes.
#[derive(Clone)]
pub struct MemoryTree {
    state: Arc<Mutex<TreeState>>,
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTree")
            .field("nodes", &self.lock().nodes.len())
            .finish()
    }
}

impl MemoryTree {
    pub fn new() -> Self {
        let root = NodeData {
            spec: NodeSpec::new(ControlType::Pane).name("Desktop"),
            parent: None,
            children: Vec::new(),
            attached: true,
            invoke_delay: None,
            scroll: None,
        };
        let state = TreeState {
            nodes: vec![root],
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TreeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn engine(&self) -> MemoryEngine {
        MemoryEngine { tree: self.clone() }
    }

    pub fn input(&self) -> MemoryInput {
        MemoryInput { tree: self.clone() }
    }

    pub fn element(&self, id: NodeId) -> UIElement {
        UIElement::new(Box::new(MemoryElement {
            tree: self.clone(),
            id,
        }))
    }

    pub fn add(&self, parent: NodeId, spec: NodeSpec) -> NodeId {
        let mut state = self.lock();
        let id = NodeId(state.nodes.len());
        state.nodes.push(NodeData {
            spec,
            parent: Some(parent),
            children: Vec::new(),
            attached: true,
            invoke_delay: None,
            scroll: None,
        });
        state.nodes[parent.0].children.push(id);
        id
    }

    /// Walks `path` from `from`, creating whatever is missing.
    ///
    /// Missing occurrences are padded with unnamed siblings of the same kind
    /// so the returned node sits at exactly the requested per-kind index.
    pub fn ensure_path(&self, from: NodeId, path: &str) -> Result<NodeId, AutomationError> {
        let path = StructuralPath::parse(path)?;
        let mut current = from;
        for segment in path.segments() {
            let existing: Vec<NodeId> = {
                let state = self.lock();
                state.nodes[current.0]
                    .children
                    .iter()
                    .copied()
                    .filter(|c| state.nodes[c.0].spec.kind == segment.kind)
                    .collect()
            };
            current = match existing.get(segment.index - 1) {
                Some(id) => *id,
                None => {
                    let mut last = current;
                    for _ in existing.len()..segment.index {
                        last = self.add(current, NodeSpec::new(segment.kind));
                    }
                    last
                }
            };
        }
        Ok(current)
    }

    /// [`ensure_path`](Self::ensure_path), then gives the final node the
    /// attributes of `spec`. The node keeps the kind named by the path.
    pub fn place(&self, from: NodeId, path: &str, spec: NodeSpec) -> Result<NodeId, AutomationError> {
        let id = self.ensure_path(from, path)?;
        self.update(id, |current| {
            let kind = current.kind;
            *current = NodeSpec { kind, ..spec };
        });
        Ok(id)
    }

    /// Detaches a node; handles to it go stale.
    pub fn remove(&self, id: NodeId) {
        let mut state = self.lock();
        if let Some(parent) = state.nodes[id.0].parent {
            state.nodes[parent.0].children.retain(|c| *c != id);
        }
        state.nodes[id.0].attached = false;
    }

    pub fn update(&self, id: NodeId, f: impl FnOnce(&mut NodeSpec)) {
        let mut state = self.lock();
        f(&mut state.nodes[id.0].spec);
    }

    pub fn set_enabled(&self, id: NodeId, enabled: bool) {
        self.update(id, |spec| spec.enabled = enabled);
    }

    pub fn set_invoke_delay(&self, id: NodeId, delay: Duration) {
        self.lock().nodes[id.0].invoke_delay = Some(delay);
    }

    /// Shows `page` children at a time; scrolling advances by one page.
    pub fn make_scrollable(&self, id: NodeId, page: usize) {
        let mut state = self.lock();
        state.nodes[id.0].scroll = Some((0, page.max(1)));
        state.nodes[id.0].spec.capabilities.push(Capability::Scrollable);
    }

    pub fn set_focus(&self, id: NodeId) {
        self.lock().focused = Some(id);
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.lock().focused
    }

    pub fn on_invoke(&self, id: NodeId, hook: impl Fn(&MemoryTree) + Send + Sync + 'static) {
        self.lock().invoke_hooks.insert(id, Arc::new(hook));
    }

    pub fn on_click(&self, id: NodeId, hook: impl Fn(&MemoryTree) + Send + Sync + 'static) {
        self.lock().click_hooks.insert(id, Arc::new(hook));
    }

    pub fn on_chord(&self, chord: &str, hook: impl Fn(&MemoryTree) + Send + Sync + 'static) {
        self.lock()
            .chord_hooks
            .insert(chord.to_lowercase(), Arc::new(hook));
    }

    pub fn events(&self) -> Vec<TreeEvent> {
        self.lock().events.clone()
    }

    pub fn value_of(&self, id: NodeId) -> Option<String> {
        self.lock().nodes[id.0].spec.value.clone()
    }

    pub fn name_of(&self, id: NodeId) -> Option<String> {
        self.lock().nodes[id.0].spec.name.clone()
    }

    pub fn expand_state_of(&self, id: NodeId) -> Option<ExpandCollapseState> {
        self.lock().nodes[id.0].spec.expand_state
    }

    pub fn toggle_state_of(&self, id: NodeId) -> Option<ToggleState> {
        self.lock().nodes[id.0].spec.toggle_state
    }

    fn record(&self, event: TreeEvent) {
        self.lock().events.push(event);
    }

    fn run_hook(&self, hook: Option<Hook>) {
        if let Some(hook) = hook {
            hook(self);
        }
    }

    fn depth(state: &TreeState, mut id: NodeId) -> usize {
        let mut depth = 0;
        while let Some(parent) = state.nodes[id.0].parent {
            depth += 1;
            id = parent;
        }
        depth
    }

    // Deepest attached node whose bounds contain the point.
    fn hit_test(&self, x: i32, y: i32) -> Option<NodeId> {
        let state = self.lock();
        let (px, py) = (x as f64, y as f64);
        state
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.attached)
            .filter_map(|(i, n)| n.spec.bounds.map(|b| (NodeId(i), b)))
            .filter(|(_, (bx, by, bw, bh))| px >= *bx && px < bx + bw && py >= *by && py < by + bh)
            .max_by_key(|(id, _)| (Self::depth(&state, *id), id.0))
            .map(|(id, _)| id)
    }
}

/// Engine over a [`MemoryTree`].
#[derive(Clone, Debug)]
pub struct MemoryEngine {
    tree: MemoryTree,
}

impl AccessibilityEngine for MemoryEngine {
    fn get_root_element(&self) -> Result<UIElement, AutomationError> {
        Ok(self.tree.element(self.tree.root()))
    }

    fn get_focused_element(&self) -> Result<UIElement, AutomationError> {
        self.tree
            .focused()
            .map(|id| self.tree.element(id))
            .ok_or_else(|| AutomationError::ElementNotFound("no element has focus".to_string()))
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Input simulator that hit-tests clicks against the tree's bounds.
#[derive(Clone, Debug)]
pub struct MemoryInput {
    tree: MemoryTree,
}

impl InputSimulator for MemoryInput {
    fn move_cursor(&self, x: i32, y: i32) -> Result<(), AutomationError> {
        let mut state = self.tree.lock();
        state.cursor = (x, y);
        state.events.push(TreeEvent::CursorMoved(x, y));
        Ok(())
    }

    fn left_down(&self) -> Result<(), AutomationError> {
        Ok(())
    }

    fn left_up(&self) -> Result<(), AutomationError> {
        let (x, y) = self.tree.lock().cursor;
        if let Some(id) = self.tree.hit_test(x, y) {
            self.tree.record(TreeEvent::Clicked(id));
            let hook = self.tree.lock().click_hooks.get(&id).cloned();
            self.tree.run_hook(hook);
        }
        Ok(())
    }

    fn press_chord(&self, chord: &KeyChord) -> Result<(), AutomationError> {
        let key = chord.to_string();
        self.tree.record(TreeEvent::Chord(key.clone()));
        let hook = self.tree.lock().chord_hooks.get(&key).cloned();
        self.tree.run_hook(hook);
        Ok(())
    }

    fn type_text(&self, text: &str) -> Result<(), AutomationError> {
        self.tree.record(TreeEvent::Typed(text.to_string()));
        if let Some(id) = self.tree.focused() {
            self.tree.update(id, |spec| {
                let mut value = spec.value.take().unwrap_or_default();
                value.push_str(text);
                spec.value = Some(value);
            });
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
struct MemoryElement {
    tree: MemoryTree,
    id: NodeId,
}

impl MemoryElement {
    fn read<T>(&self, f: impl FnOnce(&NodeData) -> T) -> Result<T, AutomationError> {
        let state = self.tree.lock();
        let node = &state.nodes[self.id.0];
        if !node.attached {
            return Err(AutomationError::ElementNotFound(format!(
                "element {:?} is no longer in the tree",
                self.id
            )));
        }
        Ok(f(node))
    }

    fn write<T>(&self, f: impl FnOnce(&mut NodeData) -> T) -> Result<T, AutomationError> {
        let mut state = self.tree.lock();
        let node = &mut state.nodes[self.id.0];
        if !node.attached {
            return Err(AutomationError::ElementNotFound(format!(
                "element {:?} is no longer in the tree",
                self.id
            )));
        }
        Ok(f(node))
    }

    fn require(&self, capability: Capability, operation: &str) -> Result<(), AutomationError> {
        if self.supports(capability) {
            Ok(())
        } else {
            Err(self.unsupported(operation))
        }
    }
}

impl UIElementImpl for MemoryElement {
    fn object_id(&self) -> usize {
        self.id.0
    }

    fn control_type(&self) -> Result<ControlType, AutomationError> {
        self.read(|n| n.spec.kind)
    }

    fn name(&self) -> Option<String> {
        self.read(|n| n.spec.name.clone()).ok().flatten()
    }

    fn children(&self) -> Result<Vec<UIElement>, AutomationError> {
        let ids = self.read(|n| match n.scroll {
            Some((offset, page)) => n.children.iter().skip(offset).take(page).copied().collect(),
            None => n.children.clone(),
        })?;
        Ok(ids.into_iter().map(|id| self.tree.element(id)).collect())
    }

    fn bounds(&self) -> Result<(f64, f64, f64, f64), AutomationError> {
        self.read(|n| n.spec.bounds)?.ok_or_else(|| {
            AutomationError::PlatformError(format!("element {:?} has no bounding rectangle", self.id))
        })
    }

    fn is_enabled(&self) -> Result<bool, AutomationError> {
        self.read(|n| n.spec.enabled)
    }

    fn supports(&self, capability: Capability) -> bool {
        self.read(|n| n.spec.capabilities.contains(&capability))
            .unwrap_or(false)
    }

    fn focus(&self) -> Result<(), AutomationError> {
        self.read(|_| ())?;
        self.tree.set_focus(self.id);
        self.tree.record(TreeEvent::Focused(self.id));
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn UIElementImpl> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn value(&self) -> Result<Option<String>, AutomationError> {
        self.read(|n| n.spec.value.clone())
    }

    fn invoke(&self) -> Result<(), AutomationError> {
        self.require(Capability::Invokable, "invoke")?;
        if let Some(delay) = self.read(|n| n.invoke_delay)? {
            std::thread::sleep(delay);
        }
        self.tree.record(TreeEvent::Invoked(self.id));
        let hook = self.tree.lock().invoke_hooks.get(&self.id).cloned();
        self.tree.run_hook(hook);
        Ok(())
    }

    fn set_value(&self, value: &str) -> Result<(), AutomationError> {
        self.require(Capability::ValueEditable, "set_value")?;
        self.write(|n| n.spec.value = Some(value.to_string()))?;
        self.tree
            .record(TreeEvent::ValueSet(self.id, value.to_string()));
        Ok(())
    }

    fn expand_collapse_state(&self) -> Result<ExpandCollapseState, AutomationError> {
        self.require(Capability::Expandable, "expand_collapse_state")?;
        Ok(self
            .read(|n| n.spec.expand_state)?
            .unwrap_or(ExpandCollapseState::Collapsed))
    }

    fn expand(&self) -> Result<(), AutomationError> {
        self.require(Capability::Expandable, "expand")?;
        self.write(|n| n.spec.expand_state = Some(ExpandCollapseState::Expanded))?;
        self.tree.record(TreeEvent::Expanded(self.id));
        Ok(())
    }

    fn collapse(&self) -> Result<(), AutomationError> {
        self.require(Capability::Expandable, "collapse")?;
        self.write(|n| n.spec.expand_state = Some(ExpandCollapseState::Collapsed))?;
        self.tree.record(TreeEvent::Collapsed(self.id));
        Ok(())
    }

    fn toggle_state(&self) -> Result<ToggleState, AutomationError> {
        self.require(Capability::Toggleable, "toggle_state")?;
        Ok(self.read(|n| n.spec.toggle_state)?.unwrap_or(ToggleState::Off))
    }

    fn toggle(&self) -> Result<(), AutomationError> {
        self.require(Capability::Toggleable, "toggle")?;
        self.write(|n| {
            n.spec.toggle_state = Some(match n.spec.toggle_state {
                Some(ToggleState::On) => ToggleState::Off,
                _ => ToggleState::On,
            })
        })?;
        self.tree.record(TreeEvent::Toggled(self.id));
        Ok(())
    }

    fn select(&self) -> Result<(), AutomationError> {
        self.require(Capability::Selectable, "select")?;
        self.tree.record(TreeEvent::Selected(self.id));
        Ok(())
    }

    fn scroll_into_view(&self) -> Result<(), AutomationError> {
        self.require(Capability::ScrollItem, "scroll_into_view")?;
        self.tree.record(TreeEvent::ScrolledIntoView(self.id));
        Ok(())
    }

    fn vertical_scroll_percent(&self) -> Result<Option<f64>, AutomationError> {
        self.require(Capability::Scrollable, "vertical_scroll_percent")?;
        self.read(|n| {
            n.scroll.and_then(|(offset, page)| {
                let total = n.children.len();
                if total <= page {
                    None
                } else {
                    let last = total - page;
                    Some((offset.min(last) as f64 / last as f64) * 100.0)
                }
            })
        })
    }

    fn scroll_down_large(&self) -> Result<(), AutomationError> {
        self.require(Capability::Scrollable, "scroll_down_large")?;
        self.write(|n| {
            let total = n.children.len();
            if let Some((offset, page)) = n.scroll {
                let last = total.saturating_sub(page);
                n.scroll = Some(((offset + page).min(last), page));
            }
        })?;
        self.tree.record(TreeEvent::ScrolledDown(self.id));
        Ok(())
    }

    fn legacy_select(&self) -> Result<(), AutomationError> {
        self.require(Capability::LegacyAccessible, "legacy_select")?;
        self.tree.record(TreeEvent::LegacySelected(self.id));
        Ok(())
    }
}
