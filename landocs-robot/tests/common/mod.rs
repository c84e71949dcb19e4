//! A LanDocs client laid out the way the registration workflow expects it,
//! built on the in-memory accessibility tree.

#![allow(dead_code)]

use landocs_robot::element::{Capability, ControlType, ExpandCollapseState, ToggleState};
use landocs_robot::landocs::{
    AGREEMENT_WINDOW, APP_WINDOW_NAME, ATTACH_WINDOW, COUNTERPARTY_WINDOW,
    CREATE_DOCUMENT_WINDOW, DATA_PANEL, DOCUMENT_KIND, DOCUMENT_SUBKIND, ERROR_WINDOW,
    FOLDER_STRUCTURE_TAB, JOURNALS_NODE, RECONCILIATION_FOLDER,
};
use landocs_robot::platforms::memory::{MemoryTree, NodeId, NodeSpec};
use landocs_robot::workflow::{journal_name_for, Orchestrator, WorkflowOptions};
use std::cell::Cell;
use std::sync::Arc;
use std::time::Duration;

const FORM: &str = "Tab/Pane/Pane/Pane/Tab/Pane";
const SEARCH_PANE: &str = "Pane[1]/Pane/Pane[1]/Pane/Pane/Pane/Pane/Tree/Pane/Pane/Pane";

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

/// Counterparty known to the fake client.
pub struct Counterparty {
    pub tax_id: &'static str,
    pub secondary_code: &'static str,
    pub name: &'static str,
}

pub const VECTOR: Counterparty = Counterparty {
    tax_id: "7701234567",
    secondary_code: "770101001",
    name: "ООО Вектор",
};

/// Node ids the tests assert on.
#[derive(Debug, Clone)]
pub struct FakeLandocs {
    pub app: NodeId,
    pub search_edit: NodeId,
    pub organization: NodeId,
    pub counterparty_tax_field: NodeId,
    pub counterparty_rows: Vec<NodeId>,
    pub journals: NodeId,
    pub journal: NodeId,
    pub first_agreement: NodeId,
    pub signatory: NodeId,
    pub structure_tab: NodeId,
    pub folder_toggle: NodeId,
    pub attachment_path: NodeId,
    pub open_button: NodeId,
}

struct Builder<'a> {
    tree: &'a MemoryTree,
    slot: Cell<u32>,
}

impl Builder<'_> {
    fn put(&self, from: NodeId, path: &str, spec: NodeSpec) -> NodeId {
        self.tree.place(from, path, spec).unwrap()
    }

    fn node(&self, from: NodeId, path: &str) -> NodeId {
        self.tree.ensure_path(from, path).unwrap()
    }

    // Non-overlapping rectangles so hit-testing finds exactly one node.
    fn clickable(&self, kind: ControlType) -> NodeSpec {
        let slot = self.slot.get();
        self.slot.set(slot + 1);
        NodeSpec::new(kind).bounds(f64::from(slot) * 100.0, 500.0, 80.0, 20.0)
    }

    fn invokable(&self, kind: ControlType) -> NodeSpec {
        NodeSpec::new(kind).with(Capability::Invokable)
    }
}

impl FakeLandocs {
    /// Adds the main window and every window the workflow opens under the
    /// desktop root of `tree`. `ppud` decides which organization and journal exist.
    pub fn build(tree: &MemoryTree, ppud: &str, counterparties: &[Counterparty]) -> Self {
        let b = Builder {
            tree,
            slot: Cell::new(0),
        };
        let app = tree.add(tree.root(), NodeSpec::new(ControlType::Window).name(APP_WINDOW_NAME));

        b.put(app, "Pane[3]/Tab/TabItem[1]", b.clickable(ControlType::TabItem).name("Избранное"));
        b.put(
            app,
            "Pane[1]/Pane/Pane[1]/Pane/Pane/Button[2]",
            b.invokable(ControlType::Button).name("Организации"),
        );
        let search_edit = b.put(app, &format!("{SEARCH_PANE}/Edit"), NodeSpec::new(ControlType::Edit).value(""));
        b.put(
            app,
            &format!("{SEARCH_PANE}/Button[3]"),
            b.invokable(ControlType::Button).name("Найти"),
        );
        let group = b.node(app, "Pane[1]/Pane/Pane[1]/Pane/Pane/Pane/Pane/Tree/Group");
        tree.add(group, b.invokable(ControlType::DataItem).value("0001.01"));
        let organization = tree.add(group, b.invokable(ControlType::DataItem).value(ppud));
        b.put(
            app,
            "Pane[3]/Pane/Pane/ToolBar[1]/Button",
            b.clickable(ControlType::Button).name("Создать"),
        );
        tree.on_chord("ctrl+f", move |t| t.set_focus(search_edit));

        let doc = tree.add(app, NodeSpec::new(ControlType::Window).name(CREATE_DOCUMENT_WINDOW));
        for (pane, kind) in [(14, DOCUMENT_KIND), (16, DOCUMENT_SUBKIND)] {
            b.put(
                doc,
                &format!("{FORM}/Pane[4]/Pane/Pane[1]/Pane[2]/Pane[{pane}]/ComboBox/Button[1]"),
                b.invokable(ControlType::Button),
            );
            tree.add(doc, b.invokable(ControlType::Other).name(kind));
        }
        b.put(
            doc,
            &format!("{FORM}/Pane[4]/Pane/Pane[1]/Pane[2]/Pane[7]/Edit/Button[1]"),
            b.clickable(ControlType::Button),
        );
        b.put(
            doc,
            &format!("{FORM}/Pane[3]/Pane/Pane/Button[2]"),
            b.clickable(ControlType::Button),
        );
        b.put(
            doc,
            &format!("{FORM}/Pane[3]/Pane/Pane/Button[4]"),
            NodeSpec::new(ControlType::Button).name("Договор № 12 от 01.01.2024"),
        );
        let signatory = b.put(
            doc,
            &format!("{FORM}/Pane[4]/Pane/Pane[1]/Pane[1]/Pane[13]/Edit"),
            NodeSpec::new(ControlType::Edit).value(""),
        );
        let save = b.put(
            doc,
            "Pane[2]/Pane/Pane/ToolBar[1]/Button[1]",
            b.clickable(ControlType::Button).name("Сохранить"),
        );
        let tabs = b.node(doc, "Tab/Pane/Pane/Pane/Tab");
        let structure_tab = tree.add(
            tabs,
            b.clickable(ControlType::TabItem)
                .name(FOLDER_STRUCTURE_TAB)
                .with(Capability::Selectable)
                .disabled(),
        );
        // The folder structure tab unlocks once the card is saved.
        tree.on_click(save, move |t| t.set_enabled(structure_tab, true));

        let folders = b.node(doc, &format!("{FORM}/Pane/Tree"));
        let folder_toggle = tree.add(
            folders,
            NodeSpec::new(ControlType::Other)
                .name("Папки")
                .toggle_state(ToggleState::Off),
        );
        tree.add(folders, NodeSpec::new(ControlType::Other).name(RECONCILIATION_FOLDER));
        b.put(
            doc,
            &format!("{FORM}/Pane/Pane[6]/Button"),
            b.clickable(ControlType::Button).name("Добавить"),
        );

        let cp = tree.add(doc, NodeSpec::new(ControlType::Window).name(COUNTERPARTY_WINDOW));
        let counterparty_tax_field = b.put(
            cp,
            "Pane[1]/Pane/Table/Pane/Pane/Edit/Edit[1]",
            NodeSpec::new(ControlType::Edit).value(""),
        );
        b.put(
            cp,
            "Pane[1]/Pane/Table/Pane/Pane/Button[2]",
            b.invokable(ControlType::Button).name("Поиск"),
        );
        let table = b.node(cp, "Pane[1]/Pane/Table");
        let panel = tree.add(table, NodeSpec::new(ControlType::Pane).name(DATA_PANEL));
        let counterparty_rows = counterparties
            .iter()
            .map(|c| {
                let row = tree.add(panel, NodeSpec::new(ControlType::Custom));
                tree.add(
                    row,
                    b.invokable(ControlType::DataItem).value(format!(
                        "ИНН: {}, КПП: {}, {}",
                        c.tax_id, c.secondary_code, c.name
                    )),
                )
            })
            .collect();
        b.put(cp, "Pane[2]/Button[1]", b.invokable(ControlType::Button).name("Выбрать"));

        let ag = tree.add(doc, NodeSpec::new(ControlType::Window).name(AGREEMENT_WINDOW));
        let agreement_tree = b.node(ag, "Pane/Pane/Pane[3]/Tree");
        tree.add(agreement_tree, NodeSpec::new(ControlType::Other).name("Vertical"));
        let journals = tree.add(
            agreement_tree,
            NodeSpec::new(ControlType::Other)
                .name(JOURNALS_NODE)
                .expand_state(ExpandCollapseState::Collapsed),
        );
        let mut journal = journals;
        for name in ["0001.Договоры", "0002.Договоры", "0003.Договоры"]
            .into_iter()
            .map(str::to_string)
            .chain([journal_name_for(ppud)])
        {
            journal = tree.add(
                journals,
                NodeSpec::new(ControlType::Other)
                    .name(name)
                    .with(Capability::ScrollItem)
                    .with(Capability::Selectable),
            );
        }
        tree.make_scrollable(journals, 2);
        let agreements = b.node(ag, "Pane/Pane/Pane[2]/Pane[2]/Table");
        let agreement_panel = tree.add(agreements, NodeSpec::new(ControlType::Pane).name(DATA_PANEL));
        let first_agreement = tree.add(
            agreement_panel,
            NodeSpec::new(ControlType::DataItem).with(Capability::LegacyAccessible),
        );
        tree.add(
            agreement_panel,
            NodeSpec::new(ControlType::DataItem).with(Capability::LegacyAccessible),
        );
        b.put(
            ag,
            "Pane/Pane/Pane[2]/Pane[3]/Button[1]",
            b.invokable(ControlType::Button).name("Выбрать"),
        );

        let at = tree.add(doc, NodeSpec::new(ControlType::Window).name(ATTACH_WINDOW));
        let attachment_path = b.put(at, "ComboBox[1]/Edit", NodeSpec::new(ControlType::Edit).value(""));
        let open_button = tree.add(at, b.invokable(ControlType::Button).name("Open"));

        FakeLandocs {
            app,
            search_edit,
            organization,
            counterparty_tax_field,
            counterparty_rows,
            journals,
            journal,
            first_agreement,
            signatory,
            structure_tab,
            folder_toggle,
            attachment_path,
            open_button,
        }
    }
}

/// The application's error window, as left behind by a failed registration.
pub fn add_error_window(tree: &MemoryTree, message: &str) -> NodeId {
    let window = tree.add(tree.root(), NodeSpec::new(ControlType::Window).name(ERROR_WINDOW));
    tree.add(window, NodeSpec::new(ControlType::Text).name(message));
    tree.add(window, NodeSpec::new(ControlType::Button).name("&ОК"));
    window
}
