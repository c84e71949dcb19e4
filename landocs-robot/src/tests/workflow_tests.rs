//! Orchestrator primitives and step semantics on the in-memory tree

use super::{init_tracing, orchestrator};
use crate::counterparty::CounterpartyQuery;
use crate::element::{Capability, ControlType, ExpandCollapseState, ToggleState};
use crate::errors::{ErrorKind, RobotError};
use crate::platforms::memory::{MemoryTree, NodeSpec, TreeEvent};
use crate::platforms::KeyChord;
use crate::selector::Selector;
use crate::workflow::{
    journal_name_for, normalize_journal_name, Interaction, InvokeOutcome, LocateSpec,
    PostCondition, Scope, Step, StepState, Target,
};
use std::time::Duration;

const SHORT: Duration = Duration::from_millis(100);

fn by_name(scope: Scope, name: &str) -> LocateSpec {
    LocateSpec::new(scope, Target::Chain(vec![Selector::name(name)])).timeout(SHORT)
}

#[tokio::test]
async fn invoke_uses_the_pattern_when_present() {
    let tree = MemoryTree::new();
    let button = tree.add(
        tree.root(),
        NodeSpec::new(ControlType::Button).name("ok").with(Capability::Invokable),
    );
    let outcome = orchestrator(&tree).invoke(&tree.element(button)).await.unwrap();
    assert_eq!(outcome, InvokeOutcome::Invoked);
    assert_eq!(tree.events(), vec![TreeEvent::Invoked(button)]);
}

#[tokio::test]
async fn invoke_without_pattern_clicks_the_midpoint() {
    let tree = MemoryTree::new();
    let button = tree.add(
        tree.root(),
        NodeSpec::new(ControlType::Button).name("plain").bounds(100.0, 40.0, 60.0, 20.0),
    );
    let outcome = orchestrator(&tree).invoke(&tree.element(button)).await.unwrap();
    let InvokeOutcome::ClickedInstead(click) = outcome else {
        panic!("expected a click, got {outcome:?}");
    };
    assert_eq!(click.coordinates, Some((130.0, 50.0)));
    assert_eq!(
        tree.events(),
        vec![TreeEvent::CursorMoved(130, 50), TreeEvent::Clicked(button)]
    );
}

#[tokio::test]
async fn invoke_on_disabled_element_is_skipped() {
    let tree = MemoryTree::new();
    let button = tree.add(
        tree.root(),
        NodeSpec::new(ControlType::Button).with(Capability::Invokable).disabled(),
    );
    let outcome = orchestrator(&tree).invoke(&tree.element(button)).await.unwrap();
    assert_eq!(outcome, InvokeOutcome::Disabled);
    assert!(tree.events().is_empty());
}

#[tokio::test]
async fn blocking_invoke_times_out_without_a_second_activation() {
    init_tracing();
    let tree = MemoryTree::new();
    let button = tree.add(
        tree.root(),
        NodeSpec::new(ControlType::Button)
            .with(Capability::Invokable)
            .bounds(0.0, 0.0, 10.0, 10.0),
    );
    tree.set_invoke_delay(button, Duration::from_millis(600));

    let outcome = orchestrator(&tree).invoke(&tree.element(button)).await.unwrap();
    assert_eq!(outcome, InvokeOutcome::TimedOut);
    assert!(!tree
        .events()
        .iter()
        .any(|e| matches!(e, TreeEvent::Clicked(_))));
}

#[tokio::test]
async fn set_value_types_into_elements_without_value_pattern() {
    let tree = MemoryTree::new();
    let editable = tree.add(tree.root(), NodeSpec::new(ControlType::Edit).value("old"));
    let plain = tree.add(tree.root(), NodeSpec::new(ControlType::Edit));
    let robot = orchestrator(&tree);

    robot.set_value(&tree.element(editable), "new").unwrap();
    robot.set_value(&tree.element(plain), "typed").unwrap();

    assert_eq!(tree.value_of(editable).as_deref(), Some("new"));
    assert_eq!(tree.value_of(plain).as_deref(), Some("typed"));
    assert_eq!(tree.focused(), Some(plain));
}

#[tokio::test]
async fn ensure_expanded_leaves_expanded_nodes_alone() {
    let tree = MemoryTree::new();
    let collapsed = tree.add(
        tree.root(),
        NodeSpec::new(ControlType::Other).name("c").expand_state(ExpandCollapseState::Collapsed),
    );
    let expanded = tree.add(
        tree.root(),
        NodeSpec::new(ControlType::Other).name("e").expand_state(ExpandCollapseState::Expanded),
    );
    let plain = tree.add(tree.root(), NodeSpec::new(ControlType::Other).name("p"));

    let steps = vec![
        Step::new("collapsed", by_name(Scope::Desktop, "c")).then(Interaction::EnsureExpanded),
        Step::new("expanded", by_name(Scope::Desktop, "e")).then(Interaction::EnsureExpanded),
    ];
    let report = orchestrator(&tree).run("expand", &steps).await;
    assert!(report.is_completed(), "{report:?}");
    assert_eq!(tree.expand_state_of(collapsed), Some(ExpandCollapseState::Expanded));
    assert_eq!(tree.expand_state_of(expanded), Some(ExpandCollapseState::Expanded));
    assert_eq!(tree.events(), vec![TreeEvent::Expanded(collapsed)]);

    let steps = vec![Step::new("plain", by_name(Scope::Desktop, "p")).then(Interaction::EnsureExpanded)];
    let report = orchestrator(&tree).run("expand", &steps).await;
    assert!(!report.is_completed());
    assert_eq!(tree.expand_state_of(plain), None);
}

#[tokio::test]
async fn ensure_expanded_handles_partial_leaf_and_unknown_states() {
    let tree = MemoryTree::new();
    let partial = tree.add(
        tree.root(),
        NodeSpec::new(ControlType::Other)
            .name("partial")
            .expand_state(ExpandCollapseState::PartiallyExpanded),
    );
    let leaf = tree.add(
        tree.root(),
        NodeSpec::new(ControlType::Other)
            .name("leaf")
            .expand_state(ExpandCollapseState::LeafNode),
    );
    let odd = tree.add(
        tree.root(),
        NodeSpec::new(ControlType::Other)
            .name("odd")
            .expand_state(ExpandCollapseState::Unknown(7)),
    );

    let steps: Vec<Step> = ["partial", "leaf", "odd"]
        .into_iter()
        .map(|name| Step::new(name, by_name(Scope::Desktop, name)).then(Interaction::EnsureExpanded))
        .collect();
    let report = orchestrator(&tree).run("expand", &steps).await;

    assert!(report.is_completed(), "{report:?}");
    assert!(report.steps.iter().all(|s| s.state == StepState::Done));
    assert_eq!(tree.events(), vec![TreeEvent::Expanded(partial)]);
    assert_eq!(tree.expand_state_of(partial), Some(ExpandCollapseState::Expanded));
    assert_eq!(tree.expand_state_of(leaf), Some(ExpandCollapseState::LeafNode));
    assert_eq!(tree.expand_state_of(odd), Some(ExpandCollapseState::Unknown(7)));
    assert_eq!(report.steps[2].notes, vec!["unexpected state 7, left as is".to_string()]);
}

fn journal_tree(tree: &MemoryTree, names: &[&str], page: usize) -> crate::platforms::memory::NodeId {
    let journals = tree.add(
        tree.root(),
        NodeSpec::new(ControlType::Other)
            .name("Журналы регистрации")
            .expand_state(ExpandCollapseState::Expanded),
    );
    for name in names {
        tree.add(
            journals,
            NodeSpec::new(ControlType::Other)
                .name(*name)
                .with(Capability::ScrollItem)
                .with(Capability::Selectable),
        );
    }
    tree.make_scrollable(journals, page);
    journals
}

#[tokio::test]
async fn journal_search_scrolls_until_the_target_is_visible() {
    let tree = MemoryTree::new();
    let journals = journal_tree(
        &tree,
        &["0001.Договоры", "0002.Договоры", "0003.Договоры", "0042. Договоры", "0050.Договоры"],
        2,
    );
    let robot = orchestrator(&tree);
    let note = robot
        .journal_scroll_search(&tree.element(journals), "0042.Договоры")
        .await
        .unwrap();
    assert!(note.contains("0042. Договоры"), "{note}");

    let events = tree.events();
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, TreeEvent::ScrolledDown(_)))
            .count(),
        1
    );
    assert!(events.iter().any(|e| matches!(e, TreeEvent::Selected(_))));
    assert!(events.iter().any(|e| matches!(e, TreeEvent::ScrolledIntoView(_))));
}

#[tokio::test]
async fn journal_search_gives_up_at_the_end_of_the_list() {
    let tree = MemoryTree::new();
    let journals = journal_tree(&tree, &["a", "b", "c", "d", "e"], 2);
    let err = orchestrator(&tree)
        .journal_scroll_search(&tree.element(journals), "0042.Договоры")
        .await
        .unwrap_err();
    assert!(matches!(err, RobotError::NotFound(_)), "{err:?}");
}

#[test]
fn journal_names_are_derived_from_the_ppud_prefix() {
    assert_eq!(journal_name_for("0042.01"), "0042.Договоры");
    assert_eq!(journal_name_for("0042"), "0042.Договоры");
    assert_eq!(
        normalize_journal_name(" 0042. Договоры "),
        normalize_journal_name("0042.договоры")
    );
}

fn counterparty_panel(tree: &MemoryTree, rows: &[&str]) -> Vec<crate::platforms::memory::NodeId> {
    let panel = tree.add(tree.root(), NodeSpec::new(ControlType::Pane).name("Панель данных"));
    rows.iter()
        .map(|value| {
            let row = tree.add(panel, NodeSpec::new(ControlType::Custom));
            tree.add(row, NodeSpec::new(ControlType::Text).name("header"));
            tree.add(
                row,
                NodeSpec::new(ControlType::DataItem)
                    .value(*value)
                    .with(Capability::Invokable),
            )
        })
        .collect()
}

#[tokio::test]
async fn counterparty_row_is_resolved_and_opened() {
    let tree = MemoryTree::new();
    let items = counterparty_panel(
        &tree,
        &[
            "ИНН: 7701234567, КПП: 770101001, ООО Вектор",
            "ИНН: 7701234567, КПП: 770102002, ООО Вектор (филиал)",
        ],
    );
    let query = CounterpartyQuery {
        tax_id: "7701234567".to_string(),
        secondary_code: Some("770102002".to_string()),
        display_name: Some("ООО Вектор".to_string()),
    };
    let steps = vec![Step::new("rows", by_name(Scope::Desktop, "Панель данных"))
        .then(Interaction::ResolveCounterparty(query))];
    let report = orchestrator(&tree).run("counterparty", &steps).await;
    assert!(report.is_completed(), "{report:?}");
    assert_eq!(
        tree.events(),
        vec![TreeEvent::Focused(items[1]), TreeEvent::Invoked(items[1])]
    );
}

#[tokio::test]
async fn unknown_counterparty_abandons_the_step() {
    let tree = MemoryTree::new();
    counterparty_panel(&tree, &["ИНН: 1111111111, ООО Альфа"]);
    let query = CounterpartyQuery {
        tax_id: "7701234567".to_string(),
        ..Default::default()
    };
    let steps = vec![Step::new("rows", by_name(Scope::Desktop, "Панель данных"))
        .then(Interaction::ResolveCounterparty(query))];
    let report = orchestrator(&tree).run("counterparty", &steps).await;
    let abandon = report.abandon().expect("run should be abandoned");
    assert_eq!(abandon.step, "rows");
    assert_eq!(abandon.kind, ErrorKind::NotFound);
    assert_eq!(report.steps[0].state, StepState::Failed);
}

#[tokio::test]
async fn anchors_scope_later_steps_and_first_failure_stops_the_run() {
    init_tracing();
    let tree = MemoryTree::new();
    let window = tree.add(tree.root(), NodeSpec::new(ControlType::Window).name("main"));
    let field = tree.place(window, "Pane[2]/Edit", NodeSpec::new(ControlType::Edit).value("")).unwrap();
    let other = tree.add(tree.root(), NodeSpec::new(ControlType::Window).name("other"));
    tree.place(other, "Pane[2]/Edit", NodeSpec::new(ControlType::Edit).value("")).unwrap();

    let steps = vec![
        Step::new("main window", by_name(Scope::Desktop, "main"))
            .verify(PostCondition::NameEquals("main".to_string()))
            .bind("main"),
        Step::new(
            "field",
            LocateSpec::new(Scope::Anchor("main"), Target::Chain(vec![Selector::path("Pane[2]/Edit")]))
                .timeout(SHORT),
        )
        .then(Interaction::SetValue("hello".to_string())),
        Step::new("missing", by_name(Scope::Anchor("main"), "nope")),
        Step::new("never reached", by_name(Scope::Desktop, "main")),
    ];
    let report = orchestrator(&tree).run("anchors", &steps).await;

    assert_eq!(tree.value_of(field).as_deref(), Some("hello"));
    assert_eq!(report.steps.len(), 3);
    assert_eq!(
        report.steps[1].trace,
        vec![
            StepState::Locating,
            StepState::Found,
            StepState::Interacting,
            StepState::Done
        ]
    );
    assert_eq!(
        report.steps[2].trace,
        vec![StepState::Locating, StepState::NotFound]
    );
    assert_eq!(report.abandon().map(|a| a.step.as_str()), Some("missing"));
}

#[tokio::test]
async fn unbound_anchor_is_not_found() {
    let tree = MemoryTree::new();
    let steps = vec![Step::new("orphan", by_name(Scope::Anchor("nowhere"), "x"))];
    let report = orchestrator(&tree).run("orphan", &steps).await;
    assert_eq!(report.steps[0].state, StepState::NotFound);
}

#[tokio::test]
async fn chord_hook_moves_focus_for_the_focused_scope() {
    let tree = MemoryTree::new();
    let window = tree.add(tree.root(), NodeSpec::new(ControlType::Window).name("app"));
    let search = tree.add(window, NodeSpec::new(ControlType::Edit).value(""));
    tree.on_chord("ctrl+f", move |t| t.set_focus(search));

    let steps = vec![
        Step::new("app", by_name(Scope::Desktop, "app"))
            .then(Interaction::SendChord(KeyChord::ctrl('f')))
            .then(Interaction::Pause(Duration::from_secs(3))),
        Step::new("search", LocateSpec::new(Scope::Focused, Target::Scope))
            .then(Interaction::SetValue("0042.01".to_string())),
    ];
    let report = orchestrator(&tree).run("search", &steps).await;
    assert!(report.is_completed(), "{report:?}");
    assert_eq!(tree.value_of(search).as_deref(), Some("0042.01"));
}

#[tokio::test]
async fn await_enabled_relocates_until_the_element_is_enabled() {
    let tree = MemoryTree::new();
    let tab = tree.add(
        tree.root(),
        NodeSpec::new(ControlType::TabItem).name("Структура папок").disabled(),
    );
    let steps = vec![Step::new("tab", by_name(Scope::Desktop, "Структура папок"))
        .then(Interaction::AwaitEnabled {
            attempts: 3,
            wait: Duration::from_secs(60),
        })];
    let report = orchestrator(&tree).run("tab", &steps).await;
    assert!(matches!(
        report.abandon().map(|a| a.reason.as_str()),
        Some(reason) if reason.contains("still disabled")
    ));

    tree.set_enabled(tab, true);
    let report = orchestrator(&tree).run("tab", &steps).await;
    assert!(report.is_completed());
    assert!(report.steps[0].notes[0].contains("1 check"));
}

#[tokio::test]
async fn toggle_first_child_only_switches_it_on() {
    let tree = MemoryTree::new();
    let folders = tree.add(tree.root(), NodeSpec::new(ControlType::Tree).name("folders"));
    let first = tree.add(folders, NodeSpec::new(ControlType::Other).toggle_state(ToggleState::Off));

    let steps = vec![Step::new("folders", by_name(Scope::Desktop, "folders"))
        .then(Interaction::ToggleFirstChildOn)];
    let robot = orchestrator(&tree);
    assert!(robot.run("toggle", &steps).await.is_completed());
    assert!(robot.run("toggle", &steps).await.is_completed());
    assert_eq!(tree.toggle_state_of(first), Some(ToggleState::On));
    assert_eq!(tree.events(), vec![TreeEvent::Toggled(first)]);
}

#[tokio::test]
async fn name_verification_failure_abandons() {
    let tree = MemoryTree::new();
    tree.add(tree.root(), NodeSpec::new(ControlType::Button).name("   "));
    let steps = vec![Step::new(
        "label",
        LocateSpec::new(Scope::Desktop, Target::Chain(vec![Selector::path("Button")])).timeout(SHORT),
    )
    .verify(PostCondition::NameNotEmpty)];
    let report = orchestrator(&tree).run("label", &steps).await;
    assert_eq!(report.steps[0].state, StepState::Failed);
    assert_eq!(
        report.steps[0].trace,
        vec![
            StepState::Locating,
            StepState::Found,
            StepState::Verifying,
            StepState::Failed
        ]
    );
    let abandon = report.abandon().cloned().unwrap();
    assert_eq!(abandon.kind, ErrorKind::VerificationFailure);
    let error = abandon.into_error();
    assert_eq!(error.kind(), ErrorKind::VerificationFailure);
    assert!(error.to_string().contains("step 'label'"), "{error}");
}

#[test]
fn report_serializes_status_inline() {
    let report = crate::workflow::WorkflowReport {
        run_id: "r".to_string(),
        workflow: "w".to_string(),
        steps: Vec::new(),
        status: crate::workflow::WorkflowStatus::Completed,
    };
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["status"], "completed");

    let abandoned = crate::workflow::WorkflowReport {
        status: crate::workflow::WorkflowStatus::Abandoned(crate::workflow::Abandon {
            step: "s".to_string(),
            kind: ErrorKind::ProviderFailure,
            reason: "com".to_string(),
        }),
        ..report
    };
    let json = serde_json::to_value(&abandoned).unwrap();
    assert_eq!(json["status"], "abandoned");
    assert_eq!(json["kind"], "provider_failure");
}
