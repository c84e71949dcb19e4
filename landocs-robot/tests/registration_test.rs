//! The full registration workflow against a fake LanDocs client.

mod common;

use common::{orchestrator, FakeLandocs, VECTOR};
use landocs_robot::element::{ExpandCollapseState, ToggleState};
use landocs_robot::landocs::{registration_steps, RegistrationInput};
use landocs_robot::platforms::memory::{MemoryTree, TreeEvent};
use landocs_robot::workflow::StepState;

fn input(tax_id: &str) -> RegistrationInput {
    RegistrationInput {
        ppud: "0042.01".to_string(),
        tax_id: tax_id.to_string(),
        secondary_tax_code: Some(VECTOR.secondary_code.to_string()),
        counterparty_name: VECTOR.name.to_string(),
        pdf_path: r"C:\robot\input\T-1\ЭДО\pdf\Акт св П 1 ООО Вектор №15 31.12.24_7701234567_770101001.pdf"
            .to_string(),
        signatory: "Иванов И.И.".to_string(),
    }
}

#[tokio::test]
async fn registration_fills_the_document_card() {
    let tree = MemoryTree::new();
    let fake = FakeLandocs::build(&tree, "0042.01", &[VECTOR]);
    let input = input(VECTOR.tax_id);
    let steps = registration_steps(&input);

    let report = orchestrator(&tree).run("landocs registration", &steps).await;

    assert!(report.is_completed(), "{:#?}", report.abandon());
    assert_eq!(report.steps.len(), steps.len());
    assert!(report.steps.iter().all(|s| s.state == StepState::Done));

    assert_eq!(tree.value_of(fake.search_edit).as_deref(), Some("0042.01"));
    assert_eq!(
        tree.value_of(fake.counterparty_tax_field).as_deref(),
        Some(VECTOR.tax_id)
    );
    assert_eq!(tree.value_of(fake.signatory).as_deref(), Some("Иванов И.И."));
    assert_eq!(
        tree.value_of(fake.attachment_path).as_deref(),
        Some(input.pdf_path.as_str())
    );
    assert_eq!(
        tree.expand_state_of(fake.journals),
        Some(ExpandCollapseState::Expanded)
    );
    assert_eq!(tree.toggle_state_of(fake.folder_toggle), Some(ToggleState::On));

    let events = tree.events();
    for expected in [
        TreeEvent::Invoked(fake.organization),
        TreeEvent::Invoked(fake.counterparty_rows[0]),
        TreeEvent::Selected(fake.journal),
        TreeEvent::LegacySelected(fake.first_agreement),
        TreeEvent::Selected(fake.structure_tab),
        TreeEvent::Clicked(fake.structure_tab),
        TreeEvent::Invoked(fake.open_button),
    ] {
        assert!(events.contains(&expected), "missing {expected:?}");
    }
    // The second folder tree pass finds the toggle already on.
    assert_eq!(
        events
            .iter()
            .filter(|e| **e == TreeEvent::Toggled(fake.folder_toggle))
            .count(),
        1
    );
}

#[tokio::test]
async fn unknown_counterparty_abandons_before_the_agreement() {
    let tree = MemoryTree::new();
    let fake = FakeLandocs::build(&tree, "0042.01", &[VECTOR]);
    let steps = registration_steps(&input("1111111111"));

    let report = orchestrator(&tree).run("landocs registration", &steps).await;

    let abandon = report.abandon().expect("registration should be abandoned");
    assert_eq!(abandon.step, "counterparty row");
    assert_eq!(report.steps.last().map(|s| s.state), Some(StepState::Failed));
    assert!(!tree
        .events()
        .contains(&TreeEvent::LegacySelected(fake.first_agreement)));
    assert_eq!(tree.value_of(fake.signatory).as_deref(), Some(""));
}
