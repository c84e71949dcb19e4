//! The LanDocs registration workflow as data.
//!
//! Paths below were recorded against the LanDocs client in production and
//! break whenever a client update reshuffles its panes. When a step starts
//! failing with `NotFound`, re-record the path for that step only.

use crate::counterparty::CounterpartyQuery;
use crate::platforms::KeyChord;
use crate::selector::Selector;
use crate::workflow::{
    journal_name_for, Interaction, LocateSpec, PostCondition, Scope, Step, Target,
};
use std::time::Duration;

pub const APP_WINDOW_NAME: &str = "_robin_landocs (Мой LanDocs) - Избранное - LanDocs";
pub const CREATE_DOCUMENT_WINDOW: &str = "Без имени - Документ LanDocs";
pub const COUNTERPARTY_WINDOW: &str = "Выбор элемента";
pub const AGREEMENT_WINDOW: &str = "Выбор документа";
pub const ATTACH_WINDOW: &str = "Выберете файлы для прикрепления к РК";
pub const ERROR_WINDOW: &str = "Ошибка";

pub const DOCUMENT_KIND: &str = "ППУД. Исходящий электронный документ";
pub const DOCUMENT_SUBKIND: &str = "ППУД ИСХ. Акт сверки по договору / договорам";
pub const DATA_PANEL: &str = "Панель данных";
pub const JOURNALS_NODE: &str = "Журналы регистрации";
pub const FOLDER_STRUCTURE_TAB: &str = "Структура папок";
pub const RECONCILIATION_FOLDER: &str = "Акт сверки";

// Window lookups that wait on the application itself.
const WINDOW_TIMEOUT: Duration = Duration::from_secs(300);
const SHORT_TIMEOUT: Duration = Duration::from_secs(10);

const APP: &str = "app";
const DOCUMENT: &str = "document";
const COUNTERPARTY: &str = "counterparty";
const AGREEMENT: &str = "agreement";
const AGREEMENT_TREE: &str = "agreement_tree";
const STRUCTURE_TABS: &str = "structure_tabs";
const FOLDER_TREE: &str = "folder_tree";
const ATTACH: &str = "attach";

const SEARCH_PANE: &str = "Pane[1]/Pane/Pane[1]/Pane/Pane/Pane/Pane/Tree/Pane/Pane/Pane";
const DOCUMENT_FORM: &str = "Tab/Pane/Pane/Pane/Tab/Pane";

/// Per-file values the workflow types into LanDocs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationInput {
    pub ppud: String,
    pub tax_id: String,
    pub secondary_tax_code: Option<String>,
    pub counterparty_name: String,
    pub pdf_path: String,
    pub signatory: String,
}

fn at(anchor: &'static str, path: &str) -> LocateSpec {
    LocateSpec::new(Scope::Anchor(anchor), Target::Chain(vec![Selector::path(path)]))
}

fn named(anchor: &'static str, name: &str) -> LocateSpec {
    LocateSpec::new(Scope::Anchor(anchor), Target::Chain(vec![Selector::name(name)]))
}

fn path_then_name(anchor: &'static str, path: &str, name: &str) -> LocateSpec {
    LocateSpec::new(
        Scope::Anchor(anchor),
        Target::Chain(vec![Selector::path(path), Selector::name(name)]),
    )
}

fn document_kind(label: &str, combo_path: String, kind: &str) -> [Step; 2] {
    [
        Step::new(
            format!("{label} dropdown"),
            LocateSpec::new(
                Scope::Anchor(DOCUMENT),
                Target::Chain(vec![Selector::path(&combo_path), Selector::path("Button[1]")]),
            ),
        )
        .then(Interaction::SetFocus)
        .then(Interaction::Invoke),
        Step::new(format!("{label} '{kind}'"), named(DOCUMENT, kind)).then(Interaction::Invoke),
    ]
}

fn folder_tree_steps(suffix: &str) -> [Step; 2] {
    [
        Step::new(
            format!("folder tree{suffix}"),
            at(DOCUMENT, &format!("{DOCUMENT_FORM}/Pane/Tree")),
        )
        .then(Interaction::ToggleFirstChildOn)
        .bind(FOLDER_TREE),
        Step::new(
            format!("folder '{RECONCILIATION_FOLDER}'{suffix}"),
            named(FOLDER_TREE, RECONCILIATION_FOLDER),
        )
        .then(Interaction::SetFocus),
    ]
}

/// Steps that create one outgoing reconciliation act in LanDocs and attach
/// its PDF. The application window must already be open.
pub fn registration_steps(input: &RegistrationInput) -> Vec<Step> {
    let mut steps = vec![
        Step::new(
            "application window",
            LocateSpec::new(
                Scope::Desktop,
                Target::Chain(vec![Selector::name(APP_WINDOW_NAME)]),
            ),
        )
        .verify(PostCondition::NameEquals(APP_WINDOW_NAME.to_string()))
        .bind(APP),
        Step::new("favourites tab", at(APP, "Pane[3]/Tab/TabItem[1]"))
            .then(Interaction::ClickAtCenter),
        Step::new(
            "organization picker",
            at(APP, "Pane[1]/Pane/Pane[1]/Pane/Pane/Button[2]"),
        )
        .then(Interaction::Invoke),
        Step::new(
            "open search",
            LocateSpec::new(Scope::Anchor(APP), Target::Scope),
        )
        .then(Interaction::SendChord(KeyChord::ctrl('f')))
        .then(Interaction::Pause(Duration::from_secs(3))),
        Step::new(
            "search text",
            LocateSpec::new(Scope::Focused, Target::Scope),
        )
        .then(Interaction::SetValue(input.ppud.clone())),
        Step::new("run search", at(APP, &format!("{SEARCH_PANE}/Button[3]")))
            .then(Interaction::SetFocus)
            .then(Interaction::Pause(Duration::from_secs(2)))
            .then(Interaction::Invoke),
        Step::new(
            "organization",
            at(APP, "Pane[1]/Pane/Pane[1]/Pane/Pane/Pane/Pane/Tree/Group"),
        )
        .then(Interaction::InvokeChildWithValue(input.ppud.clone())),
        Step::new("create document", at(APP, "Pane[3]/Pane/Pane/ToolBar[1]/Button"))
            .then(Interaction::ClickAtCenter),
        Step::new(
            "document window",
            named(APP, CREATE_DOCUMENT_WINDOW).timeout(WINDOW_TIMEOUT),
        )
        .verify(PostCondition::NameEquals(CREATE_DOCUMENT_WINDOW.to_string()))
        .bind(DOCUMENT),
    ];

    steps.extend(document_kind(
        "document kind",
        format!("{DOCUMENT_FORM}/Pane[4]/Pane/Pane[1]/Pane[2]/Pane[14]/ComboBox"),
        DOCUMENT_KIND,
    ));
    steps.extend(document_kind(
        "document subkind",
        format!("{DOCUMENT_FORM}/Pane[4]/Pane/Pane[1]/Pane[2]/Pane[16]/ComboBox"),
        DOCUMENT_SUBKIND,
    ));

    let query = CounterpartyQuery {
        tax_id: input.tax_id.clone(),
        secondary_code: input.secondary_tax_code.clone(),
        display_name: Some(input.counterparty_name.clone()),
    };

    steps.extend([
        Step::new(
            "counterparty picker",
            at(
                DOCUMENT,
                &format!("{DOCUMENT_FORM}/Pane[4]/Pane/Pane[1]/Pane[2]/Pane[7]/Edit/Button[1]"),
            ),
        )
        .then(Interaction::ClickAtCenter),
        Step::new(
            "counterparty window",
            LocateSpec::new(
                Scope::Anchor(DOCUMENT),
                Target::FirstOf(vec![
                    Selector::name(COUNTERPARTY_WINDOW),
                    Selector::path("Window[1]"),
                ]),
            ),
        )
        .bind(COUNTERPARTY),
        Step::new(
            "counterparty tax id",
            at(COUNTERPARTY, "Pane[1]/Pane/Table/Pane/Pane/Edit/Edit[1]"),
        )
        .then(Interaction::SetValue(input.tax_id.clone())),
        Step::new(
            "counterparty search",
            at(COUNTERPARTY, "Pane[1]/Pane/Table/Pane/Pane/Button[2]"),
        )
        .then(Interaction::SetFocus)
        .then(Interaction::Invoke),
        Step::new(
            "counterparty row",
            path_then_name(COUNTERPARTY, "Pane[1]/Pane/Table", DATA_PANEL),
        )
        .then(Interaction::ResolveCounterparty(query)),
        Step::new(
            "confirm counterparty",
            at(COUNTERPARTY, "Pane[2]/Button[1]").timeout(SHORT_TIMEOUT),
        )
        .then(Interaction::SetFocus)
        .then(Interaction::Invoke),
        Step::new(
            "agreement picker",
            at(DOCUMENT, &format!("{DOCUMENT_FORM}/Pane[3]/Pane/Pane/Button[2]"))
                .timeout(SHORT_TIMEOUT),
        )
        .then(Interaction::ClickAtCenter),
        Step::new("agreement window", named(DOCUMENT, AGREEMENT_WINDOW)).bind(AGREEMENT),
        Step::new("agreement tree", at(AGREEMENT, "Pane/Pane/Pane[3]/Tree")).bind(AGREEMENT_TREE),
        Step::new("agreement tree scroll bar", named(AGREEMENT_TREE, "Vertical")),
        Step::new("registration journals", named(AGREEMENT_TREE, JOURNALS_NODE))
            .then(Interaction::EnsureExpanded)
            .then(Interaction::JournalScrollSearch {
                target: journal_name_for(&input.ppud),
            }),
        Step::new(
            "first agreement",
            path_then_name(AGREEMENT, "Pane/Pane/Pane[2]/Pane[2]/Table", DATA_PANEL),
        )
        .then(Interaction::LegacySelectFirstChild),
        Step::new("confirm agreement", at(AGREEMENT, "Pane/Pane/Pane[2]/Pane[3]/Button[1]"))
            .then(Interaction::SetFocus)
            .then(Interaction::Invoke),
        Step::new(
            "agreement label",
            at(DOCUMENT, &format!("{DOCUMENT_FORM}/Pane[3]/Pane/Pane/Button[4]")),
        )
        .verify(PostCondition::NameNotEmpty),
        Step::new(
            "signatory",
            at(
                DOCUMENT,
                &format!("{DOCUMENT_FORM}/Pane[4]/Pane/Pane[1]/Pane[1]/Pane[13]/Edit"),
            ),
        )
        .then(Interaction::SetValue(input.signatory.clone())),
        Step::new("save document", at(DOCUMENT, "Pane[2]/Pane/Pane/ToolBar[1]/Button[1]"))
            .then(Interaction::SetFocus)
            .then(Interaction::ClickAtCenter),
        Step::new("document tabs", at(DOCUMENT, "Tab/Pane/Pane/Pane/Tab")).bind(STRUCTURE_TABS),
        Step::new(
            "folder structure tab",
            named(STRUCTURE_TABS, FOLDER_STRUCTURE_TAB),
        )
        .then(Interaction::AwaitEnabled {
            attempts: 3,
            wait: Duration::from_secs(60),
        })
        .then(Interaction::Select)
        .then(Interaction::ClickAtCenter),
        Step::new(
            "focus document tabs",
            LocateSpec::new(Scope::Anchor(STRUCTURE_TABS), Target::Scope),
        )
        .then(Interaction::SetFocus),
    ]);

    steps.extend(folder_tree_steps(""));

    steps.extend([
        Step::new(
            "add attachment",
            path_then_name(DOCUMENT, &format!("{DOCUMENT_FORM}/Pane/Pane[6]"), "Добавить"),
        )
        .then(Interaction::SetFocus)
        .then(Interaction::ClickAtCenter),
        Step::new(
            "attachment window",
            named(DOCUMENT, ATTACH_WINDOW).timeout(WINDOW_TIMEOUT),
        )
        .verify(PostCondition::NameEquals(ATTACH_WINDOW.to_string()))
        .bind(ATTACH),
        Step::new("attachment path", at(ATTACH, "ComboBox[1]/Edit"))
            .then(Interaction::SetValue(input.pdf_path.clone())),
        Step::new(
            "open attachment",
            LocateSpec::new(
                Scope::Anchor(ATTACH),
                Target::FirstOf(vec![Selector::name("Open"), Selector::name("Открыть")]),
            ),
        )
        .then(Interaction::SetFocus)
        .then(Interaction::Invoke),
    ]);

    steps.extend(folder_tree_steps(" after attachment"));
    steps
}
