//! Whole-run behaviour over a temporary input folder.

mod common;

use async_trait::async_trait;
use common::{add_error_window, fast_options, FakeLandocs, VECTOR};
use landocs_robot::errors::{ConverterError, ErrorKind, RobotError};
use landocs_robot::pipeline::TicketStatus;
use landocs_robot::platforms::memory::MemoryTree;
use landocs_robot::{
    AppLauncher, ApplicationSession, LandocsDriver, Orchestrator, OrganizationMap, Robot,
    SessionConfig, SpreadsheetConverter,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

const ACT: &str = "Акт св П 1 ООО Вектор №15 31.12.24_7701234567_770101001";
const MANIFEST: &str = r#"[{
    "title": "Акты сверки",
    "orgFil": { "title": "ООО Ромашка" },
    "formTypeInt": { "title": "Электронный документ" }
}]"#;

#[derive(Default)]
struct CopyConverter {
    seen: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl SpreadsheetConverter for CopyConverter {
    async fn convert(&self, input: &Path, output: &Path) -> Result<(), ConverterError> {
        self.seen.lock().unwrap().push(input.to_path_buf());
        if input.to_string_lossy().contains("broken") {
            return Err(ConverterError::ConversionFailed {
                reason: "corrupt workbook".to_string(),
                stderr: None,
            });
        }
        fs::copy(input, output)?;
        Ok(())
    }

    fn name(&self) -> &str {
        "copy"
    }
}

/// Opens the fake client on first launch; later launches find it running.
struct FakeLauncher {
    tree: MemoryTree,
    ppud: &'static str,
    launches: AtomicUsize,
    fake: Mutex<Option<FakeLandocs>>,
}

impl FakeLauncher {
    fn new(tree: &MemoryTree) -> Arc<Self> {
        Arc::new(Self {
            tree: tree.clone(),
            ppud: "0042.01",
            launches: AtomicUsize::new(0),
            fake: Mutex::new(None),
        })
    }

    fn fake(&self) -> FakeLandocs {
        self.fake.lock().unwrap().clone().expect("LanDocs was never launched")
    }
}

impl AppLauncher for FakeLauncher {
    fn launch(&self, _app_path: &Path) -> Result<(), RobotError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        let mut fake = self.fake.lock().unwrap();
        if fake.is_none() {
            *fake = Some(FakeLandocs::build(&self.tree, self.ppud, &[VECTOR]));
        }
        Ok(())
    }
}

fn organizations() -> OrganizationMap {
    let mut map = OrganizationMap::default();
    map.insert("ООО Ромашка", "0042.01");
    map
}

fn ticket(input: &Path, name: &str, files: &[&str]) -> PathBuf {
    let folder = input.join(name);
    let edo = folder.join("ЭДО");
    fs::create_dir_all(&edo).unwrap();
    fs::write(folder.join("request.txt"), MANIFEST).unwrap();
    for file in files {
        fs::write(edo.join(file), b"content").unwrap();
    }
    edo
}

fn driver(tree: &MemoryTree, launcher: Arc<FakeLauncher>) -> LandocsDriver {
    let mut config = SessionConfig::new("LanDocs.exe");
    config.window_timeout = Duration::from_secs(2);
    config.window_poll = Duration::from_millis(10);
    config.settle = Duration::ZERO;
    LandocsDriver {
        engine: Arc::new(tree.engine()),
        orchestrator: Orchestrator::new(Arc::new(tree.engine()), Arc::new(tree.input()))
            .with_options(fast_options()),
        session: ApplicationSession::new(config, launcher),
        signatory: "Иванов И.И.".to_string(),
    }
}

fn names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn ticket_is_reconciled_converted_and_registered() {
    let tmp = TempDir::new().unwrap();
    let edo = ticket(
        tmp.path(),
        "+T-1",
        &[&format!("{ACT}.xlsx"), "scan.pdf", "readme.docx"],
    );
    let tree = MemoryTree::new();
    let launcher = FakeLauncher::new(&tree);
    let converter = Arc::new(CopyConverter::default());

    let robot = Robot::new(tmp.path(), organizations(), converter.clone())
        .with_landocs(driver(&tree, launcher.clone()));
    let summary = robot.run().await.unwrap();

    assert_eq!(summary.tickets.len(), 1);
    let report = &summary.tickets[0];
    assert_eq!(report.ticket, "T-1");
    assert_eq!(report.status, TicketStatus::Completed, "{:?}", report.abandon_reason);
    assert_eq!(report.files_registered, vec![format!("{ACT}.pdf")]);
    assert_eq!(report.files_quarantined, vec!["scan.pdf".to_string()]);
    assert_eq!(report.conversions_failed, 0);

    assert_eq!(converter.seen.lock().unwrap().len(), 1);
    assert_eq!(names(&edo.join("pdf")), vec![format!("{ACT}.pdf")]);
    assert_eq!(
        names(&edo.join("error")),
        vec!["readme.docx".to_string(), "scan.pdf".to_string()]
    );
    assert_eq!(launcher.launches.load(Ordering::SeqCst), 1);

    let fake = launcher.fake();
    let attached = tree.value_of(fake.attachment_path).unwrap();
    assert!(attached.ends_with(&format!("{ACT}.pdf")), "{attached}");
    assert_eq!(tree.value_of(fake.search_edit).as_deref(), Some("0042.01"));
}

#[tokio::test]
async fn reconcile_only_run_keeps_going_after_a_broken_ticket() {
    let tmp = TempDir::new().unwrap();
    // No ЭДО folder at all.
    let broken = tmp.path().join("A-0");
    fs::create_dir_all(&broken).unwrap();
    fs::write(broken.join("request.txt"), MANIFEST).unwrap();
    let edo = ticket(
        tmp.path(),
        "B-1",
        &[&format!("{ACT}.xlsx"), "broken.xlsx"],
    );
    let converter = Arc::new(CopyConverter::default());

    let summary = Robot::new(tmp.path(), organizations(), converter)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.abandoned(), 1);
    assert_eq!(summary.completed(), 1);
    assert_eq!(summary.tickets[0].ticket, "A-0");
    assert_eq!(summary.tickets[0].abandon_kind, Some(ErrorKind::Ticket));
    assert!(summary.tickets[0]
        .abandon_reason
        .as_deref()
        .is_some_and(|r| r.contains("ЭДО")));

    let done = &summary.tickets[1];
    assert_eq!(done.conversions_failed, 1);
    assert!(done.files_registered.is_empty());
    assert_eq!(names(&edo.join("pdf")), vec![format!("{ACT}.pdf")]);
}

#[tokio::test]
async fn abandoned_registration_abandons_the_ticket() {
    let tmp = TempDir::new().unwrap();
    ticket(
        tmp.path(),
        "T-2",
        &["Акт св П 2 ООО Неизвестно №3 01.02.25_1111111111.pdf"],
    );
    let tree = MemoryTree::new();
    add_error_window(&tree, "Документ не сохранён");
    let launcher = FakeLauncher::new(&tree);

    let robot = Robot::new(tmp.path(), organizations(), Arc::new(CopyConverter::default()))
        .with_landocs(driver(&tree, launcher));
    let summary = robot.run().await.unwrap();

    let report = &summary.tickets[0];
    assert_eq!(report.status, TicketStatus::Abandoned);
    assert_eq!(report.abandon_kind, Some(ErrorKind::NotFound));
    assert!(report.files_registered.is_empty());
    assert_eq!(report.workflows.len(), 1);
    assert_eq!(
        report.workflows[0].abandon().map(|a| a.step.as_str()),
        Some("counterparty row")
    );
    assert!(report
        .abandon_reason
        .as_deref()
        .is_some_and(|r| r.contains("counterparty row")));
}

#[tokio::test]
async fn missing_input_folder_is_a_config_error() {
    let tmp = TempDir::new().unwrap();
    let robot = Robot::new(
        tmp.path().join("absent"),
        organizations(),
        Arc::new(CopyConverter::default()),
    );
    assert!(matches!(robot.run().await, Err(RobotError::Config(_))));
}
