//! The robot's outer loop: one ticket at a time, start to finish.

use crate::config::{OrganizationMap, RobotConfig};
use crate::converter::{convert_all, SpreadsheetConverter};
use crate::errors::{ErrorKind, RobotError};
use crate::filename::parse_file_name;
use crate::landocs::{registration_steps, RegistrationInput, ERROR_WINDOW};
use crate::platforms::AccessibilityEngine;
use crate::reconcile::{
    find_unconverted_spreadsheets, list_entries, quarantine, sort_and_bucket, FolderBuckets,
};
use crate::session::ApplicationSession;
use crate::ticket::{discover_tickets, Ticket, TicketKey};
use crate::workflow::{inspect_error_dialog, Orchestrator, WorkflowReport};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, info_span, warn, Instrument};

const ERROR_DIALOG_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Completed,
    Abandoned,
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketReport {
    pub ticket: String,
    pub status: TicketStatus,
    pub files_registered: Vec<String>,
    pub files_quarantined: Vec<String>,
    pub conversions_failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abandon_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abandon_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub workflows: Vec<WorkflowReport>,
}

impl TicketReport {
    fn new(ticket: &Ticket) -> Self {
        Self {
            ticket: ticket.id().to_string(),
            status: TicketStatus::Completed,
            files_registered: Vec::new(),
            files_quarantined: Vec::new(),
            conversions_failed: 0,
            abandon_reason: None,
            abandon_kind: None,
            workflows: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub tickets: Vec<TicketReport>,
}

impl RunSummary {
    pub fn completed(&self) -> usize {
        self.tickets
            .iter()
            .filter(|t| t.status == TicketStatus::Completed)
            .count()
    }

    pub fn abandoned(&self) -> usize {
        self.tickets.len() - self.completed()
    }
}

/// Everything needed to drive LanDocs for one file.
pub struct LandocsDriver {
    pub engine: Arc<dyn AccessibilityEngine>,
    pub orchestrator: Orchestrator,
    pub session: ApplicationSession,
    pub signatory: String,
}

pub struct Robot {
    input_folder: PathBuf,
    organizations: OrganizationMap,
    converter: Arc<dyn SpreadsheetConverter>,
    landocs: Option<LandocsDriver>,
}

impl Robot {
    pub fn new(
        input_folder: impl Into<PathBuf>,
        organizations: OrganizationMap,
        converter: Arc<dyn SpreadsheetConverter>,
    ) -> Self {
        Self {
            input_folder: input_folder.into(),
            organizations,
            converter,
            landocs: None,
        }
    }

    /// Loads the organization map named by `config`; a failure is fatal.
    pub fn from_config(
        config: &RobotConfig,
        converter: Arc<dyn SpreadsheetConverter>,
    ) -> Result<Self, RobotError> {
        let organizations = OrganizationMap::load(&config.organizations_file)?;
        info!("{} organizations loaded", organizations.len());
        Ok(Self::new(&config.input_folder_path, organizations, converter))
    }

    /// Without a driver the robot only reconciles files.
    pub fn with_landocs(mut self, driver: LandocsDriver) -> Self {
        self.landocs = Some(driver);
        self
    }

    /// Processes every ticket folder in name order.
    pub async fn run(&self) -> Result<RunSummary, RobotError> {
        if !self.input_folder.is_dir() {
            return Err(RobotError::Config(format!(
                "input folder {} does not exist",
                self.input_folder.display()
            )));
        }
        let tickets = discover_tickets(&self.input_folder)?;
        info!("{} ticket(s) to process", tickets.len());

        let mut summary = RunSummary::default();
        for mut ticket in tickets {
            let span = info_span!("ticket", ticket = %ticket.id());
            let report = self.process_ticket(&mut ticket).instrument(span).await;
            summary.tickets.push(report);
        }
        info!(
            completed = summary.completed(),
            abandoned = summary.abandoned(),
            "run finished"
        );
        Ok(summary)
    }

    async fn process_ticket(&self, ticket: &mut Ticket) -> TicketReport {
        let mut report = TicketReport::new(ticket);
        info!("processing {}", ticket.folder().display());
        if let Err(e) = self.drive_ticket(ticket, &mut report).await {
            error!("ticket abandoned: {e}");
            report.status = TicketStatus::Abandoned;
            report.abandon_reason = Some(e.to_string());
            report.abandon_kind = Some(e.kind());
        }
        report
    }

    async fn drive_ticket(
        &self,
        ticket: &mut Ticket,
        report: &mut TicketReport,
    ) -> Result<(), RobotError> {
        ticket.load_manifest(&self.organizations)?;
        let edo = ticket.edo_folder()?;
        let entries = list_entries(&edo)?;
        let buckets = FolderBuckets::create(&edo)?;
        sort_and_bucket(&buckets, &entries);

        let pending = find_unconverted_spreadsheets(&buckets.spreadsheets(), &buckets.converted())?;
        info!("{} spreadsheet(s) to convert", pending.len());
        if !pending.is_empty() {
            let conversion =
                convert_all(self.converter.as_ref(), &pending, &buckets.converted()).await;
            report.conversions_failed = conversion.failed.len();
        }
        ticket.set(
            TicketKey::PdfFolder,
            buckets.converted().to_string_lossy().into_owned(),
        );

        for pdf in list_entries(&buckets.converted())? {
            if !pdf.is_file() {
                continue;
            }
            let file_name = display_name(&pdf);
            let stem = pdf
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let parsed = match parse_file_name(&stem) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("{e}");
                    match quarantine(&buckets, &pdf) {
                        Ok(_) => report.files_quarantined.push(file_name),
                        Err(move_error) => warn!("{file_name} could not be quarantined: {move_error}"),
                    }
                    continue;
                }
            };
            let Some(driver) = &self.landocs else {
                info!("{file_name} parsed, LanDocs registration disabled");
                continue;
            };
            ticket.apply_file_name(&parsed);
            info!(
                counterparty = %parsed.counterparty_name,
                number = %parsed.document_number,
                "registering {file_name}"
            );

            let workflow = self.register(driver, ticket, &pdf).await?;
            let abandon = workflow.abandon().cloned();
            report.workflows.push(workflow);
            if let Some(abandon) = abandon {
                warn!("LanDocs registration of {file_name} abandoned");
                self.log_error_dialog(driver).await;
                return Err(abandon.into_error());
            }
            report.files_registered.push(file_name);
        }
        ticket.clear_file_fields();
        Ok(())
    }

    async fn register(
        &self,
        driver: &LandocsDriver,
        ticket: &Ticket,
        pdf: &Path,
    ) -> Result<WorkflowReport, RobotError> {
        driver.session.start(driver.engine.as_ref()).await?;
        let value = |key: TicketKey| ticket.get(key).unwrap_or_default().to_string();
        let secondary = value(TicketKey::SecondaryTaxCode);
        let input = RegistrationInput {
            ppud: value(TicketKey::Ppud),
            tax_id: value(TicketKey::TaxId),
            secondary_tax_code: (!secondary.is_empty()).then_some(secondary),
            counterparty_name: value(TicketKey::CounterpartyName),
            pdf_path: pdf.to_string_lossy().trim().to_string(),
            signatory: driver.signatory.clone(),
        };
        Ok(driver
            .orchestrator
            .run("landocs registration", &registration_steps(&input))
            .await)
    }

    async fn log_error_dialog(&self, driver: &LandocsDriver) {
        let Ok(root) = driver.engine.get_root_element() else {
            return;
        };
        if let Ok(dialog) = inspect_error_dialog(&root, ERROR_WINDOW, ERROR_DIALOG_TIMEOUT).await {
            error!(message = %dialog.message, "LanDocs showed an error window");
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
