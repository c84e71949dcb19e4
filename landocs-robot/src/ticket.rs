use crate::config::OrganizationMap;
use crate::errors::RobotError;
use crate::filename::ParsedFileName;
use crate::reconcile::list_entries;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Folder inside a ticket that holds the documents to register.
pub const EDO_FOLDER: &str = "ЭДО";

/// Attribute keys of a ticket, serialized under their historical names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TicketKey {
    #[serde(rename = "ticketFolderName")]
    FolderName,
    #[serde(rename = "ticketName")]
    Name,
    #[serde(rename = "ticketOrg")]
    Organization,
    #[serde(rename = "ticketType")]
    FormType,
    #[serde(rename = "ticketPpud")]
    Ppud,
    #[serde(rename = "pathPdf")]
    PdfFolder,
    #[serde(rename = "CounterpartyName")]
    CounterpartyName,
    #[serde(rename = "FileNameNumber")]
    DocumentNumber,
    #[serde(rename = "FileDate")]
    DocumentDate,
    #[serde(rename = "FileNameINN")]
    TaxId,
    #[serde(rename = "FileNameKPP")]
    SecondaryTaxCode,
}

impl TicketKey {
    pub const PER_FILE: [TicketKey; 5] = [
        TicketKey::CounterpartyName,
        TicketKey::DocumentNumber,
        TicketKey::DocumentDate,
        TicketKey::TaxId,
        TicketKey::SecondaryTaxCode,
    ];
}

/// Fields read from the ticket's JSON manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketManifest {
    pub organization: String,
    pub title: String,
    pub form_type: String,
}

impl TicketManifest {
    /// Accepts an object or an array whose first element is an object.
    pub fn from_json(text: &str) -> Result<Self, RobotError> {
        if text.trim().is_empty() {
            return Err(RobotError::Ticket("manifest is empty".to_string()));
        }
        let root: Value = serde_json::from_str(text)
            .map_err(|e| RobotError::Ticket(format!("manifest is not valid JSON: {e}")))?;
        let object = match &root {
            Value::Object(_) => &root,
            Value::Array(items) => match items.first() {
                Some(first @ Value::Object(_)) => first,
                _ => {
                    return Err(RobotError::Ticket(
                        "manifest array does not start with an object".to_string(),
                    ))
                }
            },
            _ => {
                return Err(RobotError::Ticket(
                    "manifest must be an object or an array of objects".to_string(),
                ))
            }
        };
        Ok(Self {
            organization: required(object, &["orgFil", "title"])?,
            title: required(object, &["title"])?,
            form_type: required(object, &["formTypeInt", "title"])?,
        })
    }
}

fn required(object: &Value, path: &[&str]) -> Result<String, RobotError> {
    let field = path
        .iter()
        .try_fold(object, |node, key| node.get(key))
        .and_then(|v| match v {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Null => None,
            other => Some(other.to_string()),
        })
        .filter(|s| !s.is_empty());
    field.ok_or_else(|| {
        RobotError::Ticket(format!("manifest field '{}' is missing or empty", path.join(".")))
    })
}

/// One inbound case folder and the attributes derived from it.
#[derive(Debug, Clone, Serialize)]
pub struct Ticket {
    folder: PathBuf,
    attributes: BTreeMap<TicketKey, String>,
}

impl Ticket {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        let folder = folder.into();
        let mut ticket = Self {
            folder,
            attributes: BTreeMap::new(),
        };
        let id = ticket_id(&ticket.folder);
        ticket.set(TicketKey::FolderName, id);
        ticket
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Folder name without `+` characters.
    pub fn id(&self) -> &str {
        self.get(TicketKey::FolderName).unwrap_or_default()
    }

    pub fn get(&self, key: TicketKey) -> Option<&str> {
        self.attributes.get(&key).map(String::as_str)
    }

    pub fn set(&mut self, key: TicketKey, value: impl Into<String>) {
        self.attributes.insert(key, value.into());
    }

    pub fn attributes(&self) -> &BTreeMap<TicketKey, String> {
        &self.attributes
    }

    /// Reads the manifest and resolves the organization's ppud code.
    pub fn load_manifest(&mut self, organizations: &OrganizationMap) -> Result<(), RobotError> {
        let path = find_manifest(&self.folder)?;
        debug!("reading manifest {}", path.display());
        let text = fs::read_to_string(&path).map_err(|e| RobotError::io(&path, e))?;
        let manifest = TicketManifest::from_json(&text)?;
        let ppud = organizations.ppud_for(&manifest.organization).ok_or_else(|| {
            RobotError::Ticket(format!(
                "organization '{}' has no ppud code",
                manifest.organization
            ))
        })?;
        info!(
            title = %manifest.title,
            form = %manifest.form_type,
            organization = %manifest.organization,
            ppud = %ppud,
            "manifest loaded"
        );
        self.set(TicketKey::Name, manifest.title);
        self.set(TicketKey::Organization, manifest.organization);
        self.set(TicketKey::FormType, manifest.form_type);
        self.set(TicketKey::Ppud, ppud);
        Ok(())
    }

    /// The `ЭДО` folder, which must exist and hold at least one entry.
    pub fn edo_folder(&self) -> Result<PathBuf, RobotError> {
        let edo = self.folder.join(EDO_FOLDER);
        if !edo.is_dir() {
            return Err(RobotError::Ticket(format!(
                "folder '{EDO_FOLDER}' not found in {}",
                self.folder.display()
            )));
        }
        if list_entries(&edo)?.is_empty() {
            return Err(RobotError::Ticket(format!("folder {} is empty", edo.display())));
        }
        Ok(edo)
    }

    /// Replaces the per-file attributes with the ones parsed from a file name.
    pub fn apply_file_name(&mut self, parsed: &ParsedFileName) {
        self.clear_file_fields();
        self.set(TicketKey::CounterpartyName, parsed.counterparty_name.trim());
        self.set(TicketKey::DocumentNumber, parsed.document_number.trim());
        self.set(TicketKey::DocumentDate, parsed.document_date.trim());
        self.set(TicketKey::TaxId, parsed.tax_id.trim());
        self.set(
            TicketKey::SecondaryTaxCode,
            parsed.secondary_tax_code.as_deref().unwrap_or_default().trim(),
        );
    }

    pub fn clear_file_fields(&mut self) {
        for key in TicketKey::PER_FILE {
            self.attributes.remove(&key);
        }
    }
}

fn ticket_id(folder: &Path) -> String {
    folder
        .file_name()
        .map(|n| n.to_string_lossy().trim().replace('+', ""))
        .unwrap_or_default()
}

/// First `*.txt` file of the folder, by name.
pub fn find_manifest(folder: &Path) -> Result<PathBuf, RobotError> {
    list_entries(folder)?
        .into_iter()
        .find(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("txt"))
        })
        .ok_or_else(|| {
            RobotError::Ticket(format!("no manifest (*.txt) in {}", folder.display()))
        })
}

/// Ticket folders under the input folder, in name order.
pub fn discover_tickets(input: &Path) -> Result<Vec<Ticket>, RobotError> {
    Ok(list_entries(input)?
        .into_iter()
        .filter(|p| p.is_dir())
        .map(Ticket::new)
        .collect())
}
