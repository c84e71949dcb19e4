//! Sorting of a ticket's files into typed buckets and detection of
//! spreadsheets that still need a PDF counterpart.

use crate::errors::RobotError;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Appended to a spreadsheet stem once its PDF exists.
pub const COMPLETION_SUFFIX: &str = "OK";

const ORGANIZATION_MARKER: &str = "ОЦО";
const LOCK_FILE_MARKER: &str = "~$";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketKind {
    Spreadsheet,
    Converted,
    Archive,
    Error,
    Document,
}

impl BucketKind {
    pub const ALL: [BucketKind; 5] = [
        BucketKind::Spreadsheet,
        BucketKind::Converted,
        BucketKind::Archive,
        BucketKind::Error,
        BucketKind::Document,
    ];

    pub fn dir_name(&self) -> &'static str {
        match self {
            BucketKind::Spreadsheet => "xlsx",
            BucketKind::Converted => "pdf",
            BucketKind::Archive => "zip",
            BucketKind::Error => "error",
            BucketKind::Document => "document",
        }
    }

    /// Routing by extension; anything unrecognized goes to `Error`.
    pub fn for_file(path: &Path) -> Self {
        match extension_of(path).as_deref() {
            Some("xlsx") => BucketKind::Spreadsheet,
            Some("pdf") => BucketKind::Converted,
            Some("zip") => BucketKind::Archive,
            _ => BucketKind::Error,
        }
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// The five bucket folders under a ticket's working folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderBuckets {
    base: PathBuf,
}

impl FolderBuckets {
    /// Creates every bucket folder under `base` (existing ones are kept).
    pub fn create(base: impl Into<PathBuf>) -> Result<Self, RobotError> {
        let buckets = Self { base: base.into() };
        for kind in BucketKind::ALL {
            let dir = buckets.path(kind);
            fs::create_dir_all(&dir).map_err(|e| RobotError::io(&dir, e))?;
        }
        Ok(buckets)
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn path(&self, kind: BucketKind) -> PathBuf {
        self.base.join(kind.dir_name())
    }

    pub fn spreadsheets(&self) -> PathBuf {
        self.path(BucketKind::Spreadsheet)
    }

    pub fn converted(&self) -> PathBuf {
        self.path(BucketKind::Converted)
    }

    pub fn errors(&self) -> PathBuf {
        self.path(BucketKind::Error)
    }
}

#[derive(Debug, Default, Serialize)]
pub struct SortOutcome {
    pub moved: Vec<(PathBuf, PathBuf)>,
    /// Files already sitting in their bucket.
    pub in_place: usize,
    pub skipped_dirs: usize,
    pub failures: Vec<(PathBuf, String)>,
}

/// Moves every file of `entries` into its bucket. Directories are skipped.
/// A failed move is recorded and the remaining files still move.
pub fn sort_and_bucket(buckets: &FolderBuckets, entries: &[PathBuf]) -> SortOutcome {
    let mut outcome = SortOutcome::default();
    for entry in entries {
        if entry.is_dir() {
            outcome.skipped_dirs += 1;
            continue;
        }
        let kind = BucketKind::for_file(entry);
        match move_into(entry, &buckets.path(kind)) {
            Ok(None) => outcome.in_place += 1,
            Ok(Some(destination)) => {
                if kind == BucketKind::Error {
                    warn!("{} has an unsupported extension, moved to error", entry.display());
                } else {
                    debug!("moved {} to {}", entry.display(), destination.display());
                }
                outcome.moved.push((entry.clone(), destination));
            }
            Err(e) => {
                warn!("could not sort {}: {e}", entry.display());
                outcome.failures.push((entry.clone(), e.to_string()));
            }
        }
    }
    info!(
        moved = outcome.moved.len(),
        in_place = outcome.in_place,
        failed = outcome.failures.len(),
        "files sorted into buckets"
    );
    outcome
}

/// Moves a file that could not be processed into the error bucket.
pub fn quarantine(buckets: &FolderBuckets, file: &Path) -> Result<PathBuf, RobotError> {
    let destination = move_into(file, &buckets.errors())?.unwrap_or_else(|| file.to_path_buf());
    warn!("quarantined {}", destination.display());
    Ok(destination)
}

// Ok(None) when the file is already in `dir`.
fn move_into(file: &Path, dir: &Path) -> Result<Option<PathBuf>, RobotError> {
    let file_name = file
        .file_name()
        .ok_or_else(|| RobotError::Ticket(format!("{} has no file name", file.display())))?;
    let destination = dir.join(file_name);
    if file.parent() == Some(dir) {
        return Ok(None);
    }
    if destination.exists() {
        return Err(RobotError::io(
            &destination,
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "destination already exists"),
        ));
    }
    fs::rename(file, &destination).map_err(|e| RobotError::io(file, e))?;
    Ok(Some(destination))
}

/// Files and folders directly inside `dir`, sorted by name.
pub fn list_entries(dir: &Path) -> Result<Vec<PathBuf>, RobotError> {
    let mut entries = fs::read_dir(dir)
        .map_err(|e| RobotError::io(dir, e))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| RobotError::io(dir, e))?;
    entries.sort();
    Ok(entries)
}

fn files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, RobotError> {
    Ok(list_entries(dir)?
        .into_iter()
        .filter(|p| p.is_file() && extension_of(p).as_deref() == Some(extension))
        .collect())
}

/// Strips a trailing `OK`/`ОК` (any case) that follows whitespace, so
/// words ending in those letters are kept. Returns the rest and whether
/// the suffix was there.
pub fn strip_completion_suffix(stem: &str) -> (&str, bool) {
    let chars: Vec<(usize, char)> = stem.char_indices().collect();
    if chars.len() < 3 || !chars[chars.len() - 3].1.is_whitespace() {
        return (stem, false);
    }
    let (cut, _) = chars[chars.len() - 2];
    let tail = stem[cut..].to_lowercase();
    if tail == "ok" || tail == "ок" {
        (&stem[..cut], true)
    } else {
        (stem, false)
    }
}

/// Lowercased, space-free name used to pair spreadsheets with PDFs.
pub fn spreadsheet_key(stem: &str) -> (String, bool) {
    let cleaned = stem.trim().replace(ORGANIZATION_MARKER, "");
    let (base, marked) = strip_completion_suffix(cleaned.trim());
    (normalize(base), marked)
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "")
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Spreadsheets in `spreadsheet_dir` with no PDF in `converted_dir`.
///
/// A PDF matches when its normalized stem starts with the spreadsheet key.
/// Matched spreadsheets without the completion suffix are renamed to carry it;
/// a rename that fails or would overwrite is logged and the scan goes on.
pub fn find_unconverted_spreadsheets(
    spreadsheet_dir: &Path,
    converted_dir: &Path,
) -> Result<Vec<PathBuf>, RobotError> {
    let pdf_keys: Vec<String> = files_with_extension(converted_dir, "pdf")?
        .iter()
        .map(|p| normalize(&stem_of(p)))
        .collect();

    let mut pending = Vec::new();
    for spreadsheet in files_with_extension(spreadsheet_dir, "xlsx")? {
        let file_name = spreadsheet
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if file_name.contains(LOCK_FILE_MARKER) {
            continue;
        }
        let stem = stem_of(&spreadsheet);
        let (key, marked) = spreadsheet_key(&stem);
        let has_pdf = !key.is_empty() && pdf_keys.iter().any(|pdf| pdf.starts_with(&key));

        if !has_pdf {
            info!("{file_name} has no PDF yet, queued for conversion");
            pending.push(spreadsheet);
            continue;
        }
        if marked {
            debug!("{file_name} already marked as converted");
            continue;
        }
        let renamed = spreadsheet_dir.join(format!("{} {COMPLETION_SUFFIX}.xlsx", stem.trim()));
        if renamed.exists() {
            warn!("{} already exists, {file_name} left as is", renamed.display());
            continue;
        }
        match fs::rename(&spreadsheet, &renamed) {
            Ok(()) => info!("{file_name} has a PDF, renamed to {}", renamed.display()),
            Err(e) => warn!("{file_name} has a PDF but could not be marked: {e}"),
        }
    }
    Ok(pending)
}
