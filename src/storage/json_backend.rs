use chrono::{DateTime, NaiveDateTime, Utc};
use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use crate::{
    core::{
        errors::{NotFoundKind, SchoolError},
        utils::{ensure_dir, PathResolver},
    },
    store::{SchoolData, CURRENT_SCHEMA_VERSION},
};

use super::StorageBackend;
use crate::core::errors::Result;

const BACKUP_PREFIX: &str = "school";
const BACKUP_EXTENSION: &str = "json";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S%3f";
const TMP_SUFFIX: &str = "tmp";
const DEFAULT_RETENTION: usize = 5;

/// Stores the school document as pretty-printed JSON, keeping timestamped
/// copies of previous versions.
#[derive(Clone)]
pub struct JsonStorage {
    root: PathBuf,
    document: PathBuf,
    backups_dir: PathBuf,
    retention: usize,
}

impl JsonStorage {
    pub fn new(root: Option<PathBuf>, retention: Option<usize>) -> Result<Self> {
        let app_root = PathResolver::resolve_base(root);
        ensure_dir(&app_root)?;
        let data_dir = PathResolver::data_dir_in(&app_root);
        let backups_dir = PathResolver::backup_dir_in(&app_root);
        ensure_dir(&data_dir)?;
        ensure_dir(&backups_dir)?;
        Ok(Self {
            document: PathResolver::document_file_in(&app_root),
            root: app_root,
            backups_dir,
            retention: retention.unwrap_or(DEFAULT_RETENTION).max(1),
        })
    }

    pub fn new_default() -> Result<Self> {
        Self::new(None, None)
    }

    pub fn document_path(&self) -> &Path {
        &self.document
    }

    pub fn base_dir(&self) -> &Path {
        &self.root
    }

    pub fn backup_path(&self, backup_name: &str) -> PathBuf {
        self.backups_dir.join(backup_name)
    }

    fn backup_file_name(note: Option<&str>) -> String {
        let timestamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        let mut stem = format!("{}_{}", BACKUP_PREFIX, timestamp);
        if let Some(label) = sanitize_backup_note(note) {
            stem.push('_');
            stem.push_str(&label);
        }
        format!("{}.{}", stem, BACKUP_EXTENSION)
    }

    fn backup_existing_document(&self) -> Result<()> {
        if !self.document.exists() {
            return Ok(());
        }
        ensure_dir(&self.backups_dir)?;
        let backup_path = self.backup_path(&Self::backup_file_name(None));
        fs::copy(&self.document, &backup_path)?;
        self.prune_backups()?;
        Ok(())
    }

    fn prune_backups(&self) -> Result<()> {
        let backups = self.list_backups()?;
        if backups.len() <= self.retention {
            return Ok(());
        }
        for entry in backups.iter().skip(self.retention) {
            let _ = fs::remove_file(self.backup_path(entry));
        }
        Ok(())
    }
}

impl StorageBackend for JsonStorage {
    fn load(&self) -> Result<Option<SchoolData>> {
        if !self.document.exists() {
            return Ok(None);
        }
        load_document_from_path(&self.document).map(Some)
    }

    fn save(&self, data: &SchoolData) -> Result<()> {
        self.backup_existing_document()?;
        save_document_to_path(data, &self.document)
    }

    fn backup(&self, data: &SchoolData, note: Option<&str>) -> Result<String> {
        ensure_dir(&self.backups_dir)?;
        let name = Self::backup_file_name(note);
        let json = serde_json::to_string_pretty(data)?;
        write_atomic(&self.backup_path(&name), &json)?;
        self.prune_backups()?;
        Ok(name)
    }

    fn list_backups(&self) -> Result<Vec<String>> {
        if !self.backups_dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.backups_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(BACKUP_EXTENSION) {
                continue;
            }
            let file_name = match path.file_name().and_then(|name| name.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            entries.push(file_name);
        }
        entries.sort_by(|a, b| {
            parse_backup_timestamp(b)
                .cmp(&parse_backup_timestamp(a))
                .then_with(|| b.cmp(a))
        });
        Ok(entries)
    }

    fn restore(&self, backup_name: &str) -> Result<SchoolData> {
        if !is_backup_name(backup_name) {
            return Err(SchoolError::Validation(format!(
                "`{backup_name}` is not a backup name"
            )));
        }
        let backup_path = self.backup_path(backup_name);
        if !backup_path.exists() {
            return Err(SchoolError::NotFound(NotFoundKind::Backup(
                backup_name.to_string(),
            )));
        }
        let restored = load_document_from_path(&backup_path)?;
        self.save(&restored)?;
        Ok(restored)
    }
}

/// Writes the document through a temporary sibling so a failed write never
/// truncates the existing file.
pub fn save_document_to_path(data: &SchoolData, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let json = serde_json::to_string_pretty(data)?;
    let tmp = tmp_path(path);
    write_atomic(&tmp, &json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn load_document_from_path(path: &Path) -> Result<SchoolData> {
    let raw = fs::read_to_string(path)?;
    let data: SchoolData = serde_json::from_str(&raw)?;
    if data.schema_version > CURRENT_SCHEMA_VERSION {
        return Err(SchoolError::Storage(format!(
            "school document `{}` is from a newer schema version",
            path.display()
        )));
    }
    Ok(data)
}

fn sanitize_backup_note(note: Option<&str>) -> Option<String> {
    let raw = note?.trim();
    if raw.is_empty() {
        return None;
    }
    let mut sanitized = String::new();
    let mut last_dash = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            sanitized.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if (ch.is_whitespace() || matches!(ch, '-' | '.' | '_'))
            && !sanitized.is_empty()
            && !last_dash
        {
            sanitized.push('-');
            last_dash = true;
        }
    }
    let trimmed = sanitized.trim_matches('-').to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Reads the timestamp out of `school_<date>_<time>[_note].json`.
fn parse_backup_timestamp(name: &str) -> Option<DateTime<Utc>> {
    let stem = name.strip_suffix(&format!(".{}", BACKUP_EXTENSION))?;
    let mut parts = stem.split('_');
    if parts.next()? != BACKUP_PREFIX {
        return None;
    }
    let date_part = parts.next()?;
    let time_part = parts.next()?;
    if !is_digits(date_part, 8) || !is_digits(time_part, 9) {
        return None;
    }
    let raw = format!("{}{}", date_part, &time_part[..6]);
    let millis: i64 = time_part[6..].parse().ok()?;
    NaiveDateTime::parse_from_str(&raw, "%Y%m%d%H%M%S")
        .ok()
        .map(|naive| {
            DateTime::from_naive_utc_and_offset(naive, Utc) + chrono::Duration::milliseconds(millis)
        })
}

/// Plain file names in the backups directory only.
fn is_backup_name(name: &str) -> bool {
    !name.contains('/') && !name.contains('\\') && parse_backup_timestamp(name).is_some()
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.chars().all(|c| c.is_ascii_digit())
}

pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

pub(crate) fn write_atomic(path: &Path, data: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}
