use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, MutexGuard,
};

use chrono::Utc;

use crate::{
    core::errors::{NotFoundKind, Result, SchoolError},
    store::SchoolData,
};

use super::StorageBackend;

/// Keeps the document in process memory. Used for fixtures and previews.
#[derive(Default)]
pub struct MemoryBackend {
    current: Mutex<Option<SchoolData>>,
    backups: Mutex<Vec<(String, SchoolData)>>,
    read_only: AtomicBool,
}

impl MemoryBackend {
    pub fn with_data(data: SchoolData) -> Self {
        Self {
            current: Mutex::new(Some(data)),
            ..Self::default()
        }
    }

    /// Makes every subsequent save fail, as a full disk would.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    fn current(&self) -> Result<MutexGuard<'_, Option<SchoolData>>> {
        self.current
            .lock()
            .map_err(|_| SchoolError::Storage("memory backend poisoned".into()))
    }

    fn backups(&self) -> Result<MutexGuard<'_, Vec<(String, SchoolData)>>> {
        self.backups
            .lock()
            .map_err(|_| SchoolError::Storage("memory backend poisoned".into()))
    }
}

impl StorageBackend for MemoryBackend {
    fn load(&self) -> Result<Option<SchoolData>> {
        Ok(self.current()?.clone())
    }

    fn save(&self, data: &SchoolData) -> Result<()> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(SchoolError::Storage("backend is read-only".into()));
        }
        *self.current()? = Some(data.clone());
        Ok(())
    }

    fn backup(&self, data: &SchoolData, note: Option<&str>) -> Result<String> {
        let mut backups = self.backups()?;
        let mut name = format!("memory_{}_{}", backups.len() + 1, Utc::now().timestamp());
        if let Some(label) = note.map(str::trim).filter(|label| !label.is_empty()) {
            name.push('_');
            name.push_str(label);
        }
        backups.push((name.clone(), data.clone()));
        Ok(name)
    }

    fn list_backups(&self) -> Result<Vec<String>> {
        Ok(self
            .backups()?
            .iter()
            .rev()
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn restore(&self, backup_name: &str) -> Result<SchoolData> {
        let snapshot = self
            .backups()?
            .iter()
            .find(|(name, _)| name == backup_name)
            .map(|(_, data)| data.clone())
            .ok_or_else(|| SchoolError::NotFound(NotFoundKind::Backup(backup_name.into())))?;
        self.save(&snapshot)?;
        Ok(snapshot)
    }
}
