pub mod json_backend;
pub mod memory;

use crate::{core::errors::Result, store::SchoolData};

/// Abstraction over persistence backends capable of storing the school document
/// and snapshots of it.
pub trait StorageBackend: Send + Sync {
    /// Returns `None` when nothing has been persisted yet.
    fn load(&self) -> Result<Option<SchoolData>>;
    fn save(&self, data: &SchoolData) -> Result<()>;
    fn backup(&self, data: &SchoolData, note: Option<&str>) -> Result<String>;
    /// Backup names, newest first.
    fn list_backups(&self) -> Result<Vec<String>>;
    /// Makes the named backup the current document and returns it.
    fn restore(&self, backup_name: &str) -> Result<SchoolData>;
}

pub use json_backend::JsonStorage;
pub use memory::MemoryBackend;
