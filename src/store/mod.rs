//! The persisted school document and the store handle the services mutate.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    core::errors::Result,
    domain::{
        common::find_by_id, ClassFeeConfig, LeaveRequest, SchoolClass, Student, StudentFeeState,
        Teacher,
    },
    storage::{MemoryBackend, StorageBackend},
};

pub const CURRENT_SCHEMA_VERSION: u8 = 1;

/// Every collection the application persists, as one document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchoolData {
    #[serde(default = "SchoolData::schema_version_default")]
    pub schema_version: u8,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub classes: Vec<SchoolClass>,
    #[serde(default)]
    pub teachers: Vec<Teacher>,
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub leaves: Vec<LeaveRequest>,
    #[serde(default)]
    pub fee_configs: Vec<ClassFeeConfig>,
    #[serde(default)]
    pub student_fees: Vec<StudentFeeState>,
    /// Collections owned by other pages (notices, timetables, marks, ...).
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

impl Default for SchoolData {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            updated_at: Utc::now(),
            classes: Vec::new(),
            teachers: Vec::new(),
            students: Vec::new(),
            leaves: Vec::new(),
            fee_configs: Vec::new(),
            student_fees: Vec::new(),
            other: BTreeMap::new(),
        }
    }
}

impl SchoolData {
    pub fn schema_version_default() -> u8 {
        CURRENT_SCHEMA_VERSION
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn student(&self, id: Uuid) -> Option<&Student> {
        find_by_id(&self.students, id)
    }

    pub fn teacher(&self, id: Uuid) -> Option<&Teacher> {
        find_by_id(&self.teachers, id)
    }

    pub fn class(&self, id: Uuid) -> Option<&SchoolClass> {
        find_by_id(&self.classes, id)
    }

    /// Class whose class teacher is `teacher_id`, if any.
    pub fn class_taught_by(&self, teacher_id: Uuid) -> Option<&SchoolClass> {
        self.classes
            .iter()
            .find(|class| class.class_teacher_id == Some(teacher_id))
    }

    pub fn leave(&self, id: Uuid) -> Option<&LeaveRequest> {
        find_by_id(&self.leaves, id)
    }

    pub fn fee_config(&self, class_id: Uuid) -> Option<&ClassFeeConfig> {
        self.fee_configs
            .iter()
            .find(|config| config.class_id == class_id)
    }

    pub fn student_fee(&self, student_id: Uuid) -> Option<&StudentFeeState> {
        self.student_fees
            .iter()
            .find(|state| state.student_id == student_id)
    }

    pub fn student_fee_mut(&mut self, student_id: Uuid) -> Option<&mut StudentFeeState> {
        self.student_fees
            .iter_mut()
            .find(|state| state.student_id == student_id)
    }

    /// Replaces the student's fee state, or appends it when absent.
    pub fn upsert_student_fee(&mut self, state: StudentFeeState) {
        match self.student_fee_mut(state.student_id) {
            Some(existing) => *existing = state,
            None => self.student_fees.push(state),
        }
    }

    /// Detects dangling references within a loaded document.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for student in &self.students {
            if self.class(student.class_id).is_none() {
                warnings.push(format!(
                    "student {} references unknown class {}",
                    student.id, student.class_id
                ));
            }
        }
        for class in &self.classes {
            if let Some(teacher_id) = class.class_teacher_id {
                if self.teacher(teacher_id).is_none() {
                    warnings.push(format!(
                        "class {} references unknown class teacher {}",
                        class.id, teacher_id
                    ));
                }
            }
        }
        for config in &self.fee_configs {
            if self.class(config.class_id).is_none() {
                warnings.push(format!(
                    "fee configuration references unknown class {}",
                    config.class_id
                ));
            }
        }
        warnings
    }
}

/// Read / replace-whole-state access to the school document.
pub trait EntityStore {
    fn state(&self) -> &SchoolData;

    /// Persists `next` and makes it current. On error the current state is kept.
    fn replace(&mut self, next: SchoolData) -> Result<()>;

    /// Applies `change` to a copy of the state and replaces it on success.
    fn update<T, F>(&mut self, change: F) -> Result<T>
    where
        Self: Sized,
        F: FnOnce(&mut SchoolData) -> Result<T>,
    {
        let mut next = self.state().clone();
        let outcome = change(&mut next)?;
        self.replace(next)?;
        Ok(outcome)
    }
}

/// Owns the in-memory document and the backend it is persisted to.
pub struct Store {
    data: SchoolData,
    backend: Box<dyn StorageBackend>,
}

impl Store {
    /// Loads the document from `backend`, starting empty when none exists yet.
    pub fn open(backend: Box<dyn StorageBackend>) -> Result<Self> {
        let data = backend.load()?.unwrap_or_default();
        for warning in data.warnings() {
            tracing::warn!(%warning, "school document inconsistency");
        }
        tracing::debug!(
            leaves = data.leaves.len(),
            students = data.students.len(),
            "school document loaded"
        );
        Ok(Self { data, backend })
    }

    pub fn in_memory() -> Self {
        Self::with_data(SchoolData::default())
    }

    /// Starts from a prepared document kept in memory only.
    pub fn with_data(data: SchoolData) -> Self {
        Self {
            data,
            backend: Box::new(MemoryBackend::default()),
        }
    }

    pub fn backend(&self) -> &dyn StorageBackend {
        self.backend.as_ref()
    }

    pub fn backup(&self, note: Option<&str>) -> Result<String> {
        self.backend.backup(&self.data, note)
    }

    /// Swaps in a backup and makes it the persisted document.
    pub fn restore(&mut self, backup_name: &str) -> Result<()> {
        let restored = self.backend.restore(backup_name)?;
        tracing::info!(backup = backup_name, "school document restored");
        self.data = restored;
        Ok(())
    }

    pub fn into_data(self) -> SchoolData {
        self.data
    }
}

impl EntityStore for Store {
    fn state(&self) -> &SchoolData {
        &self.data
    }

    fn replace(&mut self, mut next: SchoolData) -> Result<()> {
        next.touch();
        self.backend.save(&next)?;
        self.data = next;
        Ok(())
    }
}
