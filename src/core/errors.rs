use std::fmt;
use std::result::Result as StdResult;

use thiserror::Error;
use uuid::Uuid;

use crate::domain::leave::LeaveStatus;

/// Unified error type for the workflow, fee and storage layers.
#[derive(Error, Debug)]
pub enum SchoolError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(NotFoundKind),
    #[error("Leave request {id} is already {status}")]
    InvalidTransition { id: Uuid, status: LeaveStatus },
    #[error("Installment {index} for student {student_id} is already paid")]
    AlreadyPaid { student_id: Uuid, index: u32 },
    #[error("Not authorized: {0}")]
    Unauthorized(String),
    #[error("Persistence error: {0}")]
    Storage(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Identifies which entity a lookup failed to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundKind {
    Leave(Uuid),
    Student(Uuid),
    Teacher(Uuid),
    Class(Uuid),
    FeeConfig(Uuid),
    Installment { student_id: Uuid, index: u32 },
    Backup(String),
}

impl fmt::Display for NotFoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotFoundKind::Leave(id) => write!(f, "leave request {id}"),
            NotFoundKind::Student(id) => write!(f, "student {id}"),
            NotFoundKind::Teacher(id) => write!(f, "teacher {id}"),
            NotFoundKind::Class(id) => write!(f, "class {id}"),
            NotFoundKind::FeeConfig(id) => write!(f, "fee configuration for class {id}"),
            NotFoundKind::Installment { student_id, index } => {
                write!(f, "installment {index} for student {student_id}")
            }
            NotFoundKind::Backup(name) => write!(f, "backup `{name}`"),
        }
    }
}

impl SchoolError {
    /// True for lookups that callers render as an informational state.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SchoolError::NotFound(_))
    }
}

pub type Result<T> = StdResult<T, SchoolError>;

impl From<std::io::Error> for SchoolError {
    fn from(err: std::io::Error) -> Self {
        SchoolError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for SchoolError {
    fn from(err: serde_json::Error) -> Self {
        SchoolError::Storage(err.to_string())
    }
}
