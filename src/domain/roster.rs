use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::Identifiable;

/// A class (form/section) that students belong to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SchoolClass {
    pub id: Uuid,
    pub name: String,
    /// Teacher who approves leave for this class's students.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_teacher_id: Option<Uuid>,
}

impl SchoolClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            class_teacher_id: None,
        }
    }

    pub fn with_class_teacher(mut self, teacher_id: Uuid) -> Self {
        self.class_teacher_id = Some(teacher_id);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl Teacher {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            subject: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub class_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll_number: Option<String>,
}

impl Student {
    pub fn new(name: impl Into<String>, class_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            class_id,
            roll_number: None,
        }
    }
}

impl Identifiable for SchoolClass {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Identifiable for Teacher {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Identifiable for Student {
    fn id(&self) -> Uuid {
        self.id
    }
}
