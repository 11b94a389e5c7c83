//! Leave requests and the pending → approved/rejected state machine.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::errors::{Result, SchoolError};
use crate::domain::common::Identifiable;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RequesterRole {
    Student,
    Teacher,
}

impl fmt::Display for RequesterRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequesterRole::Student => f.write_str("student"),
            RequesterRole::Teacher => f.write_str("teacher"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LeaveType {
    Casual,
    Sick,
    Annual,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    /// Approved and rejected are final.
    pub fn is_terminal(self) -> bool {
        !matches!(self, LeaveStatus::Pending)
    }
}

impl fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeaveStatus::Pending => f.write_str("pending"),
            LeaveStatus::Approved => f.write_str("approved"),
            LeaveStatus::Rejected => f.write_str("rejected"),
        }
    }
}

/// Who is looking at, or deciding, leave requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Approver {
    /// Admins decide every teacher request.
    Admin { id: String },
    /// A teacher decides student requests for the class they are class teacher of.
    Teacher(Uuid),
}

impl Approver {
    pub fn admin(id: impl Into<String>) -> Self {
        Approver::Admin { id: id.into() }
    }

    pub fn teacher(id: Uuid) -> Self {
        Approver::Teacher(id)
    }

    /// Identifier recorded in `decided_by`.
    pub fn decider_id(&self) -> String {
        match self {
            Approver::Admin { id } => id.clone(),
            Approver::Teacher(id) => id.to_string(),
        }
    }

    /// Role of the requests this approver is responsible for.
    pub fn requester_role(&self) -> RequesterRole {
        match self {
            Approver::Admin { .. } => RequesterRole::Teacher,
            Approver::Teacher(_) => RequesterRole::Student,
        }
    }
}

/// Input for a new leave request, as captured by a requester's form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveApplication {
    pub requester_role: RequesterRole,
    pub requester_id: Uuid,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub reason: String,
}

impl LeaveApplication {
    pub fn new(
        requester_role: RequesterRole,
        requester_id: Uuid,
        leave_type: LeaveType,
        start_date: NaiveDate,
        end_date: NaiveDate,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            requester_role,
            requester_id,
            leave_type,
            start_date,
            end_date,
            start_time: None,
            end_time: None,
            reason: reason.into(),
        }
    }

    pub fn with_times(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    /// Checks the fields that do not need the store to resolve.
    pub fn validate(&self) -> Result<()> {
        if self.reason.trim().is_empty() {
            return Err(SchoolError::Validation("reason must not be empty".into()));
        }
        if self.end_date < self.start_date {
            return Err(SchoolError::Validation(
                "end date must not be before start date".into(),
            ));
        }
        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            if self.start_date == self.end_date && end < start {
                return Err(SchoolError::Validation(
                    "end time must not be before start time".into(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
    pub id: Uuid,
    pub requester_role: RequesterRole,
    pub requester_id: Uuid,
    pub requester_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<NaiveTime>,
    pub reason: String,
    pub status: LeaveStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl LeaveRequest {
    /// Builds a pending request from a validated application.
    pub fn pending(
        application: LeaveApplication,
        requester_name: impl Into<String>,
        class_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            requester_role: application.requester_role,
            requester_id: application.requester_id,
            requester_name: requester_name.into(),
            class_id,
            leave_type: application.leave_type,
            start_date: application.start_date,
            end_date: application.end_date,
            start_time: application.start_time,
            end_time: application.end_time,
            reason: application.reason.trim().to_string(),
            status: LeaveStatus::Pending,
            decided_by: None,
            decided_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == LeaveStatus::Pending
    }

    /// Inclusive number of calendar days covered.
    pub fn duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    /// Moves a pending request to its terminal state.
    pub fn decide(&mut self, approve: bool, decided_by: String, at: DateTime<Utc>) -> Result<()> {
        if self.status.is_terminal() {
            return Err(SchoolError::InvalidTransition {
                id: self.id,
                status: self.status,
            });
        }
        self.status = if approve {
            LeaveStatus::Approved
        } else {
            LeaveStatus::Rejected
        };
        self.decided_by = Some(decided_by);
        self.decided_at = Some(at);
        Ok(())
    }
}

impl Identifiable for LeaveRequest {
    fn id(&self) -> Uuid {
        self.id
    }
}
