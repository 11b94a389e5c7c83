pub mod common;
pub mod fees;
pub mod leave;
pub mod roster;
pub mod time_interval;

pub use common::Identifiable;
pub use fees::{
    ClassFeeConfig, FeeSummary, Installment, InstallmentSchedule, RemainderPlacement,
    StudentFeeState,
};
pub use leave::{Approver, LeaveApplication, LeaveRequest, LeaveStatus, LeaveType, RequesterRole};
pub use roster::{SchoolClass, Student, Teacher};
pub use time_interval::{TimeInterval, TimeUnit};
