pub mod fee_service;
pub mod leave_service;
pub mod roster_service;

pub use fee_service::{FeeService, FeeStatus};
pub use leave_service::LeaveService;
pub use roster_service::RosterService;
