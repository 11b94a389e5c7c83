#![doc(test(attr(deny(warnings))))]

//! Campus Core holds the rule layer of a school-management application: the
//! leave approval workflow and the fee installment engine, both working over a
//! single persisted entity store.

pub mod config;
pub mod core;
pub mod domain;
pub mod storage;
pub mod store;
pub mod utils;

pub use crate::core::errors::{NotFoundKind, Result, SchoolError};
pub use crate::core::services::{FeeService, LeaveService, RosterService};
pub use crate::store::{EntityStore, SchoolData, Store};

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Campus Core tracing initialized.");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
    }
}
