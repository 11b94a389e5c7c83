//! Fee templates per class and the per-student installment schedules derived
//! from them.

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::core::errors::{NotFoundKind, Result, SchoolError};
use crate::domain::fees::{rederive_installments, round2, validate_extra_fee};
use crate::domain::{ClassFeeConfig, FeeSummary, StudentFeeState};
use crate::store::EntityStore;

/// What a fee-status view renders for one student.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FeeStatus {
    /// The student's class has no fee configuration yet.
    NotConfigured { class_id: Uuid },
    Configured {
        state: StudentFeeState,
        summary: FeeSummary,
    },
}

pub struct FeeService;

impl FeeService {
    pub fn class_fee_config<S: EntityStore>(store: &S, class_id: Uuid) -> Option<&ClassFeeConfig> {
        store.state().fee_config(class_id)
    }

    /// Previously derived state; never triggers derivation.
    pub fn student_fee_state<S: EntityStore>(
        store: &S,
        student_id: Uuid,
    ) -> Option<&StudentFeeState> {
        store.state().student_fee(student_id)
    }

    /// Creates or replaces the fee template of a class.
    pub fn set_class_fee_config<S: EntityStore>(
        store: &mut S,
        mut config: ClassFeeConfig,
    ) -> Result<()> {
        config.validate()?;
        config.base_fee_amount = round2(config.base_fee_amount);
        for amount in config.extra_fees.values_mut() {
            *amount = round2(*amount);
        }
        let class_id = config.class_id;
        if store.state().class(class_id).is_none() {
            return Err(SchoolError::NotFound(NotFoundKind::Class(class_id)));
        }
        config.updated_at = Utc::now();
        store.update(|data| {
            match data.fee_configs.iter_mut().find(|c| c.class_id == class_id) {
                Some(existing) => *existing = config,
                None => data.fee_configs.push(config),
            }
            Ok(())
        })?;
        tracing::info!(%class_id, "class fee configuration saved");
        Ok(())
    }

    pub fn remove_class_fee_config<S: EntityStore>(
        store: &mut S,
        class_id: Uuid,
    ) -> Result<ClassFeeConfig> {
        let removed = store.update(|data| {
            let position = data
                .fee_configs
                .iter()
                .position(|c| c.class_id == class_id)
                .ok_or(SchoolError::NotFound(NotFoundKind::FeeConfig(class_id)))?;
            Ok(data.fee_configs.remove(position))
        })?;
        tracing::info!(%class_id, "class fee configuration removed");
        Ok(removed)
    }

    /// Brings the student's unpaid installments in line with the class
    /// template. Paid installments are kept; calling it again without a
    /// payment or template change writes nothing.
    pub fn recompute_student_installments<S: EntityStore>(
        store: &mut S,
        student_id: Uuid,
    ) -> Result<StudentFeeState> {
        let data = store.state();
        let student = data
            .student(student_id)
            .ok_or(SchoolError::NotFound(NotFoundKind::Student(student_id)))?;
        let config = data
            .fee_config(student.class_id)
            .ok_or(SchoolError::NotFound(NotFoundKind::FeeConfig(student.class_id)))?;

        let existing = data.student_fee(student_id);
        let mut state = existing
            .cloned()
            .unwrap_or_else(|| StudentFeeState::seeded_from(student_id, config));
        let installments = rederive_installments(config, &state.installments)?;
        if existing.is_some() && installments == state.installments {
            tracing::debug!(%student_id, "installments already in sync");
            return Ok(state);
        }

        state.installments = installments;
        let saved = state.clone();
        store.update(|data| {
            data.upsert_student_fee(state);
            Ok(())
        })?;
        tracing::info!(
            %student_id,
            installments = saved.installments.len(),
            "installments recomputed"
        );
        Ok(saved)
    }

    /// Marks one installment paid. Paid installments are frozen from then on.
    pub fn record_installment_payment<S: EntityStore>(
        store: &mut S,
        student_id: Uuid,
        index: u32,
    ) -> Result<StudentFeeState> {
        let missing = || SchoolError::NotFound(NotFoundKind::Installment { student_id, index });
        let updated = store.update(|data| {
            let state = data.student_fee_mut(student_id).ok_or_else(missing)?;
            let installment = state
                .installments
                .iter_mut()
                .find(|item| item.index == index)
                .ok_or_else(missing)?;
            if installment.paid {
                return Err(SchoolError::AlreadyPaid { student_id, index });
            }
            installment.paid = true;
            installment.paid_at = Some(Utc::now());
            Ok(state.clone())
        })?;
        tracing::info!(%student_id, index, "installment paid");
        Ok(updated)
    }

    /// Sets a per-student extra fee, leaving installments alone.
    pub fn set_extra_fee<S: EntityStore>(
        store: &mut S,
        student_id: Uuid,
        category: &str,
        amount: f64,
    ) -> Result<StudentFeeState> {
        let category = category.trim();
        validate_extra_fee(category, amount)?;
        let amount = round2(amount);
        let data = store.state();
        let student = data
            .student(student_id)
            .ok_or(SchoolError::NotFound(NotFoundKind::Student(student_id)))?;
        let mut state = match (data.student_fee(student_id), data.fee_config(student.class_id)) {
            (Some(existing), _) => existing.clone(),
            (None, Some(config)) => StudentFeeState::seeded_from(student_id, config),
            (None, None) => StudentFeeState {
                student_id,
                installments: Vec::new(),
                extra_fees: Default::default(),
            },
        };
        state.extra_fees.insert(category.to_string(), amount);
        let saved = state.clone();
        store.update(|data| {
            data.upsert_student_fee(state);
            Ok(())
        })?;
        tracing::info!(%student_id, category, amount, "extra fee set");
        Ok(saved)
    }

    /// Entry point for fee-status views: syncs lazily when a template exists
    /// and reports "not configured" otherwise.
    pub fn fee_status<S: EntityStore>(store: &mut S, student_id: Uuid) -> Result<FeeStatus> {
        let class_id = store
            .state()
            .student(student_id)
            .map(|student| student.class_id)
            .ok_or(SchoolError::NotFound(NotFoundKind::Student(student_id)))?;
        if Self::class_fee_config(&*store, class_id).is_none() {
            return Ok(FeeStatus::NotConfigured { class_id });
        }
        let state = Self::recompute_student_installments(store, student_id)?;
        let summary = state.summary();
        Ok(FeeStatus::Configured { state, summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InstallmentSchedule, SchoolClass, Student, TimeInterval};
    use crate::store::{SchoolData, Store};
    use chrono::NaiveDate;

    fn store_with_student() -> (Store, Uuid, Uuid) {
        let class = SchoolClass::new("9C");
        let student = Student::new("Meera", class.id);
        let ids = (class.id, student.id);
        let mut data = SchoolData::default();
        data.classes.push(class);
        data.students.push(student);
        (Store::with_data(data), ids.0, ids.1)
    }

    fn config(class_id: Uuid, base: f64, count: u32) -> ClassFeeConfig {
        ClassFeeConfig::new(
            class_id,
            base,
            InstallmentSchedule::new(
                count,
                NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                TimeInterval::monthly(),
            ),
        )
    }

    #[test]
    fn missing_config_reports_not_configured() {
        let (mut store, class_id, student_id) = store_with_student();
        assert!(FeeService::class_fee_config(&store, class_id).is_none());
        let status = FeeService::fee_status(&mut store, student_id).unwrap();
        assert_eq!(status, FeeStatus::NotConfigured { class_id });

        let err = FeeService::recompute_student_installments(&mut store, student_id)
            .expect_err("recompute needs a config");
        assert!(matches!(err, SchoolError::NotFound(NotFoundKind::FeeConfig(_))));
        assert!(FeeService::student_fee_state(&store, student_id).is_none());
    }

    #[test]
    fn config_for_unknown_class_is_rejected() {
        let (mut store, _, _) = store_with_student();
        let err = FeeService::set_class_fee_config(&mut store, config(Uuid::new_v4(), 10.0, 1))
            .expect_err("unknown class");
        assert!(matches!(err, SchoolError::NotFound(NotFoundKind::Class(_))));
    }

    #[test]
    fn first_view_seeds_extras_from_config() {
        let (mut store, class_id, student_id) = store_with_student();
        FeeService::set_class_fee_config(
            &mut store,
            config(class_id, 1000.0, 4).with_extra_fee("Library", 150.0),
        )
        .unwrap();

        match FeeService::fee_status(&mut store, student_id).unwrap() {
            FeeStatus::Configured { state, summary } => {
                assert_eq!(state.installments.len(), 4);
                assert_eq!(summary.total, 1000.0);
                assert_eq!(summary.remaining, 1000.0);
                assert_eq!(summary.extras_total, 150.0);
            }
            other => panic!("unexpected status {other:?}"),
        }
    }

    #[test]
    fn paying_twice_is_rejected() {
        let (mut store, class_id, student_id) = store_with_student();
        FeeService::set_class_fee_config(&mut store, config(class_id, 500.0, 2)).unwrap();
        FeeService::recompute_student_installments(&mut store, student_id).unwrap();

        FeeService::record_installment_payment(&mut store, student_id, 1).unwrap();
        let err = FeeService::record_installment_payment(&mut store, student_id, 1)
            .expect_err("already paid");
        assert!(matches!(err, SchoolError::AlreadyPaid { index: 1, .. }));

        let err = FeeService::record_installment_payment(&mut store, student_id, 9)
            .expect_err("no such installment");
        assert!(matches!(
            err,
            SchoolError::NotFound(NotFoundKind::Installment { index: 9, .. })
        ));
    }

    #[test]
    fn extra_fees_survive_recompute() {
        let (mut store, class_id, student_id) = store_with_student();
        FeeService::set_class_fee_config(&mut store, config(class_id, 300.0, 3)).unwrap();
        FeeService::recompute_student_installments(&mut store, student_id).unwrap();
        FeeService::set_extra_fee(&mut store, student_id, " Transport ", 45.5).unwrap();

        FeeService::set_class_fee_config(&mut store, config(class_id, 450.0, 3)).unwrap();
        let state = FeeService::recompute_student_installments(&mut store, student_id).unwrap();
        assert_eq!(state.extra_fees.get("Transport"), Some(&45.5));
        assert_eq!(state.summary().total, 450.0);
    }

    #[test]
    fn unknown_student_is_not_found() {
        let (mut store, class_id, _) = store_with_student();
        FeeService::set_class_fee_config(&mut store, config(class_id, 100.0, 2)).unwrap();
        let stranger = Uuid::new_v4();

        let err = FeeService::recompute_student_installments(&mut store, stranger)
            .expect_err("unknown student");
        assert!(matches!(err, SchoolError::NotFound(NotFoundKind::Student(id)) if id == stranger));

        let err = FeeService::fee_status(&mut store, stranger).expect_err("unknown student");
        assert!(matches!(err, SchoolError::NotFound(NotFoundKind::Student(id)) if id == stranger));
        assert!(store.state().student_fees.is_empty());
    }

    #[test]
    fn stored_config_with_unreachable_due_dates_fails_cleanly() {
        let (mut store, class_id, student_id) = store_with_student();
        let mut broken = config(class_id, 900.0, 3);
        broken.schedule.interval = TimeInterval {
            every: 3_000_000_000,
            unit: crate::domain::TimeUnit::Month,
        };
        assert!(FeeService::set_class_fee_config(&mut store, broken.clone()).is_err());

        // A document written elsewhere can still carry such a config.
        store
            .update(|data| {
                data.fee_configs.push(broken);
                Ok(())
            })
            .unwrap();
        let err = FeeService::fee_status(&mut store, student_id).expect_err("unreachable dates");
        assert!(matches!(err, SchoolError::Validation(_)));
        assert!(FeeService::student_fee_state(&store, student_id).is_none());
    }

    #[test]
    fn amounts_are_stored_to_the_cent() {
        let (mut store, class_id, student_id) = store_with_student();
        FeeService::set_class_fee_config(
            &mut store,
            config(class_id, 100.004, 2).with_extra_fee("Library", 20.001),
        )
        .unwrap();
        let stored = FeeService::class_fee_config(&store, class_id).unwrap();
        assert_eq!(stored.base_fee_amount, 100.0);
        assert_eq!(stored.extra_fees.get("Library"), Some(&20.0));

        let state = FeeService::set_extra_fee(&mut store, student_id, "Bus", 10.004).unwrap();
        assert_eq!(state.extra_fees.get("Bus"), Some(&10.0));
    }

    #[test]
    fn removing_config_returns_it() {
        let (mut store, class_id, _) = store_with_student();
        FeeService::set_class_fee_config(&mut store, config(class_id, 100.0, 1)).unwrap();
        let removed = FeeService::remove_class_fee_config(&mut store, class_id).unwrap();
        assert_eq!(removed.class_id, class_id);
        assert!(FeeService::remove_class_fee_config(&mut store, class_id).is_err());
    }
}
