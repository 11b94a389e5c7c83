//! Class fee templates, per-student installment schedules and the derivation
//! rules that keep the latter in sync with the former.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::errors::{Result, SchoolError};
use crate::domain::time_interval::TimeInterval;

/// Where the cent left over from an uneven split lands.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RemainderPlacement {
    First,
    #[default]
    Last,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InstallmentSchedule {
    pub installment_count: u32,
    pub first_due_date: NaiveDate,
    #[serde(default)]
    pub interval: TimeInterval,
    /// Explicit due dates; slots past the end continue at `interval`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub due_dates: Vec<NaiveDate>,
}

impl InstallmentSchedule {
    pub fn new(installment_count: u32, first_due_date: NaiveDate, interval: TimeInterval) -> Self {
        Self {
            installment_count,
            first_due_date,
            interval,
            due_dates: Vec::new(),
        }
    }

    pub fn with_due_dates(due_dates: Vec<NaiveDate>) -> Self {
        Self {
            installment_count: due_dates.len() as u32,
            first_due_date: due_dates.first().copied().unwrap_or(NaiveDate::MIN),
            interval: TimeInterval::monthly(),
            due_dates,
        }
    }

    /// Due date of the zero-based schedule slot.
    pub fn due_date(&self, slot: u32) -> Result<NaiveDate> {
        match self.due_dates.get(slot as usize) {
            Some(date) => Ok(*date),
            None => match self.due_dates.last() {
                Some(last) => self
                    .interval
                    .nth_after(*last, slot + 1 - self.due_dates.len() as u32),
                None => self.interval.nth_after(self.first_due_date, slot),
            },
        }
    }
}

/// Admin-defined fee template shared by every student of a class.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClassFeeConfig {
    pub class_id: Uuid,
    pub base_fee_amount: f64,
    pub schedule: InstallmentSchedule,
    #[serde(default)]
    pub extra_fees: BTreeMap<String, f64>,
    #[serde(default)]
    pub remainder_placement: RemainderPlacement,
    pub updated_at: DateTime<Utc>,
}

impl ClassFeeConfig {
    pub fn new(class_id: Uuid, base_fee_amount: f64, schedule: InstallmentSchedule) -> Self {
        Self {
            class_id,
            base_fee_amount,
            schedule,
            extra_fees: BTreeMap::new(),
            remainder_placement: RemainderPlacement::default(),
            updated_at: Utc::now(),
        }
    }

    pub fn with_extra_fee(mut self, category: impl Into<String>, amount: f64) -> Self {
        self.extra_fees.insert(category.into(), amount);
        self
    }

    pub fn with_remainder_placement(mut self, placement: RemainderPlacement) -> Self {
        self.remainder_placement = placement;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.base_fee_amount.is_finite() || self.base_fee_amount < 0.0 {
            return Err(SchoolError::Validation(
                "base fee amount must be a non-negative number".into(),
            ));
        }
        if self.schedule.installment_count == 0 {
            return Err(SchoolError::Validation(
                "installment count must be at least 1".into(),
            ));
        }
        if !self.schedule.interval.is_valid() {
            return Err(SchoolError::Validation(
                "installment interval must be positive".into(),
            ));
        }
        // One slot past the configured count is reachable once every slot is paid.
        self.schedule.due_date(self.schedule.installment_count)?;
        for (category, amount) in &self.extra_fees {
            validate_extra_fee(category, *amount)?;
        }
        Ok(())
    }
}

pub(crate) fn validate_extra_fee(category: &str, amount: f64) -> Result<()> {
    if category.trim().is_empty() {
        return Err(SchoolError::Validation(
            "extra fee category must not be empty".into(),
        ));
    }
    if !amount.is_finite() || amount < 0.0 {
        return Err(SchoolError::Validation(format!(
            "extra fee `{category}` must be a non-negative number"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Installment {
    /// One-based position in the student's schedule.
    pub index: u32,
    pub amount: f64,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub paid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudentFeeState {
    pub student_id: Uuid,
    #[serde(default)]
    pub installments: Vec<Installment>,
    #[serde(default)]
    pub extra_fees: BTreeMap<String, f64>,
}

impl StudentFeeState {
    /// Fresh state for a student, with extras seeded from the class template.
    pub fn seeded_from(student_id: Uuid, config: &ClassFeeConfig) -> Self {
        Self {
            student_id,
            installments: Vec::new(),
            extra_fees: config.extra_fees.clone(),
        }
    }

    pub fn installment(&self, index: u32) -> Option<&Installment> {
        self.installments.iter().find(|item| item.index == index)
    }

    pub fn summary(&self) -> FeeSummary {
        let total: i64 = self.installments.iter().map(|i| to_cents(i.amount)).sum();
        let paid: i64 = self
            .installments
            .iter()
            .filter(|i| i.paid)
            .map(|i| to_cents(i.amount))
            .sum();
        let extras: i64 = self.extra_fees.values().map(|amount| to_cents(*amount)).sum();
        FeeSummary {
            total: from_cents(total),
            paid: from_cents(paid),
            remaining: from_cents((total - paid).max(0)),
            extras_total: from_cents(extras),
        }
    }
}

/// Values derived for display; never stored.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeeSummary {
    pub total: f64,
    pub paid: f64,
    pub remaining: f64,
    pub extras_total: f64,
}

/// Re-derives the unpaid part of a schedule from `config`, keeping every paid
/// installment as-is. The result depends only on the config and the paid
/// installments, so repeated calls agree.
pub fn rederive_installments(
    config: &ClassFeeConfig,
    existing: &[Installment],
) -> Result<Vec<Installment>> {
    let mut paid: Vec<Installment> = existing.iter().filter(|item| item.paid).cloned().collect();
    paid.sort_by_key(|item| item.index);

    let paid_cents: i64 = paid.iter().map(|item| to_cents(item.amount)).sum();
    let remaining = (to_cents(config.base_fee_amount) - paid_cents).max(0);
    let paid_count = paid.len() as u32;
    let open_slots = if remaining == 0 {
        0
    } else {
        config
            .schedule
            .installment_count
            .saturating_sub(paid_count)
            .max(1)
    };

    let amounts = split_cents(remaining, open_slots, config.remainder_placement);
    let due_dates = open_due_dates(&config.schedule, &paid, open_slots)?;

    let mut merged = Vec::with_capacity(paid.len() + amounts.len());
    for mut item in paid {
        item.index = merged.len() as u32 + 1;
        merged.push(item);
    }
    for (cents, due_date) in amounts.into_iter().zip(due_dates) {
        merged.push(Installment {
            index: merged.len() as u32 + 1,
            amount: from_cents(cents),
            due_date,
            paid: false,
            paid_at: None,
        });
    }
    Ok(merged)
}

/// Walks the schedule slots in order, letting each paid installment claim the
/// first slot carrying its due date, and hands the rest to unpaid installments.
fn open_due_dates(
    schedule: &InstallmentSchedule,
    paid: &[Installment],
    wanted: u32,
) -> Result<Vec<NaiveDate>> {
    let mut claimed: Vec<NaiveDate> = paid.iter().map(|item| item.due_date).collect();
    let mut dates = Vec::with_capacity(wanted as usize);
    let mut slot = 0;
    while dates.len() < wanted as usize {
        let date = schedule.due_date(slot)?;
        match claimed.iter().position(|taken| *taken == date) {
            Some(position) => {
                claimed.swap_remove(position);
            }
            None => dates.push(date),
        }
        slot += 1;
    }
    Ok(dates)
}

/// Splits `total` cents into `parts` near-equal shares that sum to `total`.
pub fn split_cents(total: i64, parts: u32, placement: RemainderPlacement) -> Vec<i64> {
    if parts == 0 {
        return Vec::new();
    }
    let share = total / parts as i64;
    let remainder = total - share * parts as i64;
    let mut amounts = vec![share; parts as usize];
    let target = match placement {
        RemainderPlacement::First => 0,
        RemainderPlacement::Last => amounts.len() - 1,
    };
    amounts[target] += remainder;
    amounts
}

pub fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

pub fn from_cents(cents: i64) -> f64 {
    cents as f64 / 100.0
}

pub fn round2(amount: f64) -> f64 {
    from_cents(to_cents(amount))
}
