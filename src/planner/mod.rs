//! Installment plan drafting.
//!
//! A [`PaymentPlan`] is an immutable value: generation builds one from a
//! parent amount, and every edit returns a new plan. The last installment is
//! the balancing residual so that amounts add up to the parent amount and
//! percentages to 100.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{InstallmentStatus, PaymentMethod};

mod edit;
mod generate;

pub use edit::{NumericInput, PlanEdit};
pub use generate::{add_months, generate_plan};

/// Largest installment count offered to users.
pub const MAX_INSTALLMENTS: u32 = 10;

/// Installment count proposed when the caller does not pick one.
pub const DEFAULT_INSTALLMENTS: u32 = 4;

/// Accepted gap between plan totals and the parent totals.
pub const TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

pub const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Largest amount, in either direction, a plan or a bill may carry (10^15).
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

/// Rounds half away from zero to two decimals.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Sum that gives up on overflow instead of panicking.
pub fn checked_total(values: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, value| acc.checked_add(value))
}

pub(crate) fn within_range(value: Decimal) -> bool {
    value.abs() <= MAX_AMOUNT
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("a plan needs at least one installment")]
    EmptyPlan,
    #[error("installment index {index} is out of range for a plan of {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("due date overflows the calendar")]
    DateOverflow,
    #[error("plan amounts must stay within 1000000000000000")]
    AmountOutOfRange,
    #[error("value {value} must stay within 1000000000000000")]
    ValueOutOfRange { value: Decimal },
}

/// Installment that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftInstallment {
    pub installment_number: u32,
    pub amount: Decimal,
    pub percentage: Decimal,
    pub due_date: NaiveDate,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub status: InstallmentStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlanTotals {
    pub amount: Decimal,
    pub percentage: Decimal,
}

impl PlanTotals {
    /// A total that overflows is reported as `Decimal::MAX`, which never
    /// balances.
    pub fn of(installments: &[DraftInstallment]) -> Self {
        let amount = checked_total(installments.iter().map(|i| i.amount));
        let percentage = checked_total(installments.iter().map(|i| i.percentage));
        PlanTotals {
            amount: amount.map_or(Decimal::MAX, round2),
            percentage: percentage.map_or(Decimal::MAX, round2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "PlanParts")]
pub struct PaymentPlan {
    parent_amount: Decimal,
    installments: Vec<DraftInstallment>,
    total: PlanTotals,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanParts {
    parent_amount: Decimal,
    installments: Vec<DraftInstallment>,
}

impl TryFrom<PlanParts> for PaymentPlan {
    type Error = PlanError;

    fn try_from(parts: PlanParts) -> Result<Self, Self::Error> {
        let rows_in_range = parts
            .installments
            .iter()
            .all(|row| within_range(row.amount) && within_range(row.percentage));
        let parent_in_range =
            parts.parent_amount >= Decimal::ZERO && within_range(parts.parent_amount);
        if !parent_in_range || !rows_in_range {
            return Err(PlanError::AmountOutOfRange);
        }
        Ok(PaymentPlan::from_parts(parts.parent_amount, parts.installments))
    }
}

impl PaymentPlan {
    /// Builds a plan from already computed rows; totals are recomputed.
    pub fn from_parts(parent_amount: Decimal, installments: Vec<DraftInstallment>) -> Self {
        let total = PlanTotals::of(&installments);
        PaymentPlan {
            parent_amount,
            installments,
            total,
        }
    }

    pub fn parent_amount(&self) -> Decimal {
        self.parent_amount
    }

    pub fn installments(&self) -> &[DraftInstallment] {
        &self.installments
    }

    pub fn into_installments(self) -> Vec<DraftInstallment> {
        self.installments
    }

    pub fn totals(&self) -> PlanTotals {
        self.total
    }

    pub fn len(&self) -> usize {
        self.installments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.installments.is_empty()
    }

    /// True when totals match the parent amount and 100% within [`TOLERANCE`].
    pub fn is_balanced(&self) -> bool {
        is_balanced(
            self.parent_amount,
            self.total.amount,
            self.total.percentage,
        )
    }
}

/// Shared check between drafts and submitted plans.
pub fn is_balanced(parent_amount: Decimal, total_amount: Decimal, total_percentage: Decimal) -> bool {
    let close = |expected: Decimal, actual: Decimal| {
        expected
            .checked_sub(actual)
            .is_some_and(|gap| gap.abs() <= TOLERANCE)
    };
    close(round2(parent_amount), total_amount) && close(HUNDRED, total_percentage)
}
