use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{PaymentMethod, iso_date};

use super::{
    DraftInstallment, HUNDRED, PaymentPlan, PlanError, checked_total, round2, within_range,
};

/// Number typed into the planner, either as a JSON number or as raw text.
/// Text that does not parse counts as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    Number(Decimal),
    Text(String),
}

impl NumericInput {
    pub fn to_decimal(&self) -> Decimal {
        match self {
            NumericInput::Number(value) => *value,
            NumericInput::Text(raw) => raw.trim().parse().unwrap_or(Decimal::ZERO),
        }
    }
}

/// One user edit on a draft plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", rename_all = "camelCase")]
pub enum PlanEdit {
    Amount {
        index: usize,
        value: NumericInput,
    },
    Percentage {
        index: usize,
        value: NumericInput,
    },
    DueDate {
        index: usize,
        #[serde(deserialize_with = "iso_date::deserialize")]
        value: NaiveDate,
    },
    PaymentMethod {
        index: usize,
        value: PaymentMethod,
    },
}

impl PaymentPlan {
    pub fn apply(&self, edit: &PlanEdit) -> Result<PaymentPlan, PlanError> {
        match edit {
            PlanEdit::Amount { index, value } => self.with_amount(*index, value.to_decimal()),
            PlanEdit::Percentage { index, value } => {
                self.with_percentage(*index, value.to_decimal())
            }
            PlanEdit::DueDate { index, value } => self.with_due_date(*index, *value),
            PlanEdit::PaymentMethod { index, value } => self.with_payment_method(*index, *value),
        }
    }

    /// Sets the amount of one installment and derives its percentage.
    ///
    /// Editing any installment but the last rebalances the last one. Editing
    /// the last one is taken as-is, even if the plan stops adding up.
    pub fn with_amount(&self, index: usize, amount: Decimal) -> Result<PaymentPlan, PlanError> {
        let amount = in_range(amount)?;
        let percentage = share_of(amount, self.parent_amount());
        self.edit_row(index, |row| {
            row.amount = amount;
            row.percentage = percentage;
        })
    }

    /// Sets the percentage of one installment and derives its amount.
    /// Same rebalancing rule as [`PaymentPlan::with_amount`].
    pub fn with_percentage(
        &self,
        index: usize,
        percentage: Decimal,
    ) -> Result<PaymentPlan, PlanError> {
        let percentage = in_range(percentage)?;
        let amount = (percentage / HUNDRED)
            .checked_mul(self.parent_amount())
            .map(round2)
            .filter(|amount| within_range(*amount))
            .ok_or(PlanError::AmountOutOfRange)?;
        self.edit_row(index, |row| {
            row.percentage = percentage;
            row.amount = amount;
        })
    }

    pub fn with_due_date(&self, index: usize, due_date: NaiveDate) -> Result<PaymentPlan, PlanError> {
        self.replace_row(index, |row| row.due_date = due_date)
    }

    pub fn with_payment_method(
        &self,
        index: usize,
        method: PaymentMethod,
    ) -> Result<PaymentPlan, PlanError> {
        self.replace_row(index, |row| row.payment_method = method)
    }

    fn edit_row(
        &self,
        index: usize,
        change: impl FnOnce(&mut DraftInstallment),
    ) -> Result<PaymentPlan, PlanError> {
        let mut rows = self.rows_with(index, change)?;
        if index + 1 < rows.len() {
            rebalance_last(self.parent_amount(), &mut rows)?;
        }
        Ok(PaymentPlan::from_parts(self.parent_amount(), rows))
    }

    fn replace_row(
        &self,
        index: usize,
        change: impl FnOnce(&mut DraftInstallment),
    ) -> Result<PaymentPlan, PlanError> {
        let rows = self.rows_with(index, change)?;
        Ok(PaymentPlan::from_parts(self.parent_amount(), rows))
    }

    fn rows_with(
        &self,
        index: usize,
        change: impl FnOnce(&mut DraftInstallment),
    ) -> Result<Vec<DraftInstallment>, PlanError> {
        let mut rows = self.installments().to_vec();
        let len = rows.len();
        let row = rows
            .get_mut(index)
            .ok_or(PlanError::IndexOutOfRange { index, len })?;
        change(row);
        Ok(rows)
    }
}

fn in_range(value: Decimal) -> Result<Decimal, PlanError> {
    if within_range(value) {
        Ok(value)
    } else {
        Err(PlanError::ValueOutOfRange { value })
    }
}

/// Zero when the parent is zero or the ratio does not fit.
fn share_of(amount: Decimal, parent: Decimal) -> Decimal {
    amount
        .checked_div(parent)
        .and_then(|ratio| ratio.checked_mul(HUNDRED))
        .map(round2)
        .unwrap_or(Decimal::ZERO)
}

fn rebalance_last(parent: Decimal, rows: &mut [DraftInstallment]) -> Result<(), PlanError> {
    let Some((last, head)) = rows.split_last_mut() else {
        return Ok(());
    };
    let remainder = |whole: Decimal, parts: Option<Decimal>| {
        parts
            .and_then(|allocated| whole.checked_sub(allocated))
            .map(round2)
            .ok_or(PlanError::AmountOutOfRange)
    };
    last.amount = remainder(parent, checked_total(head.iter().map(|r| r.amount)))?;
    last.percentage = remainder(HUNDRED, checked_total(head.iter().map(|r| r.percentage)))?;
    Ok(())
}
