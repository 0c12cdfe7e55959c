use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;

use crate::models::{InstallmentStatus, PaymentMethod};

use super::{
    DraftInstallment, HUNDRED, PaymentPlan, PlanError, checked_total, round2, within_range,
};

/// Splits `amount` into `count` monthly installments.
///
/// The first installment falls on `due_date`, the following ones `i` months
/// later (clamped to the end of shorter months). Every installment but the
/// last gets the rounded even share; the last one takes whatever is left so
/// the totals come out exact.
pub fn generate_plan(
    amount: Decimal,
    due_date: NaiveDate,
    count: u32,
) -> Result<PaymentPlan, PlanError> {
    if count == 0 {
        return Err(PlanError::EmptyPlan);
    }
    if !within_range(amount) {
        return Err(PlanError::AmountOutOfRange);
    }

    let divisor = Decimal::from(count);
    let base_amount = round2(amount / divisor);
    let base_percentage = round2(HUNDRED / divisor);

    let mut installments: Vec<DraftInstallment> = Vec::with_capacity(count as usize);
    for i in 0..count {
        let is_last = i + 1 == count;
        let (share, share_pct) = if is_last {
            let allocated = checked_total(installments.iter().map(|d| d.amount))
                .ok_or(PlanError::AmountOutOfRange)?;
            let allocated_pct = checked_total(installments.iter().map(|d| d.percentage))
                .ok_or(PlanError::AmountOutOfRange)?;
            (round2(amount - allocated), round2(HUNDRED - allocated_pct))
        } else {
            (base_amount, base_percentage)
        };

        installments.push(DraftInstallment {
            installment_number: i + 1,
            amount: share,
            percentage: share_pct,
            due_date: add_months(due_date, i)?,
            payment_method: if i == 0 {
                PaymentMethod::Transfer
            } else {
                PaymentMethod::Draft
            },
            status: InstallmentStatus::Pending,
        });
    }

    Ok(PaymentPlan::from_parts(amount, installments))
}

/// Adds calendar months, clamping the day to the target month's length.
pub fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate, PlanError> {
    if months == 0 {
        return Ok(date);
    }
    date.checked_add_months(Months::new(months))
        .ok_or(PlanError::DateOverflow)
}
