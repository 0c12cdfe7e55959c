use chrono::Utc;
use tracing::{info, instrument};
use validator::Validate;

use crate::{
    dashboard::{PlanProgress, plan_progress},
    error::{AppError, AppResult, FieldError},
    models::{BillPatch, BillStatus, Book, Id, Installment, InstallmentPatch, NewInstallment},
    planner::{checked_total, is_balanced, round2},
    validation::{InstallmentInput, InstallmentUpdate},
};

use super::{AppState, InstallmentFilter, audit_entry, get_bill, record_activity};

/// Installments of one parent in plan order, or every pending installment of
/// the book by due date when no parent is given.
pub async fn list_installments(
    state: &AppState,
    book: Book,
    parent_id: Option<Id>,
) -> AppResult<Vec<Installment>> {
    let filter = match parent_id {
        Some(id) => InstallmentFilter::of_parent(id),
        None => InstallmentFilter::pending(),
    };
    Ok(state.store.list_installments(book, filter).await?)
}

pub async fn get_installment(state: &AppState, book: Book, id: Id) -> AppResult<Installment> {
    state
        .store
        .get_installment(book, id)
        .await?
        .ok_or_else(|| AppError::not_found(book.installment_kind(), id))
}

/// Runs the `Validate` rules of every entry, naming fields by position.
fn validate_entries(book: Book, parent_id: Id, entries: &[InstallmentInput]) -> AppResult<()> {
    let mut fields = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        if let Err(errors) = entry.validate() {
            if let AppError::Validation(errs) = AppError::from(errors) {
                fields.extend(errs.into_iter().map(|e| {
                    FieldError::new(format!("installments[{i}].{}", e.field), e.message)
                }));
            }
        }
        if entry.parent_id != parent_id {
            fields.push(FieldError::new(
                format!("installments[{i}].{}", book.parent_field()),
                format!("every installment must reference {} {parent_id}", book.bill_kind()),
            ));
        }
    }
    if fields.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(fields))
    }
}

/// Replaces the whole plan of a bill.
///
/// Entries are renumbered 1..N in the order given. The set must add up to the
/// bill amount and to 100% within a cent; otherwise nothing is written. The
/// old installments, the new ones and the bill's `partial` status are written
/// as one unit.
#[instrument(skip(state, entries), fields(book = book.as_str(), count = entries.len()))]
pub async fn submit_plan(
    state: &AppState,
    book: Book,
    parent_id: Id,
    entries: Vec<InstallmentInput>,
) -> AppResult<Vec<Installment>> {
    if entries.is_empty() {
        return Err(AppError::field("installments", "no installments provided"));
    }
    validate_entries(book, parent_id, &entries)?;
    let parent = get_bill(state, book, parent_id).await?;

    let totals = checked_total(entries.iter().map(|e| e.amount))
        .zip(checked_total(entries.iter().map(|e| e.percentage)));
    let Some((total_amount, total_percentage)) = totals else {
        return Err(AppError::field("installments", "installment totals overflow"));
    };
    let (total_amount, total_percentage) = (round2(total_amount), round2(total_percentage));
    if !is_balanced(parent.amount, total_amount, total_percentage) {
        return Err(AppError::InvariantViolation(format!(
            "installments total {total_amount} ({total_percentage}%) but {} {} is {}",
            book.bill_kind(),
            parent.number,
            round2(parent.amount)
        )));
    }

    let plan: Vec<NewInstallment> = entries
        .into_iter()
        .zip(1u32..)
        .map(|(entry, number)| NewInstallment {
            installment_number: number,
            ..entry.into_new(number)
        })
        .collect();

    let created = state
        .store
        .replace_plan(book, parent_id, plan, BillStatus::Partial)
        .await?;
    info!(parent_id, installments = created.len(), "payment plan submitted");

    record_activity(
        state,
        audit_entry(
            state,
            "create",
            "payment_plan",
            Some(parent_id),
            format!("a créé un plan de paiement pour {} {}", book.bill_label(), parent.number),
        ),
    )
    .await;
    Ok(created)
}

/// Adds one installment next to the existing ones. Siblings and the bill
/// status are left alone.
pub async fn create_installment(
    state: &AppState,
    book: Book,
    entry: InstallmentInput,
) -> AppResult<Installment> {
    entry.validate()?;
    let parent = state
        .store
        .get_bill(book, entry.parent_id)
        .await?
        .ok_or_else(|| {
            AppError::field(
                book.parent_field(),
                format!("{} {} does not exist", book.bill_kind(), entry.parent_id),
            )
        })?;

    let siblings = state
        .store
        .list_installments(book, InstallmentFilter::of_parent(parent.id))
        .await?;
    let next_number = siblings
        .iter()
        .map(|i| i.installment_number)
        .max()
        .unwrap_or(0)
        + 1;

    let installment = state
        .store
        .insert_installment(book, entry.into_new(next_number))
        .await?;
    record_activity(
        state,
        audit_entry(
            state,
            "create",
            book.installment_kind(),
            Some(installment.id),
            format!("a créé un échéancier pour {} {}", book.bill_label(), parent.number),
        ),
    )
    .await;
    Ok(installment)
}

pub async fn update_installment(
    state: &AppState,
    book: Book,
    id: Id,
    update: InstallmentUpdate,
) -> AppResult<Installment> {
    let paying = update.is_plain_payment();
    let mut patch = update.into_patch();
    if paying {
        patch.payment_date = Some(Utc::now());
    }
    apply_installment_patch(state, book, id, patch, "update").await
}

/// Flags an installment as paid today. Paying it again only moves the
/// payment date.
#[instrument(skip(state), fields(book = book.as_str()))]
pub async fn mark_installment_paid(state: &AppState, book: Book, id: Id) -> AppResult<Installment> {
    let installment =
        apply_installment_patch(state, book, id, InstallmentPatch::paid_at(Utc::now()), "payment")
            .await?;
    info!(id, parent_id = installment.parent_id, "installment paid");
    Ok(installment)
}

async fn apply_installment_patch(
    state: &AppState,
    book: Book,
    id: Id,
    patch: InstallmentPatch,
    action: &str,
) -> AppResult<Installment> {
    let touches_status = patch.status.is_some();
    let installment = state
        .store
        .update_installment(book, id, patch)
        .await?
        .ok_or_else(|| AppError::not_found(book.installment_kind(), id))?;

    if touches_status {
        sync_parent_status(state, book, installment.parent_id).await?;
    }

    record_activity(
        state,
        audit_entry(
            state,
            action,
            book.installment_kind(),
            Some(id),
            format!(
                "a modifié l'échéance {} de {} {}",
                installment.installment_number,
                book.bill_label(),
                installment.parent_id
            ),
        ),
    )
    .await;
    Ok(installment)
}

/// Moves the bill to `paid` once every installment is paid, and back to
/// `partial` if a paid bill gets an unpaid installment again. A bill without
/// installments is left as it is.
async fn sync_parent_status(state: &AppState, book: Book, parent_id: Id) -> AppResult<()> {
    let Some(parent) = state.store.get_bill(book, parent_id).await? else {
        return Ok(());
    };
    let installments = state
        .store
        .list_installments(book, InstallmentFilter::of_parent(parent_id))
        .await?;

    let target = match plan_progress(&installments) {
        PlanProgress::None => return Ok(()),
        PlanProgress::Settled { .. } => BillStatus::Paid,
        PlanProgress::Open { .. } if parent.status == BillStatus::Paid => BillStatus::Partial,
        PlanProgress::Open { .. } => return Ok(()),
    };
    if target != parent.status {
        state
            .store
            .update_bill(book, parent_id, BillPatch::status(target))
            .await?;
        info!(parent_id, status = target.as_str(), "bill status follows its plan");
    }
    Ok(())
}
