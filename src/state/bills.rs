use tracing::info;

use crate::{
    dashboard::{PlanProgress, plan_progress},
    error::{AppError, AppResult},
    models::{Bill, BillPatch, Book, Id, Installment, NewBill},
    planner::{MAX_INSTALLMENTS, PaymentPlan, generate_plan},
};

use super::{AppState, BillFilter, InstallmentFilter, audit_entry, record_activity};

pub async fn list_bills(state: &AppState, book: Book, filter: &BillFilter) -> AppResult<Vec<Bill>> {
    Ok(state.store.list_bills(book, filter).await?)
}

/// Pending and partially planned bills.
pub async fn list_open_bills(state: &AppState, book: Book) -> AppResult<Vec<Bill>> {
    list_bills(state, book, &BillFilter::open()).await
}

pub async fn get_bill(state: &AppState, book: Book, id: Id) -> AppResult<Bill> {
    state
        .store
        .get_bill(book, id)
        .await?
        .ok_or_else(|| AppError::not_found(book.bill_kind(), id))
}

async fn require_counterparty(state: &AppState, book: Book, id: Id) -> AppResult<String> {
    match state.store.get_counterparty(book, id).await? {
        Some(party) => Ok(party.name),
        None => Err(AppError::field(
            book.counterparty_field(),
            format!("{} {id} does not exist", book.counterparty_kind()),
        )),
    }
}

pub async fn create_bill(state: &AppState, book: Book, new: NewBill) -> AppResult<Bill> {
    let party_name = require_counterparty(state, book, new.counterparty_id).await?;
    let bill = state.store.insert_bill(book, new).await?;
    info!(book = book.as_str(), id = bill.id, number = %bill.number, "bill created");
    record_activity(
        state,
        audit_entry(
            state,
            "create",
            book.bill_kind(),
            Some(bill.id),
            format!("a ajouté {} {} de {}", book.bill_label(), bill.number, party_name),
        ),
    )
    .await;
    Ok(bill)
}

pub async fn update_bill(state: &AppState, book: Book, id: Id, patch: BillPatch) -> AppResult<Bill> {
    if let Some(counterparty_id) = patch.counterparty_id {
        require_counterparty(state, book, counterparty_id).await?;
    }
    let bill = state
        .store
        .update_bill(book, id, patch)
        .await?
        .ok_or_else(|| AppError::not_found(book.bill_kind(), id))?;
    record_activity(
        state,
        audit_entry(
            state,
            "update",
            book.bill_kind(),
            Some(id),
            format!("a modifié {} {}", book.bill_label(), bill.number),
        ),
    )
    .await;
    Ok(bill)
}

/// Deletes the bill together with its installments.
pub async fn delete_bill(state: &AppState, book: Book, id: Id) -> AppResult<()> {
    let bill = get_bill(state, book, id).await?;
    state.store.delete_bill(book, id).await?;
    record_activity(
        state,
        audit_entry(
            state,
            "delete",
            book.bill_kind(),
            Some(id),
            format!("a supprimé {} {}", book.bill_label(), bill.number),
        ),
    )
    .await;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct BillWithInstallments {
    pub bill: Bill,
    pub installments: Vec<Installment>,
    pub progress: PlanProgress,
}

pub async fn bill_with_installments(
    state: &AppState,
    book: Book,
    id: Id,
) -> AppResult<BillWithInstallments> {
    let bill = get_bill(state, book, id).await?;
    let installments = state
        .store
        .list_installments(book, InstallmentFilter::of_parent(id))
        .await?;
    let progress = plan_progress(&installments);
    Ok(BillWithInstallments {
        bill,
        installments,
        progress,
    })
}

/// Draft plan splitting the bill into `count` monthly installments. Nothing
/// is stored.
pub async fn preview_plan(
    state: &AppState,
    book: Book,
    id: Id,
    count: u32,
) -> AppResult<PaymentPlan> {
    if !(1..=MAX_INSTALLMENTS).contains(&count) {
        return Err(AppError::field(
            "count",
            format!("must be between 1 and {MAX_INSTALLMENTS}"),
        ));
    }
    let bill = get_bill(state, book, id).await?;
    Ok(generate_plan(bill.amount, bill.due_date, count)?)
}
