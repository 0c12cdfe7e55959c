use tracing::info;

use crate::{
    error::{AppError, AppResult},
    models::{Book, Counterparty, CounterpartyPatch, Id, NewCounterparty},
};

use super::{AppState, BillFilter, audit_entry, record_activity};

pub async fn list_counterparties(state: &AppState, book: Book) -> AppResult<Vec<Counterparty>> {
    Ok(state.store.list_counterparties(book).await?)
}

pub async fn get_counterparty(state: &AppState, book: Book, id: Id) -> AppResult<Counterparty> {
    state
        .store
        .get_counterparty(book, id)
        .await?
        .ok_or_else(|| AppError::not_found(book.counterparty_kind(), id))
}

pub async fn create_counterparty(
    state: &AppState,
    book: Book,
    new: NewCounterparty,
) -> AppResult<Counterparty> {
    let party = state.store.insert_counterparty(book, new).await?;
    info!(book = book.as_str(), id = party.id, "counterparty created");
    record_activity(
        state,
        audit_entry(
            state,
            "create",
            book.counterparty_kind(),
            Some(party.id),
            format!("a créé un nouveau {} {}", book.counterparty_label(), party.name),
        ),
    )
    .await;
    Ok(party)
}

pub async fn update_counterparty(
    state: &AppState,
    book: Book,
    id: Id,
    patch: CounterpartyPatch,
) -> AppResult<Counterparty> {
    let party = state
        .store
        .update_counterparty(book, id, patch)
        .await?
        .ok_or_else(|| AppError::not_found(book.counterparty_kind(), id))?;
    record_activity(
        state,
        audit_entry(
            state,
            "update",
            book.counterparty_kind(),
            Some(id),
            format!("a modifié le {} {}", book.counterparty_label(), party.name),
        ),
    )
    .await;
    Ok(party)
}

/// Refuses to delete a counterparty that still has bills.
pub async fn delete_counterparty(state: &AppState, book: Book, id: Id) -> AppResult<()> {
    let party = get_counterparty(state, book, id).await?;

    let filter = BillFilter {
        counterparty_id: Some(id),
        ..Default::default()
    };
    let bills = state.store.list_bills(book, &filter).await?;
    if !bills.is_empty() {
        return Err(AppError::Conflict(format!(
            "{} {id} still has {} {}(s)",
            book.counterparty_kind(),
            bills.len(),
            book.bill_kind()
        )));
    }

    state.store.delete_counterparty(book, id).await?;
    record_activity(
        state,
        audit_entry(
            state,
            "delete",
            book.counterparty_kind(),
            Some(id),
            format!("a supprimé le {} {}", book.counterparty_label(), party.name),
        ),
    )
    .await;
    Ok(())
}
