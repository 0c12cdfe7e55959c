use tracing::warn;

use crate::{
    error::AppResult,
    models::{Activity, BankTransaction, Id, NewActivity, NewBankTransaction},
};

use super::{AppState, TransactionFilter};

/// Audit entry authored by the API itself.
pub fn audit_entry(
    state: &AppState,
    action: &str,
    resource_type: &str,
    resource_id: Option<Id>,
    details: String,
) -> NewActivity {
    NewActivity {
        user_id: state.audit_user_id,
        action: action.to_string(),
        resource_type: resource_type.to_string(),
        resource_id,
        timestamp: None,
        details: Some(details),
        metadata: None,
    }
}

/// Appends an activity without failing the caller. The business change it
/// describes is already committed, so a failed write is only logged.
pub async fn record_activity(state: &AppState, entry: NewActivity) {
    let action = entry.action.clone();
    let resource_type = entry.resource_type.clone();
    if let Err(err) = state.store.insert_activity(entry).await {
        warn!(%action, %resource_type, error = %err, "failed to record activity");
    }
}

pub async fn list_activities(state: &AppState, limit: Option<usize>) -> AppResult<Vec<Activity>> {
    Ok(state.store.list_activities(limit).await?)
}

pub async fn create_activity(state: &AppState, entry: NewActivity) -> AppResult<Activity> {
    Ok(state.store.insert_activity(entry).await?)
}

pub async fn list_bank_transactions(
    state: &AppState,
    filter: TransactionFilter,
) -> AppResult<Vec<BankTransaction>> {
    Ok(state.store.list_bank_transactions(filter).await?)
}

pub async fn create_bank_transaction(
    state: &AppState,
    new: NewBankTransaction,
) -> AppResult<BankTransaction> {
    let tx = state.store.insert_bank_transaction(new).await?;
    record_activity(
        state,
        audit_entry(
            state,
            "create",
            "bank_transaction",
            Some(tx.id),
            format!("a importé la transaction {} du compte {}", tx.id, tx.account_id),
        ),
    )
    .await;
    Ok(tx)
}
