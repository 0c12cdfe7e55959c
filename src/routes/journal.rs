// Activities and bank transactions.

use std::{collections::HashMap, sync::Arc};

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use chrono::NaiveDate;

use crate::{
    error::{AppError, AppResult},
    models::{Activity, BankTransaction, BankTransactionType, iso_date},
    state::{
        AppState, TransactionFilter, create_activity, create_bank_transaction, list_activities,
        list_bank_transactions,
    },
    validation::{ActivityInput, BankTransactionInput, ValidatedJson},
};

use super::helpers::query_param;

pub async fn activities_index(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> AppResult<Json<Vec<Activity>>> {
    let limit = query_param(&query, "limit")?;
    Ok(Json(list_activities(&state, limit).await?))
}

pub async fn activities_create(
    State(state): State<Arc<AppState>>,
    ValidatedJson(input): ValidatedJson<ActivityInput>,
) -> AppResult<(StatusCode, Json<Activity>)> {
    let entry = input.into_new(state.audit_user_id);
    Ok((StatusCode::CREATED, Json(create_activity(&state, entry).await?)))
}

fn date_param(query: &HashMap<String, String>, key: &str) -> AppResult<Option<NaiveDate>> {
    match query.get(key).filter(|v| !v.trim().is_empty()) {
        None => Ok(None),
        Some(raw) => iso_date::parse(raw)
            .map(Some)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid {key} parameter"))),
    }
}

/// `?from=&to=` bound the transaction date (inclusive); `?type=` picks
/// credits or debits.
pub async fn bank_transactions_index(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> AppResult<Json<Vec<BankTransaction>>> {
    let filter = TransactionFilter {
        from: date_param(&query, "from")?,
        to: date_param(&query, "to")?,
        kind: query_param::<BankTransactionType>(&query, "type")?,
    };
    Ok(Json(list_bank_transactions(&state, filter).await?))
}

pub async fn bank_transactions_create(
    State(state): State<Arc<AppState>>,
    ValidatedJson(input): ValidatedJson<BankTransactionInput>,
) -> AppResult<(StatusCode, Json<BankTransaction>)> {
    let tx = create_bank_transaction(&state, input.into_new()).await?;
    Ok((StatusCode::CREATED, Json(tx)))
}
