// Suppliers and customers share these handlers; the book comes from the
// type parameter picked in the router.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    error::AppResult,
    models::Counterparty,
    state::{
        AppState, create_counterparty, delete_counterparty, get_counterparty,
        list_counterparties, update_counterparty,
    },
    validation::{CounterpartyInput, CounterpartyUpdate, ValidatedJson},
};

use super::helpers::{BookRoute, parse_id};

pub async fn index<B: BookRoute>(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<Counterparty>>> {
    Ok(Json(list_counterparties(&state, B::BOOK).await?))
}

pub async fn show<B: BookRoute>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Counterparty>> {
    let id = parse_id(&id, B::BOOK.counterparty_kind())?;
    Ok(Json(get_counterparty(&state, B::BOOK, id).await?))
}

pub async fn create<B: BookRoute>(
    State(state): State<Arc<AppState>>,
    ValidatedJson(input): ValidatedJson<CounterpartyInput>,
) -> AppResult<(StatusCode, Json<Counterparty>)> {
    let party = create_counterparty(&state, B::BOOK, input.into_new()).await?;
    Ok((StatusCode::CREATED, Json(party)))
}

pub async fn update<B: BookRoute>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidatedJson(input): ValidatedJson<CounterpartyUpdate>,
) -> AppResult<Json<Counterparty>> {
    let id = parse_id(&id, B::BOOK.counterparty_kind())?;
    Ok(Json(
        update_counterparty(&state, B::BOOK, id, input.into_patch()).await?,
    ))
}

pub async fn delete<B: BookRoute>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let id = parse_id(&id, B::BOOK.counterparty_kind())?;
    delete_counterparty(&state, B::BOOK, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
