// Installments of invoices and receivables.
//
// POST takes either one object (adds a single installment) or an array (the
// full plan of the bill named by the first element, replacing any previous
// one).

use std::{collections::HashMap, sync::Arc};

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use crate::{
    error::{AppError, AppResult},
    state::{
        AppState, create_installment, get_installment, list_installments, submit_plan,
        update_installment,
    },
    validation::{InstallmentInput, InstallmentUpdate, ValidatedJson, json_rejection},
};

use super::helpers::{BookRoute, InstallmentView, parse_id, query_param};

pub async fn index<B: BookRoute>(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> AppResult<Json<Vec<InstallmentView>>> {
    let book = B::BOOK;
    let parent_id = query_param(&query, book.parent_field())?;
    let installments = list_installments(&state, book, parent_id).await?;
    Ok(Json(InstallmentView::list(book, installments)))
}

pub async fn show<B: BookRoute>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<InstallmentView>> {
    let id = parse_id(&id, B::BOOK.installment_kind())?;
    let installment = get_installment(&state, B::BOOK, id).await?;
    Ok(Json(InstallmentView::new(B::BOOK, installment)))
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> AppResult<T> {
    serde_json::from_value(value).map_err(|e| AppError::field("body", e.to_string()))
}

pub async fn create<B: BookRoute>(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Response> {
    let book = B::BOOK;
    let Json(body) = payload.map_err(json_rejection)?;

    match body {
        Value::Array(_) => {
            let entries: Vec<InstallmentInput> = decode(body)?;
            let Some(parent_id) = entries.first().map(|e| e.parent_id) else {
                return Err(AppError::field("installments", "no installments provided"));
            };
            let created = submit_plan(&state, book, parent_id, entries).await?;
            Ok((
                StatusCode::CREATED,
                Json(InstallmentView::list(book, created)),
            )
                .into_response())
        }
        Value::Object(_) => {
            let entry: InstallmentInput = decode(body)?;
            let created = create_installment(&state, book, entry).await?;
            Ok((
                StatusCode::CREATED,
                Json(InstallmentView::new(book, created)),
            )
                .into_response())
        }
        _ => Err(AppError::BadRequest(
            "expected an installment object or an array of installments".to_string(),
        )),
    }
}

pub async fn update<B: BookRoute>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidatedJson(input): ValidatedJson<InstallmentUpdate>,
) -> AppResult<Json<InstallmentView>> {
    let id = parse_id(&id, B::BOOK.installment_kind())?;
    let installment = update_installment(&state, B::BOOK, id, input).await?;
    Ok(Json(InstallmentView::new(B::BOOK, installment)))
}
