// Invoices and receivables.

use std::{collections::HashMap, sync::Arc};

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    error::AppResult,
    models::BillStatus,
    planner::{DEFAULT_INSTALLMENTS, PaymentPlan},
    state::{
        AppState, BillFilter, bill_with_installments, create_bill, delete_bill, get_bill,
        list_bills, list_open_bills, preview_plan, update_bill,
    },
    validation::{BillInput, BillUpdate, ValidatedJson},
};

use super::helpers::{BillView, BillWithInstallmentsView, BookRoute, parse_id, query_param};

/// `?status=` and `?supplierId=` / `?customerId=` narrow the list.
pub async fn index<B: BookRoute>(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> AppResult<Json<Vec<BillView>>> {
    let book = B::BOOK;
    let filter = BillFilter {
        statuses: query_param::<BillStatus>(&query, "status")?
            .into_iter()
            .collect(),
        counterparty_id: query_param(&query, book.counterparty_field())?,
    };
    let bills = list_bills(&state, book, &filter).await?;
    Ok(Json(BillView::list(book, bills)))
}

pub async fn pending<B: BookRoute>(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<BillView>>> {
    let bills = list_open_bills(&state, B::BOOK).await?;
    Ok(Json(BillView::list(B::BOOK, bills)))
}

pub async fn show<B: BookRoute>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<BillView>> {
    let id = parse_id(&id, B::BOOK.bill_kind())?;
    let bill = get_bill(&state, B::BOOK, id).await?;
    Ok(Json(BillView::new(B::BOOK, bill)))
}

pub async fn with_installments<B: BookRoute>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<BillWithInstallmentsView>> {
    let id = parse_id(&id, B::BOOK.bill_kind())?;
    let data = bill_with_installments(&state, B::BOOK, id).await?;
    Ok(Json(BillWithInstallmentsView::new(B::BOOK, data)))
}

pub async fn plan_preview<B: BookRoute>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> AppResult<Json<PaymentPlan>> {
    let id = parse_id(&id, B::BOOK.bill_kind())?;
    let count = query_param(&query, "count")?.unwrap_or(DEFAULT_INSTALLMENTS);
    Ok(Json(preview_plan(&state, B::BOOK, id, count).await?))
}

pub async fn create<B: BookRoute>(
    State(state): State<Arc<AppState>>,
    ValidatedJson(input): ValidatedJson<BillInput>,
) -> AppResult<(StatusCode, Json<BillView>)> {
    let bill = create_bill(&state, B::BOOK, input.into_new()).await?;
    Ok((StatusCode::CREATED, Json(BillView::new(B::BOOK, bill))))
}

pub async fn update<B: BookRoute>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidatedJson(input): ValidatedJson<BillUpdate>,
) -> AppResult<Json<BillView>> {
    let id = parse_id(&id, B::BOOK.bill_kind())?;
    let bill = update_bill(&state, B::BOOK, id, input.into_patch()).await?;
    Ok(Json(BillView::new(B::BOOK, bill)))
}

pub async fn delete<B: BookRoute>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let id = parse_id(&id, B::BOOK.bill_kind())?;
    delete_bill(&state, B::BOOK, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
