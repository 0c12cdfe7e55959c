use std::{collections::HashMap, sync::Arc};

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::{Local, NaiveDate};

use crate::{
    dashboard::{CashFlowBucket, DashboardStats, DistributionEntry, ForecastBucket, SettledMonth},
    error::AppResult,
    models::{Activity, Book},
    state::{
        AppState, dashboard_cash_flow, dashboard_distribution, dashboard_forecast,
        dashboard_payments_by_month, dashboard_stats, list_activities, list_open_bills,
    },
};

use super::helpers::{BillView, query_param};

const RECENT_ACTIVITIES: usize = 10;

fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub async fn stats(State(state): State<Arc<AppState>>) -> AppResult<Json<DashboardStats>> {
    Ok(Json(dashboard_stats(&state, today()).await?))
}

pub async fn forecast(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<ForecastBucket>>> {
    Ok(Json(dashboard_forecast(&state, today()).await?))
}

pub async fn cash_flow(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<CashFlowBucket>>> {
    Ok(Json(dashboard_cash_flow(&state, today()).await?))
}

pub async fn payments_by_month(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<SettledMonth>>> {
    Ok(Json(dashboard_payments_by_month(&state).await?))
}

pub async fn supplier_distribution(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<DistributionEntry>>> {
    Ok(Json(dashboard_distribution(&state, Book::Payables).await?))
}

pub async fn customer_distribution(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<DistributionEntry>>> {
    Ok(Json(dashboard_distribution(&state, Book::Receivables).await?))
}

pub async fn pending_invoices(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<BillView>>> {
    let bills = list_open_bills(&state, Book::Payables).await?;
    Ok(Json(BillView::list(Book::Payables, bills)))
}

pub async fn recent_activities(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> AppResult<Json<Vec<Activity>>> {
    let limit = query_param(&query, "limit")?.unwrap_or(RECENT_ACTIVITIES);
    Ok(Json(list_activities(&state, Some(limit)).await?))
}
