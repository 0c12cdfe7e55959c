// routes/mod.rs
// JSON API under /api. Payables and receivables share handlers; the book is
// picked by the type parameter.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod bills;
pub mod counterparties;
pub mod dashboard;
pub mod health;
pub mod helpers;
pub mod installments;
pub mod journal;
pub mod plans;

use helpers::{Payables, Receivables};

pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route(
            "/suppliers",
            get(counterparties::index::<Payables>).post(counterparties::create::<Payables>),
        )
        .route(
            "/suppliers/{id}",
            get(counterparties::show::<Payables>)
                .put(counterparties::update::<Payables>)
                .delete(counterparties::delete::<Payables>),
        )
        .route(
            "/customers",
            get(counterparties::index::<Receivables>).post(counterparties::create::<Receivables>),
        )
        .route(
            "/customers/{id}",
            get(counterparties::show::<Receivables>)
                .put(counterparties::update::<Receivables>)
                .delete(counterparties::delete::<Receivables>),
        )
        .route(
            "/invoices",
            get(bills::index::<Payables>).post(bills::create::<Payables>),
        )
        .route("/invoices/pending", get(bills::pending::<Payables>))
        .route(
            "/invoices/{id}",
            get(bills::show::<Payables>)
                .put(bills::update::<Payables>)
                .delete(bills::delete::<Payables>),
        )
        .route(
            "/invoices/{id}/with-installments",
            get(bills::with_installments::<Payables>),
        )
        .route(
            "/invoices/{id}/plan-preview",
            get(bills::plan_preview::<Payables>),
        )
        .route(
            "/receivables",
            get(bills::index::<Receivables>).post(bills::create::<Receivables>),
        )
        .route("/receivables/pending", get(bills::pending::<Receivables>))
        .route(
            "/receivables/{id}",
            get(bills::show::<Receivables>)
                .put(bills::update::<Receivables>)
                .delete(bills::delete::<Receivables>),
        )
        .route(
            "/receivables/{id}/with-installments",
            get(bills::with_installments::<Receivables>),
        )
        .route(
            "/receivables/{id}/plan-preview",
            get(bills::plan_preview::<Receivables>),
        )
        .route(
            "/installments",
            get(installments::index::<Payables>).post(installments::create::<Payables>),
        )
        .route(
            "/installments/{id}",
            get(installments::show::<Payables>).put(installments::update::<Payables>),
        )
        .route(
            "/receivable-installments",
            get(installments::index::<Receivables>).post(installments::create::<Receivables>),
        )
        .route(
            "/receivable-installments/{id}",
            get(installments::show::<Receivables>).put(installments::update::<Receivables>),
        )
        .route("/plans/edit", post(plans::edit))
        .route("/dashboard/stats", get(dashboard::stats))
        .route("/dashboard/forecast", get(dashboard::forecast))
        .route("/dashboard/cash-flow", get(dashboard::cash_flow))
        .route(
            "/dashboard/payments-by-month",
            get(dashboard::payments_by_month),
        )
        .route(
            "/dashboard/supplier-distribution",
            get(dashboard::supplier_distribution),
        )
        .route(
            "/dashboard/customer-distribution",
            get(dashboard::customer_distribution),
        )
        .route(
            "/dashboard/pending-invoices",
            get(dashboard::pending_invoices),
        )
        .route(
            "/dashboard/recent-activities",
            get(dashboard::recent_activities),
        )
        .route(
            "/bank-transactions",
            get(journal::bank_transactions_index).post(journal::bank_transactions_create),
        )
        .route(
            "/financial-situation",
            get(journal::bank_transactions_index),
        )
        .route(
            "/activities",
            get(journal::activities_index).post(journal::activities_create),
        )
        .route("/health", get(health::health));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
