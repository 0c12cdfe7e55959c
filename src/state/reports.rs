use chrono::NaiveDate;

use crate::{
    dashboard::{
        CashFlowBucket, DashboardStats, DistributionEntry, ForecastBucket, LedgerSnapshot,
        SettledMonth, cash_flow_forecast, compute_stats, distribution, financial_forecast,
        payments_by_month,
    },
    error::AppResult,
    models::Book,
};

use super::{AppState, BillFilter, InstallmentFilter};

/// Reads everything the dashboard aggregates in one go.
pub async fn load_snapshot(state: &AppState) -> AppResult<LedgerSnapshot> {
    let store = &state.store;
    let all_bills = BillFilter::default();
    let (suppliers, customers, invoices, receivables, installments, receivable_installments) = tokio::try_join!(
        store.list_counterparties(Book::Payables),
        store.list_counterparties(Book::Receivables),
        store.list_bills(Book::Payables, &all_bills),
        store.list_bills(Book::Receivables, &all_bills),
        store.list_installments(Book::Payables, InstallmentFilter::default()),
        store.list_installments(Book::Receivables, InstallmentFilter::default()),
    )?;
    Ok(LedgerSnapshot {
        suppliers,
        customers,
        invoices,
        receivables,
        installments,
        receivable_installments,
    })
}

pub async fn dashboard_stats(state: &AppState, today: NaiveDate) -> AppResult<DashboardStats> {
    let snapshot = load_snapshot(state).await?;
    Ok(compute_stats(&snapshot, today))
}

pub async fn dashboard_forecast(
    state: &AppState,
    today: NaiveDate,
) -> AppResult<Vec<ForecastBucket>> {
    let store = &state.store;
    let installments = store
        .list_installments(Book::Payables, InstallmentFilter::pending())
        .await?;
    let snapshot = LedgerSnapshot {
        installments,
        ..Default::default()
    };
    Ok(financial_forecast(&snapshot, today))
}

pub async fn dashboard_cash_flow(
    state: &AppState,
    today: NaiveDate,
) -> AppResult<Vec<CashFlowBucket>> {
    let store = &state.store;
    let (installments, receivable_installments) = tokio::try_join!(
        store.list_installments(Book::Payables, InstallmentFilter::pending()),
        store.list_installments(Book::Receivables, InstallmentFilter::pending()),
    )?;
    let snapshot = LedgerSnapshot {
        installments,
        receivable_installments,
        ..Default::default()
    };
    Ok(cash_flow_forecast(&snapshot, today))
}

pub async fn dashboard_payments_by_month(state: &AppState) -> AppResult<Vec<SettledMonth>> {
    let store = &state.store;
    let (installments, receivable_installments) = tokio::try_join!(
        store.list_installments(Book::Payables, InstallmentFilter::default()),
        store.list_installments(Book::Receivables, InstallmentFilter::default()),
    )?;
    let snapshot = LedgerSnapshot {
        installments,
        receivable_installments,
        ..Default::default()
    };
    Ok(payments_by_month(&snapshot))
}

/// Top counterparties of a book by billed amount.
pub async fn dashboard_distribution(
    state: &AppState,
    book: Book,
) -> AppResult<Vec<DistributionEntry>> {
    let store = &state.store;
    let all_bills = BillFilter::default();
    let (parties, bills) = tokio::try_join!(
        store.list_counterparties(book),
        store.list_bills(book, &all_bills),
    )?;
    Ok(distribution(&parties, &bills))
}
