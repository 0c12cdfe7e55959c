// dashboard.rs
// Aggregates served by /api/dashboard/*. Everything here is a pure function of
// a ledger snapshot and the current date, so the numbers can be checked
// without a store.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Days, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use crate::{
    models::{Bill, Counterparty, Id, Installment, InstallmentStatus},
    planner::{checked_total, round2},
};

pub const FORECAST_MONTHS: u32 = 6;
pub const TOP_COUNTERPARTIES: usize = 5;
/// Pending bills due within this many days count as "due".
pub const DUE_SOON_DAYS: u64 = 7;

const MONTH_NAMES: [&str; 12] = [
    "janvier",
    "février",
    "mars",
    "avril",
    "mai",
    "juin",
    "juillet",
    "août",
    "septembre",
    "octobre",
    "novembre",
    "décembre",
];

/// Everything the aggregates read, loaded once per request.
#[derive(Debug, Clone, Default)]
pub struct LedgerSnapshot {
    pub suppliers: Vec<Counterparty>,
    pub customers: Vec<Counterparty>,
    pub invoices: Vec<Bill>,
    pub receivables: Vec<Bill>,
    pub installments: Vec<Installment>,
    pub receivable_installments: Vec<Installment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub invoice_count: usize,
    pub supplier_count: usize,
    pub upcoming_payments: usize,
    pub pending_amount: Decimal,
    pub due_invoices: usize,
    pub overdue_installments: usize,
    pub overdue_amount: Decimal,
    pub customer_count: usize,
    pub receivable_count: usize,
    pub pending_receivable_amount: Decimal,
}

/// Rounded sum, capped at `Decimal::MAX` if it overflows.
fn total(values: impl IntoIterator<Item = Decimal>) -> Decimal {
    checked_total(values).map_or_else(capped, round2)
}

fn capped() -> Decimal {
    warn!("dashboard total overflowed, capping");
    Decimal::MAX
}

fn accumulate(slot: &mut Decimal, amount: Decimal) {
    *slot = slot.checked_add(amount).unwrap_or_else(capped);
}

pub fn compute_stats(snapshot: &LedgerSnapshot, today: NaiveDate) -> DashboardStats {
    let due_limit = today
        .checked_add_days(Days::new(DUE_SOON_DAYS))
        .unwrap_or(NaiveDate::MAX);

    let open_invoices: Vec<&Bill> = snapshot
        .invoices
        .iter()
        .filter(|b| b.status.is_open())
        .collect();
    let pending_installments: Vec<&Installment> = snapshot
        .installments
        .iter()
        .filter(|i| i.is_pending())
        .collect();
    let overdue: Vec<&&Installment> = pending_installments
        .iter()
        .filter(|i| i.due_date < today)
        .collect();

    DashboardStats {
        invoice_count: snapshot.invoices.len(),
        supplier_count: snapshot.suppliers.len(),
        upcoming_payments: pending_installments.len(),
        pending_amount: total(open_invoices.iter().map(|b| b.amount)),
        due_invoices: open_invoices
            .iter()
            .filter(|b| b.due_date <= due_limit)
            .count(),
        overdue_installments: overdue.len(),
        overdue_amount: total(overdue.iter().map(|i| i.amount)),
        customer_count: snapshot.customers.len(),
        receivable_count: snapshot.receivables.len(),
        pending_receivable_amount: total(
            snapshot
                .receivables
                .iter()
                .filter(|b| b.status.is_open())
                .map(|b| b.amount),
        ),
    }
}

/// Calendar month, labelled the way the dashboard displays it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn of(date: NaiveDate) -> Self {
        MonthKey {
            year: date.year(),
            month: date.month(),
        }
    }

    /// `"janvier 2025"`
    pub fn label(&self) -> String {
        let name = MONTH_NAMES
            .get(self.month.saturating_sub(1) as usize)
            .copied()
            .unwrap_or("?");
        format!("{name} {}", self.year)
    }

    /// `"2025-01"`
    pub fn iso(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

/// The forecast window: the current month and the five following ones.
pub fn forecast_window(today: NaiveDate) -> Vec<MonthKey> {
    let first = today.with_day(1).unwrap_or(today);
    (0..FORECAST_MONTHS)
        .filter_map(|i| first.checked_add_months(Months::new(i)))
        .map(MonthKey::of)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastBucket {
    pub month: String,
    pub key: String,
    pub amount: Decimal,
}

/// Pending invoice installments summed by due month. Installments due before
/// or after the window are left out.
pub fn financial_forecast(snapshot: &LedgerSnapshot, today: NaiveDate) -> Vec<ForecastBucket> {
    let window = forecast_window(today);
    let totals = sum_by_month(&snapshot.installments, &window);
    window
        .iter()
        .map(|key| ForecastBucket {
            month: key.label(),
            key: key.iso(),
            amount: totals.get(key).copied().unwrap_or_default(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CashFlowBucket {
    pub month: String,
    pub key: String,
    pub income: Decimal,
    pub expense: Decimal,
}

/// Expected money in (receivable installments) and out (invoice
/// installments) per month over the forecast window.
pub fn cash_flow_forecast(snapshot: &LedgerSnapshot, today: NaiveDate) -> Vec<CashFlowBucket> {
    let window = forecast_window(today);
    let expense = sum_by_month(&snapshot.installments, &window);
    let income = sum_by_month(&snapshot.receivable_installments, &window);
    window
        .iter()
        .map(|key| CashFlowBucket {
            month: key.label(),
            key: key.iso(),
            income: income.get(key).copied().unwrap_or_default(),
            expense: expense.get(key).copied().unwrap_or_default(),
        })
        .collect()
}

fn sum_by_month(installments: &[Installment], window: &[MonthKey]) -> HashMap<MonthKey, Decimal> {
    let mut totals: HashMap<MonthKey, Decimal> = HashMap::new();
    for installment in installments.iter().filter(|i| i.is_pending()) {
        let key = MonthKey::of(installment.due_date);
        if window.contains(&key) {
            accumulate(totals.entry(key).or_default(), installment.amount);
        }
    }
    totals.into_iter().map(|(k, v)| (k, round2(v))).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettledMonth {
    pub month: String,
    pub amount: Decimal,
}

/// Net money that actually moved, per month of payment: receivable
/// installments count in, invoice installments count out. Oldest month first.
pub fn payments_by_month(snapshot: &LedgerSnapshot) -> Vec<SettledMonth> {
    let mut totals: BTreeMap<String, Decimal> = BTreeMap::new();
    let flows = [
        (&snapshot.installments, true),
        (&snapshot.receivable_installments, false),
    ];
    for (installments, outgoing) in flows {
        for installment in installments {
            let Some(paid_at) = installment.payment_date else {
                continue;
            };
            let amount = if outgoing {
                -installment.amount
            } else {
                installment.amount
            };
            let key = MonthKey::of(paid_at.date_naive()).iso();
            accumulate(totals.entry(key).or_default(), amount);
        }
    }
    totals
        .into_iter()
        .map(|(month, amount)| SettledMonth {
            month,
            amount: round2(amount),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionEntry {
    pub id: Id,
    pub name: String,
    pub amount: Decimal,
}

/// Billed amount per counterparty, all statuses included, largest first.
/// Counterparties with nothing billed are skipped.
pub fn distribution(counterparties: &[Counterparty], bills: &[Bill]) -> Vec<DistributionEntry> {
    let mut per_party: HashMap<Id, Decimal> = HashMap::new();
    for bill in bills {
        accumulate(per_party.entry(bill.counterparty_id).or_default(), bill.amount);
    }

    let mut entries: Vec<DistributionEntry> = counterparties
        .iter()
        .filter_map(|party| {
            let amount = per_party.get(&party.id).copied().unwrap_or_default();
            (amount > Decimal::ZERO).then(|| DistributionEntry {
                id: party.id,
                name: party.name.clone(),
                amount: round2(amount),
            })
        })
        .collect();
    entries.sort_by(|a, b| b.amount.cmp(&a.amount).then(a.id.cmp(&b.id)));
    entries.truncate(TOP_COUNTERPARTIES);
    entries
}

/// How far a parent's plan has been paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum PlanProgress {
    /// No installment exists yet.
    None,
    Open { paid: usize, total: usize },
    Settled { total: usize },
}

impl PlanProgress {
    pub fn is_settled(&self) -> bool {
        matches!(self, PlanProgress::Settled { .. })
    }
}

pub fn plan_progress(installments: &[Installment]) -> PlanProgress {
    let total = installments.len();
    if total == 0 {
        return PlanProgress::None;
    }
    let paid = installments
        .iter()
        .filter(|i| i.status == InstallmentStatus::Paid)
        .count();
    if paid == total {
        PlanProgress::Settled { total }
    } else {
        PlanProgress::Open { paid, total }
    }
}
