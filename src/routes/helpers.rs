use std::{collections::HashMap, str::FromStr};

use serde::Serialize;

use crate::{
    dashboard::PlanProgress,
    error::{AppError, AppResult},
    models::{Bill, Book, Id, Installment},
    state::BillWithInstallments,
};

/// Ties a handler instantiation to one book, e.g. `index::<Payables>`.
pub trait BookRoute: Send + Sync + 'static {
    const BOOK: Book;
}

pub struct Payables;
pub struct Receivables;

impl BookRoute for Payables {
    const BOOK: Book = Book::Payables;
}

impl BookRoute for Receivables {
    const BOOK: Book = Book::Receivables;
}

pub fn parse_id(raw: &str, kind: &str) -> AppResult<Id> {
    raw.trim()
        .parse::<Id>()
        .map_err(|_| AppError::BadRequest(format!("Invalid {kind} ID")))
}

/// Optional query parameter; present but unparsable is a 400.
pub fn query_param<T: FromStr>(query: &HashMap<String, String>, key: &str) -> AppResult<Option<T>> {
    match query.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("Invalid {key} parameter"))),
    }
}

/// Bill as sent to clients: the counterparty id is also exposed under its
/// book-specific name (`supplierId` or `customerId`).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillView {
    #[serde(flatten)]
    pub bill: Bill,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<Id>,
}

impl BillView {
    pub fn new(book: Book, bill: Bill) -> Self {
        let id = bill.counterparty_id;
        let (supplier_id, customer_id) = match book {
            Book::Payables => (Some(id), None),
            Book::Receivables => (None, Some(id)),
        };
        BillView {
            bill,
            supplier_id,
            customer_id,
        }
    }

    pub fn list(book: Book, bills: Vec<Bill>) -> Vec<Self> {
        bills.into_iter().map(|b| BillView::new(book, b)).collect()
    }
}

/// Installment with its parent id under `invoiceId` or `receivableId`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallmentView {
    #[serde(flatten)]
    pub installment: Installment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receivable_id: Option<Id>,
}

impl InstallmentView {
    pub fn new(book: Book, installment: Installment) -> Self {
        let id = installment.parent_id;
        let (invoice_id, receivable_id) = match book {
            Book::Payables => (Some(id), None),
            Book::Receivables => (None, Some(id)),
        };
        InstallmentView {
            installment,
            invoice_id,
            receivable_id,
        }
    }

    pub fn list(book: Book, installments: Vec<Installment>) -> Vec<Self> {
        installments
            .into_iter()
            .map(|i| InstallmentView::new(book, i))
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct BillWithInstallmentsView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice: Option<BillView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receivable: Option<BillView>,
    pub installments: Vec<InstallmentView>,
    pub progress: PlanProgress,
}

impl BillWithInstallmentsView {
    pub fn new(book: Book, data: BillWithInstallments) -> Self {
        let bill = BillView::new(book, data.bill);
        let (invoice, receivable) = match book {
            Book::Payables => (Some(bill), None),
            Book::Receivables => (None, Some(bill)),
        };
        BillWithInstallmentsView {
            invoice,
            receivable,
            installments: InstallmentView::list(book, data.installments),
            progress: data.progress,
        }
    }
}
