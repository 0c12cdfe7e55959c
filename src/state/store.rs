use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{
    Activity, BankTransaction, BankTransactionType, Bill, BillPatch, BillStatus, Book,
    Counterparty, CounterpartyPatch, Id, Installment, InstallmentPatch, InstallmentStatus,
    NewActivity, NewBankTransaction, NewBill, NewCounterparty, NewInstallment,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend failure: {0}")]
    Backend(#[from] anyhow::Error),
    #[error("{0}")]
    Conflict(String),
    #[error("parent record no longer exists")]
    MissingParent,
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Default)]
pub struct BillFilter {
    /// Empty means every status.
    pub statuses: Vec<BillStatus>,
    pub counterparty_id: Option<Id>,
}

impl BillFilter {
    pub fn open() -> Self {
        BillFilter {
            statuses: vec![BillStatus::Pending, BillStatus::Partial],
            counterparty_id: None,
        }
    }

    pub fn matches(&self, bill: &Bill) -> bool {
        (self.statuses.is_empty() || self.statuses.contains(&bill.status))
            && self.counterparty_id.is_none_or(|id| id == bill.counterparty_id)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InstallmentFilter {
    pub parent_id: Option<Id>,
    pub status: Option<InstallmentStatus>,
}

impl InstallmentFilter {
    pub fn of_parent(parent_id: Id) -> Self {
        InstallmentFilter {
            parent_id: Some(parent_id),
            status: None,
        }
    }

    pub fn pending() -> Self {
        InstallmentFilter {
            parent_id: None,
            status: Some(InstallmentStatus::Pending),
        }
    }

    pub fn matches(&self, installment: &Installment) -> bool {
        self.parent_id.is_none_or(|id| id == installment.parent_id)
            && self.status.is_none_or(|s| s == installment.status)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub kind: Option<BankTransactionType>,
}

impl TransactionFilter {
    pub fn matches(&self, tx: &BankTransaction) -> bool {
        self.from.is_none_or(|from| tx.transaction_date >= from)
            && self.to.is_none_or(|to| tx.transaction_date <= to)
            && self.kind.is_none_or(|kind| kind == tx.kind)
    }
}

/// Persistence seam. Every method taking a [`Book`] works the same way on
/// payables and receivables.
///
/// Listing order: counterparties and bills by id; installments by number when
/// filtered on a parent, otherwise by due date; bank transactions newest
/// first; activities newest first.
#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;

    async fn list_counterparties(&self, book: Book) -> StoreResult<Vec<Counterparty>>;
    async fn get_counterparty(&self, book: Book, id: Id) -> StoreResult<Option<Counterparty>>;
    async fn insert_counterparty(&self, book: Book, new: NewCounterparty)
    -> StoreResult<Counterparty>;
    async fn update_counterparty(
        &self,
        book: Book,
        id: Id,
        patch: CounterpartyPatch,
    ) -> StoreResult<Option<Counterparty>>;
    async fn delete_counterparty(&self, book: Book, id: Id) -> StoreResult<bool>;

    async fn list_bills(&self, book: Book, filter: &BillFilter) -> StoreResult<Vec<Bill>>;
    async fn get_bill(&self, book: Book, id: Id) -> StoreResult<Option<Bill>>;
    /// Fails with [`StoreError::Conflict`] when the number is already taken.
    async fn insert_bill(&self, book: Book, new: NewBill) -> StoreResult<Bill>;
    async fn update_bill(&self, book: Book, id: Id, patch: BillPatch) -> StoreResult<Option<Bill>>;
    /// Removes the bill and its installments.
    async fn delete_bill(&self, book: Book, id: Id) -> StoreResult<bool>;

    async fn list_installments(
        &self,
        book: Book,
        filter: InstallmentFilter,
    ) -> StoreResult<Vec<Installment>>;
    async fn get_installment(&self, book: Book, id: Id) -> StoreResult<Option<Installment>>;
    async fn insert_installment(&self, book: Book, new: NewInstallment)
    -> StoreResult<Installment>;
    async fn update_installment(
        &self,
        book: Book,
        id: Id,
        patch: InstallmentPatch,
    ) -> StoreResult<Option<Installment>>;

    /// Atomically drops every installment of `parent_id`, inserts `plan`
    /// and sets the parent status. Nothing changes if any step fails.
    async fn replace_plan(
        &self,
        book: Book,
        parent_id: Id,
        plan: Vec<NewInstallment>,
        parent_status: BillStatus,
    ) -> StoreResult<Vec<Installment>>;

    async fn list_bank_transactions(
        &self,
        filter: TransactionFilter,
    ) -> StoreResult<Vec<BankTransaction>>;
    async fn insert_bank_transaction(&self, new: NewBankTransaction)
    -> StoreResult<BankTransaction>;

    async fn list_activities(&self, limit: Option<usize>) -> StoreResult<Vec<Activity>>;
    async fn insert_activity(&self, new: NewActivity) -> StoreResult<Activity>;
}
