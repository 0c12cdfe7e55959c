use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::models::{
    Activity, BankTransaction, Bill, BillPatch, BillStatus, Book, Counterparty, CounterpartyPatch,
    Id, Installment, InstallmentPatch, NewActivity, NewBankTransaction, NewBill, NewCounterparty,
    NewInstallment,
};

use super::store::{
    BillFilter, InstallmentFilter, Store, StoreError, StoreResult, TransactionFilter,
};

/// Id-keyed rows plus the next id to hand out.
#[derive(Debug)]
struct Table<T> {
    rows: BTreeMap<Id, T>,
    next_id: Id,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Table {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<T> Table<T> {
    fn allocate(&mut self) -> Id {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

#[derive(Debug, Default)]
struct BookTables {
    counterparties: Table<Counterparty>,
    bills: Table<Bill>,
    installments: Table<Installment>,
}

#[derive(Debug, Default)]
struct Tables {
    payables: BookTables,
    receivables: BookTables,
    bank_transactions: Table<BankTransaction>,
    activities: Table<Activity>,
}

impl Tables {
    fn book(&self, book: Book) -> &BookTables {
        match book {
            Book::Payables => &self.payables,
            Book::Receivables => &self.receivables,
        }
    }

    fn book_mut(&mut self, book: Book) -> &mut BookTables {
        match book {
            Book::Payables => &mut self.payables,
            Book::Receivables => &mut self.receivables,
        }
    }
}

/// Process-local store. One lock guards every table so multi-row writes such
/// as plan replacement are seen all at once or not at all.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn number_taken(tables: &BookTables, number: &str, except: Option<Id>) -> bool {
    tables
        .bills
        .rows
        .values()
        .any(|b| b.number == number && Some(b.id) != except)
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn list_counterparties(&self, book: Book) -> StoreResult<Vec<Counterparty>> {
        let tables = self.tables.read().await;
        Ok(tables.book(book).counterparties.rows.values().cloned().collect())
    }

    async fn get_counterparty(&self, book: Book, id: Id) -> StoreResult<Option<Counterparty>> {
        let tables = self.tables.read().await;
        Ok(tables.book(book).counterparties.rows.get(&id).cloned())
    }

    async fn insert_counterparty(
        &self,
        book: Book,
        new: NewCounterparty,
    ) -> StoreResult<Counterparty> {
        let mut tables = self.tables.write().await;
        let table = &mut tables.book_mut(book).counterparties;
        let record = new.into_record(table.allocate(), Utc::now());
        table.rows.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_counterparty(
        &self,
        book: Book,
        id: Id,
        patch: CounterpartyPatch,
    ) -> StoreResult<Option<Counterparty>> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables.book_mut(book).counterparties.rows.get_mut(&id) else {
            return Ok(None);
        };
        patch.apply_to(row, Utc::now());
        Ok(Some(row.clone()))
    }

    async fn delete_counterparty(&self, book: Book, id: Id) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .book_mut(book)
            .counterparties
            .rows
            .remove(&id)
            .is_some())
    }

    async fn list_bills(&self, book: Book, filter: &BillFilter) -> StoreResult<Vec<Bill>> {
        let tables = self.tables.read().await;
        Ok(tables
            .book(book)
            .bills
            .rows
            .values()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect())
    }

    async fn get_bill(&self, book: Book, id: Id) -> StoreResult<Option<Bill>> {
        let tables = self.tables.read().await;
        Ok(tables.book(book).bills.rows.get(&id).cloned())
    }

    async fn insert_bill(&self, book: Book, new: NewBill) -> StoreResult<Bill> {
        let mut tables = self.tables.write().await;
        let book_tables = tables.book_mut(book);
        if number_taken(book_tables, &new.number, None) {
            return Err(StoreError::Conflict(format!(
                "{} number {} already exists",
                book.bill_kind(),
                new.number
            )));
        }
        let record = new.into_record(book_tables.bills.allocate(), Utc::now());
        book_tables.bills.rows.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_bill(&self, book: Book, id: Id, patch: BillPatch) -> StoreResult<Option<Bill>> {
        let mut tables = self.tables.write().await;
        let book_tables = tables.book_mut(book);
        if let Some(number) = patch.number.as_deref() {
            if number_taken(book_tables, number, Some(id)) {
                return Err(StoreError::Conflict(format!(
                    "{} number {number} already exists",
                    book.bill_kind()
                )));
            }
        }
        let Some(row) = book_tables.bills.rows.get_mut(&id) else {
            return Ok(None);
        };
        patch.apply_to(row, Utc::now());
        Ok(Some(row.clone()))
    }

    async fn delete_bill(&self, book: Book, id: Id) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let book_tables = tables.book_mut(book);
        book_tables
            .installments
            .rows
            .retain(|_, i| i.parent_id != id);
        Ok(book_tables.bills.rows.remove(&id).is_some())
    }

    async fn list_installments(
        &self,
        book: Book,
        filter: InstallmentFilter,
    ) -> StoreResult<Vec<Installment>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Installment> = tables
            .book(book)
            .installments
            .rows
            .values()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect();
        if filter.parent_id.is_some() {
            rows.sort_by_key(|i| (i.installment_number, i.id));
        } else {
            rows.sort_by_key(|i| (i.due_date, i.id));
        }
        Ok(rows)
    }

    async fn get_installment(&self, book: Book, id: Id) -> StoreResult<Option<Installment>> {
        let tables = self.tables.read().await;
        Ok(tables.book(book).installments.rows.get(&id).cloned())
    }

    async fn insert_installment(
        &self,
        book: Book,
        new: NewInstallment,
    ) -> StoreResult<Installment> {
        let mut tables = self.tables.write().await;
        let book_tables = tables.book_mut(book);
        if !book_tables.bills.rows.contains_key(&new.parent_id) {
            return Err(StoreError::MissingParent);
        }
        let record = new.into_record(book_tables.installments.allocate(), Utc::now());
        book_tables.installments.rows.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_installment(
        &self,
        book: Book,
        id: Id,
        patch: InstallmentPatch,
    ) -> StoreResult<Option<Installment>> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables.book_mut(book).installments.rows.get_mut(&id) else {
            return Ok(None);
        };
        patch.apply_to(row, Utc::now());
        Ok(Some(row.clone()))
    }

    async fn replace_plan(
        &self,
        book: Book,
        parent_id: Id,
        plan: Vec<NewInstallment>,
        parent_status: BillStatus,
    ) -> StoreResult<Vec<Installment>> {
        let mut tables = self.tables.write().await;
        let book_tables = tables.book_mut(book);
        let now = Utc::now();

        let Some(parent) = book_tables.bills.rows.get_mut(&parent_id) else {
            return Err(StoreError::MissingParent);
        };
        BillPatch::status(parent_status).apply_to(parent, now);

        book_tables
            .installments
            .rows
            .retain(|_, i| i.parent_id != parent_id);

        let mut created = Vec::with_capacity(plan.len());
        for new in plan {
            let record = new.into_record(book_tables.installments.allocate(), now);
            book_tables.installments.rows.insert(record.id, record.clone());
            created.push(record);
        }
        Ok(created)
    }

    async fn list_bank_transactions(
        &self,
        filter: TransactionFilter,
    ) -> StoreResult<Vec<BankTransaction>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<BankTransaction> = tables
            .bank_transactions
            .rows
            .values()
            .filter(|tx| filter.matches(tx))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.transaction_date
                .cmp(&a.transaction_date)
                .then(b.id.cmp(&a.id))
        });
        Ok(rows)
    }

    async fn insert_bank_transaction(
        &self,
        new: NewBankTransaction,
    ) -> StoreResult<BankTransaction> {
        let mut tables = self.tables.write().await;
        let table = &mut tables.bank_transactions;
        let record = new.into_record(table.allocate(), Utc::now());
        table.rows.insert(record.id, record.clone());
        Ok(record)
    }

    async fn list_activities(&self, limit: Option<usize>) -> StoreResult<Vec<Activity>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Activity> = tables.activities.rows.values().cloned().collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        if let Some(limit) = limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert_activity(&self, new: NewActivity) -> StoreResult<Activity> {
        let mut tables = self.tables.write().await;
        let table = &mut tables.activities;
        let record = new.into_record(table.allocate(), Utc::now());
        table.rows.insert(record.id, record.clone());
        Ok(record)
    }
}
