use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use futures::stream::TryStreamExt;
use mongodb::{
    Client, ClientSession, Collection, Database, IndexModel,
    bson::{Bson, Document, doc, to_bson, to_document},
    error::{ErrorKind, WriteFailure},
    options::{IndexOptions, ReturnDocument},
};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::models::{
    Activity, BankTransaction, Bill, BillPatch, BillStatus, Book, Counterparty, CounterpartyPatch,
    Id, Installment, InstallmentPatch, NewActivity, NewBankTransaction, NewBill, NewCounterparty,
    NewInstallment,
};

use super::store::{
    BillFilter, InstallmentFilter, Store, StoreError, StoreResult, TransactionFilter,
};

const COUNTERS: &str = "counters";
const BANK_TRANSACTIONS: &str = "bank_transactions";
const ACTIVITIES: &str = "activities";
const DUPLICATE_KEY: i32 = 11000;

struct BookCollections {
    counterparties: &'static str,
    bills: &'static str,
    installments: &'static str,
}

fn collections(book: Book) -> BookCollections {
    match book {
        Book::Payables => BookCollections {
            counterparties: "suppliers",
            bills: "invoices",
            installments: "installments",
        },
        Book::Receivables => BookCollections {
            counterparties: "customers",
            bills: "receivables",
            installments: "receivable_installments",
        },
    }
}

fn backend<E: Into<anyhow::Error>>(err: E) -> StoreError {
    StoreError::Backend(err.into())
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY
    )
}

/// `$set` document for a patch, stamped with `updatedAt`.
fn set_document<P: Serialize>(patch: &P) -> StoreResult<Document> {
    let mut set = to_document(patch).map_err(backend)?;
    set.insert("updatedAt", to_bson(&Utc::now()).map_err(backend)?);
    Ok(doc! { "$set": set })
}

/// MongoDB-backed store. Records keep their numeric `id` next to Mongo's own
/// `_id`; ids come from the `counters` collection.
///
/// Plan replacement uses a multi-document transaction, so the server must run
/// as a replica set.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, db_name: &str) -> anyhow::Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        Self::from_client(client, db_name).await
    }

    pub async fn from_client(client: Client, db_name: &str) -> anyhow::Result<Self> {
        let db = client.database(db_name);
        let store = MongoStore { client, db };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> anyhow::Result<()> {
        for book in [Book::Payables, Book::Receivables] {
            let names = collections(book);
            for name in [names.counterparties, names.bills, names.installments] {
                self.db
                    .collection::<Document>(name)
                    .create_index(unique_index(doc! { "id": 1 }))
                    .await?;
            }
            self.db
                .collection::<Document>(names.bills)
                .create_index(unique_index(doc! { "number": 1 }))
                .await?;
            self.db
                .collection::<Document>(names.installments)
                .create_index(IndexModel::builder().keys(doc! { "parentId": 1 }).build())
                .await?;
        }
        for name in [BANK_TRANSACTIONS, ACTIVITIES] {
            self.db
                .collection::<Document>(name)
                .create_index(unique_index(doc! { "id": 1 }))
                .await?;
        }
        Ok(())
    }

    fn counterparties(&self, book: Book) -> Collection<Counterparty> {
        self.db.collection(collections(book).counterparties)
    }

    fn bills(&self, book: Book) -> Collection<Bill> {
        self.db.collection(collections(book).bills)
    }

    fn installments(&self, book: Book) -> Collection<Installment> {
        self.db.collection(collections(book).installments)
    }

    fn bank_transactions(&self) -> Collection<BankTransaction> {
        self.db.collection(BANK_TRANSACTIONS)
    }

    fn activities(&self) -> Collection<Activity> {
        self.db.collection(ACTIVITIES)
    }

    async fn next_id(&self, sequence: &str) -> StoreResult<Id> {
        let counter = self
            .db
            .collection::<Document>(COUNTERS)
            .find_one_and_update(doc! { "_id": sequence }, doc! { "$inc": { "seq": 1_i64 } })
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .map_err(backend)?;
        counter
            .and_then(|d| d.get_i64("seq").ok())
            .ok_or_else(|| backend(anyhow!("counter {sequence} did not return a value")))
    }

    async fn replace_plan_in(
        &self,
        session: &mut ClientSession,
        book: Book,
        parent_id: Id,
        records: &[Installment],
        parent_status: BillStatus,
    ) -> StoreResult<()> {
        let updated = self
            .bills(book)
            .find_one_and_update(
                doc! { "id": parent_id },
                doc! { "$set": {
                    "status": parent_status.as_str(),
                    "updatedAt": to_bson(&Utc::now()).map_err(backend)?,
                } },
            )
            .session(&mut *session)
            .await
            .map_err(backend)?;
        if updated.is_none() {
            return Err(StoreError::MissingParent);
        }

        let removed = self
            .installments(book)
            .delete_many(doc! { "parentId": parent_id })
            .session(&mut *session)
            .await
            .map_err(backend)?;
        debug!(parent_id, removed = removed.deleted_count, "old plan removed");

        if !records.is_empty() {
            self.installments(book)
                .insert_many(records)
                .session(&mut *session)
                .await
                .map_err(backend)?;
        }
        Ok(())
    }
}

fn unique_index(keys: Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

fn bill_filter_document(filter: &BillFilter) -> Document {
    let mut query = Document::new();
    if !filter.statuses.is_empty() {
        let statuses: Vec<Bson> = filter
            .statuses
            .iter()
            .map(|s| Bson::String(s.as_str().to_string()))
            .collect();
        query.insert("status", doc! { "$in": statuses });
    }
    if let Some(id) = filter.counterparty_id {
        query.insert("counterpartyId", id);
    }
    query
}

fn installment_filter_document(filter: InstallmentFilter) -> Document {
    let mut query = Document::new();
    if let Some(id) = filter.parent_id {
        query.insert("parentId", id);
    }
    if let Some(status) = filter.status {
        query.insert("status", status.as_str());
    }
    query
}

fn transaction_filter_document(filter: TransactionFilter) -> Document {
    let mut query = Document::new();
    let mut range = Document::new();
    if let Some(from) = filter.from {
        range.insert("$gte", from.format("%Y-%m-%d").to_string());
    }
    if let Some(to) = filter.to {
        range.insert("$lte", to.format("%Y-%m-%d").to_string());
    }
    if !range.is_empty() {
        query.insert("transactionDate", range);
    }
    if let Some(kind) = filter.kind {
        query.insert("type", kind.as_str());
    }
    query
}

#[async_trait]
impl Store for MongoStore {
    async fn ping(&self) -> StoreResult<()> {
        self.db
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn list_counterparties(&self, book: Book) -> StoreResult<Vec<Counterparty>> {
        let cursor = self
            .counterparties(book)
            .find(doc! {})
            .sort(doc! { "id": 1 })
            .await
            .map_err(backend)?;
        cursor.try_collect().await.map_err(backend)
    }

    async fn get_counterparty(&self, book: Book, id: Id) -> StoreResult<Option<Counterparty>> {
        self.counterparties(book)
            .find_one(doc! { "id": id })
            .await
            .map_err(backend)
    }

    #[instrument(skip(self, new), fields(book = book.as_str()))]
    async fn insert_counterparty(
        &self,
        book: Book,
        new: NewCounterparty,
    ) -> StoreResult<Counterparty> {
        let id = self.next_id(collections(book).counterparties).await?;
        let record = new.into_record(id, Utc::now());
        self.counterparties(book)
            .insert_one(&record)
            .await
            .map_err(backend)?;
        Ok(record)
    }

    async fn update_counterparty(
        &self,
        book: Book,
        id: Id,
        patch: CounterpartyPatch,
    ) -> StoreResult<Option<Counterparty>> {
        self.counterparties(book)
            .find_one_and_update(doc! { "id": id }, set_document(&patch)?)
            .return_document(ReturnDocument::After)
            .await
            .map_err(backend)
    }

    async fn delete_counterparty(&self, book: Book, id: Id) -> StoreResult<bool> {
        let res = self
            .counterparties(book)
            .delete_one(doc! { "id": id })
            .await
            .map_err(backend)?;
        Ok(res.deleted_count > 0)
    }

    async fn list_bills(&self, book: Book, filter: &BillFilter) -> StoreResult<Vec<Bill>> {
        let cursor = self
            .bills(book)
            .find(bill_filter_document(filter))
            .sort(doc! { "id": 1 })
            .await
            .map_err(backend)?;
        cursor.try_collect().await.map_err(backend)
    }

    async fn get_bill(&self, book: Book, id: Id) -> StoreResult<Option<Bill>> {
        self.bills(book)
            .find_one(doc! { "id": id })
            .await
            .map_err(backend)
    }

    #[instrument(skip(self, new), fields(book = book.as_str(), number = %new.number))]
    async fn insert_bill(&self, book: Book, new: NewBill) -> StoreResult<Bill> {
        let id = self.next_id(collections(book).bills).await?;
        let record = new.into_record(id, Utc::now());
        match self.bills(book).insert_one(&record).await {
            Ok(_) => Ok(record),
            Err(err) if is_duplicate_key(&err) => Err(StoreError::Conflict(format!(
                "{} number {} already exists",
                book.bill_kind(),
                record.number
            ))),
            Err(err) => Err(backend(err)),
        }
    }

    async fn update_bill(&self, book: Book, id: Id, patch: BillPatch) -> StoreResult<Option<Bill>> {
        let number = patch.number.clone();
        match self
            .bills(book)
            .find_one_and_update(doc! { "id": id }, set_document(&patch)?)
            .return_document(ReturnDocument::After)
            .await
        {
            Ok(updated) => Ok(updated),
            Err(err) if is_duplicate_key(&err) => Err(StoreError::Conflict(format!(
                "{} number {} already exists",
                book.bill_kind(),
                number.unwrap_or_default()
            ))),
            Err(err) => Err(backend(err)),
        }
    }

    #[instrument(skip(self), fields(book = book.as_str()))]
    async fn delete_bill(&self, book: Book, id: Id) -> StoreResult<bool> {
        self.installments(book)
            .delete_many(doc! { "parentId": id })
            .await
            .map_err(backend)?;
        let res = self
            .bills(book)
            .delete_one(doc! { "id": id })
            .await
            .map_err(backend)?;
        Ok(res.deleted_count > 0)
    }

    async fn list_installments(
        &self,
        book: Book,
        filter: InstallmentFilter,
    ) -> StoreResult<Vec<Installment>> {
        let sort = if filter.parent_id.is_some() {
            doc! { "installmentNumber": 1, "id": 1 }
        } else {
            doc! { "dueDate": 1, "id": 1 }
        };
        let cursor = self
            .installments(book)
            .find(installment_filter_document(filter))
            .sort(sort)
            .await
            .map_err(backend)?;
        cursor.try_collect().await.map_err(backend)
    }

    async fn get_installment(&self, book: Book, id: Id) -> StoreResult<Option<Installment>> {
        self.installments(book)
            .find_one(doc! { "id": id })
            .await
            .map_err(backend)
    }

    async fn insert_installment(
        &self,
        book: Book,
        new: NewInstallment,
    ) -> StoreResult<Installment> {
        if self.get_bill(book, new.parent_id).await?.is_none() {
            return Err(StoreError::MissingParent);
        }
        let id = self.next_id(collections(book).installments).await?;
        let record = new.into_record(id, Utc::now());
        self.installments(book)
            .insert_one(&record)
            .await
            .map_err(backend)?;
        Ok(record)
    }

    async fn update_installment(
        &self,
        book: Book,
        id: Id,
        patch: InstallmentPatch,
    ) -> StoreResult<Option<Installment>> {
        self.installments(book)
            .find_one_and_update(doc! { "id": id }, set_document(&patch)?)
            .return_document(ReturnDocument::After)
            .await
            .map_err(backend)
    }

    #[instrument(skip(self, plan), fields(book = book.as_str(), count = plan.len()))]
    async fn replace_plan(
        &self,
        book: Book,
        parent_id: Id,
        plan: Vec<NewInstallment>,
        parent_status: BillStatus,
    ) -> StoreResult<Vec<Installment>> {
        // Ids are drawn outside the transaction; a rollback only leaves gaps.
        let now = Utc::now();
        let mut records = Vec::with_capacity(plan.len());
        for new in plan {
            let id = self.next_id(collections(book).installments).await?;
            records.push(new.into_record(id, now));
        }

        let mut session = self.client.start_session().await.map_err(backend)?;
        session.start_transaction().await.map_err(backend)?;
        match self
            .replace_plan_in(&mut session, book, parent_id, &records, parent_status)
            .await
        {
            Ok(()) => {
                session.commit_transaction().await.map_err(backend)?;
                Ok(records)
            }
            Err(err) => {
                if let Err(abort_err) = session.abort_transaction().await {
                    debug!(error = %abort_err, "abort after failed plan replacement");
                }
                Err(err)
            }
        }
    }

    async fn list_bank_transactions(
        &self,
        filter: TransactionFilter,
    ) -> StoreResult<Vec<BankTransaction>> {
        let cursor = self
            .bank_transactions()
            .find(transaction_filter_document(filter))
            .sort(doc! { "transactionDate": -1, "id": -1 })
            .await
            .map_err(backend)?;
        cursor.try_collect().await.map_err(backend)
    }

    async fn insert_bank_transaction(
        &self,
        new: NewBankTransaction,
    ) -> StoreResult<BankTransaction> {
        let id = self.next_id(BANK_TRANSACTIONS).await?;
        let record = new.into_record(id, Utc::now());
        self.bank_transactions()
            .insert_one(&record)
            .await
            .map_err(backend)?;
        Ok(record)
    }

    async fn list_activities(&self, limit: Option<usize>) -> StoreResult<Vec<Activity>> {
        let activities = self.activities();
        let find = activities
            .find(doc! {})
            .sort(doc! { "timestamp": -1, "id": -1 });
        let find = match limit {
            Some(limit) => find.limit(i64::try_from(limit).unwrap_or(i64::MAX)),
            None => find,
        };
        let cursor = find.await.map_err(backend)?;
        cursor.try_collect().await.map_err(backend)
    }

    async fn insert_activity(&self, new: NewActivity) -> StoreResult<Activity> {
        let id = self.next_id(ACTIVITIES).await?;
        let record = new.into_record(id, Utc::now());
        self.activities()
            .insert_one(&record)
            .await
            .map_err(backend)?;
        Ok(record)
    }
}
