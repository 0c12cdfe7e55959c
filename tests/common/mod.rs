#![allow(dead_code)]

use std::{
    env,
    sync::{Arc, Mutex, MutexGuard, OnceLock},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use chrono::NaiveDate;
use mongodb::{Client, bson::doc, options::ClientOptions};
use rust_decimal::Decimal;

use echeancier::{
    models::{Bill, BillStatus, Book, Counterparty, Id, InstallmentStatus, NewBill, NewCounterparty, PaymentMethod},
    state::{AppState, MongoStore, create_bill, create_counterparty},
    validation::InstallmentInput,
};

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

pub fn memory_state() -> Arc<AppState> {
    Arc::new(AppState::in_memory())
}

pub async fn counterparty(state: &AppState, book: Book, name: &str) -> Counterparty {
    create_counterparty(
        state,
        book,
        NewCounterparty {
            name: name.to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap()
}

pub async fn bill(
    state: &AppState,
    book: Book,
    counterparty_id: Id,
    number: &str,
    amount: Decimal,
    due_date: NaiveDate,
) -> Bill {
    create_bill(
        state,
        book,
        NewBill {
            number: number.to_string(),
            counterparty_id,
            amount,
            issue_date: due_date,
            due_date,
            status: BillStatus::Pending,
            description: None,
            category: None,
            reference: None,
            attachment_url: None,
        },
    )
    .await
    .unwrap()
}

/// Supplier plus one pending invoice.
pub async fn invoice(state: &AppState, amount: Decimal, due_date: NaiveDate) -> Bill {
    let supplier = counterparty(state, Book::Payables, "Acme").await;
    bill(state, Book::Payables, supplier.id, "F-001", amount, due_date).await
}

pub fn entry(parent_id: Id, amount: Decimal, percentage: Decimal, due_date: NaiveDate) -> InstallmentInput {
    InstallmentInput {
        parent_id,
        installment_number: None,
        amount,
        percentage,
        due_date,
        payment_method: PaymentMethod::Transfer,
        status: InstallmentStatus::Pending,
        payment_date: None,
        reference: None,
        bank_transaction_id: None,
        notes: None,
    }
}

/// Global lock so tests that share a MongoDB server run one at a time.
static TEST_DB_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub struct MongoContext {
    pub state: AppState,
    pub client: Client,
    pub db_name: String,
    _guard: MutexGuard<'static, ()>,
}

impl MongoContext {
    /// Multi-document transactions need a replica set.
    pub async fn supports_transactions(&self) -> bool {
        match self.client.database("admin").run_command(doc! { "hello": 1 }).await {
            Ok(reply) => reply.contains_key("setName"),
            Err(_) => false,
        }
    }
}

pub async fn setup_mongo() -> Option<MongoContext> {
    let guard = TEST_DB_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let uri = env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
    let db_name = format!(
        "echeanciertest_{}",
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis()
    );

    let mut options = match ClientOptions::parse(&uri).await {
        Ok(o) => o,
        Err(err) => {
            eprintln!("Skipping test; invalid MongoDB URI: {err:?}");
            return None;
        }
    };
    options.server_selection_timeout = Some(Duration::from_secs(2));
    let client = match Client::with_options(options) {
        Ok(c) => c,
        Err(err) => {
            eprintln!("Skipping test; cannot connect to MongoDB: {err:?}");
            return None;
        }
    };
    if let Err(err) = client.database(&db_name).drop().await {
        eprintln!("Skipping test; cannot drop test DB: {err:?}");
        return None;
    }

    match MongoStore::from_client(client.clone(), &db_name).await {
        Ok(store) => Some(MongoContext {
            state: AppState::new(Arc::new(store), 1),
            client,
            db_name,
            _guard: guard,
        }),
        Err(err) => {
            eprintln!("Skipping test; store init failed: {err:?}");
            None
        }
    }
}

pub async fn teardown(ctx: Option<MongoContext>) {
    if let Some(ctx) = ctx {
        let _ = ctx.client.database(&ctx.db_name).drop().await;
        drop(ctx);
    }
}
