use echeancier::error::AppError;
use echeancier::models::{BillStatus, Book, InstallmentStatus, NewBill};
use echeancier::state::{
    bill_with_installments, create_bill, delete_bill, delete_counterparty, get_bill,
    list_activities, list_installments, list_open_bills, mark_installment_paid, submit_plan,
};

#[path = "common/mod.rs"]
mod common;

use rust_decimal_macros::dec;

use common::{bill, counterparty, d, entry};

#[tokio::test]
async fn counterparties_and_bills_roundtrip() {
    let ctx = match common::setup_mongo().await {
        Some(c) => c,
        None => return,
    };
    let state = ctx.state.clone();

    let acme = counterparty(&state, Book::Payables, "Acme").await;
    let second = counterparty(&state, Book::Payables, "Globex").await;
    assert_eq!(second.id, acme.id + 1);

    let inv = bill(&state, Book::Payables, acme.id, "F-1", dec!(123.45), d(2025, 4, 30)).await;
    let fetched = get_bill(&state, Book::Payables, inv.id).await.unwrap();
    assert_eq!(fetched.amount, dec!(123.45));
    assert_eq!(fetched.due_date, d(2025, 4, 30));
    assert_eq!(fetched.status, BillStatus::Pending);

    let client = counterparty(&state, Book::Receivables, "Client").await;
    assert_eq!(client.id, 1);

    assert_eq!(list_open_bills(&state, Book::Payables).await.unwrap().len(), 1);
    assert!(matches!(
        delete_counterparty(&state, Book::Payables, acme.id).await.unwrap_err(),
        AppError::Conflict(_)
    ));

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn duplicate_bill_numbers_conflict() {
    let ctx = match common::setup_mongo().await {
        Some(c) => c,
        None => return,
    };
    let state = ctx.state.clone();

    let acme = counterparty(&state, Book::Payables, "Acme").await;
    bill(&state, Book::Payables, acme.id, "F-1", dec!(10), d(2025, 1, 1)).await;
    let err = create_bill(
        &state,
        Book::Payables,
        NewBill {
            number: "F-1".to_string(),
            counterparty_id: acme.id,
            amount: dec!(20),
            issue_date: d(2025, 1, 1),
            due_date: d(2025, 1, 1),
            status: BillStatus::Pending,
            description: None,
            category: None,
            reference: None,
            attachment_url: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn plan_replacement_is_transactional() {
    let ctx = match common::setup_mongo().await {
        Some(c) => c,
        None => return,
    };
    if !ctx.supports_transactions().await {
        eprintln!("Skipping test; MongoDB is not a replica set");
        common::teardown(Some(ctx)).await;
        return;
    }
    let state = ctx.state.clone();

    let acme = counterparty(&state, Book::Payables, "Acme").await;
    let inv = bill(&state, Book::Payables, acme.id, "F-1", dec!(300), d(2025, 1, 31)).await;

    let first = submit_plan(
        &state,
        Book::Payables,
        inv.id,
        vec![
            entry(inv.id, dec!(100), dec!(33.33), d(2025, 1, 31)),
            entry(inv.id, dec!(100), dec!(33.33), d(2025, 2, 28)),
            entry(inv.id, dec!(100), dec!(33.34), d(2025, 3, 31)),
        ],
    )
    .await
    .unwrap();
    assert_eq!(first.len(), 3);

    let second = submit_plan(
        &state,
        Book::Payables,
        inv.id,
        vec![
            entry(inv.id, dec!(150), dec!(50), d(2025, 1, 31)),
            entry(inv.id, dec!(150), dec!(50), d(2025, 2, 28)),
        ],
    )
    .await
    .unwrap();

    let stored = list_installments(&state, Book::Payables, Some(inv.id)).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(
        stored.iter().map(|i| i.installment_number).collect::<Vec<_>>(),
        [1, 2]
    );
    assert_eq!(stored[0].id, second[0].id);
    assert_eq!(
        get_bill(&state, Book::Payables, inv.id).await.unwrap().status,
        BillStatus::Partial
    );

    for installment in &stored {
        let paid = mark_installment_paid(&state, Book::Payables, installment.id)
            .await
            .unwrap();
        assert_eq!(paid.status, InstallmentStatus::Paid);
    }
    let view = bill_with_installments(&state, Book::Payables, inv.id).await.unwrap();
    assert_eq!(view.bill.status, BillStatus::Paid);
    assert!(view.progress.is_settled());

    assert!(!list_activities(&state, Some(5)).await.unwrap().is_empty());

    delete_bill(&state, Book::Payables, inv.id).await.unwrap();
    assert!(list_installments(&state, Book::Payables, Some(inv.id)).await.unwrap().is_empty());

    common::teardown(Some(ctx)).await;
}
