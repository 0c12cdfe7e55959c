#[path = "common/mod.rs"]
mod common;

use std::path::{Path, PathBuf};

use echeancier::{
    config::{Settings, StoreBackend},
    models::Book,
    state::{
        init_state, list_counterparties,
        seed::{SeedSummary, is_store_empty, load_fixtures},
    },
};

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

#[tokio::test]
async fn init_state_seeds_an_empty_memory_store() {
    let settings = Settings {
        store_backend: StoreBackend::Memory,
        seed_dir: Some(fixtures_dir()),
        ..Settings::default()
    };
    let state = init_state(&settings).await.unwrap();

    let suppliers = list_counterparties(&state, Book::Payables).await.unwrap();
    let customers = list_counterparties(&state, Book::Receivables).await.unwrap();
    assert_eq!(suppliers.len(), 3);
    assert_eq!(customers.len(), 2);
    assert_eq!(suppliers[0].name, "Imprimerie Dupont");
    assert_eq!(suppliers[0].tax_id.as_deref(), Some("FR40123456789"));
    assert!(!is_store_empty(&state).await.unwrap());
}

#[tokio::test]
async fn missing_fixture_files_load_nothing() {
    let state = common::memory_state();
    let dir = std::env::temp_dir().join("echeancier-no-fixtures-here");
    let summary = load_fixtures(&state, &dir).await.unwrap();
    assert_eq!(summary, SeedSummary::default());
    assert!(is_store_empty(&state).await.unwrap());
}

#[tokio::test]
async fn seeding_against_mongo_fills_both_books() {
    let ctx = match common::setup_mongo().await {
        Some(c) => c,
        None => return,
    };
    let state = ctx.state.clone();

    assert!(is_store_empty(&state).await.unwrap());
    let summary = load_fixtures(&state, &fixtures_dir()).await.unwrap();
    assert_eq!(
        summary,
        SeedSummary {
            suppliers: 3,
            customers: 2
        }
    );
    let customers = list_counterparties(&state, Book::Receivables).await.unwrap();
    assert_eq!(customers[1].name, "Cabinet Moreau");

    common::teardown(Some(ctx)).await;
}
