use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use crate::models::{Book, NewCounterparty};

use super::AppState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub suppliers: usize,
    pub customers: usize,
}

/// True when neither book has a counterparty yet.
pub async fn is_store_empty(state: &AppState) -> Result<bool> {
    let suppliers = state.store.list_counterparties(Book::Payables).await?;
    let customers = state.store.list_counterparties(Book::Receivables).await?;
    Ok(suppliers.is_empty() && customers.is_empty())
}

/// Reads a JSON array from `path`. A missing file is an empty array.
pub fn load_json_array<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    match fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str::<Vec<T>>(&contents)
            .with_context(|| format!("invalid fixture file {}", path.display())),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(err) => Err(err).with_context(|| format!("cannot read {}", path.display())),
    }
}

/// Inserts `suppliers.json` and `customers.json` from `dir`.
pub async fn load_fixtures(state: &AppState, dir: &Path) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();
    for (book, file) in [
        (Book::Payables, "suppliers.json"),
        (Book::Receivables, "customers.json"),
    ] {
        let parties: Vec<NewCounterparty> = load_json_array(&dir.join(file))?;
        let count = parties.len();
        for party in parties {
            state.store.insert_counterparty(book, party).await?;
        }
        match book {
            Book::Payables => summary.suppliers = count,
            Book::Receivables => summary.customers = count,
        }
    }
    Ok(summary)
}
