//! Payables and receivables tracking with installment payment plans.
//!
//! [`planner`] drafts and edits plans, [`state`] persists them behind the
//! [`state::Store`] trait, [`dashboard`] aggregates, and [`routes`] exposes
//! everything as a JSON API.

pub mod config;
pub mod dashboard;
pub mod error;
pub mod models;
pub mod planner;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod validation;
