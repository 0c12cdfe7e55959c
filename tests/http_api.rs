#[path = "common/mod.rs"]
mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt; // for oneshot

use echeancier::routes;

fn app() -> Router {
    routes::router(common::memory_state())
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    call(app, Method::GET, uri, None).await
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    call(app, Method::POST, uri, Some(body)).await
}

async fn put(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    call(app, Method::PUT, uri, Some(body)).await
}

/// Supplier plus a 1000.00 invoice due 2025-01-31; returns the invoice id.
async fn seed_invoice(app: &Router) -> i64 {
    let (status, supplier) = post(app, "/api/suppliers", json!({ "name": "Acme" })).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, invoice) = post(
        app,
        "/api/invoices",
        json!({
            "number": "F-2025-001",
            "supplierId": supplier["id"],
            "amount": 1000.00,
            "issueDate": "2025-01-01",
            "dueDate": "2025-01-31"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{invoice}");
    invoice["id"].as_i64().unwrap()
}

fn number(value: &Value) -> f64 {
    value.as_f64().unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app();
    let (status, body) = get(&app, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn supplier_crud_roundtrip() {
    let app = app();

    let (status, created) = post(
        &app,
        "/api/suppliers",
        json!({ "name": "  Acme  ", "email": "billing@acme.test" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "Acme");
    let id = created["id"].as_i64().unwrap();

    let (status, list) = get(&app, "/api/suppliers").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, updated) = put(
        &app,
        &format!("/api/suppliers/{id}"),
        json!({ "phone": "0102030405" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["phone"], "0102030405");
    assert_eq!(updated["name"], "Acme");

    let (status, _) = call(&app, Method::DELETE, &format!("/api/suppliers/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = get(&app, &format!("/api/suppliers/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn suppliers_with_invoices_cannot_be_deleted() {
    let app = app();
    seed_invoice(&app).await;
    let (status, _) = call(&app, Method::DELETE, "/api/suppliers/1", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn invalid_payloads_name_their_fields() {
    let app = app();

    let (status, body) = post(&app, "/api/suppliers", json!({ "name": "", "email": "nope" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let fields: Vec<&str> = body["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"name"));
    assert!(fields.contains(&"email"));

    let (status, body) = post(
        &app,
        "/api/invoices",
        json!({
            "number": "F-1",
            "supplierId": 99,
            "amount": 10,
            "issueDate": "2025-01-01",
            "dueDate": "2025-01-31"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["fields"][0]["field"], "supplierId");
}

#[tokio::test]
async fn malformed_ids_are_bad_requests() {
    let app = app();
    let (status, body) = get(&app, "/api/invoices/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Invalid"));

    let (status, _) = get(&app, "/api/invoices/42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_invoice_numbers_conflict() {
    let app = app();
    seed_invoice(&app).await;
    let (status, _) = post(
        &app,
        "/api/invoices",
        json!({
            "number": "F-2025-001",
            "supplierId": 1,
            "amount": 5,
            "issueDate": "2025-01-01",
            "dueDate": "2025-01-31"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn invoice_list_filters_by_status() {
    let app = app();
    let id = seed_invoice(&app).await;

    let (_, pending) = get(&app, "/api/invoices?status=pending").await;
    assert_eq!(pending.as_array().unwrap().len(), 1);
    assert_eq!(pending[0]["supplierId"], 1);

    let (_, paid) = get(&app, "/api/invoices?status=paid").await;
    assert!(paid.as_array().unwrap().is_empty());

    let (status, _) = get(&app, "/api/invoices?status=whatever").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = put(&app, &format!("/api/invoices/{id}"), json!({ "status": "cancelled" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "cancelled");

    let (_, open) = get(&app, "/api/invoices/pending").await;
    assert!(open.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn plan_preview_splits_the_invoice() {
    let app = app();
    let id = seed_invoice(&app).await;

    let (status, plan) = get(&app, &format!("/api/invoices/{id}/plan-preview?count=3")).await;
    assert_eq!(status, StatusCode::OK);
    let rows = plan["installments"].as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(number(&rows[0]["amount"]), 333.33);
    assert_eq!(rows[0]["paymentMethod"], "transfer");
    assert_eq!(rows[1]["dueDate"], "2025-02-28");
    assert_eq!(rows[1]["paymentMethod"], "draft");
    assert_eq!(number(&rows[2]["amount"]), 333.34);
    assert_eq!(number(&plan["total"]["amount"]), 1000.0);
    assert_eq!(number(&plan["total"]["percentage"]), 100.0);

    let (_, default_plan) = get(&app, &format!("/api/invoices/{id}/plan-preview")).await;
    assert_eq!(default_plan["installments"].as_array().unwrap().len(), 4);

    let (status, _) = get(&app, &format!("/api/invoices/{id}/plan-preview?count=0")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn plan_edits_rebalance_the_last_row() {
    let app = app();
    let id = seed_invoice(&app).await;
    let (_, plan) = get(&app, &format!("/api/invoices/{id}/plan-preview?count=3")).await;

    let (status, edited) = post(
        &app,
        "/api/plans/edit",
        json!({ "plan": plan, "edit": { "field": "amount", "index": 0, "value": 400 } }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(number(&edited["installments"][0]["percentage"]), 40.0);
    assert_eq!(number(&edited["installments"][2]["amount"]), 266.67);
    assert_eq!(number(&edited["total"]["amount"]), 1000.0);

    let (status, body) = post(
        &app,
        "/api/plans/edit",
        json!({ "plan": plan, "edit": { "field": "amount", "index": 7, "value": 1 } }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["fields"][0]["field"], "index");
}

#[tokio::test]
async fn posting_an_array_replaces_the_plan() {
    let app = app();
    let id = seed_invoice(&app).await;

    let plan = json!([
        { "invoiceId": id, "amount": 500, "percentage": 50, "dueDate": "2025-01-31", "paymentMethod": "transfer" },
        { "invoiceId": id, "amount": 500, "percentage": 50, "dueDate": "2025-02-28", "paymentMethod": "draft" }
    ]);
    let (status, created) = post(&app, "/api/installments", plan.clone()).await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created.as_array().unwrap().len(), 2);
    assert_eq!(created[1]["installmentNumber"], 2);
    assert_eq!(created[0]["invoiceId"], id);

    let (status, _) = post(&app, "/api/installments", plan).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, view) = get(&app, &format!("/api/invoices/{id}/with-installments")).await;
    assert_eq!(view["invoice"]["status"], "partial");
    assert_eq!(view["installments"].as_array().unwrap().len(), 2);
    assert_eq!(view["progress"]["state"], "open");

    let (_, listed) = get(&app, &format!("/api/installments?invoiceId={id}")).await;
    assert_eq!(listed.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn unbalanced_arrays_are_rejected() {
    let app = app();
    let id = seed_invoice(&app).await;
    let (status, body) = post(
        &app,
        "/api/installments",
        json!([
            { "invoiceId": id, "amount": 333.33, "percentage": 33.33, "dueDate": "2025-01-31" },
            { "invoiceId": id, "amount": 100, "percentage": 10, "dueDate": "2025-02-28" }
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("433.33"));

    let (_, listed) = get(&app, &format!("/api/installments?invoiceId={id}")).await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn posting_an_object_adds_one_installment() {
    let app = app();
    let id = seed_invoice(&app).await;
    let (status, created) = post(
        &app,
        "/api/installments",
        json!({ "invoiceId": id, "amount": 250, "percentage": 25, "dueDate": "2025-03-31" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["installmentNumber"], 1);
    assert_eq!(created["status"], "pending");

    let (status, _) = post(&app, "/api/installments", json!("nope")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn paying_every_installment_settles_the_invoice() {
    let app = app();
    let id = seed_invoice(&app).await;
    let (_, created) = post(
        &app,
        "/api/installments",
        json!([{ "invoiceId": id, "amount": 1000, "percentage": 100, "dueDate": "2025-01-31" }]),
    )
    .await;
    let installment_id = created[0]["id"].as_i64().unwrap();

    let (status, paid) = put(
        &app,
        &format!("/api/installments/{installment_id}"),
        json!({ "status": "paid" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["status"], "paid");
    assert!(paid["paymentDate"].is_string());

    let (_, invoice) = get(&app, &format!("/api/invoices/{id}")).await;
    assert_eq!(invoice["status"], "paid");

    let (_, stats) = get(&app, "/api/dashboard/stats").await;
    assert_eq!(stats["invoiceCount"], 1);
    assert_eq!(stats["upcomingPayments"], 0);
}

#[tokio::test]
async fn dashboard_endpoints_answer() {
    let app = app();
    seed_invoice(&app).await;

    let (status, forecast) = get(&app, "/api/dashboard/forecast").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(forecast.as_array().unwrap().len(), 6);

    let (status, flow) = get(&app, "/api/dashboard/cash-flow").await;
    assert_eq!(status, StatusCode::OK);
    assert!(flow[0]["income"].is_number());

    let (_, top) = get(&app, "/api/dashboard/supplier-distribution").await;
    assert_eq!(top[0]["name"], "Acme");
    assert_eq!(number(&top[0]["amount"]), 1000.0);

    let (_, pending) = get(&app, "/api/dashboard/pending-invoices").await;
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let (_, recent) = get(&app, "/api/dashboard/recent-activities?limit=1").await;
    assert_eq!(recent.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn bank_transactions_filter_by_type() {
    let app = app();
    for (kind, date) in [("credit", "2025-01-05"), ("debit", "2025-02-10")] {
        let (status, _) = post(
            &app,
            "/api/bank-transactions",
            json!({
                "accountId": "FR76-0001",
                "transactionDate": date,
                "amount": 120.5,
                "type": kind
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, credits) = get(&app, "/api/bank-transactions?type=credit").await;
    assert_eq!(credits.as_array().unwrap().len(), 1);

    let (_, january) = get(&app, "/api/bank-transactions?from=2025-01-01&to=2025-01-31").await;
    assert_eq!(january.as_array().unwrap().len(), 1);
    assert_eq!(january[0]["type"], "credit");

    let (status, _) = get(&app, "/api/bank-transactions?from=yesterday").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn activities_can_be_posted_and_listed() {
    let app = app();
    let (status, created) = post(
        &app,
        "/api/activities",
        json!({ "action": "export", "resourceType": "report", "metadata": { "rows": 3 } }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["userId"], 1);

    let (_, listed) = get(&app, "/api/activities").await;
    assert_eq!(listed[0]["action"], "export");
}

#[tokio::test]
async fn oversized_amounts_are_rejected_before_they_reach_the_dashboard() {
    let app = app();
    seed_invoice(&app).await;

    let (status, body) = post(
        &app,
        "/api/invoices",
        json!({
            "number": "F-HUGE",
            "supplierId": 1,
            "amount": 5e28,
            "issueDate": "2025-01-01",
            "dueDate": "2025-01-31"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["fields"][0]["field"], "amount");

    let (status, _) = put(&app, "/api/invoices/1", json!({ "amount": 5e28 })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = post(
        &app,
        "/api/installments",
        json!([
            { "invoiceId": 1, "amount": 5e28, "percentage": 50, "dueDate": "2025-01-31" },
            { "invoiceId": 1, "amount": 5e28, "percentage": 50, "dueDate": "2025-02-28" }
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["fields"][0]["field"], "installments[0].amount");

    let (status, stats) = get(&app, "/api/dashboard/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(number(&stats["pendingAmount"]), 1000.0);
}

#[tokio::test]
async fn plan_edits_with_oversized_values_are_rejected() {
    let app = app();
    let id = seed_invoice(&app).await;
    let (_, plan) = get(&app, &format!("/api/invoices/{id}/plan-preview?count=3")).await;

    let (status, body) = post(
        &app,
        "/api/plans/edit",
        json!({ "plan": plan, "edit": { "field": "percentage", "index": 0, "value": 7e28 } }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["fields"][0]["field"], "value");

    let (status, body) = post(
        &app,
        "/api/plans/edit",
        json!({ "plan": plan, "edit": { "field": "percentage", "index": 0, "value": 1e15 } }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["fields"][0]["field"], "amount");

    let mut huge = plan.clone();
    huge["parentAmount"] = json!(5e28);
    let (status, _) = post(
        &app,
        "/api/plans/edit",
        json!({ "plan": huge, "edit": { "field": "amount", "index": 0, "value": 1 } }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn stats_hold_up_at_the_largest_accepted_amounts() {
    let app = app();
    let (_, supplier) = post(&app, "/api/suppliers", json!({ "name": "Big" })).await;
    for number in ["F-1", "F-2"] {
        let (status, _) = post(
            &app,
            "/api/invoices",
            json!({
                "number": number,
                "supplierId": supplier["id"],
                "amount": 1e15,
                "issueDate": "2025-01-01",
                "dueDate": "2025-01-31"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, stats) = get(&app, "/api/dashboard/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(number(&stats["pendingAmount"]), 2e15);

    let (status, top) = get(&app, "/api/dashboard/supplier-distribution").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(number(&top[0]["amount"]), 2e15);
}

#[tokio::test]
async fn payments_by_month_nets_settled_installments() {
    let app = app();
    let id = seed_invoice(&app).await;
    let (_, created) = post(
        &app,
        "/api/installments",
        json!([{ "invoiceId": id, "amount": 1000, "percentage": 100, "dueDate": "2025-01-31" }]),
    )
    .await;
    let installment_id = created[0]["id"].as_i64().unwrap();
    put(
        &app,
        &format!("/api/installments/{installment_id}"),
        json!({ "status": "paid", "paymentDate": "2025-02-03T10:00:00Z" }),
    )
    .await;

    let (status, months) = get(&app, "/api/dashboard/payments-by-month").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(months[0]["month"], "2025-02");
    assert_eq!(number(&months[0]["amount"]), -1000.0);
}

#[tokio::test]
async fn financial_situation_lists_bank_transactions() {
    let app = app();
    for kind in ["credit", "debit"] {
        post(
            &app,
            "/api/bank-transactions",
            json!({ "accountId": "FR76-0001", "transactionDate": "2025-01-05", "amount": 10, "type": kind }),
        )
        .await;
    }
    let (status, all) = get(&app, "/api/financial-situation").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, debits) = get(&app, "/api/financial-situation?type=debit").await;
    assert_eq!(debits.as_array().unwrap().len(), 1);
    assert_eq!(debits[0]["type"], "debit");

    let (status, _) = post(
        &app,
        "/api/bank-transactions",
        json!({ "accountId": "FR76-0001", "transactionDate": "2025-01-05", "amount": -5e28, "type": "debit" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
