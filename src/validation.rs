// validation.rs
// Request payloads. Each one is checked with `validator` before it is turned
// into the command the state layer expects.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, de::DeserializeOwned};
use validator::{Validate, ValidationError};

use crate::{
    error::AppError,
    models::{
        BankTransactionType, BillPatch, BillStatus, CounterpartyPatch, Id, InstallmentPatch,
        InstallmentStatus, NewActivity, NewBankTransaction, NewBill, NewCounterparty,
        NewInstallment, PaymentMethod, iso_date,
    },
    planner::{HUNDRED, MAX_AMOUNT, PaymentPlan, PlanEdit},
};

/// JSON body that has passed its `Validate` rules.
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(json_rejection)?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

pub fn json_rejection(rejection: JsonRejection) -> AppError {
    match rejection {
        JsonRejection::JsonDataError(err) => AppError::field("body", err.body_text()),
        other => AppError::BadRequest(other.body_text()),
    }
}

fn within_max(value: &Decimal) -> Result<(), ValidationError> {
    if value.abs() <= MAX_AMOUNT {
        Ok(())
    } else {
        Err(ValidationError::new("max_amount")
            .with_message(format!("must not exceed {MAX_AMOUNT}").into()))
    }
}

fn positive(value: &Decimal) -> Result<(), ValidationError> {
    if *value > Decimal::ZERO {
        within_max(value)
    } else {
        Err(ValidationError::new("positive").with_message("must be greater than zero".into()))
    }
}

fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if *value >= Decimal::ZERO {
        within_max(value)
    } else {
        Err(ValidationError::new("non_negative").with_message("must not be negative".into()))
    }
}

fn percentage_bounds(value: &Decimal) -> Result<(), ValidationError> {
    if (Decimal::ZERO..=HUNDRED).contains(value) {
        Ok(())
    } else {
        Err(ValidationError::new("percentage").with_message("must be between 0 and 100".into()))
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CounterpartyInput {
    #[validate(length(min = 1, message = "is required"))]
    pub name: String,
    #[validate(email(message = "is not a valid email"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub contact_person: Option<String>,
    pub category: Option<String>,
    pub tax_id: Option<String>,
    pub bank_info: Option<String>,
    pub notes: Option<String>,
}

impl CounterpartyInput {
    pub fn into_new(self) -> NewCounterparty {
        NewCounterparty {
            name: self.name.trim().to_string(),
            email: trimmed(self.email),
            phone: trimmed(self.phone),
            address: trimmed(self.address),
            contact_person: trimmed(self.contact_person),
            category: trimmed(self.category),
            tax_id: trimmed(self.tax_id),
            bank_info: trimmed(self.bank_info),
            notes: trimmed(self.notes),
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CounterpartyUpdate {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub name: Option<String>,
    #[validate(email(message = "is not a valid email"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub contact_person: Option<String>,
    pub category: Option<String>,
    pub tax_id: Option<String>,
    pub bank_info: Option<String>,
    pub notes: Option<String>,
}

impl CounterpartyUpdate {
    pub fn into_patch(self) -> CounterpartyPatch {
        CounterpartyPatch {
            name: self.name.map(|n| n.trim().to_string()),
            email: self.email,
            phone: self.phone,
            address: self.address,
            contact_person: self.contact_person,
            category: self.category,
            tax_id: self.tax_id,
            bank_info: self.bank_info,
            notes: self.notes,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BillInput {
    #[validate(length(min = 1, message = "is required"))]
    pub number: String,
    #[serde(alias = "supplierId", alias = "customerId")]
    pub counterparty_id: Id,
    #[validate(custom(function = "positive"))]
    pub amount: Decimal,
    #[serde(deserialize_with = "iso_date::deserialize")]
    pub issue_date: NaiveDate,
    #[serde(deserialize_with = "iso_date::deserialize")]
    pub due_date: NaiveDate,
    pub status: Option<BillStatus>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub reference: Option<String>,
    pub attachment_url: Option<String>,
}

impl BillInput {
    pub fn into_new(self) -> NewBill {
        NewBill {
            number: self.number.trim().to_string(),
            counterparty_id: self.counterparty_id,
            amount: self.amount,
            issue_date: self.issue_date,
            due_date: self.due_date,
            status: self.status.unwrap_or_default(),
            description: trimmed(self.description),
            category: trimmed(self.category),
            reference: trimmed(self.reference),
            attachment_url: trimmed(self.attachment_url),
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BillUpdate {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub number: Option<String>,
    #[serde(alias = "supplierId", alias = "customerId")]
    pub counterparty_id: Option<Id>,
    #[validate(custom(function = "positive"))]
    pub amount: Option<Decimal>,
    #[serde(default, deserialize_with = "iso_date::option::deserialize")]
    pub issue_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "iso_date::option::deserialize")]
    pub due_date: Option<NaiveDate>,
    pub status: Option<BillStatus>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub reference: Option<String>,
    pub attachment_url: Option<String>,
}

impl BillUpdate {
    pub fn into_patch(self) -> BillPatch {
        BillPatch {
            number: self.number.map(|n| n.trim().to_string()),
            counterparty_id: self.counterparty_id,
            amount: self.amount,
            issue_date: self.issue_date,
            due_date: self.due_date,
            status: self.status,
            description: self.description,
            category: self.category,
            reference: self.reference,
            attachment_url: self.attachment_url,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InstallmentInput {
    #[serde(alias = "invoiceId", alias = "receivableId")]
    pub parent_id: Id,
    #[validate(range(min = 1, message = "must start at 1"))]
    pub installment_number: Option<u32>,
    #[validate(custom(function = "non_negative"))]
    pub amount: Decimal,
    #[validate(custom(function = "percentage_bounds"))]
    pub percentage: Decimal,
    #[serde(deserialize_with = "iso_date::deserialize")]
    pub due_date: NaiveDate,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub status: InstallmentStatus,
    pub payment_date: Option<DateTime<Utc>>,
    pub reference: Option<String>,
    pub bank_transaction_id: Option<Id>,
    pub notes: Option<String>,
}

impl InstallmentInput {
    /// `number` is used when the payload does not carry its own.
    pub fn into_new(self, number: u32) -> NewInstallment {
        NewInstallment {
            parent_id: self.parent_id,
            installment_number: self.installment_number.unwrap_or(number),
            amount: self.amount,
            percentage: self.percentage,
            due_date: self.due_date,
            payment_method: self.payment_method,
            status: self.status,
            payment_date: self.payment_date,
            reference: trimmed(self.reference),
            bank_transaction_id: self.bank_transaction_id,
            notes: trimmed(self.notes),
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InstallmentUpdate {
    #[validate(range(min = 1, message = "must start at 1"))]
    pub installment_number: Option<u32>,
    #[validate(custom(function = "non_negative"))]
    pub amount: Option<Decimal>,
    #[validate(custom(function = "percentage_bounds"))]
    pub percentage: Option<Decimal>,
    #[serde(default, deserialize_with = "iso_date::option::deserialize")]
    pub due_date: Option<NaiveDate>,
    pub payment_method: Option<PaymentMethod>,
    pub status: Option<InstallmentStatus>,
    pub payment_date: Option<DateTime<Utc>>,
    pub reference: Option<String>,
    pub bank_transaction_id: Option<Id>,
    pub notes: Option<String>,
}

impl InstallmentUpdate {
    /// A bare `status: paid` is a payment; the state layer stamps the date.
    pub fn is_plain_payment(&self) -> bool {
        self.status == Some(InstallmentStatus::Paid) && self.payment_date.is_none()
    }

    pub fn into_patch(self) -> InstallmentPatch {
        InstallmentPatch {
            installment_number: self.installment_number,
            amount: self.amount,
            percentage: self.percentage,
            due_date: self.due_date,
            payment_method: self.payment_method,
            status: self.status,
            payment_date: self.payment_date,
            reference: self.reference,
            bank_transaction_id: self.bank_transaction_id,
            notes: self.notes,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PlanEditRequest {
    pub plan: PaymentPlan,
    pub edit: PlanEdit,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BankTransactionInput {
    #[validate(length(min = 1, message = "is required"))]
    pub account_id: String,
    #[serde(deserialize_with = "iso_date::deserialize")]
    pub transaction_date: NaiveDate,
    #[validate(custom(function = "within_max"))]
    pub amount: Decimal,
    pub description: Option<String>,
    pub reference: Option<String>,
    #[serde(rename = "type")]
    pub kind: BankTransactionType,
    pub category: Option<String>,
    pub matched_entity_type: Option<String>,
    pub matched_entity_id: Option<Id>,
    #[serde(default)]
    pub is_matched: bool,
    pub import_batch: Option<String>,
}

impl BankTransactionInput {
    pub fn into_new(self) -> NewBankTransaction {
        NewBankTransaction {
            account_id: self.account_id.trim().to_string(),
            transaction_date: self.transaction_date,
            amount: self.amount,
            description: trimmed(self.description),
            reference: trimmed(self.reference),
            kind: self.kind,
            category: trimmed(self.category),
            matched_entity_type: self.matched_entity_type,
            matched_entity_id: self.matched_entity_id,
            is_matched: self.is_matched,
            import_batch: self.import_batch,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ActivityInput {
    pub user_id: Option<Id>,
    #[validate(length(min = 1, message = "is required"))]
    pub action: String,
    #[validate(length(min = 1, message = "is required"))]
    pub resource_type: String,
    pub resource_id: Option<Id>,
    pub timestamp: Option<DateTime<Utc>>,
    pub details: Option<String>,
    /// Free-form; stored as its JSON text.
    pub metadata: Option<serde_json::Value>,
}

impl ActivityInput {
    pub fn into_new(self, default_user: Id) -> NewActivity {
        NewActivity {
            user_id: self.user_id.unwrap_or(default_user),
            action: self.action,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            timestamp: self.timestamp,
            details: self.details,
            metadata: self.metadata.map(|m| m.to_string()),
        }
    }
}
