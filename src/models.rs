// models.rs
// Domain records shared by the store backends, the planner and the HTTP layer.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type Id = i64;

/// Which side of the business a record belongs to.
///
/// Payables hold suppliers, invoices and invoice installments; receivables
/// hold customers, receivables and receivable installments. Both books share
/// the same record shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Book {
    Payables,
    Receivables,
}

impl Book {
    pub fn as_str(&self) -> &'static str {
        match self {
            Book::Payables => "payables",
            Book::Receivables => "receivables",
        }
    }

    pub fn counterparty_kind(&self) -> &'static str {
        match self {
            Book::Payables => "supplier",
            Book::Receivables => "customer",
        }
    }

    pub fn bill_kind(&self) -> &'static str {
        match self {
            Book::Payables => "invoice",
            Book::Receivables => "receivable",
        }
    }

    pub fn installment_kind(&self) -> &'static str {
        match self {
            Book::Payables => "installment",
            Book::Receivables => "receivable_installment",
        }
    }

    /// Wire name of a bill's counterparty reference.
    pub fn counterparty_field(&self) -> &'static str {
        match self {
            Book::Payables => "supplierId",
            Book::Receivables => "customerId",
        }
    }

    /// Wire name of an installment's parent reference.
    pub fn parent_field(&self) -> &'static str {
        match self {
            Book::Payables => "invoiceId",
            Book::Receivables => "receivableId",
        }
    }

    // Labels used in activity details.
    pub fn counterparty_label(&self) -> &'static str {
        match self {
            Book::Payables => "fournisseur",
            Book::Receivables => "client",
        }
    }

    pub fn bill_label(&self) -> &'static str {
        match self {
            Book::Payables => "la facture",
            Book::Receivables => "la créance",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    Draft,
    #[default]
    Pending,
    Paid,
    Partial,
    Cancelled,
}

impl BillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillStatus::Draft => "draft",
            BillStatus::Pending => "pending",
            BillStatus::Paid => "paid",
            BillStatus::Partial => "partial",
            BillStatus::Cancelled => "cancelled",
        }
    }

    /// Pending and partial bills still carry an outstanding balance.
    pub fn is_open(&self) -> bool {
        matches!(self, BillStatus::Pending | BillStatus::Partial)
    }
}

impl FromStr for BillStatus {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "draft" => Ok(BillStatus::Draft),
            "pending" => Ok(BillStatus::Pending),
            "paid" => Ok(BillStatus::Paid),
            "partial" => Ok(BillStatus::Partial),
            "cancelled" => Ok(BillStatus::Cancelled),
            other => Err(format!("unknown bill status {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Check,
    #[default]
    Transfer,
    Draft,
    Cash,
    Card,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Check => "check",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Draft => "draft",
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InstallmentStatus {
    #[default]
    Pending,
    Paid,
}

impl InstallmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallmentStatus::Pending => "pending",
            InstallmentStatus::Paid => "paid",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BankTransactionType {
    Credit,
    Debit,
}

impl BankTransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BankTransactionType::Credit => "credit",
            BankTransactionType::Debit => "debit",
        }
    }
}

impl FromStr for BankTransactionType {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "credit" => Ok(BankTransactionType::Credit),
            "debit" => Ok(BankTransactionType::Debit),
            other => Err(format!("unknown transaction type {other}")),
        }
    }
}

/// Supplier (payables) or customer (receivables).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Counterparty {
    pub id: Id,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub contact_person: Option<String>,
    pub category: Option<String>,
    pub tax_id: Option<String>,
    pub bank_info: Option<String>,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCounterparty {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tax_id: Option<String>,
    #[serde(default)]
    pub bank_info: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewCounterparty {
    pub fn into_record(self, id: Id, now: DateTime<Utc>) -> Counterparty {
        Counterparty {
            id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            address: self.address,
            contact_person: self.contact_person,
            category: self.category,
            tax_id: self.tax_id,
            bank_info: self.bank_info,
            notes: self.notes,
            created_at: Some(now),
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterpartyPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_person: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CounterpartyPatch {
    pub fn apply_to(self, target: &mut Counterparty, now: DateTime<Utc>) {
        if let Some(v) = self.name {
            target.name = v;
        }
        if self.email.is_some() {
            target.email = self.email;
        }
        if self.phone.is_some() {
            target.phone = self.phone;
        }
        if self.address.is_some() {
            target.address = self.address;
        }
        if self.contact_person.is_some() {
            target.contact_person = self.contact_person;
        }
        if self.category.is_some() {
            target.category = self.category;
        }
        if self.tax_id.is_some() {
            target.tax_id = self.tax_id;
        }
        if self.bank_info.is_some() {
            target.bank_info = self.bank_info;
        }
        if self.notes.is_some() {
            target.notes = self.notes;
        }
        target.updated_at = Some(now);
    }
}

/// Invoice (payables) or receivable (receivables).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: Id,
    pub number: String,
    pub counterparty_id: Id,
    pub amount: Decimal,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: BillStatus,
    pub description: Option<String>,
    pub category: Option<String>,
    pub reference: Option<String>,
    pub attachment_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewBill {
    pub number: String,
    pub counterparty_id: Id,
    pub amount: Decimal,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: BillStatus,
    pub description: Option<String>,
    pub category: Option<String>,
    pub reference: Option<String>,
    pub attachment_url: Option<String>,
}

impl NewBill {
    pub fn into_record(self, id: Id, now: DateTime<Utc>) -> Bill {
        Bill {
            id,
            number: self.number,
            counterparty_id: self.counterparty_id,
            amount: self.amount,
            issue_date: self.issue_date,
            due_date: self.due_date,
            status: self.status,
            description: self.description,
            category: self.category,
            reference: self.reference,
            attachment_url: self.attachment_url,
            created_at: Some(now),
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterparty_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<BillStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_url: Option<String>,
}

impl BillPatch {
    pub fn status(status: BillStatus) -> Self {
        BillPatch {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn apply_to(self, target: &mut Bill, now: DateTime<Utc>) {
        if let Some(v) = self.number {
            target.number = v;
        }
        if let Some(v) = self.counterparty_id {
            target.counterparty_id = v;
        }
        if let Some(v) = self.amount {
            target.amount = v;
        }
        if let Some(v) = self.issue_date {
            target.issue_date = v;
        }
        if let Some(v) = self.due_date {
            target.due_date = v;
        }
        if let Some(v) = self.status {
            target.status = v;
        }
        if self.description.is_some() {
            target.description = self.description;
        }
        if self.category.is_some() {
            target.category = self.category;
        }
        if self.reference.is_some() {
            target.reference = self.reference;
        }
        if self.attachment_url.is_some() {
            target.attachment_url = self.attachment_url;
        }
        target.updated_at = Some(now);
    }
}

/// One scheduled payment of a plan. `parent_id` points at an invoice or a
/// receivable depending on the book the installment is stored in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Installment {
    pub id: Id,
    pub parent_id: Id,
    pub installment_number: u32,
    pub amount: Decimal,
    pub percentage: Decimal,
    pub due_date: NaiveDate,
    pub payment_method: PaymentMethod,
    pub status: InstallmentStatus,
    pub payment_date: Option<DateTime<Utc>>,
    pub reference: Option<String>,
    pub bank_transaction_id: Option<Id>,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Installment {
    pub fn is_pending(&self) -> bool {
        self.status == InstallmentStatus::Pending
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewInstallment {
    pub parent_id: Id,
    pub installment_number: u32,
    pub amount: Decimal,
    pub percentage: Decimal,
    pub due_date: NaiveDate,
    pub payment_method: PaymentMethod,
    pub status: InstallmentStatus,
    pub payment_date: Option<DateTime<Utc>>,
    pub reference: Option<String>,
    pub bank_transaction_id: Option<Id>,
    pub notes: Option<String>,
}

impl NewInstallment {
    pub fn into_record(self, id: Id, now: DateTime<Utc>) -> Installment {
        Installment {
            id,
            parent_id: self.parent_id,
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
            created_at: Some(now),
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallmentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installment_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<InstallmentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_transaction_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl InstallmentPatch {
    pub fn paid_at(when: DateTime<Utc>) -> Self {
        InstallmentPatch {
            status: Some(InstallmentStatus::Paid),
            payment_date: Some(when),
            ..Default::default()
        }
    }

    pub fn apply_to(self, target: &mut Installment, now: DateTime<Utc>) {
        if let Some(v) = self.installment_number {
            target.installment_number = v;
        }
        if let Some(v) = self.amount {
            target.amount = v;
        }
        if let Some(v) = self.percentage {
            target.percentage = v;
        }
        if let Some(v) = self.due_date {
            target.due_date = v;
        }
        if let Some(v) = self.payment_method {
            target.payment_method = v;
        }
        if let Some(v) = self.status {
            target.status = v;
        }
        if self.payment_date.is_some() {
            target.payment_date = self.payment_date;
        }
        if self.reference.is_some() {
            target.reference = self.reference;
        }
        if self.bank_transaction_id.is_some() {
            target.bank_transaction_id = self.bank_transaction_id;
        }
        if self.notes.is_some() {
            target.notes = self.notes;
        }
        target.updated_at = Some(now);
    }
}

/// Imported bank statement line. Match fields are stored as given; no
/// reconciliation happens here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BankTransaction {
    pub id: Id,
    pub account_id: String,
    pub transaction_date: NaiveDate,
    pub amount: Decimal,
    pub description: Option<String>,
    pub reference: Option<String>,
    #[serde(rename = "type")]
    pub kind: BankTransactionType,
    pub category: Option<String>,
    pub matched_entity_type: Option<String>,
    pub matched_entity_id: Option<Id>,
    pub is_matched: bool,
    pub import_batch: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewBankTransaction {
    pub account_id: String,
    pub transaction_date: NaiveDate,
    pub amount: Decimal,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub kind: BankTransactionType,
    pub category: Option<String>,
    pub matched_entity_type: Option<String>,
    pub matched_entity_id: Option<Id>,
    pub is_matched: bool,
    pub import_batch: Option<String>,
}

impl NewBankTransaction {
    pub fn into_record(self, id: Id, now: DateTime<Utc>) -> BankTransaction {
        BankTransaction {
            id,
            account_id: self.account_id,
            transaction_date: self.transaction_date,
            amount: self.amount,
            description: self.description,
            reference: self.reference,
            kind: self.kind,
            category: self.category,
            matched_entity_type: self.matched_entity_type,
            matched_entity_id: self.matched_entity_id,
            is_matched: self.is_matched,
            import_batch: self.import_batch,
            created_at: Some(now),
        }
    }
}

/// Append-only audit record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: Id,
    pub user_id: Id,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<Id>,
    pub timestamp: DateTime<Utc>,
    pub details: Option<String>,
    pub metadata: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewActivity {
    pub user_id: Id,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<Id>,
    pub timestamp: Option<DateTime<Utc>>,
    pub details: Option<String>,
    pub metadata: Option<String>,
}

impl NewActivity {
    pub fn into_record(self, id: Id, now: DateTime<Utc>) -> Activity {
        Activity {
            id,
            user_id: self.user_id,
            action: self.action,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            timestamp: self.timestamp.unwrap_or(now),
            details: self.details,
            metadata: self.metadata,
        }
    }
}

/// Calendar dates arrive either as `YYYY-MM-DD` or as a full ISO timestamp
/// from browser date pickers. Only the date part is kept.
pub mod iso_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, de::Error};

    pub fn parse(raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        let head = raw.get(..10).unwrap_or(raw);
        NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid date: {raw}")))
    }

    pub mod option {
        use chrono::NaiveDate;
        use serde::{Deserialize, Deserializer, de::Error};

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
        where
            D: Deserializer<'de>,
        {
            match Option::<String>::deserialize(deserializer)? {
                None => Ok(None),
                Some(raw) if raw.trim().is_empty() => Ok(None),
                Some(raw) => super::parse(&raw)
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("invalid date: {raw}"))),
            }
        }
    }
}
