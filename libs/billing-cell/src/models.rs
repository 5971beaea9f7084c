use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::DatabaseError;
use shared_models::error::AppError;
use shared_utils::validation::{check_range, require_non_empty, Validate, ValidationErrors};

use crate::services::totals::round2;

// ==============================================================================
// INVOICES
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Issued,
    PartiallyPaid,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    pub fn accepts_payment(self) -> bool {
        matches!(self, InvoiceStatus::Issued | InvoiceStatus::PartiallyPaid)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvoiceStatus::Draft => write!(f, "draft"),
            InvoiceStatus::Issued => write!(f, "issued"),
            InvoiceStatus::PartiallyPaid => write!(f, "partially_paid"),
            InvoiceStatus::Paid => write!(f, "paid"),
            InvoiceStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub description: String,
    pub service_id: Option<Uuid>,
    pub quantity: i32,
    pub unit_price: f64,
}

impl Validate for InvoiceItem {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_non_empty(&mut errors, "description", &self.description);
        check_range(&mut errors, "quantity", self.quantity, 1, 10_000);
        if !self.unit_price.is_finite() || self.unit_price < 0.0 {
            errors.add("unit_price", "must be zero or more");
        }
        errors.into_result()
    }
}

/// Computed amounts of an invoice, all rounded to two decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub subtotal: f64,
    pub discount_amount: f64,
    pub tax_rate: f64,
    pub tax_amount: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub clinic_id: Uuid,
    pub patient_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub invoice_number: String,
    pub items: Vec<InvoiceItem>,
    pub subtotal: f64,
    pub discount_amount: f64,
    pub tax_rate: f64,
    pub tax_amount: f64,
    pub total: f64,
    pub amount_paid: f64,
    pub balance: f64,
    pub status: InvoiceStatus,
    pub issued_at: Option<DateTime<Utc>>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInvoiceRequest {
    pub clinic_id: Uuid,
    pub patient_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub items: Vec<InvoiceItem>,
    pub discount_amount: Option<f64>,
    /// Fraction, e.g. `0.15`; the configured default applies when absent.
    pub tax_rate: Option<f64>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl Validate for CreateInvoiceRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.items.is_empty() {
            errors.add("items", "at least one item is required");
        }
        check_items(&mut errors, &self.items);
        check_amounts(&mut errors, self.discount_amount, self.tax_rate);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateInvoiceRequest {
    pub items: Option<Vec<InvoiceItem>>,
    pub discount_amount: Option<f64>,
    pub tax_rate: Option<f64>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl Validate for UpdateInvoiceRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(items) = &self.items {
            if items.is_empty() {
                errors.add("items", "at least one item is required");
            }
            check_items(&mut errors, items);
        }
        check_amounts(&mut errors, self.discount_amount, self.tax_rate);
        errors.into_result()
    }
}

fn check_items(errors: &mut ValidationErrors, items: &[InvoiceItem]) {
    for (i, item) in items.iter().enumerate() {
        if let Err(e) = item.validate() {
            errors.merge(&format!("items[{}]", i), e);
        }
    }
}

fn check_amounts(errors: &mut ValidationErrors, discount: Option<f64>, tax_rate: Option<f64>) {
    if let Some(discount) = discount {
        if !discount.is_finite() || discount < 0.0 {
            errors.add("discount_amount", "must be zero or more");
        }
    }
    if let Some(rate) = tax_rate {
        check_range(errors, "tax_rate", rate, 0.0, 1.0);
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceListQuery {
    pub patient_id: Option<Uuid>,
    pub clinic_id: Option<Uuid>,
    pub status: Option<InvoiceStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// ==============================================================================
// PAYMENTS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Insurance,
    BankTransfer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub invoice_id: Uuid,
    pub amount: f64,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub paid_at: DateTime<Utc>,
    pub received_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPaymentRequest {
    pub amount: f64,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Validate for RecordPaymentRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if !self.amount.is_finite() || round2(self.amount) <= 0.0 {
            errors.add("amount", "must be at least 0.01");
        }
        if let Some(reference) = &self.reference {
            if reference.chars().count() > 100 {
                errors.add("reference", "must be at most 100 characters");
            }
        }
        errors.into_result()
    }
}

/// A recorded payment together with the invoice it settled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub invoice: Invoice,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("Invoice not found")]
    InvoiceNotFound,

    #[error("{0} not found")]
    RelatedNotFound(&'static str),

    #[error("Appointment belongs to a different patient")]
    AppointmentMismatch,

    #[error("Only draft invoices can be changed (invoice is {0})")]
    NotDraft(InvoiceStatus),

    #[error("Invoice does not accept payments while {0}")]
    NotPayable(InvoiceStatus),

    #[error("Payment of {amount:.2} exceeds the outstanding balance of {balance:.2}")]
    Overpayment { amount: f64, balance: f64 },

    #[error("Invoice has recorded payments and cannot be cancelled")]
    HasPayments,

    #[error("Invoice is already cancelled")]
    AlreadyCancelled,

    #[error("Discount of {discount:.2} exceeds the subtotal of {subtotal:.2}")]
    DiscountExceedsSubtotal { discount: f64, subtotal: f64 },

    #[error("Invoice was modified concurrently, retry the request")]
    ConcurrentUpdate,

    #[error("Validation error: {0}")]
    Validation(ValidationErrors),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<BillingError> for AppError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::InvoiceNotFound | BillingError::RelatedNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            BillingError::AppointmentMismatch => AppError::BadRequest(err.to_string()),
            BillingError::NotDraft(_)
            | BillingError::NotPayable(_)
            | BillingError::HasPayments
            | BillingError::AlreadyCancelled
            | BillingError::ConcurrentUpdate => AppError::Conflict(err.to_string()),
            BillingError::Overpayment { .. } => AppError::ValidationError(format!("amount: {}", err)),
            BillingError::DiscountExceedsSubtotal { .. } => {
                AppError::ValidationError(format!("discount_amount: {}", err))
            }
            BillingError::Validation(errors) => errors.into(),
            BillingError::Database(e) => e.into(),
        }
    }
}
