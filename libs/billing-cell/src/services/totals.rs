use chrono::NaiveDate;

use crate::models::{BillingError, InvoiceItem, InvoiceStatus, InvoiceTotals};

/// Half-away-from-zero rounding to cents.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn compute_totals(items: &[InvoiceItem], discount: f64, tax_rate: f64) -> Result<InvoiceTotals, BillingError> {
    let subtotal = round2(
        items
            .iter()
            .map(|item| f64::from(item.quantity) * item.unit_price)
            .sum(),
    );
    let discount = round2(discount);
    if discount > subtotal {
        return Err(BillingError::DiscountExceedsSubtotal { discount, subtotal });
    }

    let tax_amount = round2((subtotal - discount) * tax_rate);
    Ok(InvoiceTotals {
        subtotal,
        discount_amount: discount,
        tax_rate,
        tax_amount,
        total: round2(subtotal - discount + tax_amount),
    })
}

pub fn balance(total: f64, amount_paid: f64) -> f64 {
    round2(total - amount_paid)
}

/// Status once a payment has brought the balance to `balance`.
pub fn status_after_payment(balance: f64) -> InvoiceStatus {
    if balance <= 0.0 {
        InvoiceStatus::Paid
    } else {
        InvoiceStatus::PartiallyPaid
    }
}

/// `INV-YYYYMMDD-NNNN`, where `sequence` is 1-based within the day.
pub fn invoice_number(date: NaiveDate, sequence: usize) -> String {
    format!("INV-{}-{:04}", date.format("%Y%m%d"), sequence)
}
