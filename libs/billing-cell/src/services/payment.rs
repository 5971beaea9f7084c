use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{QueryBuilder, SupabaseClient};

use crate::models::{BillingError, Payment, PaymentReceipt, RecordPaymentRequest};
use crate::services::invoice::fetch_invoice;
use crate::services::totals::{balance, round2, status_after_payment};

const TABLE: &str = "payments";

/// Database function that applies the guarded invoice update and inserts
/// the payment row in one transaction.
pub const RECORD_PAYMENT_RPC: &str = "record_invoice_payment";

pub struct PaymentService {
    supabase: SupabaseClient,
}

impl PaymentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Apply a payment to an issued invoice. The invoice update and the
    /// payment row are written by one database function; the update is
    /// guarded on the status and paid amount it was computed from.
    pub async fn record_payment(
        &self,
        organization_id: Uuid,
        invoice_id: Uuid,
        received_by: Uuid,
        request: RecordPaymentRequest,
        auth_token: &str,
    ) -> Result<PaymentReceipt, BillingError> {
        let invoice = fetch_invoice(&self.supabase, organization_id, invoice_id, auth_token).await?;
        debug!("Recording payment of {} on invoice {}", request.amount, invoice.invoice_number);

        if !invoice.status.accepts_payment() {
            return Err(BillingError::NotPayable(invoice.status));
        }

        let amount = round2(request.amount);
        if amount > invoice.balance {
            warn!("Overpayment attempt on invoice {}: {} > {}", invoice.invoice_number, amount, invoice.balance);
            return Err(BillingError::Overpayment {
                amount,
                balance: invoice.balance,
            });
        }

        let amount_paid = round2(invoice.amount_paid + amount);
        let remaining = balance(invoice.total, amount_paid);
        let now = Utc::now();
        let args = json!({
            "invoice": {
                "id": invoice.id,
                "organization_id": organization_id,
                "expected_status": invoice.status,
                "expected_amount_paid": invoice.amount_paid,
                "amount_paid": amount_paid,
                "balance": remaining,
                "status": status_after_payment(remaining),
                "updated_at": now.to_rfc3339()
            },
            "payment": {
                "id": Uuid::new_v4(),
                "organization_id": organization_id,
                "invoice_id": invoice.id,
                "amount": amount,
                "method": request.method,
                "reference": request.reference,
                "paid_at": request.paid_at.unwrap_or(now).to_rfc3339(),
                "received_by": received_by,
                "created_at": now.to_rfc3339()
            }
        });

        // A null result means the guard matched no invoice row.
        let receipt: Option<PaymentReceipt> = self.supabase.rpc(RECORD_PAYMENT_RPC, args, auth_token).await?;
        let receipt = receipt.ok_or(BillingError::ConcurrentUpdate)?;

        info!(
            "Payment {} recorded on invoice {}, balance now {}",
            receipt.payment.id, receipt.invoice.invoice_number, receipt.invoice.balance
        );
        Ok(receipt)
    }

    pub async fn list_payments(
        &self,
        organization_id: Uuid,
        invoice_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Payment>, BillingError> {
        fetch_invoice(&self.supabase, organization_id, invoice_id, auth_token).await?;

        let query = QueryBuilder::new()
            .eq("organization_id", organization_id)
            .eq("invoice_id", invoice_id)
            .order("paid_at", true);

        Ok(self.supabase.select(TABLE, &query, auth_token).await?)
    }
}
