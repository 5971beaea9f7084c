use chrono::{FixedOffset, Utc};
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use appointment_cell::models::Appointment;
use appointment_cell::services::availability::{clinic_offset, local_day_bounds};
use shared_config::AppConfig;
use shared_database::{Patch, QueryBuilder, SupabaseClient};
use shared_models::response::Pagination;

use crate::models::{
    BillingError, CreateInvoiceRequest, Invoice, InvoiceListQuery, InvoiceStatus, UpdateInvoiceRequest,
};
use crate::services::totals::{balance, compute_totals, invoice_number};

const TABLE: &str = "invoices";

pub(crate) async fn fetch_invoice(
    supabase: &SupabaseClient,
    organization_id: Uuid,
    invoice_id: Uuid,
    auth_token: &str,
) -> Result<Invoice, BillingError> {
    let query = QueryBuilder::new()
        .eq("id", invoice_id)
        .eq("organization_id", organization_id);

    supabase
        .select_one(TABLE, query, auth_token)
        .await?
        .ok_or(BillingError::InvoiceNotFound)
}

pub struct InvoiceService {
    supabase: SupabaseClient,
    default_tax_rate: f64,
    offset: FixedOffset,
}

impl InvoiceService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            default_tax_rate: config.default_tax_rate,
            offset: clinic_offset(&config.default_timezone),
        }
    }

    pub async fn create_invoice(
        &self,
        organization_id: Uuid,
        created_by: Uuid,
        request: CreateInvoiceRequest,
        auth_token: &str,
    ) -> Result<Invoice, BillingError> {
        debug!("Creating invoice for patient {} at clinic {}", request.patient_id, request.clinic_id);

        self.ensure_exists("clinics", "Clinic", organization_id, request.clinic_id, auth_token)
            .await?;
        self.ensure_exists("patients", "Patient", organization_id, request.patient_id, auth_token)
            .await?;
        if let Some(appointment_id) = request.appointment_id {
            let appointment: Appointment = self
                .supabase
                .select_one(
                    "appointments",
                    QueryBuilder::new()
                        .eq("id", appointment_id)
                        .eq("organization_id", organization_id),
                    auth_token,
                )
                .await?
                .ok_or(BillingError::RelatedNotFound("Appointment"))?;
            if appointment.patient_id != request.patient_id {
                return Err(BillingError::AppointmentMismatch);
            }
        }

        let totals = compute_totals(
            &request.items,
            request.discount_amount.unwrap_or(0.0),
            request.tax_rate.unwrap_or(self.default_tax_rate),
        )?;
        let number = self.next_invoice_number(organization_id, auth_token).await?;

        let now = Utc::now().to_rfc3339();
        let invoice_data = json!({
            "id": Uuid::new_v4(),
            "organization_id": organization_id,
            "clinic_id": request.clinic_id,
            "patient_id": request.patient_id,
            "appointment_id": request.appointment_id,
            "invoice_number": number,
            "items": request.items,
            "subtotal": totals.subtotal,
            "discount_amount": totals.discount_amount,
            "tax_rate": totals.tax_rate,
            "tax_amount": totals.tax_amount,
            "total": totals.total,
            "amount_paid": 0.0,
            "balance": totals.total,
            "status": InvoiceStatus::Draft,
            "issued_at": null,
            "due_date": request.due_date.map(|d| d.format("%Y-%m-%d").to_string()),
            "notes": request.notes,
            "created_by": created_by,
            "created_at": now,
            "updated_at": now
        });

        let invoice: Invoice = self.supabase.insert(TABLE, invoice_data, auth_token).await?;
        info!("Invoice {} created ({})", invoice.invoice_number, invoice.id);
        Ok(invoice)
    }

    pub async fn get_invoice(
        &self,
        organization_id: Uuid,
        invoice_id: Uuid,
        auth_token: &str,
    ) -> Result<Invoice, BillingError> {
        fetch_invoice(&self.supabase, organization_id, invoice_id, auth_token).await
    }

    pub async fn list_invoices(
        &self,
        organization_id: Uuid,
        query: InvoiceListQuery,
        auth_token: &str,
    ) -> Result<(Vec<Invoice>, Pagination), BillingError> {
        let page = Pagination::from_query(query.limit, query.offset);

        let mut filter = QueryBuilder::new().eq("organization_id", organization_id);
        if let Some(patient_id) = query.patient_id {
            filter = filter.eq("patient_id", patient_id);
        }
        if let Some(clinic_id) = query.clinic_id {
            filter = filter.eq("clinic_id", clinic_id);
        }
        if let Some(status) = query.status {
            filter = filter.eq("status", status);
        }
        let filter = filter
            .order("created_at", false)
            .limit(page.limit)
            .offset(page.offset);

        let invoices = self.supabase.select(TABLE, &filter, auth_token).await?;
        Ok((invoices, page))
    }

    /// Replace items or amounts of a draft and recompute its totals.
    pub async fn update_invoice(
        &self,
        organization_id: Uuid,
        invoice_id: Uuid,
        request: UpdateInvoiceRequest,
        auth_token: &str,
    ) -> Result<Invoice, BillingError> {
        let invoice = self.get_invoice(organization_id, invoice_id, auth_token).await?;
        if invoice.status != InvoiceStatus::Draft {
            return Err(BillingError::NotDraft(invoice.status));
        }

        let items = request.items.unwrap_or(invoice.items);
        let totals = compute_totals(
            &items,
            request.discount_amount.unwrap_or(invoice.discount_amount),
            request.tax_rate.unwrap_or(invoice.tax_rate),
        )?;

        let patch = Patch::new()
            .set("items", items)
            .set("subtotal", totals.subtotal)
            .set("discount_amount", totals.discount_amount)
            .set("tax_rate", totals.tax_rate)
            .set("tax_amount", totals.tax_amount)
            .set("total", totals.total)
            .set("balance", balance(totals.total, invoice.amount_paid))
            .set_opt("due_date", request.due_date.map(|d| d.format("%Y-%m-%d").to_string()))
            .set_opt("notes", request.notes);

        self.patch_in_status(organization_id, invoice_id, InvoiceStatus::Draft, patch, auth_token)
            .await
    }

    pub async fn issue_invoice(
        &self,
        organization_id: Uuid,
        invoice_id: Uuid,
        auth_token: &str,
    ) -> Result<Invoice, BillingError> {
        let invoice = self.get_invoice(organization_id, invoice_id, auth_token).await?;
        if invoice.status != InvoiceStatus::Draft {
            return Err(BillingError::NotDraft(invoice.status));
        }

        let patch = Patch::new()
            .set("status", InvoiceStatus::Issued)
            .set("issued_at", Utc::now().to_rfc3339());

        let issued = self
            .patch_in_status(organization_id, invoice_id, InvoiceStatus::Draft, patch, auth_token)
            .await?;
        info!("Invoice {} issued", issued.invoice_number);
        Ok(issued)
    }

    pub async fn cancel_invoice(
        &self,
        organization_id: Uuid,
        invoice_id: Uuid,
        auth_token: &str,
    ) -> Result<Invoice, BillingError> {
        let invoice = self.get_invoice(organization_id, invoice_id, auth_token).await?;
        if invoice.status == InvoiceStatus::Cancelled {
            return Err(BillingError::AlreadyCancelled);
        }
        if invoice.amount_paid > 0.0 {
            warn!("Refusing to cancel invoice {} with payments", invoice.invoice_number);
            return Err(BillingError::HasPayments);
        }

        let patch = Patch::new().set("status", InvoiceStatus::Cancelled);
        self.patch_in_status(organization_id, invoice_id, invoice.status, patch, auth_token)
            .await
    }

    /// 1 + the number of invoices the organization created on the local day.
    async fn next_invoice_number(&self, organization_id: Uuid, auth_token: &str) -> Result<String, BillingError> {
        let today = Utc::now().with_timezone(&self.offset).date_naive();
        let (day_start, day_end) = local_day_bounds(today, self.offset);

        let query = QueryBuilder::new()
            .eq("organization_id", organization_id)
            .gte("created_at", day_start.to_rfc3339())
            .lt("created_at", day_end.to_rfc3339());
        let issued_today = self.supabase.count(TABLE, query, auth_token).await?;

        Ok(invoice_number(today, issued_today + 1))
    }

    async fn patch_in_status(
        &self,
        organization_id: Uuid,
        invoice_id: Uuid,
        expected: InvoiceStatus,
        patch: Patch,
        auth_token: &str,
    ) -> Result<Invoice, BillingError> {
        let query = QueryBuilder::new()
            .eq("id", invoice_id)
            .eq("organization_id", organization_id)
            .eq("status", expected);

        self.supabase
            .update(TABLE, &query, patch.into_value(), auth_token)
            .await?
            .ok_or(BillingError::ConcurrentUpdate)
    }

    async fn ensure_exists(
        &self,
        table: &str,
        entity: &'static str,
        organization_id: Uuid,
        id: Uuid,
        auth_token: &str,
    ) -> Result<(), BillingError> {
        let query = QueryBuilder::new()
            .eq("id", id)
            .eq("organization_id", organization_id);

        if self.supabase.exists(table, query, auth_token).await? {
            Ok(())
        } else {
            Err(BillingError::RelatedNotFound(entity))
        }
    }
}
