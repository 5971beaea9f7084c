use serde::{Deserialize, Serialize};

/// A user-facing message in both supported languages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedMessage {
    pub ar: String,
    pub en: String,
}

impl LocalizedMessage {
    pub fn new(ar: impl Into<String>, en: impl Into<String>) -> Self {
        Self {
            ar: ar.into(),
            en: en.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKey {
    Created,
    Updated,
    Deleted,
    Fetched,
    NotFound,
    Conflict,
    ValidationFailed,
    Unauthorized,
    Forbidden,
    BadRequest,
    InternalError,
    ServiceUnavailable,
    AppointmentBooked,
    AppointmentRescheduled,
    AppointmentStatusChanged,
    SlotUnavailable,
    ReportFinalized,
    InvoiceIssued,
    PaymentRecorded,
    OnboardingCompleted,
    OnboardingValidated,
}

impl MessageKey {
    pub fn message(self) -> LocalizedMessage {
        let (ar, en) = match self {
            MessageKey::Created => ("تم الإنشاء بنجاح", "Created successfully"),
            MessageKey::Updated => ("تم التحديث بنجاح", "Updated successfully"),
            MessageKey::Deleted => ("تم الحذف بنجاح", "Deleted successfully"),
            MessageKey::Fetched => ("تم جلب البيانات بنجاح", "Fetched successfully"),
            MessageKey::NotFound => ("العنصر غير موجود", "Resource not found"),
            MessageKey::Conflict => ("يتعارض الطلب مع بيانات موجودة", "Request conflicts with existing data"),
            MessageKey::ValidationFailed => ("البيانات المدخلة غير صالحة", "Validation failed"),
            MessageKey::Unauthorized => ("غير مصرح بالدخول", "Unauthorized"),
            MessageKey::Forbidden => ("ليس لديك صلاحية لهذا الإجراء", "You are not allowed to perform this action"),
            MessageKey::BadRequest => ("طلب غير صالح", "Bad request"),
            MessageKey::InternalError => ("حدث خطأ داخلي في الخادم", "Internal server error"),
            MessageKey::ServiceUnavailable => ("الخدمة الخارجية غير متاحة", "Upstream service unavailable"),
            MessageKey::AppointmentBooked => ("تم حجز الموعد بنجاح", "Appointment booked successfully"),
            MessageKey::AppointmentRescheduled => ("تمت إعادة جدولة الموعد", "Appointment rescheduled"),
            MessageKey::AppointmentStatusChanged => ("تم تحديث حالة الموعد", "Appointment status updated"),
            MessageKey::SlotUnavailable => ("الموعد المطلوب غير متاح", "Requested time slot is not available"),
            MessageKey::ReportFinalized => ("تم اعتماد التقرير الطبي", "Medical report finalized"),
            MessageKey::InvoiceIssued => ("تم إصدار الفاتورة", "Invoice issued"),
            MessageKey::PaymentRecorded => ("تم تسجيل الدفعة", "Payment recorded"),
            MessageKey::OnboardingCompleted => ("تم تسجيل المنشأة بنجاح", "Onboarding completed successfully"),
            MessageKey::OnboardingValidated => ("بيانات التسجيل صالحة", "Onboarding payload is valid"),
        };
        LocalizedMessage::new(ar, en)
    }
}

impl From<MessageKey> for LocalizedMessage {
    fn from(key: MessageKey) -> Self {
        key.message()
    }
}
