pub mod invoice;
pub mod payment;
pub mod totals;

pub use invoice::InvoiceService;
pub use payment::PaymentService;
