//! Invoice billing rules.
//!
//! - [`period`] - which monthly invoice a purchase belongs to, and the
//!   closing/due dates of that invoice
//! - [`status`] - the explicit invoice state machine
//! - [`payment`] - preconditions for applying a payment against an invoice

pub mod error;
pub mod payment;
pub mod period;
pub mod status;

pub use error::BillingError;
pub use payment::{PaymentBreakdown, validate_payment};
pub use period::BillingPeriod;
pub use status::InvoiceStatus;
