pub mod billing_cycles;
pub mod invoice_statuses;
pub mod subscription_statuses;
