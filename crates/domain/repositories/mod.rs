pub mod invoices;
pub mod plans;
pub mod stores;
pub mod subscriptions;
