pub mod enums;
pub mod invoices;
pub mod money;
pub mod plans;
pub mod stores;
pub mod subscriptions;
