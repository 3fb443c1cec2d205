pub mod billing_periods;
pub mod subscription_search;
pub mod subscriptions;
