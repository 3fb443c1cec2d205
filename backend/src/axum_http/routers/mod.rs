pub mod admin_subscriptions;
