use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::{
    invoices::{InsertInvoiceEntity, InvoiceEntity, IssueInvoiceOutcome},
    subscriptions::UpdateSubscriptionPeriodEntity,
};

#[automock]
#[async_trait]
pub trait InvoiceRepository {
    /// Atomically inserts `invoice` and applies `period` to its subscription.
    /// Nothing is written when the subscription is suspended or cancelled, or
    /// when a non-failed invoice already overlaps the invoice period.
    async fn issue_invoice(
        &self,
        invoice: InsertInvoiceEntity,
        period: UpdateSubscriptionPeriodEntity,
    ) -> Result<IssueInvoiceOutcome>;

    /// Newest first.
    async fn list_by_subscription(&self, subscription_id: Uuid) -> Result<Vec<InvoiceEntity>>;
}
