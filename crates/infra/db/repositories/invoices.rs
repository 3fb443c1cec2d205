use anyhow::Result;
use async_trait::async_trait;
use diesel::{
    OptionalExtension, RunQueryDsl, insert_into,
    prelude::*,
    result::{DatabaseErrorKind, Error as DieselError},
    update,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{invoices, subscriptions},
    },
};
use domain::{
    entities::{
        invoices::{InsertInvoiceEntity, InvoiceEntity, IssueInvoiceOutcome},
        subscriptions::UpdateSubscriptionPeriodEntity,
    },
    repositories::invoices::InvoiceRepository,
    value_objects::enums::{
        invoice_statuses::InvoiceStatus, subscription_statuses::SubscriptionStatus,
    },
};

/// Partial unique index over non-failed invoices of a period.
const OPEN_INVOICE_PER_PERIOD: &str = "invoices_one_open_per_period";

pub struct InvoicePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl InvoicePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl InvoiceRepository for InvoicePostgres {
    async fn issue_invoice(
        &self,
        invoice: InsertInvoiceEntity,
        period: UpdateSubscriptionPeriodEntity,
    ) -> Result<IssueInvoiceOutcome> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let subscription_id = invoice.subscription_id;

        let result = conn.transaction::<IssueInvoiceOutcome, DieselError, _>(|conn| {
            // Concurrent issuers of the same subscription queue on this lock.
            let status = subscriptions::table
                .find(subscription_id)
                .select(subscriptions::status)
                .for_update()
                .first::<String>(conn)?;

            if status == SubscriptionStatus::Canceled.as_str()
                || status == SubscriptionStatus::Suspended.as_str()
            {
                return Ok(IssueInvoiceOutcome::SubscriptionNotBillable(status));
            }

            let overlapping = invoices::table
                .filter(invoices::subscription_id.eq(subscription_id))
                .filter(invoices::status.ne(InvoiceStatus::Failed.as_str()))
                .filter(invoices::period_start.lt(invoice.period_end))
                .filter(invoices::period_end.gt(invoice.period_start))
                .order(invoices::created_at.desc())
                .select(invoices::number)
                .first::<String>(conn)
                .optional()?;

            if let Some(number) = overlapping {
                return Ok(IssueInvoiceOutcome::AlreadyIssued(number));
            }

            let created = insert_into(invoices::table)
                .values(&invoice)
                .returning(InvoiceEntity::as_returning())
                .get_result::<InvoiceEntity>(conn)?;

            update(subscriptions::table.find(subscription_id))
                .set(&period)
                .execute(conn)?;

            Ok(IssueInvoiceOutcome::Issued(created))
        });

        match result {
            Ok(outcome) => Ok(outcome),
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info))
                if info.constraint_name() == Some(OPEN_INVOICE_PER_PERIOD) =>
            {
                let number = open_invoice_number(&mut conn, subscription_id, &invoice)?;
                Ok(IssueInvoiceOutcome::AlreadyIssued(number))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn list_by_subscription(&self, subscription_id: Uuid) -> Result<Vec<InvoiceEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rows = invoices::table
            .filter(invoices::subscription_id.eq(subscription_id))
            .order((invoices::created_at.desc(), invoices::due_date.desc()))
            .select(InvoiceEntity::as_select())
            .load::<InvoiceEntity>(&mut conn)?;

        Ok(rows)
    }
}

fn open_invoice_number(
    conn: &mut PgConnection,
    subscription_id: Uuid,
    invoice: &InsertInvoiceEntity,
) -> Result<String> {
    let number = invoices::table
        .filter(invoices::subscription_id.eq(subscription_id))
        .filter(invoices::period_start.eq(invoice.period_start))
        .filter(invoices::status.ne(InvoiceStatus::Failed.as_str()))
        .select(invoices::number)
        .first::<String>(conn)?;

    Ok(number)
}
