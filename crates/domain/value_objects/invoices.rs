use anyhow::{Error, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::entities::invoices::InvoiceEntity;
use crate::domain::value_objects::enums::invoice_statuses::InvoiceStatus;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InvoiceDto {
    pub id: Uuid,
    pub number: String,
    pub amount_minor: i32,
    pub currency: String,
    pub status: InvoiceStatus,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub due_date: NaiveDate,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<InvoiceEntity> for InvoiceDto {
    type Error = Error;

    fn try_from(value: InvoiceEntity) -> Result<Self, Self::Error> {
        let status = InvoiceStatus::from_str(&value.status)
            .ok_or_else(|| anyhow!("invoice {} has unknown status {}", value.id, value.status))?;

        Ok(Self {
            id: value.id,
            number: value.number,
            amount_minor: value.amount_minor,
            currency: value.currency,
            status,
            period_start: value.period_start,
            period_end: value.period_end,
            due_date: value.due_date,
            paid_at: value.paid_at,
            created_at: value.created_at,
        })
    }
}

/// Result of a manual invoice generation.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GeneratedInvoice {
    pub number: String,
    pub amount_minor: i32,
    pub currency: String,
    pub due_date: NaiveDate,
}
