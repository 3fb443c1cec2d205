use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::invoices;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = invoices)]
pub struct InvoiceEntity {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub store_id: Uuid,
    pub plan_id: Uuid,
    pub number: String,
    pub amount_minor: i32,
    pub currency: String,
    pub status: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub due_date: NaiveDate,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = invoices)]
pub struct InsertInvoiceEntity {
    pub subscription_id: Uuid,
    pub store_id: Uuid,
    pub plan_id: Uuid,
    pub number: String,
    pub amount_minor: i32,
    pub currency: String,
    pub status: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IssueInvoiceOutcome {
    Issued(InvoiceEntity),
    /// Number of the open invoice already covering part of the period.
    AlreadyIssued(String),
    /// Status the subscription had when its row was locked.
    SubscriptionNotBillable(String),
}
