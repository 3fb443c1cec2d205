use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::entities::{plans::PlanEntity, stores::StoreEntity};
use crate::infra::db::postgres::schema::subscriptions;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = subscriptions)]
pub struct SubscriptionEntity {
    pub id: Uuid,
    pub store_id: Uuid,
    pub plan_id: Uuid,
    pub status: String,
    pub billing_cycle: String,
    pub trial_end: Option<NaiveDate>,
    pub current_period_start: NaiveDate,
    pub current_period_end: NaiveDate,
    pub billing_anchor: NaiveDate,
    pub next_invoice_date: Option<NaiveDate>,
    pub suspended_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = subscriptions)]
pub struct InsertSubscriptionEntity {
    pub store_id: Uuid,
    pub plan_id: Uuid,
    pub status: String,
    pub billing_cycle: String,
    pub trial_end: Option<NaiveDate>,
    pub current_period_start: NaiveDate,
    pub current_period_end: NaiveDate,
    pub billing_anchor: NaiveDate,
    pub next_invoice_date: Option<NaiveDate>,
}

/// Full replacement of the plan-dependent columns when a plan is re-assigned.
/// `None` writes NULL.
#[derive(Debug, Clone, PartialEq, AsChangeset)]
#[diesel(table_name = subscriptions, treat_none_as_null = true)]
pub struct UpdateSubscriptionPlanEntity {
    pub plan_id: Uuid,
    pub status: String,
    pub billing_cycle: String,
    pub trial_end: Option<NaiveDate>,
    pub current_period_start: NaiveDate,
    pub current_period_end: NaiveDate,
    pub billing_anchor: NaiveDate,
    pub next_invoice_date: Option<NaiveDate>,
    pub suspended_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Written together with a newly issued invoice.
#[derive(Debug, Clone, PartialEq, AsChangeset)]
#[diesel(table_name = subscriptions, treat_none_as_null = true)]
pub struct UpdateSubscriptionPeriodEntity {
    pub status: String,
    pub current_period_start: NaiveDate,
    pub current_period_end: NaiveDate,
    pub next_invoice_date: Option<NaiveDate>,
    pub updated_at: DateTime<Utc>,
}

/// Subscription joined with the plan it is on and the store that owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionWithRelations {
    pub subscription: SubscriptionEntity,
    pub plan: PlanEntity,
    pub store: StoreEntity,
}

impl From<(SubscriptionEntity, PlanEntity, StoreEntity)> for SubscriptionWithRelations {
    fn from((subscription, plan, store): (SubscriptionEntity, PlanEntity, StoreEntity)) -> Self {
        Self {
            subscription,
            plan,
            store,
        }
    }
}
