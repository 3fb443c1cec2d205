use anyhow::{Error, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::entities::subscriptions::SubscriptionWithRelations;
use crate::domain::value_objects::enums::{
    billing_cycles::BillingCycle, subscription_statuses::SubscriptionStatus,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriptionFilters {
    pub status: Option<SubscriptionStatus>,
}

/// Subscription as rendered by the admin pages: joined with plan and store.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubscriptionDetailDto {
    pub id: Uuid,
    pub store_id: Uuid,
    pub store_name: String,
    pub plan_id: Uuid,
    pub plan_slug: String,
    pub plan_name: String,
    pub status: SubscriptionStatus,
    pub billing_cycle: BillingCycle,
    pub trial_end: Option<NaiveDate>,
    pub current_period_start: NaiveDate,
    pub current_period_end: NaiveDate,
    pub next_invoice_date: Option<NaiveDate>,
    pub price_minor: Option<i32>,
    pub currency: String,
    pub canceled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionWithRelations> for SubscriptionDetailDto {
    type Error = Error;

    fn try_from(value: SubscriptionWithRelations) -> Result<Self, Self::Error> {
        let SubscriptionWithRelations {
            subscription,
            plan,
            store,
        } = value;

        let status = SubscriptionStatus::from_str(&subscription.status).ok_or_else(|| {
            anyhow!(
                "subscription {} has unknown status {}",
                subscription.id,
                subscription.status
            )
        })?;
        let billing_cycle = BillingCycle::from_str(&subscription.billing_cycle).ok_or_else(|| {
            anyhow!(
                "subscription {} has unknown billing cycle {}",
                subscription.id,
                subscription.billing_cycle
            )
        })?;

        Ok(Self {
            id: subscription.id,
            store_id: subscription.store_id,
            store_name: store.name,
            plan_id: plan.id,
            price_minor: plan.price_for_cycle(billing_cycle),
            plan_slug: plan.slug,
            plan_name: plan.name,
            status,
            billing_cycle,
            trial_end: subscription.trial_end,
            current_period_start: subscription.current_period_start,
            current_period_end: subscription.current_period_end,
            next_invoice_date: subscription.next_invoice_date,
            currency: plan.currency,
            canceled_at: subscription.canceled_at,
            created_at: subscription.created_at,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignPlanOutcome {
    pub subscription_id: Uuid,
    /// `false` when an existing subscription changed plan.
    pub created: bool,
}
