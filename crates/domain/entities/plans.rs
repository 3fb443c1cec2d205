use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::value_objects::enums::billing_cycles::BillingCycle;
use crate::infra::db::postgres::schema::plans;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = plans)]
pub struct PlanEntity {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub monthly_price_minor: i32,
    pub yearly_price_minor: Option<i32>,
    pub trial_days: i32,
    pub currency: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl PlanEntity {
    /// Price charged for one period of `cycle`. Plans without an explicit
    /// yearly price bill twelve monthly prices; `None` on overflow.
    pub fn price_for_cycle(&self, cycle: BillingCycle) -> Option<i32> {
        match cycle {
            BillingCycle::Monthly => Some(self.monthly_price_minor),
            BillingCycle::Yearly => match self.yearly_price_minor {
                Some(yearly) => Some(yearly),
                None => self.monthly_price_minor.checked_mul(12),
            },
        }
    }
}
