use serde::Serialize;
use uuid::Uuid;

use crate::domain::entities::plans::PlanEntity;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlanDto {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub monthly_price_minor: i32,
    pub yearly_price_minor: Option<i32>,
    pub trial_days: i32,
    pub currency: String,
}

impl From<PlanEntity> for PlanDto {
    fn from(value: PlanEntity) -> Self {
        Self {
            id: value.id,
            slug: value.slug,
            name: value.name,
            monthly_price_minor: value.monthly_price_minor,
            yearly_price_minor: value.yearly_price_minor,
            trial_days: value.trial_days,
            currency: value.currency,
        }
    }
}
