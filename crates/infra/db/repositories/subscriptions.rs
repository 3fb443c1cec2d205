use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use diesel::{OptionalExtension, RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{plans, stores, subscriptions},
    },
};
use domain::{
    entities::{
        plans::PlanEntity,
        stores::StoreEntity,
        subscriptions::{
            InsertSubscriptionEntity, SubscriptionEntity, SubscriptionWithRelations,
            UpdateSubscriptionPlanEntity,
        },
    },
    repositories::subscriptions::SubscriptionRepository,
    value_objects::enums::subscription_statuses::SubscriptionStatus,
};

pub struct SubscriptionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SubscriptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl SubscriptionRepository for SubscriptionPostgres {
    async fn find_by_id(&self, subscription_id: Uuid) -> Result<Option<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let subscription = subscriptions::table
            .filter(subscriptions::id.eq(subscription_id))
            .select(SubscriptionEntity::as_select())
            .first::<SubscriptionEntity>(&mut conn)
            .optional()?;

        Ok(subscription)
    }

    async fn find_with_relations_by_id(
        &self,
        subscription_id: Uuid,
    ) -> Result<Option<SubscriptionWithRelations>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = subscriptions::table
            .inner_join(plans::table)
            .inner_join(stores::table)
            .filter(subscriptions::id.eq(subscription_id))
            .select((
                SubscriptionEntity::as_select(),
                PlanEntity::as_select(),
                StoreEntity::as_select(),
            ))
            .first::<(SubscriptionEntity, PlanEntity, StoreEntity)>(&mut conn)
            .optional()?;

        Ok(row.map(SubscriptionWithRelations::from))
    }

    async fn find_latest_by_store(&self, store_id: Uuid) -> Result<Option<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let subscription = subscriptions::table
            .filter(subscriptions::store_id.eq(store_id))
            .order(subscriptions::created_at.desc())
            .select(SubscriptionEntity::as_select())
            .first::<SubscriptionEntity>(&mut conn)
            .optional()?;

        Ok(subscription)
    }

    async fn list_with_relations(
        &self,
        status: Option<SubscriptionStatus>,
    ) -> Result<Vec<SubscriptionWithRelations>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let mut query = subscriptions::table
            .inner_join(plans::table)
            .inner_join(stores::table)
            .select((
                SubscriptionEntity::as_select(),
                PlanEntity::as_select(),
                StoreEntity::as_select(),
            ))
            .order(subscriptions::created_at.desc())
            .into_boxed();

        if let Some(status) = status {
            query = query.filter(subscriptions::status.eq(status.as_str()));
        }

        let rows = query.load::<(SubscriptionEntity, PlanEntity, StoreEntity)>(&mut conn)?;

        Ok(rows.into_iter().map(SubscriptionWithRelations::from).collect())
    }

    async fn create_subscription(&self, subscription: InsertSubscriptionEntity) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let subscription_id = insert_into(subscriptions::table)
            .values(&subscription)
            .returning(subscriptions::id)
            .get_result::<Uuid>(&mut conn)?;

        Ok(subscription_id)
    }

    async fn update_plan(
        &self,
        subscription_id: Uuid,
        changes: UpdateSubscriptionPlanEntity,
    ) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let affected = update(live_subscription(subscription_id))
            .set(&changes)
            .execute(&mut conn)?;

        Ok(affected > 0)
    }

    async fn mark_suspended(&self, subscription_id: Uuid) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let now = Utc::now();

        let affected = update(live_subscription(subscription_id))
            .set((
                subscriptions::status.eq(SubscriptionStatus::Suspended.as_str()),
                subscriptions::suspended_at.eq(Some(now)),
                subscriptions::updated_at.eq(now),
            ))
            .execute(&mut conn)?;

        Ok(affected > 0)
    }

    async fn mark_canceled(&self, subscription_id: Uuid) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let now = Utc::now();

        let affected = update(live_subscription(subscription_id))
            .set((
                subscriptions::status.eq(SubscriptionStatus::Canceled.as_str()),
                subscriptions::canceled_at.eq(Some(now)),
                subscriptions::next_invoice_date.eq::<Option<NaiveDate>>(None),
                subscriptions::updated_at.eq(now),
            ))
            .execute(&mut conn)?;

        Ok(affected > 0)
    }
}

/// The subscription row unless it has been cancelled.
fn live_subscription(
    subscription_id: Uuid,
) -> diesel::dsl::Filter<
    diesel::dsl::Filter<subscriptions::table, diesel::dsl::Eq<subscriptions::id, Uuid>>,
    diesel::dsl::NotEq<subscriptions::status, &'static str>,
> {
    subscriptions::table
        .filter(subscriptions::id.eq(subscription_id))
        .filter(subscriptions::status.ne(SubscriptionStatus::Canceled.as_str()))
}
