use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::subscriptions::{
    InsertSubscriptionEntity, SubscriptionEntity, SubscriptionWithRelations,
    UpdateSubscriptionPlanEntity,
};
use crate::domain::value_objects::enums::subscription_statuses::SubscriptionStatus;

#[automock]
#[async_trait]
pub trait SubscriptionRepository {
    async fn find_by_id(&self, subscription_id: Uuid) -> Result<Option<SubscriptionEntity>>;

    async fn find_with_relations_by_id(
        &self,
        subscription_id: Uuid,
    ) -> Result<Option<SubscriptionWithRelations>>;

    /// Most recently created subscription of the store, cancelled ones included.
    async fn find_latest_by_store(&self, store_id: Uuid) -> Result<Option<SubscriptionEntity>>;

    async fn list_with_relations(
        &self,
        status: Option<SubscriptionStatus>,
    ) -> Result<Vec<SubscriptionWithRelations>>;

    async fn create_subscription(&self, subscription: InsertSubscriptionEntity) -> Result<Uuid>;

    // The writes below skip cancelled rows and return whether a row changed.

    async fn update_plan(
        &self,
        subscription_id: Uuid,
        changes: UpdateSubscriptionPlanEntity,
    ) -> Result<bool>;

    async fn mark_suspended(&self, subscription_id: Uuid) -> Result<bool>;

    async fn mark_canceled(&self, subscription_id: Uuid) -> Result<bool>;
}
