use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::entities::plans::PlanEntity;

#[automock]
#[async_trait]
pub trait PlanRepository {
    async fn find_active_by_slug(&self, slug: &str) -> Result<Option<PlanEntity>>;

    /// Ordered by ascending monthly price.
    async fn list_active_plans(&self) -> Result<Vec<PlanEntity>>;
}
