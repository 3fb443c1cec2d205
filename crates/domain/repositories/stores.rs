use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::stores::StoreEntity;

#[automock]
#[async_trait]
pub trait StoreRepository {
    async fn find_by_id(&self, store_id: Uuid) -> Result<Option<StoreEntity>>;
}
