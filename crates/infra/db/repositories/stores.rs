use anyhow::Result;
use async_trait::async_trait;
use diesel::{OptionalExtension, RunQueryDsl, prelude::*};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain;
use crate::infra::db::postgres::{postgres_connection::PgPoolSquad, schema::stores};
use domain::{entities::stores::StoreEntity, repositories::stores::StoreRepository};

pub struct StorePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl StorePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl StoreRepository for StorePostgres {
    async fn find_by_id(&self, store_id: Uuid) -> Result<Option<StoreEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let store = stores::table
            .filter(stores::id.eq(store_id))
            .select(StoreEntity::as_select())
            .first::<StoreEntity>(&mut conn)
            .optional()?;

        Ok(store)
    }
}
