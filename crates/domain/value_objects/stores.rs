use serde::Serialize;
use uuid::Uuid;

use crate::domain::entities::stores::StoreEntity;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StoreDto {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

impl From<StoreEntity> for StoreDto {
    fn from(value: StoreEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            email: value.email,
            phone: value.phone,
        }
    }
}
