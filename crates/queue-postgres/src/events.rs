use async_trait::async_trait;
use chrono::Utc;
use queue_core::{EventRecord, EventStorage};
use sea_orm::ActiveValue::Set;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::codec;
use crate::entity::event::{ActiveModel, Column, Entity, Model};

/// `EventStorage` backed by a `queue_event_records` table.
pub struct PgEventStorage {
    db: DatabaseConnection,
}

impl PgEventStorage {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl From<&EventRecord> for ActiveModel {
    fn from(record: &EventRecord) -> Self {
        ActiveModel {
            id: Set(record.id),
            subscriber_id: Set(codec::encode(record.subscriber_id)),
            event_type: Set(record.event_type.clone()),
            event: Set(record.event.clone()),
            expire_on: Set(record.expire_on.into()),
            is_complete: Set(record.is_complete),
        }
    }
}

impl From<Model> for EventRecord {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            subscriber_id: codec::decode(&model.subscriber_id),
            event_type: model.event_type,
            event: model.event,
            expire_on: model.expire_on.into(),
            is_complete: model.is_complete,
        }
    }
}

#[async_trait]
impl EventStorage for PgEventStorage {
    type Error = DbErr;

    async fn store_event(&self, record: &EventRecord) -> Result<(), Self::Error> {
        let active: ActiveModel = record.into();
        Entity::insert(active).exec(&self.db).await?;
        Ok(())
    }

    async fn get_next_event(&self, subscriber_id: u128) -> Result<Option<EventRecord>, Self::Error> {
        let now = Utc::now();
        let model = Entity::find()
            .filter(Column::SubscriberId.eq(codec::encode(subscriber_id)))
            .filter(Column::IsComplete.eq(false))
            .filter(Column::ExpireOn.gte(now))
            .one(&self.db)
            .await?;

        Ok(model.map(EventRecord::from))
    }

    async fn mark_event_complete(&self, id: Uuid) -> Result<(), Self::Error> {
        Entity::update_many()
            .col_expr(Column::IsComplete, true.into())
            .filter(Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(())
    }
}
