use async_trait::async_trait;
use chrono::{DateTime, Utc};
use queue_core::{JobRecord, JobStorage};
use sea_orm::ActiveValue::Set;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QuerySelect};
use uuid::Uuid;

use crate::codec;
use crate::entity::job::{ActiveModel, Column, Entity, Model};

/// `JobStorage` backed by a `queue_job_records` table, following the
/// same entity-plus-thin-wrapper shape as the domain repositories this
/// is grounded on.
pub struct PgJobStorage {
    db: DatabaseConnection,
}

impl PgJobStorage {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl From<&JobRecord> for ActiveModel {
    fn from(record: &JobRecord) -> Self {
        ActiveModel {
            tracking_id: Set(record.tracking_id),
            queue_id: Set(codec::encode(record.queue_id)),
            command: Set(record.command.clone()),
            execute_after: Set(record.execute_after.into()),
            expire_on: Set(record.expire_on.into()),
            is_complete: Set(record.is_complete),
            last_error: Set(None),
        }
    }
}

impl From<Model> for JobRecord {
    fn from(model: Model) -> Self {
        Self {
            tracking_id: model.tracking_id,
            queue_id: codec::decode(&model.queue_id),
            command: model.command,
            execute_after: model.execute_after.into(),
            expire_on: model.expire_on.into(),
            is_complete: model.is_complete,
        }
    }
}

#[async_trait]
impl JobStorage for PgJobStorage {
    type Error = DbErr;

    async fn store_job(&self, record: &JobRecord) -> Result<(), Self::Error> {
        let active: ActiveModel = record.into();
        Entity::insert(active).exec(&self.db).await?;
        Ok(())
    }

    async fn get_next_batch(
        &self,
        queue_id: u128,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<JobRecord>, Self::Error> {
        let models = Entity::find()
            .filter(Column::QueueId.eq(codec::encode(queue_id)))
            .filter(Column::IsComplete.eq(false))
            .filter(Column::ExecuteAfter.lte(now))
            .filter(Column::ExpireOn.gte(now))
            .limit(limit as u64)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(JobRecord::from).collect())
    }

    async fn mark_job_complete(&self, tracking_id: Uuid) -> Result<(), Self::Error> {
        Entity::update_many()
            .col_expr(Column::IsComplete, true.into())
            .filter(Column::TrackingId.eq(tracking_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn cancel_job(&self, tracking_id: Uuid) -> Result<(), Self::Error> {
        Entity::update_many()
            .col_expr(Column::IsComplete, true.into())
            .filter(Column::TrackingId.eq(tracking_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn on_handler_execution_failure(
        &self,
        tracking_id: Uuid,
        error: &str,
    ) -> Result<(), Self::Error> {
        Entity::update_many()
            .col_expr(Column::LastError, error.into())
            .filter(Column::TrackingId.eq(tracking_id))
            .exec(&self.db)
            .await?;
        tracing::debug!(%tracking_id, error, "recorded job execution failure, left pending for redispatch");
        Ok(())
    }
}
