use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(QueueJobRecords::Table)
                    .if_not_exists()
                    .col(pk_uuid(QueueJobRecords::TrackingId))
                    .col(ColumnDef::new(QueueJobRecords::QueueId).binary().not_null())
                    .col(
                        ColumnDef::new(QueueJobRecords::Command)
                            .json_binary()
                            .not_null(),
                    )
                    .col(timestamp_with_time_zone(QueueJobRecords::ExecuteAfter))
                    .col(timestamp_with_time_zone(QueueJobRecords::ExpireOn))
                    .col(boolean(QueueJobRecords::IsComplete).default(false))
                    .col(ColumnDef::new(QueueJobRecords::LastError).text().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_queue_job_records_due")
                    .table(QueueJobRecords::Table)
                    .col(QueueJobRecords::QueueId)
                    .col(QueueJobRecords::IsComplete)
                    .col(QueueJobRecords::ExecuteAfter)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(QueueEventRecords::Table)
                    .if_not_exists()
                    .col(pk_uuid(QueueEventRecords::Id))
                    .col(
                        ColumnDef::new(QueueEventRecords::SubscriberId)
                            .binary()
                            .not_null(),
                    )
                    .col(string(QueueEventRecords::EventType))
                    .col(ColumnDef::new(QueueEventRecords::Event).json_binary().not_null())
                    .col(timestamp_with_time_zone(QueueEventRecords::ExpireOn))
                    .col(boolean(QueueEventRecords::IsComplete).default(false))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_queue_event_records_due")
                    .table(QueueEventRecords::Table)
                    .col(QueueEventRecords::SubscriberId)
                    .col(QueueEventRecords::IsComplete)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(QueueEventRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(QueueJobRecords::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum QueueJobRecords {
    Table,
    TrackingId,
    QueueId,
    Command,
    ExecuteAfter,
    ExpireOn,
    IsComplete,
    LastError,
}

#[derive(DeriveIden)]
enum QueueEventRecords {
    Table,
    Id,
    SubscriberId,
    EventType,
    Event,
    ExpireOn,
    IsComplete,
}
