use sea_orm::entity::prelude::*;

/// Sea-ORM entity for `queue-core`'s job records.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "queue_job_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub tracking_id: Uuid,
    pub queue_id: Vec<u8>,
    pub command: Json,
    pub execute_after: DateTimeWithTimeZone,
    pub expire_on: DateTimeWithTimeZone,
    pub is_complete: bool,
    pub last_error: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
