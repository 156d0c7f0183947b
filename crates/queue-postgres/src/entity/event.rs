use sea_orm::entity::prelude::*;

/// Sea-ORM entity for `queue-core`'s event records.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "queue_event_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub subscriber_id: Vec<u8>,
    pub event_type: String,
    pub event: Json,
    pub expire_on: DateTimeWithTimeZone,
    pub is_complete: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
