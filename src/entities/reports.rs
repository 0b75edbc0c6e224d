use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "reports")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub target_type: String,
    pub target_id: i32,
    pub reported_by: Option<i32>,
    pub reason: String,
    /// `open` until a moderator resolves it
    pub status: String,
    pub created_at: String,
    pub resolved_by: Option<i32>,
    pub resolved_at: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::ReportedBy",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Reporter,
}

impl ActiveModelBehavior for ActiveModel {}
