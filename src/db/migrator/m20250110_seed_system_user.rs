use crate::constants::accounts::{SYSTEM_USER_EMAIL, SYSTEM_USER_NAME};
use crate::entities::prelude::*;
use crate::entities::users;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Seeds the account that authors AI replies. It has no password and cannot log in.
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let now = crate::db::now_timestamp();

        let insert = Query::insert()
            .into_table(Users)
            .columns([
                users::Column::Email,
                users::Column::PasswordHash,
                users::Column::DisplayName,
                users::Column::Role,
                users::Column::CreatedAt,
            ])
            .values_panic([
                SYSTEM_USER_EMAIL.into(),
                "".into(),
                SYSTEM_USER_NAME.into(),
                "system".into(),
                now.into(),
            ])
            .on_conflict(
                OnConflict::column(users::Column::Email)
                    .do_nothing()
                    .to_owned(),
            )
            .to_owned();

        manager.exec_stmt(insert).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let delete = Query::delete()
            .from_table(Users)
            .and_where(Expr::col(users::Column::Email).eq(SYSTEM_USER_EMAIL))
            .to_owned();

        manager.exec_stmt(delete).await?;

        Ok(())
    }
}
