use sea_orm_migration::{prelude::*, schema::*};

use crate::iden::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = Table::create()
            .table(AppUser::Table)
            .if_not_exists()
            .col(pk_auto(AppUser::Id))
            .col(integer(AppUser::VolunteerId))
            .col(uuid_uniq(AppUser::AuthId))
            .col(text(AppUser::AccessToken))
            .col(text(AppUser::RefreshToken))
            .col(timestamp_with_time_zone(AppUser::TokenExpiresAt))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_app_user_volunteer")
                    .from(AppUser::Table, AppUser::VolunteerId)
                    .to(Volunteers::Table, Volunteers::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        manager.create_table(table).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AppUser::Table).to_owned())
            .await?;

        Ok(())
    }
}
