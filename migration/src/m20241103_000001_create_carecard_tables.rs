use sea_orm_migration::{prelude::*, schema::*};

use crate::iden::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = Table::create()
            .table(Organisations::Table)
            .if_not_exists()
            .col(pk_auto(Organisations::Id))
            .col(string(Organisations::Name))
            .col(text_null(Organisations::ContactInfo))
            .to_owned();
        manager.create_table(table).await?;

        let table = Table::create()
            .table(Volunteers::Table)
            .if_not_exists()
            .col(pk_auto(Volunteers::Id))
            .col(string(Volunteers::Name))
            .col(string_uniq(Volunteers::Email))
            .col(integer_null(Volunteers::OrganisationId))
            .col(uuid_null(Volunteers::AuthId))
            .col(
                timestamp_with_time_zone(Volunteers::CreatedAt)
                    .default(Expr::current_timestamp()),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_volunteer_organisation")
                    .from(Volunteers::Table, Volunteers::OrganisationId)
                    .to(Organisations::Table, Organisations::Id)
                    .on_delete(ForeignKeyAction::SetNull),
            )
            .to_owned();
        manager.create_table(table).await?;

        let table = Table::create()
            .table(Seniors::Table)
            .if_not_exists()
            .col(pk_auto(Seniors::Id))
            .col(string(Seniors::Name))
            .col(integer(Seniors::Age))
            .col(json(Seniors::SpokenLanguage))
            .col(string_len(Seniors::LastFourCharNric, 4))
            .col(string(Seniors::PostalCode))
            .to_owned();
        manager.create_table(table).await?;

        let table = Table::create()
            .table(Activities::Table)
            .if_not_exists()
            .col(pk_auto(Activities::Id))
            .col(integer(Activities::VolunteerId))
            .col(integer(Activities::SeniorId))
            .col(string(Activities::Category))
            .col(text_null(Activities::Issue))
            .col(text_null(Activities::Resolved))
            .col(timestamp_with_time_zone(Activities::ActivityDate))
            .col(
                timestamp_with_time_zone(Activities::CreatedAt)
                    .default(Expr::current_timestamp()),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_activity_volunteer")
                    .from(Activities::Table, Activities::VolunteerId)
                    .to(Volunteers::Table, Volunteers::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_activity_senior")
                    .from(Activities::Table, Activities::SeniorId)
                    .to(Seniors::Table, Seniors::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .check(Expr::col(Activities::Category).is_in([
                "Befriending/Welfare check",
                "Delivery",
                "Housekeeping",
                "Other",
            ]))
            .to_owned();
        manager.create_table(table).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_activity_senior_date")
                    .table(Activities::Table)
                    .col(Activities::SeniorId)
                    .col(Activities::ActivityDate)
                    .to_owned(),
            )
            .await?;

        // One running summary per senior.
        let table = Table::create()
            .table(CareSummary::Table)
            .if_not_exists()
            .col(integer(CareSummary::SeniorId).primary_key())
            .col(text(CareSummary::Response))
            .col(
                timestamp_with_time_zone(CareSummary::UpdatedAt)
                    .default(Expr::current_timestamp()),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_care_summary_senior")
                    .from(CareSummary::Table, CareSummary::SeniorId)
                    .to(Seniors::Table, Seniors::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        manager.create_table(table).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CareSummary::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Activities::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Seniors::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Volunteers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Organisations::Table).to_owned())
            .await?;

        Ok(())
    }
}
