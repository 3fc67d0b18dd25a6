use chrono::Utc;
use sea_orm::{
    ActiveValue::Set, DatabaseConnection, DbErr, EntityTrait, sea_query::OnConflict,
};

use crate::entities::care_summary;

pub async fn fetch(
    db: &DatabaseConnection,
    senior_id: i32,
) -> Result<Option<care_summary::Model>, DbErr> {
    care_summary::Entity::find_by_id(senior_id).one(db).await
}

/// Writes `response` as the senior's summary, creating the row if needed.
pub async fn upsert(db: &DatabaseConnection, senior_id: i32, response: &str) -> Result<(), DbErr> {
    let model = care_summary::ActiveModel {
        senior_id: Set(senior_id),
        response: Set(response.to_string()),
        updated_at: Set(Utc::now().fixed_offset()),
    };

    care_summary::Entity::insert(model)
        .on_conflict(
            OnConflict::column(care_summary::Column::SeniorId)
                .update_columns([
                    care_summary::Column::Response,
                    care_summary::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    Ok(())
}
