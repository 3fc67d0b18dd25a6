use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    FromQueryResult, JoinType, NotSet, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
    prelude::DateTimeWithTimeZone,
};

use crate::entities::{
    activity::{self, ActivityCategory},
    organisation, senior, volunteer,
};

/// Number of visits shown on a CareCard.
pub const RECENT_VISITS_LIMIT: u64 = 10;

#[derive(Debug, Clone)]
pub struct NewActivity {
    pub volunteer_id: i32,
    pub senior_id: i32,
    pub category: ActivityCategory,
    pub issue: Option<String>,
    pub resolved: Option<String>,
    pub activity_date: DateTimeWithTimeZone,
}

/// The editable fields of a logged visit.
#[derive(Debug, Clone)]
pub struct VisitUpdate {
    pub category: ActivityCategory,
    pub issue: Option<String>,
    pub resolved: Option<String>,
    pub activity_date: DateTimeWithTimeZone,
}

#[derive(Debug, Clone, FromQueryResult)]
pub struct RecentVisit {
    pub id: i32,
    pub category: ActivityCategory,
    pub activity_date: DateTimeWithTimeZone,
    pub issue: Option<String>,
    pub volunteer_name: Option<String>,
    pub organisation_name: Option<String>,
}

pub async fn insert(db: &DatabaseConnection, new: NewActivity) -> Result<activity::Model, DbErr> {
    activity::ActiveModel {
        id: NotSet,
        volunteer_id: Set(new.volunteer_id),
        senior_id: Set(new.senior_id),
        category: Set(new.category),
        issue: Set(new.issue),
        resolved: Set(new.resolved),
        activity_date: Set(new.activity_date),
        created_at: NotSet,
    }
    .insert(db)
    .await
}

/// Latest visits for a senior, newest first.
pub async fn recent_for_senior(
    db: &DatabaseConnection,
    senior_id: i32,
    limit: u64,
) -> Result<Vec<activity::Model>, DbErr> {
    activity::Entity::find()
        .filter(activity::Column::SeniorId.eq(senior_id))
        .order_by_desc(activity::Column::ActivityDate)
        .limit(limit)
        .all(db)
        .await
}

/// Latest visits for a CareCard, with who made them.
pub async fn recent_visits(
    db: &DatabaseConnection,
    senior_id: i32,
) -> Result<Vec<RecentVisit>, DbErr> {
    activity::Entity::find()
        .select_only()
        .columns([
            activity::Column::Id,
            activity::Column::Category,
            activity::Column::ActivityDate,
            activity::Column::Issue,
        ])
        .column_as(volunteer::Column::Name, "volunteer_name")
        .column_as(organisation::Column::Name, "organisation_name")
        .join(JoinType::LeftJoin, activity::Relation::Volunteer.def())
        .join(JoinType::LeftJoin, volunteer::Relation::Organisation.def())
        .filter(activity::Column::SeniorId.eq(senior_id))
        .order_by_desc(activity::Column::ActivityDate)
        .limit(RECENT_VISITS_LIMIT)
        .into_model::<RecentVisit>()
        .all(db)
        .await
}

/// A volunteer's own visits, most recently logged first.
pub async fn for_volunteer(
    db: &DatabaseConnection,
    volunteer_id: i32,
) -> Result<Vec<(activity::Model, Option<senior::Model>)>, DbErr> {
    activity::Entity::find()
        .find_also_related(senior::Entity)
        .filter(activity::Column::VolunteerId.eq(volunteer_id))
        .order_by_desc(activity::Column::CreatedAt)
        .all(db)
        .await
}

async fn find_owned(
    db: &DatabaseConnection,
    volunteer_id: i32,
    visit_id: i32,
) -> Result<Option<activity::Model>, DbErr> {
    activity::Entity::find_by_id(visit_id)
        .filter(activity::Column::VolunteerId.eq(volunteer_id))
        .one(db)
        .await
}

/// Updates a visit the volunteer logged. `None` when it is not theirs.
pub async fn update_visit(
    db: &DatabaseConnection,
    volunteer_id: i32,
    visit_id: i32,
    update: VisitUpdate,
) -> Result<Option<activity::Model>, DbErr> {
    let Some(visit) = find_owned(db, volunteer_id, visit_id).await? else {
        return Ok(None);
    };

    let mut model: activity::ActiveModel = visit.into();
    model.category = Set(update.category);
    model.issue = Set(update.issue);
    model.resolved = Set(update.resolved);
    model.activity_date = Set(update.activity_date);
    model.update(db).await.map(Some)
}

/// Deletes a visit the volunteer logged, returning its senior.
pub async fn delete_visit(
    db: &DatabaseConnection,
    volunteer_id: i32,
    visit_id: i32,
) -> Result<Option<i32>, DbErr> {
    let Some(visit) = find_owned(db, volunteer_id, visit_id).await? else {
        return Ok(None);
    };

    activity::Entity::delete_by_id(visit.id).exec(db).await?;
    Ok(Some(visit.senior_id))
}
