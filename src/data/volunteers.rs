use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, NotSet, QueryFilter,
};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::{organisation, volunteer};

/// A volunteer with their organisation flattened in.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VolunteerProfile {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub organisation_id: Option<i32>,
    pub organisation: String,
    pub organisation_contact: String,
}

impl VolunteerProfile {
    fn from_models(volunteer: volunteer::Model, org: Option<organisation::Model>) -> Self {
        let (organisation, organisation_contact) = match org {
            Some(org) => (org.name, org.contact_info.unwrap_or_default()),
            None => (String::new(), String::new()),
        };

        Self {
            id: volunteer.id,
            name: volunteer.name,
            email: volunteer.email,
            organisation_id: volunteer.organisation_id,
            organisation,
            organisation_contact,
        }
    }
}

pub async fn find_by_email(
    db: &DatabaseConnection,
    email: &str,
) -> Result<Option<volunteer::Model>, DbErr> {
    volunteer::Entity::find()
        .filter(volunteer::Column::Email.eq(email.trim().to_lowercase()))
        .one(db)
        .await
}

pub async fn fetch_profile(
    db: &DatabaseConnection,
    volunteer_id: i32,
) -> Result<Option<VolunteerProfile>, DbErr> {
    let found = volunteer::Entity::find_by_id(volunteer_id)
        .find_also_related(organisation::Entity)
        .one(db)
        .await?;

    Ok(found.map(|(volunteer, org)| VolunteerProfile::from_models(volunteer, org)))
}

pub async fn create(
    db: &DatabaseConnection,
    name: &str,
    email: &str,
    auth_id: Uuid,
) -> Result<volunteer::Model, DbErr> {
    volunteer::ActiveModel {
        id: NotSet,
        name: Set(name.trim().to_string()),
        email: Set(email.trim().to_lowercase()),
        organisation_id: Set(None),
        auth_id: Set(Some(auth_id)),
        created_at: NotSet,
    }
    .insert(db)
    .await
}

/// Records the auth user id on a volunteer row created before sign-up.
pub async fn link_auth_id(
    db: &DatabaseConnection,
    volunteer: volunteer::Model,
    auth_id: Uuid,
) -> Result<volunteer::Model, DbErr> {
    if volunteer.auth_id == Some(auth_id) {
        return Ok(volunteer);
    }

    let mut model = volunteer.into_active_model();
    model.auth_id = Set(Some(auth_id));
    model.update(db).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn profile_without_organisation_uses_empty_strings() {
        let volunteer = volunteer::Model {
            id: 4,
            name: "Aisha".into(),
            email: "aisha@example.sg".into(),
            organisation_id: None,
            auth_id: None,
            created_at: Utc::now().fixed_offset(),
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![(volunteer, None::<organisation::Model>)]])
            .into_connection();

        let profile = fetch_profile(&db, 4).await.unwrap().unwrap();
        assert_eq!(profile.name, "Aisha");
        assert_eq!(profile.organisation, "");
        assert_eq!(profile.organisation_contact, "");
    }
}
