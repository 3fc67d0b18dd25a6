use std::collections::{BTreeMap, BTreeSet};

use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, FromQueryResult, JoinType, QueryFilter,
    QuerySelect, RelationTrait,
};
use serde::Serialize;

use crate::entities::{
    activity::{self, ActivityCategory},
    organisation, volunteer,
};

/// One activity joined through its volunteer to their organisation.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct OrganisationRow {
    pub category: ActivityCategory,
    pub organisation_name: Option<String>,
    pub contact_info: Option<String>,
}

/// An organisation that has visited a senior, and what it did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganisationSummary {
    pub name: String,
    pub categories: Vec<ActivityCategory>,
    pub contact_info: String,
}

pub async fn rows_for_senior(
    db: &DatabaseConnection,
    senior_id: i32,
) -> Result<Vec<OrganisationRow>, DbErr> {
    activity::Entity::find()
        .select_only()
        .column(activity::Column::Category)
        .column_as(organisation::Column::Name, "organisation_name")
        .column_as(organisation::Column::ContactInfo, "contact_info")
        .join(JoinType::LeftJoin, activity::Relation::Volunteer.def())
        .join(JoinType::LeftJoin, volunteer::Relation::Organisation.def())
        .filter(activity::Column::SeniorId.eq(senior_id))
        .into_model::<OrganisationRow>()
        .all(db)
        .await
}

/// Groups join rows by organisation name. Rows without an organisation are
/// dropped; output is sorted by name with sorted, distinct categories.
pub fn dedupe(rows: &[OrganisationRow]) -> Vec<OrganisationSummary> {
    let mut grouped: BTreeMap<&str, (BTreeSet<ActivityCategory>, BTreeSet<&str>)> =
        BTreeMap::new();

    for row in rows {
        let Some(name) = row.organisation_name.as_deref() else {
            continue;
        };
        let (categories, contacts) = grouped.entry(name).or_default();
        categories.insert(row.category);
        if let Some(contact) = row.contact_info.as_deref().filter(|c| !c.trim().is_empty()) {
            contacts.insert(contact);
        }
    }

    grouped
        .into_iter()
        .map(|(name, (categories, contacts))| OrganisationSummary {
            name: name.to_string(),
            categories: categories.into_iter().collect(),
            // Rows for one organisation carry the same contact; take the
            // smallest so the pick never depends on row order.
            contact_info: contacts.into_iter().next().unwrap_or_default().to_string(),
        })
        .collect()
}
