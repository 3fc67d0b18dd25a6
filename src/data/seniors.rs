use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QuerySelect,
    sea_query::{Expr, extension::postgres::PgExpr},
};

use crate::entities::senior;
use crate::error::AppError;

pub const NOT_ENOUGH_FIELDS: &str = "Please fill at least 2 fields";

/// Search terms that passed the two-of-three rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeniorSearch {
    pub name: Option<String>,
    pub nric_suffix: Option<String>,
    pub postal_code: Option<String>,
}

impl SeniorSearch {
    pub fn from_form(name: &str, nric_suffix: &str, postal_code: &str) -> Result<Self, AppError> {
        let search = Self {
            name: non_empty(name),
            nric_suffix: non_empty(nric_suffix).map(|nric| nric.to_uppercase()),
            postal_code: non_empty(postal_code),
        };

        let filled = [
            search.name.is_some(),
            search.nric_suffix.is_some(),
            search.postal_code.is_some(),
        ]
        .into_iter()
        .filter(|filled| *filled)
        .count();
        if filled < 2 {
            return Err(AppError::validation(NOT_ENOUGH_FIELDS));
        }

        Ok(search)
    }
}

fn non_empty(field: &str) -> Option<String> {
    let trimmed = field.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// `ILIKE` pattern matching `name` anywhere, with its wildcards taken literally.
fn contains_pattern(name: &str) -> String {
    let mut pattern = String::with_capacity(name.len() + 2);
    pattern.push('%');
    for c in name.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Returns the id of the one senior matching every given term. No match and
/// an ambiguous match both come back as `None`.
pub async fn search(db: &DatabaseConnection, terms: &SeniorSearch) -> Result<Option<i32>, DbErr> {
    let mut query = senior::Entity::find();
    if let Some(nric) = &terms.nric_suffix {
        query = query.filter(senior::Column::LastFourCharNric.eq(nric.as_str()));
    }
    if let Some(postal_code) = &terms.postal_code {
        query = query.filter(senior::Column::PostalCode.eq(postal_code.as_str()));
    }
    if let Some(name) = &terms.name {
        query = query.filter(
            Expr::col((senior::Entity, senior::Column::Name)).ilike(contains_pattern(name)),
        );
    }

    let found = query.limit(2).all(db).await?;
    match found.as_slice() {
        [only] => Ok(Some(only.id)),
        _ => Ok(None),
    }
}

pub async fn fetch(db: &DatabaseConnection, id: i32) -> Result<Option<senior::Model>, DbErr> {
    senior::Entity::find_by_id(id).one(db).await
}
