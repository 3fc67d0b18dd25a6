use axum::{
    Form,
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_login::tower_sessions::Session;
use chrono::FixedOffset;
use minijinja::context;
use serde::Serialize;
use tracing::info;

use super::{
    FlashLevel,
    activity::{INPUT_FORMAT, VisitForm, categories},
    set_flash, signed_in, take_flash,
};
use crate::{
    auth::user::AuthSession,
    data::activities,
    entities::{activity, senior},
    error::AppError,
    router::AppState,
};

const VISIT_UPDATED: &str = "Visit updated.";
const VISIT_DELETED: &str = "Visit deleted.";

/// One row of the volunteer's own history, with the edit form prefilled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisitRow {
    pub id: i32,
    pub senior_id: i32,
    pub senior_name: String,
    pub category: &'static str,
    pub date: String,
    pub date_input: String,
    pub issue: String,
    pub resolved: String,
}

impl VisitRow {
    fn new(visit: activity::Model, senior: Option<senior::Model>, offset: &FixedOffset) -> Self {
        let local = visit.activity_date.with_timezone(offset);
        Self {
            id: visit.id,
            senior_id: visit.senior_id,
            senior_name: senior.map(|s| s.name).unwrap_or_else(|| "N/A".into()),
            category: visit.category.label(),
            date: local.format("%-m/%-d/%Y").to_string(),
            date_input: local.format(INPUT_FORMAT).to_string(),
            issue: visit.issue.unwrap_or_default(),
            resolved: visit.resolved.unwrap_or_default(),
        }
    }
}

pub async fn visit_history(
    auth_session: AuthSession,
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>, AppError> {
    let user = signed_in(&auth_session)?;
    let offset = state.config.display_offset;
    let visits: Vec<VisitRow> = activities::for_volunteer(&state.db, user.volunteer_id)
        .await?
        .into_iter()
        .map(|(visit, senior)| VisitRow::new(visit, senior, &offset))
        .collect();

    state.render(
        "visit_history.html",
        context! {
            visits => visits,
            categories => categories(),
            flash => take_flash(&session).await?,
        },
    )
}

pub async fn edit_visit(
    auth_session: AuthSession,
    State(state): State<AppState>,
    session: Session,
    Path(visit_id): Path<i32>,
    Form(form): Form<VisitForm>,
) -> Result<Response, AppError> {
    let user = signed_in(&auth_session)?;
    let update = match form.parse(&state.config.display_offset) {
        Ok(update) => update,
        Err(err) => {
            set_flash(&session, FlashLevel::Error, err.user_message()).await?;
            return Ok(Redirect::to("/visit-history").into_response());
        }
    };

    activities::update_visit(&state.db, user.volunteer_id, visit_id, update)
        .await?
        .ok_or(AppError::NotFound)?;
    info!("Volunteer {} edited visit {visit_id}", user.volunteer_id);

    set_flash(&session, FlashLevel::Success, VISIT_UPDATED).await?;
    Ok(Redirect::to("/visit-history").into_response())
}

pub async fn delete_visit(
    auth_session: AuthSession,
    State(state): State<AppState>,
    session: Session,
    Path(visit_id): Path<i32>,
) -> Result<Response, AppError> {
    let user = signed_in(&auth_session)?;
    let senior_id = activities::delete_visit(&state.db, user.volunteer_id, visit_id)
        .await?
        .ok_or(AppError::NotFound)?;
    info!(
        "Volunteer {} deleted visit {visit_id} for senior {senior_id}",
        user.volunteer_id
    );

    set_flash(&session, FlashLevel::Success, VISIT_DELETED).await?;
    Ok(Redirect::to("/visit-history").into_response())
}
