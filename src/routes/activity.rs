use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_login::tower_sessions::Session;
use chrono::{FixedOffset, NaiveDateTime, TimeZone, Utc};
use minijinja::context;
use sea_orm::{Iterable, prelude::DateTimeWithTimeZone};
use serde::Deserialize;
use tracing::{error, info};

use super::{FlashLevel, carecard::SeniorCard, search::CONSENT_REQUIRED, set_flash, signed_in};
use crate::{
    auth::user::AuthSession,
    data::{
        activities::{self, NewActivity, VisitUpdate},
        seniors,
    },
    entities::activity::ActivityCategory,
    error::AppError,
    router::AppState,
    summary,
};

pub const INVALID_CATEGORY: &str = "Please select a valid category";
pub const INVALID_DATE: &str = "Please enter the date and time of the visit";
const ACTIVITY_LOGGED: &str = "Activity logged successfully.";
const LOGGED_WITHOUT_SUMMARY: &str =
    "Activity logged, but the care summary could not be refreshed.";

/// `datetime-local` input format.
pub const INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Fields shared by the log and edit forms.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VisitForm {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub activity_date: String,
    #[serde(default)]
    pub issue: String,
    #[serde(default)]
    pub resolved: String,
    pub consent: Option<String>,
}

impl VisitForm {
    /// Checks category and date; the date is read in the display offset.
    pub fn parse(&self, offset: &FixedOffset) -> Result<VisitUpdate, AppError> {
        let category = ActivityCategory::from_label(self.category.trim())
            .ok_or_else(|| AppError::validation(INVALID_CATEGORY))?;
        let activity_date = parse_input_time(&self.activity_date, offset)
            .ok_or_else(|| AppError::validation(INVALID_DATE))?;

        Ok(VisitUpdate {
            category,
            issue: optional(&self.issue),
            resolved: optional(&self.resolved),
            activity_date,
        })
    }
}

fn optional(field: &str) -> Option<String> {
    let trimmed = field.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub fn parse_input_time(raw: &str, offset: &FixedOffset) -> Option<DateTimeWithTimeZone> {
    let raw = raw.trim();
    let naive = NaiveDateTime::parse_from_str(raw, INPUT_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()?;
    offset.from_local_datetime(&naive).single()
}

pub fn categories() -> Vec<&'static str> {
    ActivityCategory::iter().map(|c| c.label()).collect()
}

fn render_page(
    state: &AppState,
    senior: &SeniorCard,
    form: &VisitForm,
    error: Option<String>,
) -> Result<Response, AppError> {
    let html = state.render(
        "log_activity.html",
        context! {
            senior => senior,
            categories => categories(),
            form => context! {
                category => &form.category,
                activity_date => &form.activity_date,
                issue => &form.issue,
                resolved => &form.resolved,
                consent => form.consent.is_some(),
            },
            error => error,
        },
    )?;
    Ok(html.into_response())
}

pub async fn log_activity_page(
    State(state): State<AppState>,
    Path(senior_id): Path<i32>,
) -> Result<Response, AppError> {
    let senior = seniors::fetch(&state.db, senior_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let now = Utc::now().with_timezone(&state.config.display_offset);
    let form = VisitForm {
        activity_date: now.format(INPUT_FORMAT).to_string(),
        ..VisitForm::default()
    };
    render_page(&state, &SeniorCard::from(&senior), &form, None)
}

/// Logs a visit, then regenerates the senior's care summary.
pub async fn log_activity(
    auth_session: AuthSession,
    State(state): State<AppState>,
    session: Session,
    Path(senior_id): Path<i32>,
    Form(form): Form<VisitForm>,
) -> Result<Response, AppError> {
    let user = signed_in(&auth_session)?;
    let senior = seniors::fetch(&state.db, senior_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let card = SeniorCard::from(&senior);

    if form.consent.is_none() {
        return render_page(&state, &card, &form, Some(CONSENT_REQUIRED.to_string()));
    }
    let visit = match form.parse(&state.config.display_offset) {
        Ok(visit) => visit,
        Err(err) => return render_page(&state, &card, &form, Some(err.user_message())),
    };

    let activity = activities::insert(
        &state.db,
        NewActivity {
            volunteer_id: user.volunteer_id,
            senior_id,
            category: visit.category,
            issue: visit.issue,
            resolved: visit.resolved,
            activity_date: visit.activity_date,
        },
    )
    .await?;
    info!("Volunteer {} logged activity {}", user.volunteer_id, activity.id);

    // The visit is saved either way; a failed refresh only changes the notice.
    let refreshed = summary::refresh_care_summary(
        &state.db,
        &state.openai,
        senior_id,
        &state.config.display_offset,
    )
    .await;
    match refreshed {
        Ok(_) => set_flash(&session, FlashLevel::Success, ACTIVITY_LOGGED).await?,
        Err(err) => {
            error!("Care summary refresh after logging failed for senior {senior_id}: {err}");
            set_flash(&session, FlashLevel::Error, LOGGED_WITHOUT_SUMMARY).await?
        }
    }

    Ok(Redirect::to(&format!("/carecard/{senior_id}")).into_response())
}
