use axum::{
    Form,
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_login::tower_sessions::Session;
use minijinja::context;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{error, info};

use super::{FlashLevel, set_flash, take_flash};
use crate::{
    data::{activities, care_summary, organisations, seniors},
    entities::senior,
    error::AppError,
    router::AppState,
    summary::{self, SummaryError, parse_summary},
};

pub const NO_SUMMARY: &str = "No care summary available.";
const SUMMARY_SAVED: &str = "Care summary updated.";
const SUMMARY_REFRESHED: &str = "Care summary refreshed.";
const SUMMARY_EMPTY: &str = "Care summary cannot be empty.";
const NOTHING_TO_SUMMARISE: &str = "No visits have been logged for this senior yet.";
const REFRESH_FAILED: &str = "Failed to refresh care summary. Please try again.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Summary,
    Visits,
    Organisations,
}

#[derive(Debug, Deserialize)]
pub struct TabQuery {
    #[serde(default, deserialize_with = "lenient_tab")]
    tab: Tab,
}

/// Missing or unknown `?tab=` values open the summary tab.
fn lenient_tab<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Tab, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(match raw.as_deref().map(str::trim) {
        Some("visits") => Tab::Visits,
        Some("organisations") => Tab::Organisations,
        _ => Tab::Summary,
    })
}

#[derive(Debug, Deserialize)]
pub struct SummaryForm {
    response: String,
}

/// The profile block at the top of a CareCard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeniorCard {
    pub id: i32,
    pub name: String,
    pub age: i32,
    pub nric: String,
    pub languages: String,
}

impl From<&senior::Model> for SeniorCard {
    fn from(senior: &senior::Model) -> Self {
        let languages = senior.languages();
        Self {
            id: senior.id,
            name: senior.name.clone(),
            age: senior.age,
            nric: format!("NRIC: XXXXX{}", senior.last_four_char_nric),
            languages: if languages.is_empty() {
                String::new()
            } else {
                format!("Prefers {}", languages.join(", "))
            },
        }
    }
}

async fn find_senior(state: &AppState, senior_id: i32) -> Result<senior::Model, AppError> {
    seniors::fetch(&state.db, senior_id)
        .await?
        .ok_or(AppError::NotFound)
}

fn card_url(senior_id: i32, tab: Tab) -> String {
    match tab {
        Tab::Summary => format!("/carecard/{senior_id}"),
        Tab::Visits => format!("/carecard/{senior_id}?tab=visits"),
        Tab::Organisations => format!("/carecard/{senior_id}?tab=organisations"),
    }
}

pub async fn carecard(
    State(state): State<AppState>,
    session: Session,
    Path(senior_id): Path<i32>,
    Query(TabQuery { tab }): Query<TabQuery>,
) -> Result<Html<String>, AppError> {
    let senior = find_senior(&state, senior_id).await?;
    let flash = take_flash(&session).await?;
    let offset = state.config.display_offset;

    let ctx = match tab {
        Tab::Summary => {
            let stored = care_summary::fetch(&state.db, senior_id).await?;
            let summary = stored.as_ref().map(|s| s.response.as_str());
            context! {
                summary => summary,
                sections => summary.and_then(parse_summary),
                updated_at => stored.as_ref().map(|s| {
                    s.updated_at.with_timezone(&offset).format("%-m/%-d/%Y %-I:%M %p").to_string()
                }),
                no_summary => NO_SUMMARY,
            }
        }
        Tab::Visits => {
            let visits: Vec<_> = activities::recent_visits(&state.db, senior_id)
                .await?
                .into_iter()
                .map(|visit| {
                    context! {
                        category => visit.category.label(),
                        date => visit.activity_date.with_timezone(&offset).format("%-m/%-d/%Y").to_string(),
                        issue => visit.issue,
                        volunteer => visit.volunteer_name.unwrap_or_else(|| "N/A".into()),
                        organisation => visit.organisation_name.unwrap_or_else(|| "N/A".into()),
                    }
                })
                .collect();
            context! { visits => visits }
        }
        Tab::Organisations => {
            let rows = organisations::rows_for_senior(&state.db, senior_id).await?;
            let organisations: Vec<_> = organisations::dedupe(&rows)
                .into_iter()
                .map(|org| {
                    let categories: Vec<_> = org.categories.iter().map(|c| c.label()).collect();
                    context! {
                        name => org.name,
                        categories => categories,
                        contact_info => org.contact_info,
                    }
                })
                .collect();
            context! { organisations => organisations }
        }
    };

    state.render(
        "carecard.html",
        context! {
            senior => SeniorCard::from(&senior),
            tab => tab,
            flash => flash,
            ..ctx
        },
    )
}

/// Saves a hand-edited care summary.
pub async fn edit_summary(
    State(state): State<AppState>,
    session: Session,
    Path(senior_id): Path<i32>,
    Form(SummaryForm { response }): Form<SummaryForm>,
) -> Result<Response, AppError> {
    find_senior(&state, senior_id).await?;

    let response = response.trim();
    if response.is_empty() {
        set_flash(&session, FlashLevel::Error, SUMMARY_EMPTY).await?;
    } else {
        care_summary::upsert(&state.db, senior_id, response).await?;
        info!("Care summary edited for senior {senior_id}");
        set_flash(&session, FlashLevel::Success, SUMMARY_SAVED).await?;
    }

    Ok(Redirect::to(&card_url(senior_id, Tab::Summary)).into_response())
}

pub async fn refresh_summary(
    State(state): State<AppState>,
    session: Session,
    Path(senior_id): Path<i32>,
) -> Result<Response, AppError> {
    find_senior(&state, senior_id).await?;

    let result = summary::refresh_care_summary(
        &state.db,
        &state.openai,
        senior_id,
        &state.config.display_offset,
    )
    .await;
    match result {
        Ok(_) => set_flash(&session, FlashLevel::Success, SUMMARY_REFRESHED).await?,
        Err(SummaryError::NoActivities(_)) => {
            set_flash(&session, FlashLevel::Error, NOTHING_TO_SUMMARISE).await?
        }
        Err(err) => {
            error!("Care summary refresh failed for senior {senior_id}: {err}");
            set_flash(&session, FlashLevel::Error, REFRESH_FAILED).await?
        }
    }

    Ok(Redirect::to(&card_url(senior_id, Tab::Summary)).into_response())
}
