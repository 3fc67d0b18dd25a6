use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use minijinja::context;
use serde::Deserialize;
use tracing::debug;

use crate::{
    data::seniors::{self, SeniorSearch},
    error::AppError,
    router::AppState,
};

pub const CONSENT_REQUIRED: &str = "Please confirm you have the senior's consent";
pub const NO_SENIOR_FOUND: &str = "No senior record found";

#[derive(Debug, Default, Deserialize)]
pub struct SearchForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub nric: String,
    #[serde(default)]
    pub postal_code: String,
    /// Present only when the checkbox is ticked.
    pub consent: Option<String>,
}

impl SearchForm {
    pub fn has_consent(&self) -> bool {
        self.consent.is_some()
    }

    /// Consent first, then the two-of-three rule; no query runs on failure.
    pub fn terms(&self) -> Result<SeniorSearch, AppError> {
        if !self.has_consent() {
            return Err(AppError::validation(CONSENT_REQUIRED));
        }
        SeniorSearch::from_form(&self.name, &self.nric, &self.postal_code)
    }
}

fn render_page(state: &AppState, form: &SearchForm, error: Option<String>) -> Result<Response, AppError> {
    let html = state.render(
        "search.html",
        context! {
            name => &form.name,
            nric => &form.nric,
            postal_code => &form.postal_code,
            consent => form.has_consent(),
            error => error,
        },
    )?;
    Ok(html.into_response())
}

pub async fn search_page(State(state): State<AppState>) -> Result<Response, AppError> {
    render_page(&state, &SearchForm::default(), None)
}

pub async fn search(
    State(state): State<AppState>,
    Form(form): Form<SearchForm>,
) -> Result<Response, AppError> {
    let terms = match form.terms() {
        Ok(terms) => terms,
        Err(err) => return render_page(&state, &form, Some(err.user_message())),
    };

    match seniors::search(&state.db, &terms).await? {
        Some(senior_id) => Ok(Redirect::to(&format!("/carecard/{senior_id}")).into_response()),
        None => {
            debug!("Search found no single senior for {terms:?}");
            render_page(&state, &form, Some(NO_SENIOR_FOUND.to_string()))
        }
    }
}
