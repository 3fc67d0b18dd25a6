use axum::{extract::State, response::Html};
use axum_login::tower_sessions::Session;
use minijinja::context;

use super::{signed_in, take_flash};
use crate::{auth::user::AuthSession, data::volunteers, error::AppError, router::AppState};

pub async fn home(
    auth_session: AuthSession,
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>, AppError> {
    let user = signed_in(&auth_session)?;
    let profile = volunteers::fetch_profile(&state.db, user.volunteer_id).await?;

    state.render(
        "home.html",
        context! {
            volunteer => profile,
            flash => take_flash(&session).await?,
        },
    )
}
