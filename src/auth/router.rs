use axum::{
    Form, Router,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_login::tower_sessions::Session;
use minijinja::context;
use oauth2::PkceCodeChallenge;
use serde::Deserialize;
use tracing::{debug, error, warn};

use super::forms::{EmailForm, PasswordLoginForm, ResetPasswordForm, SignUpForm, safe_next};
use super::user::{AuthSession, Credentials, ensure_valid_access_token};
use crate::data::volunteers;
use crate::error::AppError;
use crate::router::AppState;
use crate::routes::{FlashLevel, set_flash, signed_in, take_flash};
use crate::supabase::SupabaseError;

pub const NEXT_URL_KEY: &str = "auth.next-url";
pub const PKCE_VERIFIER_KEY: &str = "auth.pkce-verifier";

const MAGIC_LINK_SENT: &str = "Check your email for the login link!";
const MAGIC_LINK_FAILED: &str = "Failed to send magic link. Please try again.";
const INVALID_LOGIN: &str = "Invalid email or password.";
const LINK_EXPIRED: &str = "This link is invalid or has expired. Please request a new one.";
const SIGNUP_SENT: &str = "A confirmation link has been sent to your email. \
                           Please check your inbox to complete your signup.";
const SIGNUP_FAILED: &str = "Failed to sign up. Please try again.";
const RESET_SENT: &str = "Password reset link sent. Please check your email.";
const RESET_FAILED: &str = "Failed to send reset link. Please try again.";
const PASSWORD_UPDATED: &str = "Your password has been updated.";
const PASSWORD_UPDATE_FAILED: &str = "Failed to update password. Please try again.";

// This allows us to extract the "next" field from the query string. We use this
// to redirect after log in.
#[derive(Debug, Deserialize)]
pub struct NextUrl {
    next: Option<String>,
}

/// Where the emailed links land: `code` on success, `error_description` when
/// the auth service refused the link.
#[derive(Debug, Deserialize)]
pub struct LinkCallback {
    code: Option<String>,
    error_description: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(self::get::login))
        .route("/login/magic-link", post(self::post::magic_link))
        .route("/login/password", post(self::post::password))
        .route("/auth/complete", get(self::get::callback))
        .route("/signup", get(self::get::signup).post(self::post::signup))
        .route(
            "/forgot-password",
            get(self::get::forgot_password).post(self::post::forgot_password),
        )
        .route("/logout", get(self::get::logout))
}

/// Routes that need a signed-in user; the caller adds the login guard.
pub fn protected_router() -> Router<AppState> {
    Router::new().route(
        "/reset-password",
        get(self::get::reset_password).post(self::post::reset_password),
    )
}

/// Message for a failed auth-service call: the service's own wording for
/// rejected input, `fallback` for everything else.
fn service_message(err: &SupabaseError, fallback: &str) -> String {
    match err {
        SupabaseError::Api { status, message } if status.is_client_error() => message.clone(),
        _ => fallback.to_string(),
    }
}

/// Starts a PKCE code flow, keeping the verifier for `/auth/complete`.
async fn begin_email_link(session: &Session, next: Option<String>) -> Result<String, AppError> {
    let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
    session.insert(PKCE_VERIFIER_KEY, verifier.secret()).await?;
    session.insert(NEXT_URL_KEY, next).await?;
    Ok(challenge.as_str().to_string())
}

fn callback_url(state: &AppState) -> String {
    format!("{}/auth/complete", state.config.site_url)
}

fn login_page(
    state: &AppState,
    next: Option<String>,
    error: Option<String>,
    notice: Option<&str>,
) -> Result<Response, AppError> {
    let html = state.render(
        "login.html",
        context! {
            next => next,
            error => error,
            notice => notice,
        },
    )?;
    Ok(html.into_response())
}

mod post {
    use super::*;

    pub async fn magic_link(
        State(state): State<AppState>,
        session: Session,
        Form(form): Form<EmailForm>,
    ) -> Result<Response, AppError> {
        let next = safe_next(form.next.clone());
        if let Err(err) = form.validate() {
            return login_page(&state, next, Some(err.user_message()), None);
        }

        let challenge = begin_email_link(&session, next.clone()).await?;
        match state
            .supabase
            .send_magic_link(form.email.trim(), &challenge, &callback_url(&state))
            .await
        {
            Ok(()) => login_page(&state, next, None, Some(MAGIC_LINK_SENT)),
            Err(err) => {
                error!("Failed to send magic link: {err}");
                login_page(&state, next, Some(MAGIC_LINK_FAILED.to_string()), None)
            }
        }
    }

    pub async fn password(
        mut auth_session: AuthSession,
        State(state): State<AppState>,
        Form(form): Form<PasswordLoginForm>,
    ) -> Result<Response, AppError> {
        let next = safe_next(form.next.clone());
        if let Err(err) = form.validate() {
            return login_page(&state, next, Some(err.user_message()), None);
        }

        let creds = Credentials::Password {
            email: form.email,
            password: form.password,
        };
        let user = match auth_session.authenticate(creds).await {
            Ok(Some(user)) => user,
            Ok(None) => return login_page(&state, next, Some(INVALID_LOGIN.to_string()), None),
            Err(err) => {
                error!("Password sign-in failed: {err}");
                return login_page(&state, next, Some(INVALID_LOGIN.to_string()), None);
            }
        };

        auth_session.login(&user).await?;
        Ok(Redirect::to(next.as_deref().unwrap_or("/home")).into_response())
    }

    pub async fn signup(
        State(state): State<AppState>,
        Form(form): Form<SignUpForm>,
    ) -> Result<Response, AppError> {
        let render = |error: String| {
            state.render(
                "signup.html",
                context! {
                    name => &form.name,
                    email => &form.email,
                    error => error,
                },
            )
        };

        if let Err(err) = form.validate() {
            return Ok(render(err.user_message())?.into_response());
        }

        let email = form.email.trim().to_lowercase();
        let redirect_to = format!("{}/", state.config.site_url);
        let response = match state
            .supabase
            .sign_up(form.name.trim(), &email, &form.password, &redirect_to)
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!("Sign-up rejected for {email}: {err}");
                return Ok(render(service_message(&err, SIGNUP_FAILED))?.into_response());
            }
        };

        let auth_id = response.user().id;
        match volunteers::find_by_email(&state.db, &email).await? {
            Some(volunteer) => {
                debug!("Linking existing volunteer {} to new sign-up", volunteer.id);
                volunteers::link_auth_id(&state.db, volunteer, auth_id).await?;
            }
            None => {
                volunteers::create(&state.db, &form.name, &email, auth_id).await?;
            }
        }

        Ok(state
            .render("login.html", context! { notice => SIGNUP_SENT })?
            .into_response())
    }

    pub async fn forgot_password(
        State(state): State<AppState>,
        session: Session,
        Form(form): Form<EmailForm>,
    ) -> Result<Response, AppError> {
        let render = |error: Option<String>, notice: Option<&str>| {
            state.render(
                "forgot_password.html",
                context! { error => error, notice => notice },
            )
        };

        if let Err(err) = form.validate() {
            return Ok(render(Some(err.user_message()), None)?.into_response());
        }

        // Recovery links sign the volunteer in, then land on the reset form.
        let challenge = begin_email_link(&session, Some("/reset-password".to_string())).await?;
        match state
            .supabase
            .send_password_reset(form.email.trim(), &challenge, &callback_url(&state))
            .await
        {
            Ok(()) => Ok(render(None, Some(RESET_SENT))?.into_response()),
            Err(err) => {
                error!("Failed to send password reset: {err}");
                let message = service_message(&err, RESET_FAILED);
                Ok(render(Some(message), None)?.into_response())
            }
        }
    }

    pub async fn reset_password(
        auth_session: AuthSession,
        State(state): State<AppState>,
        session: Session,
        Form(form): Form<ResetPasswordForm>,
    ) -> Result<Response, AppError> {
        let render = |error: String| state.render("reset_password.html", context! { error => error });

        if let Err(err) = form.validate() {
            return Ok(render(err.user_message())?.into_response());
        }

        let mut user = signed_in(&auth_session)?;
        ensure_valid_access_token(&mut user, &state.db, &state.supabase).await?;

        if let Err(err) = state
            .supabase
            .update_password(&user.access_token, &form.password)
            .await
        {
            warn!("Password update failed for app user {}: {err}", user.id);
            return Ok(render(service_message(&err, PASSWORD_UPDATE_FAILED))?.into_response());
        }

        set_flash(&session, FlashLevel::Success, PASSWORD_UPDATED).await?;
        Ok(Redirect::to("/home").into_response())
    }
}

mod get {
    use super::*;

    pub async fn login(
        auth_session: AuthSession,
        State(state): State<AppState>,
        session: Session,
        Query(NextUrl { next }): Query<NextUrl>,
    ) -> Result<Response, AppError> {
        if auth_session.user.is_some() {
            return Ok(Redirect::to("/home").into_response());
        }

        let flash = take_flash(&session).await?;
        let html = state.render(
            "login.html",
            context! {
                next => safe_next(next),
                flash => flash,
            },
        )?;
        Ok(html.into_response())
    }

    pub async fn callback(
        mut auth_session: AuthSession,
        State(state): State<AppState>,
        session: Session,
        Query(LinkCallback {
            code,
            error_description,
        }): Query<LinkCallback>,
    ) -> Result<Response, AppError> {
        if let Some(description) = error_description {
            debug!("Auth service refused email link: {description}");
            return login_page(&state, None, Some(description), None);
        }

        let verifier = session.remove::<String>(PKCE_VERIFIER_KEY).await?;
        let (Some(code), Some(verifier)) = (code, verifier) else {
            return login_page(&state, None, Some(LINK_EXPIRED.to_string()), None);
        };

        let user = match auth_session
            .authenticate(Credentials::EmailLink { code, verifier })
            .await
        {
            Ok(Some(user)) => user,
            Ok(None) => return login_page(&state, None, Some(LINK_EXPIRED.to_string()), None),
            Err(err) => {
                error!("Email link sign-in failed: {err}");
                return login_page(&state, None, Some(LINK_EXPIRED.to_string()), None);
            }
        };

        auth_session.login(&user).await?;

        let next = session.remove::<Option<String>>(NEXT_URL_KEY).await?.flatten();
        Ok(Redirect::to(next.as_deref().unwrap_or("/home")).into_response())
    }

    pub async fn signup(State(state): State<AppState>) -> Result<Response, AppError> {
        Ok(state.render("signup.html", context! {})?.into_response())
    }

    pub async fn forgot_password(State(state): State<AppState>) -> Result<Response, AppError> {
        Ok(state
            .render("forgot_password.html", context! {})?
            .into_response())
    }

    pub async fn reset_password(State(state): State<AppState>) -> Result<Response, AppError> {
        Ok(state
            .render("reset_password.html", context! {})?
            .into_response())
    }

    pub async fn logout(
        mut auth_session: AuthSession,
        State(state): State<AppState>,
    ) -> Result<Response, AppError> {
        if let Some(user) = auth_session.user.clone() {
            // Best effort: the local session goes regardless.
            if let Err(err) = state.supabase.sign_out(&user.access_token).await {
                warn!("Remote sign-out failed for app user {}: {err}", user.id);
            }
        }

        auth_session.logout().await?;
        Ok(Redirect::to("/").into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn rejected_input_shows_service_wording() {
        let err = SupabaseError::Api {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: "User already registered".into(),
        };
        assert_eq!(service_message(&err, SIGNUP_FAILED), "User already registered");
    }

    #[test]
    fn server_failures_fall_back() {
        let err = SupabaseError::Api {
            status: StatusCode::BAD_GATEWAY,
            message: "upstream timeout".into(),
        };
        assert_eq!(service_message(&err, RESET_FAILED), RESET_FAILED);
    }
}
