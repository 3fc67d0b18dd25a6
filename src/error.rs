use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_login::tower_sessions::session;
use sea_orm::DbErr;
use thiserror::Error;

use crate::auth::user::BackendError;
use crate::supabase::SupabaseError;

pub const GENERIC_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Error)]
pub enum AppError {
    /// Rejected locally; the message is shown to the volunteer as-is.
    #[error("{0}")]
    Validation(String),

    #[error("Record not found")]
    NotFound,

    #[error("Not signed in")]
    Unauthorized,

    #[error(transparent)]
    Database(#[from] DbErr),

    #[error(transparent)]
    Template(#[from] minijinja::Error),

    #[error(transparent)]
    Supabase(#[from] SupabaseError),

    #[error(transparent)]
    Session(#[from] session::Error),

    #[error(transparent)]
    Auth(#[from] axum_login::Error<crate::auth::user::Backend>),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Supabase(SupabaseError::Api { status, .. }) if status.is_client_error() => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The text a volunteer sees for this error.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(message) => message.clone(),
            AppError::NotFound => "Record not found".to_string(),
            AppError::Unauthorized => "Please sign in to continue.".to_string(),
            _ => GENERIC_MESSAGE.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {self:?}");
        } else {
            tracing::debug!("Request rejected: {self}");
        }

        (status, self.user_message()).into_response()
    }
}
