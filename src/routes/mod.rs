pub mod activity;
pub mod carecard;
pub mod functions;
pub mod home;
pub mod search;
pub mod visits;

use axum_login::tower_sessions::Session;
use serde::{Deserialize, Serialize};

use crate::auth::user::AuthSession;
use crate::entities::app_user;
use crate::error::AppError;

const FLASH_KEY: &str = "flash";

/// A notice shown once on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Error,
}

pub async fn set_flash(
    session: &Session,
    level: FlashLevel,
    message: impl Into<String>,
) -> Result<(), AppError> {
    let flash = Flash {
        level,
        message: message.into(),
    };
    session.insert(FLASH_KEY, flash).await?;
    Ok(())
}

pub async fn take_flash(session: &Session) -> Result<Option<Flash>, AppError> {
    Ok(session.remove::<Flash>(FLASH_KEY).await?)
}

/// The signed-in user. Routes behind `login_required!` always have one.
pub fn signed_in(auth_session: &AuthSession) -> Result<app_user::Model, AppError> {
    auth_session.user.clone().ok_or(AppError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flash_round_trips_through_session_json() {
        let flash = Flash {
            level: FlashLevel::Success,
            message: "Visit deleted.".into(),
        };
        let value = serde_json::to_value(&flash).unwrap();
        assert_eq!(value["level"], "success");
        assert_eq!(serde_json::from_value::<Flash>(value).unwrap(), flash);
    }

    #[test]
    fn flash_level_serialises_lowercase() {
        let value = serde_json::to_value(FlashLevel::Error).unwrap();
        assert_eq!(value, serde_json::json!("error"));
    }
}
