use async_session::async_trait;
use axum_login::{AuthUser, AuthnBackend, UserId};
use chrono::{TimeDelta, Utc};
use sea_orm::{ActiveValue::*, IntoActiveModel, prelude::*};
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use std::sync::Arc;
use tracing::debug;

use crate::data::volunteers;
use crate::entities::app_user;
use crate::supabase::{AuthSessionTokens, SupabaseClient, SupabaseError};

/// Tokens this close to expiry are refreshed before use.
const EXPIRY_LEEWAY_SECS: i64 = 30;

impl AuthUser for app_user::Model {
    type Id = i32;

    fn id(&self) -> Self::Id {
        self.id
    }

    // The auth id is stable across token refreshes, so refreshing does not
    // invalidate the session.
    fn session_auth_hash(&self) -> &[u8] {
        self.auth_id.as_bytes()
    }
}

#[derive(Debug, Clone)]
pub enum Credentials {
    Password { email: String, password: String },
    /// Code from a magic-link or recovery email plus the PKCE verifier we kept.
    EmailLink { code: String, verifier: String },
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error(transparent)]
    Seaorm(sea_orm::DbErr),

    #[error(transparent)]
    Supabase(SupabaseError),
}

#[derive(Debug, Clone)]
pub struct Backend {
    db: Arc<DatabaseConnection>,
    supabase: SupabaseClient,
}

impl Backend {
    pub fn new(db: Arc<DatabaseConnection>, supabase: SupabaseClient) -> Self {
        Self { db, supabase }
    }

    async fn tokens_for(
        &self,
        creds: Credentials,
    ) -> Result<Option<AuthSessionTokens>, BackendError> {
        let result = match creds {
            Credentials::Password { email, password } => {
                self.supabase
                    .sign_in_with_password(email.trim(), &password)
                    .await
            }
            Credentials::EmailLink { code, verifier } => {
                self.supabase.exchange_code(&code, &verifier).await
            }
        };

        match result {
            Ok(tokens) => Ok(Some(tokens)),
            // Wrong password, expired link and the like.
            Err(SupabaseError::Api { status, message }) if status.is_client_error() => {
                debug!("Auth service rejected credentials: {message}");
                Ok(None)
            }
            Err(err) => Err(BackendError::Supabase(err)),
        }
    }
}

#[async_trait]
impl AuthnBackend for Backend {
    type User = app_user::Model;
    type Credentials = Credentials;
    type Error = BackendError;

    async fn authenticate(
        &self,
        creds: Self::Credentials,
    ) -> Result<Option<Self::User>, Self::Error> {
        let Some(tokens) = self.tokens_for(creds).await? else {
            return Ok(None);
        };

        let Some(email) = tokens.user.email.clone() else {
            return Ok(None);
        };

        // Only people with a volunteer record may use the app.
        let volunteer = volunteers::find_by_email(&self.db, &email)
            .await
            .map_err(Self::Error::Seaorm)?;
        let Some(volunteer) = volunteer else {
            debug!("No volunteer record for {email}");
            return Ok(None);
        };
        let volunteer = volunteers::link_auth_id(&self.db, volunteer, tokens.user.id)
            .await
            .map_err(Self::Error::Seaorm)?;

        let token_expires_at = Utc::now().fixed_offset() + TimeDelta::seconds(tokens.expires_in);
        let existing = app_user::Entity::find()
            .filter(app_user::Column::AuthId.eq(tokens.user.id))
            .one(&*self.db)
            .await
            .map_err(Self::Error::Seaorm)?;

        debug!("Handling app user for volunteer {}", volunteer.id);
        let user = match existing {
            Some(user) => {
                let mut user_model = user.into_active_model();
                user_model.volunteer_id = Set(volunteer.id);
                user_model.access_token = Set(tokens.access_token);
                user_model.refresh_token = Set(tokens.refresh_token);
                user_model.token_expires_at = Set(token_expires_at);
                user_model
                    .update(&*self.db)
                    .await
                    .map_err(Self::Error::Seaorm)?
            }
            None => {
                let user_model = app_user::ActiveModel {
                    id: NotSet,
                    volunteer_id: Set(volunteer.id),
                    auth_id: Set(tokens.user.id),
                    access_token: Set(tokens.access_token),
                    refresh_token: Set(tokens.refresh_token),
                    token_expires_at: Set(token_expires_at),
                };
                user_model
                    .insert(&*self.db)
                    .await
                    .map_err(Self::Error::Seaorm)?
            }
        };

        Ok(Some(user))
    }

    async fn get_user(&self, user_id: &UserId<Self>) -> Result<Option<Self::User>, Self::Error> {
        app_user::Entity::find_by_id(*user_id)
            .one(&*self.db)
            .await
            .map_err(Self::Error::Seaorm)
    }
}

// We use a type alias for convenience.
//
// Note that we've supplied our concrete backend here.
pub type AuthSession = axum_login::AuthSession<Backend>;

/// Refreshes the stored token pair when the access token is about to expire.
pub async fn ensure_valid_access_token(
    user: &mut app_user::Model,
    db: &DatabaseConnection,
    supabase: &SupabaseClient,
) -> Result<(), BackendError> {
    let deadline = Utc::now().fixed_offset() + TimeDelta::seconds(EXPIRY_LEEWAY_SECS);
    if user.token_expires_at > deadline {
        return Ok(());
    }

    debug!("Refreshing access token for app user {}", user.id);
    let tokens = supabase
        .refresh_session(&user.refresh_token)
        .await
        .map_err(BackendError::Supabase)?;

    let mut active_model = user.clone().into_active_model();
    active_model.access_token = Set(tokens.access_token);
    active_model.refresh_token = Set(tokens.refresh_token);
    active_model.token_expires_at =
        Set(Utc::now().fixed_offset() + TimeDelta::seconds(tokens.expires_in));
    *user = active_model
        .update(db)
        .await
        .map_err(BackendError::Seaorm)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn user(expires_in: i64) -> app_user::Model {
        app_user::Model {
            id: 1,
            volunteer_id: 2,
            auth_id: Uuid::new_v4(),
            access_token: "at".into(),
            refresh_token: "rt".into(),
            token_expires_at: Utc::now().fixed_offset() + TimeDelta::seconds(expires_in),
        }
    }

    #[tokio::test]
    async fn fresh_token_is_left_alone() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        // Never contacted for a fresh token.
        let supabase = SupabaseClient::new("http://127.0.0.1:9", "anon");
        let mut fresh = user(3600);
        let before = fresh.clone();

        ensure_valid_access_token(&mut fresh, &db, &supabase)
            .await
            .unwrap();
        assert_eq!(fresh, before);
        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn cloned_backends_share_one_connection() {
        let stored = user(3600);
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![stored.clone()], vec![]])
                .into_connection(),
        );
        let backend = Backend::new(db.clone(), SupabaseClient::new("http://127.0.0.1:9", "anon"));
        let other = backend.clone();

        assert_eq!(backend.get_user(&1).await.unwrap(), Some(stored));
        assert_eq!(other.get_user(&2).await.unwrap(), None);

        drop((backend, other));
        let db = Arc::try_unwrap(db).ok().unwrap();
        assert_eq!(db.into_transaction_log().len(), 2);
    }

    #[test]
    fn session_hash_survives_token_refresh() {
        let a = user(10);
        let mut b = a.clone();
        b.access_token = "rotated".into();
        assert_eq!(a.session_auth_hash(), b.session_auth_hash());
    }
}
