use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod auth;

#[derive(Debug, thiserror::Error)]
pub enum SupabaseError {
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error("auth service returned {status}: {message}")]
    Api { status: StatusCode, message: String },
}

/// Client for the hosted backend's auth REST API.
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        let http = reqwest::ClientBuilder::new()
            // The auth service never needs redirects followed on our side.
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url: base_url.into(),
            anon_key: anon_key.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub user: AuthUser,
}

/// Sign-up answers with a full session when e-mail confirmation is off and
/// with the bare user otherwise.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignUpResponse {
    Session(AuthSessionTokens),
    User(AuthUser),
}

impl SignUpResponse {
    pub fn user(&self) -> &AuthUser {
        match self {
            SignUpResponse::Session(session) => &session.user,
            SignUpResponse::User(user) => user,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct ApiErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

impl ApiErrorBody {
    fn into_message(self) -> Option<String> {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
    }
}

/// Turns a non-success response into `SupabaseError::Api`.
async fn check(response: reqwest::Response) -> Result<reqwest::Response, SupabaseError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&text)
        .ok()
        .and_then(ApiErrorBody::into_message)
        .unwrap_or(text);

    Err(SupabaseError::Api { status, message })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_up_without_confirmation_returns_session() {
        let body = serde_json::json!({
            "access_token": "at",
            "refresh_token": "rt",
            "expires_in": 3600,
            "token_type": "bearer",
            "user": { "id": "4b0c9ae8-0d1c-4b7a-9d7a-0c7b2f7f1e11", "email": "a@b.sg" }
        });
        let parsed: SignUpResponse = serde_json::from_value(body).unwrap();
        assert!(matches!(parsed, SignUpResponse::Session(_)));
        assert_eq!(parsed.user().email.as_deref(), Some("a@b.sg"));
    }

    #[test]
    fn sign_up_with_confirmation_returns_user() {
        let body = serde_json::json!({
            "id": "4b0c9ae8-0d1c-4b7a-9d7a-0c7b2f7f1e11",
            "email": "a@b.sg",
            "confirmation_sent_at": "2024-11-02T10:00:00Z"
        });
        let parsed: SignUpResponse = serde_json::from_value(body).unwrap();
        assert!(matches!(parsed, SignUpResponse::User(_)));
    }

    #[test]
    fn error_body_prefers_description() {
        let body: ApiErrorBody = serde_json::from_str(
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        )
        .unwrap();
        assert_eq!(body.into_message().as_deref(), Some("Invalid login credentials"));
    }
}
