//! Fakes for handler tests: app state over a mock database, in-memory
//! sessions and local stand-ins for the auth and completion services.

use std::sync::Arc;

use axum::{
    Json, Router,
    http::{StatusCode, header::SET_COOKIE},
    response::Response,
    routing::{get, post},
};
use axum_login::{
    AuthManagerLayerBuilder,
    tower_sessions::{MemoryStore, SessionManagerLayer},
};
use chrono::FixedOffset;
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use crate::{
    auth::user::Backend,
    config::Config,
    router::{AppState, setup_templates},
    summary::OpenAiClient,
    supabase::SupabaseClient,
};

/// Nothing listens here.
pub const UNREACHABLE: &str = "http://127.0.0.1:9";
pub const GOOD_TOKEN: &str = "good-token";

/// Serves `app` on an ephemeral local port and returns its base URL.
pub async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Auth service that knows exactly one access token.
pub async fn fake_auth_api() -> String {
    serve(Router::new().route(
        "/auth/v1/user",
        get(|headers: axum::http::HeaderMap| async move {
            let bearer = format!("Bearer {GOOD_TOKEN}");
            if headers.get("authorization").is_some_and(|v| v == bearer.as_str()) {
                (
                    StatusCode::OK,
                    Json(json!({
                        "id": "5b0c9f3e-8a51-4c2e-9d8f-2f6f0d9a1b77",
                        "email": "mei@example.sg",
                    })),
                )
            } else {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "msg": "invalid JWT" })),
                )
            }
        }),
    ))
    .await
}

/// Completion API that always answers with `status` and `body`.
pub async fn fake_completion_api(status: StatusCode, body: Value) -> String {
    serve(Router::new().route(
        "/chat/completions",
        post(move || {
            let body = body.clone();
            async move { (status, Json(body)) }
        }),
    ))
    .await
}

pub fn completion(text: &str) -> Value {
    json!({ "choices": [{ "message": { "role": "assistant", "content": text } }] })
}

pub fn config() -> Config {
    Config {
        database_url: "postgres://localhost/carecard_test".into(),
        rust_log: "carecard=debug".into(),
        bind_addr: ([127, 0, 0, 1], 0).into(),
        site_url: "http://localhost:3000".into(),
        supabase_url: UNREACHABLE.into(),
        supabase_anon_key: "anon".into(),
        openai_api_key: "sk-test".into(),
        openai_base_url: UNREACHABLE.into(),
        openai_model: "gpt-3.5-turbo".into(),
        allowed_origins: vec!["http://localhost:3000".into()],
        display_offset: FixedOffset::east_opt(8 * 3600).unwrap(),
        run_migrations: false,
        secure_cookies: false,
    }
}

pub fn app_state(db: Arc<DatabaseConnection>, supabase_url: &str, openai_url: &str) -> AppState {
    let config = Config {
        supabase_url: supabase_url.into(),
        openai_base_url: openai_url.into(),
        ..config()
    };
    AppState {
        db,
        supabase: SupabaseClient::new(&config.supabase_url, &config.supabase_anon_key),
        openai: OpenAiClient::new(
            &config.openai_base_url,
            &config.openai_api_key,
            &config.openai_model,
        ),
        templates: Arc::new(setup_templates()),
        config: Arc::new(config),
    }
}

/// Finishes `router` with `state` behind the auth layer on in-memory sessions.
pub fn with_sessions(router: Router<AppState>, state: AppState) -> Router {
    let backend = Backend::new(state.db.clone(), state.supabase.clone());
    let session_layer = SessionManagerLayer::new(MemoryStore::default()).with_secure(false);
    let auth_layer = AuthManagerLayerBuilder::new(backend, session_layer).build();
    router.with_state(state).layer(auth_layer)
}

/// The `name=value` pair of the session cookie a response sets.
pub fn session_cookie(response: &Response) -> String {
    let header = response.headers()[SET_COOKIE].to_str().unwrap();
    header.split(';').next().unwrap().to_string()
}

pub async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
