//! `POST /functions/v1/care-summary`, the endpoint browser clients call to
//! regenerate a summary, plus the cross-origin policy that guards it.

use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Request, State},
    http::{
        HeaderName, HeaderValue, Method, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE, ORIGIN},
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{debug, error};

use crate::{auth::user::AuthSession, router::AppState, summary};

pub const SENIOR_ID_REQUIRED: &str = "senior_id is required";
const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(86400);

/// Browser clients send the id either as a number or as a numeric string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SeniorId {
    Number(i32),
    Text(String),
}

impl SeniorId {
    fn value(self) -> Option<i32> {
        match self {
            SeniorId::Number(id) => Some(id),
            SeniorId::Text(raw) => raw.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CareSummaryRequest {
    senior_id: Option<SeniorId>,
}

/// Reads `senior_id` from a JSON body. Zero counts as missing.
fn senior_id_from(body: &[u8]) -> Option<i32> {
    serde_json::from_slice::<CareSummaryRequest>(body)
        .ok()
        .and_then(|req| req.senior_id)
        .and_then(SeniorId::value)
        .filter(|id| *id != 0)
}

fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// A signed-in session, or a bearer token the auth service recognises.
async fn is_authorised(
    state: &AppState,
    auth_session: &AuthSession,
    bearer: Option<&str>,
) -> bool {
    if auth_session.user.is_some() {
        return true;
    }
    let Some(token) = bearer else {
        return false;
    };

    match state.supabase.get_user(token).await {
        Ok(user) => {
            debug!("Function call authorised for auth user {}", user.id);
            true
        }
        Err(err) => {
            debug!("Bearer token rejected: {err}");
            false
        }
    }
}

pub async fn care_summary(
    State(state): State<AppState>,
    auth_session: AuthSession,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    body: Bytes,
) -> Response {
    let token = bearer.as_ref().map(|TypedHeader(auth)| auth.token());
    if !is_authorised(&state, &auth_session, token).await {
        return json_error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    let Some(senior_id) = senior_id_from(&body) else {
        return json_error(StatusCode::BAD_REQUEST, SENIOR_ID_REQUIRED);
    };

    match summary::refresh_care_summary(
        &state.db,
        &state.openai,
        senior_id,
        &state.config.display_offset,
    )
    .await
    {
        Ok(summary) => Json(json!({ "summary": summary })).into_response(),
        Err(err) => {
            error!("Care summary function failed for senior {senior_id}: {err}");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

pub fn is_allowed_origin(allowed: &[String], origin: Option<&HeaderValue>) -> bool {
    origin
        .and_then(|origin| origin.to_str().ok())
        .is_some_and(|origin| allowed.iter().any(|a| a == origin))
}

/// Preflights from origins outside the list get a bare 403.
async fn reject_foreign_preflight(
    State(allowed): State<Arc<Vec<String>>>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS
        && !is_allowed_origin(&allowed, request.headers().get(ORIGIN))
    {
        debug!("Rejected preflight from {:?}", request.headers().get(ORIGIN));
        return StatusCode::FORBIDDEN.into_response();
    }
    next.run(request).await
}

fn cors_layer(allowed: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            CONTENT_TYPE,
        ])
        .max_age(PREFLIGHT_MAX_AGE)
}

/// Wraps `router` so only `allowed` origins may call it from a browser.
pub fn with_origin_policy<S>(router: Router<S>, allowed: Vec<String>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let cors = cors_layer(&allowed);
    router.layer(cors).layer(middleware::from_fn_with_state(
        Arc::new(allowed),
        reject_foreign_preflight,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{self, header},
        routing::post,
    };
    use crate::{
        entities::activity::{self, ActivityCategory},
        summary::SummaryError,
        test_support::{self, GOOD_TOKEN, UNREACHABLE},
    };
    use chrono::{FixedOffset, TimeZone};
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use serde_json::Value;
    use tower::ServiceExt;

    const APP_ORIGIN: &str = "https://carecard.example.sg";

    fn app() -> Router {
        with_origin_policy(
            Router::new().route("/functions/v1/care-summary", post(|| async { "ok" })),
            vec![APP_ORIGIN.to_string()],
        )
    }

    fn preflight(origin: &str) -> Request<Body> {
        http::Request::builder()
            .method(Method::OPTIONS)
            .uri("/functions/v1/care-summary")
            .header(ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn foreign_preflight_is_forbidden() {
        let response = app()
            .oneshot(preflight("https://evil.example"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .is_none()
        );
    }

    #[tokio::test]
    async fn allowed_preflight_echoes_origin() {
        let response = app().oneshot(preflight(APP_ORIGIN)).await.unwrap();
        assert!(response.status().is_success());

        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], APP_ORIGIN);
        assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], "86400");
        let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap();
        assert!(methods.contains("POST"));
        let allowed_headers = headers[header::ACCESS_CONTROL_ALLOW_HEADERS].to_str().unwrap();
        assert!(allowed_headers.contains("x-client-info"));
        assert!(allowed_headers.contains("apikey"));
    }

    #[tokio::test]
    async fn post_from_allowed_origin_gets_cors_header() {
        let request = http::Request::builder()
            .method(Method::POST)
            .uri("/functions/v1/care-summary")
            .header(ORIGIN, APP_ORIGIN)
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], APP_ORIGIN);
    }

    #[test]
    fn origin_must_match_exactly() {
        let allowed = vec![APP_ORIGIN.to_string()];
        assert!(is_allowed_origin(&allowed, Some(&HeaderValue::from_static(APP_ORIGIN))));
        assert!(!is_allowed_origin(
            &allowed,
            Some(&HeaderValue::from_static("https://carecard.example.sg.evil"))
        ));
        assert!(!is_allowed_origin(&allowed, None));
    }

    #[test]
    fn senior_id_is_read_from_body() {
        assert_eq!(senior_id_from(br#"{"senior_id": 12}"#), Some(12));
        assert_eq!(senior_id_from(br#"{"senior_id": "12"}"#), Some(12));
        assert_eq!(senior_id_from(br#"{"senior_id": 0}"#), None);
        assert_eq!(senior_id_from(br#"{"senior_id": "0"}"#), None);
        assert_eq!(senior_id_from(br#"{"senior_id": "twelve"}"#), None);
        assert_eq!(senior_id_from(br#"{}"#), None);
        assert_eq!(senior_id_from(b"not json"), None);
    }

    fn handler_app(db: DatabaseConnection, supabase_url: &str, openai_url: &str) -> Router {
        let state = test_support::app_state(Arc::new(db), supabase_url, openai_url);
        test_support::with_sessions(
            Router::new().route("/functions/v1/care-summary", post(care_summary)),
            state,
        )
    }

    fn call(body: &str, token: Option<&str>) -> Request<Body> {
        let mut request = http::Request::builder()
            .method(Method::POST)
            .uri("/functions/v1/care-summary")
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        request.body(Body::from(body.to_string())).unwrap()
    }

    fn visit(id: i32) -> activity::Model {
        let date = FixedOffset::east_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 5, id as u32, 9, 0, 0)
            .unwrap();
        activity::Model {
            id,
            volunteer_id: 3,
            senior_id: 11,
            category: ActivityCategory::Delivery,
            issue: Some("Needs groceries".into()),
            resolved: None,
            activity_date: date,
            created_at: date,
        }
    }

    #[tokio::test]
    async fn anonymous_caller_is_unauthorized() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let response = handler_app(db, UNREACHABLE, UNREACHABLE)
            .oneshot(call(r#"{"senior_id": 11}"#, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            test_support::json_body(response).await,
            json!({ "error": "Unauthorized" })
        );
    }

    #[tokio::test]
    async fn unknown_bearer_token_is_unauthorized() {
        let auth_url = test_support::fake_auth_api().await;
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let response = handler_app(db, &auth_url, UNREACHABLE)
            .oneshot(call(r#"{"senior_id": 11}"#, Some("stolen")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_senior_id_is_a_bad_request() {
        let auth_url = test_support::fake_auth_api().await;
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let response = handler_app(db, &auth_url, UNREACHABLE)
            .oneshot(call(r#"{"senior_id": null}"#, Some(GOOD_TOKEN)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            test_support::json_body(response).await,
            json!({ "error": SENIOR_ID_REQUIRED })
        );
    }

    #[tokio::test]
    async fn failed_refresh_is_a_json_server_error() {
        let auth_url = test_support::fake_auth_api().await;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<activity::Model>::new()])
            .into_connection();
        let response = handler_app(db, &auth_url, UNREACHABLE)
            .oneshot(call(r#"{"senior_id": 11}"#, Some(GOOD_TOKEN)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            test_support::json_body(response).await,
            json!({ "error": SummaryError::NoActivities(11).to_string() })
        );
    }

    #[tokio::test]
    async fn returns_the_new_summary() {
        let text = "Recent visits summary:\n- 5/2/2024: groceries\n\nAction items:\n- Restock fridge";
        let auth_url = test_support::fake_auth_api().await;
        let openai_url =
            test_support::fake_completion_api(StatusCode::OK, test_support::completion(text)).await;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![visit(2), visit(1)]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();
        let response = handler_app(db, &auth_url, &openai_url)
            .oneshot(call(r#"{"senior_id": "11"}"#, Some(GOOD_TOKEN)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = test_support::json_body(response).await;
        assert_eq!(body["summary"], text);
    }
}
