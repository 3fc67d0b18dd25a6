use chrono::FixedOffset;
use sea_orm::{DatabaseConnection, DbErr};
use tracing::{debug, info};

use crate::data::{activities, care_summary};

pub mod openai;
pub mod prompt;
pub mod sections;

pub use openai::OpenAiClient;
pub use sections::parse_summary;

use prompt::{SYSTEM_PROMPT, build_prompt};

/// How many of the latest visits feed a summary.
pub const RECENT_ACTIVITY_LIMIT: u64 = 5;

#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    #[error(transparent)]
    Database(#[from] DbErr),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("completion API returned {status}: {body}")]
    Completion {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("completion API returned no text")]
    EmptyCompletion,

    #[error("senior {0} has no activities to summarise")]
    NoActivities(i32),
}

/// Regenerates and stores the care summary for one senior.
///
/// Any failure returns before the write, so the stored summary is only ever
/// replaced by a complete new one. Nothing is retried.
pub async fn refresh_care_summary(
    db: &DatabaseConnection,
    client: &OpenAiClient,
    senior_id: i32,
    offset: &FixedOffset,
) -> Result<String, SummaryError> {
    let recent = activities::recent_for_senior(db, senior_id, RECENT_ACTIVITY_LIMIT).await?;
    if recent.is_empty() {
        return Err(SummaryError::NoActivities(senior_id));
    }
    debug!("Summarising {} visits for senior {senior_id}", recent.len());

    let prompt = build_prompt(&recent, offset);
    let summary = client.complete(SYSTEM_PROMPT, &prompt).await?;

    care_summary::upsert(db, senior_id, &summary).await?;
    info!("Care summary refreshed for senior {senior_id}");

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::activity::{self, ActivityCategory};
    use crate::test_support::serve;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use chrono::TimeZone;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};

    type Captured = Arc<Mutex<Option<Value>>>;

    async fn fake_completion_api(status: StatusCode, body: Value) -> (String, Captured) {
        let seen: Captured = Arc::new(Mutex::new(None));
        let captured = seen.clone();
        let app = Router::new().route(
            "/chat/completions",
            post(move |Json(request): Json<Value>| {
                let captured = captured.clone();
                let body = body.clone();
                async move {
                    *captured.lock().unwrap() = Some(request);
                    (status, Json(body))
                }
            }),
        );

        (serve(app).await, seen)
    }

    fn sgt() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    fn visit(id: i32, day: u32) -> activity::Model {
        let date = sgt().with_ymd_and_hms(2024, 5, day, 9, 30, 0).unwrap();
        activity::Model {
            id,
            volunteer_id: 3,
            senior_id: 11,
            category: ActivityCategory::Delivery,
            issue: Some(format!("issue {id}")),
            resolved: None,
            activity_date: date,
            created_at: date,
        }
    }

    #[tokio::test]
    async fn stores_completion_verbatim() {
        let text = "Recent visits summary:\n- 5/1/2024: ok\n\nAction items:\n- No outstanding action items";
        let (base_url, seen) = fake_completion_api(
            StatusCode::OK,
            json!({ "choices": [{ "message": { "role": "assistant", "content": text } }] }),
        )
        .await;
        let client = OpenAiClient::new(base_url, "sk-test", "gpt-3.5-turbo");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![visit(2, 8), visit(1, 1)]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let summary = refresh_care_summary(&db, &client, 11, &sgt()).await.unwrap();
        assert_eq!(summary, text);

        let request = seen.lock().unwrap().take().unwrap();
        assert_eq!(request["model"], "gpt-3.5-turbo");
        assert_eq!(request["messages"][0]["role"], "system");
        assert_eq!(request["messages"][1]["role"], "user");
        let prompt = request["messages"][1]["content"].as_str().unwrap();
        assert!(prompt.find("5/1/2024").unwrap() < prompt.find("5/8/2024").unwrap());

        // One select, one upsert keyed on the senior.
        let log = db.into_transaction_log();
        assert_eq!(log.len(), 2);
        let upsert = &log[1].statements()[0].sql;
        assert!(upsert.starts_with(r#"INSERT INTO "care_summary""#));
        assert!(upsert.contains(r#"ON CONFLICT ("senior_id") DO UPDATE"#));
    }

    #[tokio::test]
    async fn api_failure_leaves_summary_untouched() {
        let (base_url, _) = fake_completion_api(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": { "message": "overloaded" } }),
        )
        .await;
        let client = OpenAiClient::new(base_url, "sk-test", "gpt-3.5-turbo");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![visit(1, 1)]])
            .into_connection();

        let err = refresh_care_summary(&db, &client, 11, &sgt())
            .await
            .unwrap_err();
        assert!(matches!(err, SummaryError::Completion { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(db.into_transaction_log().len(), 1);
    }

    #[tokio::test]
    async fn empty_choices_are_an_error() {
        let (base_url, _) = fake_completion_api(StatusCode::OK, json!({ "choices": [] })).await;
        let client = OpenAiClient::new(base_url, "sk-test", "gpt-3.5-turbo");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![visit(1, 1)]])
            .into_connection();

        let err = refresh_care_summary(&db, &client, 11, &sgt())
            .await
            .unwrap_err();
        assert!(matches!(err, SummaryError::EmptyCompletion));
        assert_eq!(db.into_transaction_log().len(), 1);
    }

    #[tokio::test]
    async fn no_activities_skips_the_api() {
        // Nothing listens here; reaching the API would surface as an Http error.
        let client = OpenAiClient::new("http://127.0.0.1:9", "sk-test", "gpt-3.5-turbo");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<activity::Model>::new()])
            .into_connection();

        let err = refresh_care_summary(&db, &client, 11, &sgt())
            .await
            .unwrap_err();
        assert!(matches!(err, SummaryError::NoActivities(11)));
    }
}
