use crate::{
    auth::{router as auth_router, user::Backend},
    config::Config,
    error::AppError,
    routes::{activity, carecard, functions, home, search, visits},
    summary::OpenAiClient,
    supabase::SupabaseClient,
    util::asset_loader::AssetLoader,
};
use axum::{
    Router,
    response::Html,
    routing::{get, get_service, post},
};
use axum_login::{
    AuthManagerLayerBuilder, login_required,
    tower_sessions::{
        Expiry, SessionManagerLayer,
        cookie::{SameSite, time},
    },
};
use minijinja::Environment;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use tokio::{signal, task::AbortHandle};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tower_sessions_sqlx_store::PostgresStore;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub supabase: SupabaseClient,
    pub openai: OpenAiClient,
    pub templates: Arc<Environment<'static>>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn render<S: Serialize>(&self, template: &str, ctx: S) -> Result<Html<String>, AppError> {
        let tmpl = self.templates.get_template(template)?;
        Ok(Html(tmpl.render(ctx)?))
    }
}

pub async fn create_router(
    db: DatabaseConnection,
    config: Config,
    session_store: PostgresStore,
) -> anyhow::Result<Router> {
    let db = Arc::new(db);
    let templates = setup_templates();
    let supabase = SupabaseClient::new(&config.supabase_url, &config.supabase_anon_key);
    let openai = OpenAiClient::new(
        &config.openai_base_url,
        &config.openai_api_key,
        &config.openai_model,
    );

    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(config.secure_cookies)
        .with_same_site(SameSite::Lax) // Ensure we send the cookie from the emailed link redirect.
        .with_expiry(Expiry::OnInactivity(time::Duration::days(1)));

    // Auth service.
    //
    // This combines the session layer with our backend to establish the auth
    // service which will provide the auth session as a request extension.
    let backend = Backend::new(db.clone(), supabase.clone());
    let auth_layer = AuthManagerLayerBuilder::new(backend, session_layer).build();

    let allowed_origins = config.allowed_origins.clone();
    let state = AppState {
        db,
        supabase,
        openai,
        templates: Arc::new(templates),
        config: Arc::new(config),
    };

    let protected = Router::new()
        .route("/home", get(home::home))
        .route(
            "/search-carecard",
            get(search::search_page).post(search::search),
        )
        .route("/carecard/{id}", get(carecard::carecard))
        .route("/carecard/{id}/summary", post(carecard::edit_summary))
        .route(
            "/carecard/{id}/summary/refresh",
            post(carecard::refresh_summary),
        )
        .route(
            "/log-activity/{id}",
            get(activity::log_activity_page).post(activity::log_activity),
        )
        .route("/visit-history", get(visits::visit_history))
        .route("/visit-history/{id}", post(visits::edit_visit))
        .route("/visit-history/{id}/delete", post(visits::delete_visit))
        .merge(auth_router::protected_router())
        .route_layer(login_required!(Backend, login_url = "/"));

    let function = functions::with_origin_policy(
        Router::new().route(
            "/functions/v1/care-summary",
            post(functions::care_summary),
        ),
        allowed_origins,
    );

    let app = Router::new()
        .merge(protected)
        .merge(auth_router::router())
        .merge(function)
        .with_state(state)
        .nest_service("/static", get_service(ServeDir::new("static")))
        .layer(auth_layer)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

pub fn setup_templates() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_loader(minijinja::path_loader("templates"));
    let asset_loader = AssetLoader::new("static");
    asset_loader.register(&mut env);
    env
}

pub async fn shutdown_signal(deletion_task_abort_handle: AbortHandle) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { deletion_task_abort_handle.abort() },
        _ = terminate => { deletion_task_abort_handle.abort() },
    }
}
