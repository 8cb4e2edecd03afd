use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Router,
};
use server_api::{
    csrf::{CsrfValidator, SharedTokenCsrf},
    mail::{LogMailer, Mailer, SmtpMailer},
    maintenance::{HtaccessProtector, SqliteDumper},
    paths::InstallPaths,
    ApiContext, FUNCTION_PATH, OVERVIEW_PATH,
};
use storage::Storage;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};

mod api;
mod app_state;
mod config;

use app_state::AppState;
use config::{load_settings, prepare_database_url, Settings};

const MAX_FORM_BYTES: usize = 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await?;
    let api = api_context(&settings, storage)?;
    let app = build_router(Arc::new(AppState { api }));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, public_url = %settings.public_url, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn api_context(settings: &Settings, storage: Storage) -> anyhow::Result<ApiContext> {
    let paths = InstallPaths::new(&settings.install_root);

    let mailer: Arc<dyn Mailer> = match settings.smtp()? {
        Some(smtp) => {
            info!(host = %smtp.host, port = smtp.port, "delivering mail over smtp");
            Arc::new(SmtpMailer::new(&smtp)?)
        }
        None => Arc::new(LogMailer),
    };
    let csrf: Arc<dyn CsrfValidator> = match &settings.csrf_token {
        Some(token) => Arc::new(SharedTokenCsrf::new(token.clone())),
        None => Arc::new(SharedTokenCsrf::random()),
    };

    Ok(ApiContext {
        storage: storage.clone(),
        public_url: settings.public_url.clone(),
        default_language: settings.default_language.clone(),
        mailer,
        protector: Arc::new(HtaccessProtector::new(paths.data_dir())),
        dumper: Arc::new(SqliteDumper::new(storage, paths.backup_dir())),
        csrf,
        paths,
    })
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(
            &format!("/{FUNCTION_PATH}"),
            get(api::preferences_function).post(api::preferences_function),
        )
        .route(&format!("/{OVERVIEW_PATH}"), get(api::preferences_overview))
        .layer(RequestBodyLimitLayer::new(MAX_FORM_BYTES))
        .with_state(state)
}

async fn healthz(State(state): State<Arc<AppState>>) -> (StatusCode, &'static str) {
    match state.api.storage.health_check().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(err) => {
            error!(error = %err, "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
