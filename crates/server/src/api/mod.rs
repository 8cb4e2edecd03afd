//! HTTP surface of the preferences module: query parsing, mode dispatch and
//! the error boundary that turns `AdminError` into the reply each mode expects.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use server_api::{
    error::AdminError,
    maintenance::DatabaseExport,
    message::{MessagePresenter, RenderedMessage},
    provisioning::NewOrganizationRequest,
    ApiContext, RequestContext,
};
use shared::{
    domain::{OrganizationId, UserId},
    error::ErrorCode,
    protocol::{PreferencesMode, SaveResponse, SubmittedForm},
};
use tracing::warn;

use crate::app_state::AppState;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct FunctionQuery {
    mode: Option<String>,
    form: Option<String>,
    user_id: Option<i64>,
    org_id: Option<i64>,
    #[serde(default)]
    orga_short_name: String,
    #[serde(default)]
    orga_long_name: String,
    #[serde(default)]
    orga_email: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct OverviewQuery {
    user_id: Option<i64>,
    org_id: Option<i64>,
    show_option: Option<String>,
}

pub(crate) async fn preferences_function(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FunctionQuery>,
    body: Bytes,
) -> Response {
    let ctx = &state.api;
    let Some(mode) = query
        .mode
        .as_deref()
        .and_then(|mode| mode.parse::<PreferencesMode>().ok())
    else {
        return error_response(ctx, None, None, AdminError::InvalidPageView).await;
    };

    let mut request = match authorize(ctx, query.user_id, query.org_id).await {
        Ok(request) => request,
        Err(err) => return error_response(ctx, Some(mode), None, err).await,
    };

    let submitted = parse_form_body(&body);
    match run_mode(ctx, &mut request, mode, &query, submitted).await {
        Ok(response) => response,
        Err(err) => error_response(ctx, Some(mode), Some(&request), err).await,
    }
}

pub(crate) async fn preferences_overview(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OverviewQuery>,
) -> Response {
    let ctx = &state.api;
    let request = match authorize(ctx, query.user_id, query.org_id).await {
        Ok(request) => request,
        Err(err) => return error_response(ctx, None, None, err).await,
    };
    match server_api::preferences_page(ctx, &request, query.show_option.as_deref()).await {
        Ok(html) => Html(html).into_response(),
        Err(err) => error_response(ctx, None, Some(&request), err).await,
    }
}

async fn authorize(
    ctx: &ApiContext,
    user_id: Option<i64>,
    org_id: Option<i64>,
) -> Result<RequestContext, AdminError> {
    let user_id = user_id.ok_or(AdminError::NotAuthorized)?;
    server_api::resolve_request(ctx, UserId(user_id), org_id.map(OrganizationId)).await
}

async fn run_mode(
    ctx: &ApiContext,
    request: &mut RequestContext,
    mode: PreferencesMode,
    query: &FunctionQuery,
    submitted: SubmittedForm,
) -> Result<Response, AdminError> {
    let response = match mode {
        PreferencesMode::Save => {
            let form = server_api::parse_form(query.form.as_deref())?;
            Json(server_api::save_preferences(ctx, request, form, submitted).await?).into_response()
        }
        PreferencesMode::HtmlForm => {
            let form = server_api::parse_form(query.form.as_deref())?;
            Html(server_api::form_markup(ctx, request, form).await?).into_response()
        }
        PreferencesMode::NewOrgDialog => {
            let values = NewOrganizationRequest {
                orga_short_name: query.orga_short_name.clone(),
                orga_long_name: query.orga_long_name.clone(),
                orga_email: query.orga_email.clone(),
            };
            Html(server_api::new_organization_dialog(ctx, request, &values)?).into_response()
        }
        PreferencesMode::NewOrgCreate => {
            Html(server_api::create_organization(ctx, request, &submitted).await?).into_response()
        }
        PreferencesMode::Htaccess => server_api::protect_data_folder(ctx, request)
            .await
            .into_response(),
        PreferencesMode::TestEmail => {
            message_response(StatusCode::OK, server_api::send_test_email(ctx, request).await?)
        }
        PreferencesMode::Backup => attachment(server_api::backup_database(ctx).await?),
    };
    Ok(response)
}

/// Replies in the shape the failed mode promises: JSON for `save`, plain
/// text for `html_form` and a message page for everything else.
async fn error_response(
    ctx: &ApiContext,
    mode: Option<PreferencesMode>,
    request: Option<&RequestContext>,
    err: AdminError,
) -> Response {
    let code = err.code();
    if code == ErrorCode::DeliveryFailure {
        warn!(error = %err, "test email failed");
    }
    let status = status_for(code);

    let fallback;
    let (l10n, page) = match request {
        Some(request) => (&request.l10n, request.page(ctx)),
        None => {
            fallback = ctx.default_localization();
            (&fallback, ctx.fallback_page())
        }
    };
    let message = err.localized_message(l10n);

    match mode {
        Some(PreferencesMode::Save) => (status, Json(SaveResponse::error(message))).into_response(),
        Some(PreferencesMode::HtmlForm) => (status, message).into_response(),
        _ => {
            let rendered = MessagePresenter::new(l10n, page).render(&message, None).await;
            message_response(status, rendered)
        }
    }
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::NotAuthorized => StatusCode::FORBIDDEN,
        ErrorCode::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorCode::DuplicateResource => StatusCode::CONFLICT,
        ErrorCode::DeliveryFailure => StatusCode::BAD_GATEWAY,
        ErrorCode::UnsupportedConfiguration => StatusCode::NOT_IMPLEMENTED,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::TransactionFailure | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn message_response(status: StatusCode, message: RenderedMessage) -> Response {
    let content_type = message.content_type();
    (status, [(header::CONTENT_TYPE, content_type)], message.into_body()).into_response()
}

fn attachment(export: DatabaseExport) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", export.file_name);
    (
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.content,
    )
        .into_response()
}

fn parse_form_body(body: &[u8]) -> SubmittedForm {
    url::form_urlencoded::parse(body).into_owned().collect()
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
