pub mod csrf;
pub mod defaults;
pub mod error;
pub mod forms;
pub mod l10n;
pub mod mail;
pub mod maintenance;
pub mod message;
pub mod page;
pub mod paths;
pub mod preferences;
pub mod provisioning;
pub mod templates;
pub mod views;

use std::{collections::HashMap, sync::Arc};

use shared::{
    domain::{flag_is_enabled, OrganizationId, UserId, CSRF_FIELD, SYSTEM_LANGUAGE_KEY},
    protocol::{PreferenceForm, SaveResponse, SubmittedForm},
};
use storage::{Storage, StoredOrganization, StoredUser};

use crate::{
    csrf::CsrfValidator,
    defaults::{EMAIL_ADMINISTRATOR_KEY, HTML_MAIL_KEY, THEME_KEY},
    error::AdminError,
    forms::{render_form, FormView},
    l10n::Localization,
    mail::Mailer,
    maintenance::{DatabaseDumper, DatabaseExport, FolderProtector},
    message::{MessagePresenter, RenderedMessage},
    page::{encode_url, PageContext},
    paths::InstallPaths,
    preferences::PreferenceUpdater,
    provisioning::{NewOrganizationRequest, OrganizationProvisioner},
};

pub const FUNCTION_PATH: &str = "preferences/function";
pub const OVERVIEW_PATH: &str = "preferences";
const FALLBACK_THEME: &str = "simple";

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub paths: InstallPaths,
    pub public_url: String,
    pub default_language: String,
    pub mailer: Arc<dyn Mailer>,
    pub protector: Arc<dyn FolderProtector>,
    pub dumper: Arc<dyn DatabaseDumper>,
    pub csrf: Arc<dyn CsrfValidator>,
}

impl ApiContext {
    /// Localization of the installation default, used before an organization is known.
    pub fn default_localization(&self) -> Localization {
        Localization::load(&self.paths, &self.default_language)
    }

    pub fn fallback_page(&self) -> PageContext {
        PageContext {
            base_url: self.public_url.clone(),
            theme: FALLBACK_THEME.to_string(),
            organization_name: String::new(),
            language: self.default_language.clone(),
        }
    }
}

/// Administrator, organization and language a request acts for.
pub struct RequestContext {
    pub user: StoredUser,
    pub organization: StoredOrganization,
    pub preferences: HashMap<String, String>,
    pub l10n: Localization,
}

impl RequestContext {
    pub fn page(&self, ctx: &ApiContext) -> PageContext {
        PageContext {
            base_url: ctx.public_url.clone(),
            theme: self
                .preferences
                .get(THEME_KEY)
                .cloned()
                .unwrap_or_else(|| FALLBACK_THEME.to_string()),
            organization_name: self.organization.long_name.clone(),
            language: self.l10n.language().to_string(),
        }
    }

    /// Link into this module that keeps the acting user and organization.
    pub fn url(&self, ctx: &ApiContext, path: &str, params: &[(&str, &str)]) -> String {
        let user_id = self.user.user_id.to_string();
        let organization_id = self.organization.organization_id.to_string();
        let mut all: Vec<(&str, &str)> = params.to_vec();
        all.push(("user_id", user_id.as_str()));
        all.push(("org_id", organization_id.as_str()));
        encode_url(&ctx.public_url, path, &all)
    }

    fn check_csrf(&self, ctx: &ApiContext, submitted: &SubmittedForm) -> Result<(), AdminError> {
        if ctx
            .csrf
            .validate(submitted.get(CSRF_FIELD).map(String::as_str))
        {
            Ok(())
        } else {
            Err(AdminError::InvalidPageView)
        }
    }
}

/// Resolves the organization (the first one when none is given) and checks that the user administers it.
pub async fn resolve_request(
    ctx: &ApiContext,
    user_id: UserId,
    organization_id: Option<OrganizationId>,
) -> Result<RequestContext, AdminError> {
    let organization = match organization_id {
        Some(organization_id) => ctx.storage.organization(organization_id).await?,
        None => ctx.storage.first_organization().await?,
    }
    .ok_or(AdminError::UnknownOrganization)?;

    let user = ctx
        .storage
        .user(user_id)
        .await?
        .ok_or(AdminError::NotAuthorized)?;
    if !ctx
        .storage
        .is_administrator(organization.organization_id, user.user_id)
        .await?
    {
        return Err(AdminError::NotAuthorized);
    }

    let preferences = ctx.storage.preferences(organization.organization_id).await?;
    let language = preferences
        .get(SYSTEM_LANGUAGE_KEY)
        .map(String::as_str)
        .unwrap_or(ctx.default_language.as_str());
    let l10n = Localization::load(&ctx.paths, language);

    Ok(RequestContext {
        user,
        organization,
        preferences,
        l10n,
    })
}

pub fn parse_form(form: Option<&str>) -> Result<PreferenceForm, AdminError> {
    form.unwrap_or_default()
        .parse()
        .map_err(|_| AdminError::InvalidPageView)
}

pub async fn save_preferences(
    ctx: &ApiContext,
    request: &mut RequestContext,
    form: PreferenceForm,
    submitted: SubmittedForm,
) -> Result<SaveResponse, AdminError> {
    request.check_csrf(ctx, &submitted)?;
    PreferenceUpdater::new(&ctx.storage, &ctx.paths, request.organization.organization_id)
        .apply(form, submitted, &request.preferences, &mut request.l10n)
        .await?;
    Ok(SaveResponse::success(request.l10n.get("SYS_SAVE_DATA")))
}

pub async fn form_markup(
    ctx: &ApiContext,
    request: &RequestContext,
    form: PreferenceForm,
) -> Result<String, AdminError> {
    let texts = ctx
        .storage
        .texts(request.organization.organization_id)
        .await?;
    let save_url = request.url(ctx, FUNCTION_PATH, &[("mode", "save"), ("form", form.as_str())]);
    let view = FormView {
        l10n: &request.l10n,
        paths: &ctx.paths,
        organization: &request.organization,
        preferences: &request.preferences,
        texts: &texts,
        csrf_token: ctx.csrf.token(),
        save_url,
        test_email_url: request.url(ctx, FUNCTION_PATH, &[("mode", "test_email")]),
        new_organization_url: request.url(ctx, FUNCTION_PATH, &[("mode", "new_org_dialog")]),
    };
    Ok(render_form(form, &view)?)
}

pub async fn preferences_page(
    ctx: &ApiContext,
    request: &RequestContext,
    show_option: Option<&str>,
) -> Result<String, AdminError> {
    let mut sections = Vec::with_capacity(PreferenceForm::ALL.len());
    for form in PreferenceForm::ALL {
        sections.push((form, form_markup(ctx, request, form).await?));
    }
    let open = show_option.and_then(|option| {
        PreferenceForm::ALL
            .into_iter()
            .find(|form| form.show_option() == option)
    });
    Ok(views::preferences_overview(
        request.page(ctx),
        &request.l10n,
        &sections,
        open,
    )?)
}

pub fn new_organization_dialog(
    ctx: &ApiContext,
    request: &RequestContext,
    values: &NewOrganizationRequest,
) -> Result<String, AdminError> {
    Ok(views::new_organization_dialog(
        request.page(ctx),
        &request.l10n,
        ctx.csrf.token(),
        &request.url(ctx, FUNCTION_PATH, &[("mode", "new_org_create")]),
        values,
    )?)
}

pub async fn create_organization(
    ctx: &ApiContext,
    request: &RequestContext,
    submitted: &SubmittedForm,
) -> Result<String, AdminError> {
    request.check_csrf(ctx, submitted)?;
    let values = NewOrganizationRequest {
        orga_short_name: submitted.get("orga_short_name").cloned().unwrap_or_default(),
        orga_long_name: submitted.get("orga_long_name").cloned().unwrap_or_default(),
        orga_email: submitted.get("orga_email").cloned().unwrap_or_default(),
    };
    let system_language = request
        .preferences
        .get(SYSTEM_LANGUAGE_KEY)
        .map(String::as_str)
        .unwrap_or(ctx.default_language.as_str());
    OrganizationProvisioner::new(&ctx.storage, &ctx.public_url, &request.l10n)
        .create(&values, request.user.user_id, system_language)
        .await?;

    Ok(views::organization_created_page(
        request.page(ctx),
        &request.l10n,
        values.orga_long_name.trim(),
        &request.url(ctx, OVERVIEW_PATH, &[]),
    )?)
}

pub async fn protect_data_folder(ctx: &ApiContext, request: &RequestContext) -> String {
    maintenance::protect_folder(ctx.protector.as_ref(), &request.l10n).await
}

pub async fn send_test_email(
    ctx: &ApiContext,
    request: &RequestContext,
) -> Result<RenderedMessage, AdminError> {
    let from = request
        .preferences
        .get(EMAIL_ADMINISTRATOR_KEY)
        .cloned()
        .unwrap_or_default();
    let html = flag_is_enabled(request.preferences.get(HTML_MAIL_KEY).map(String::as_str));
    let email = mail::test_email(
        &request.l10n,
        &request.organization.long_name,
        &request.organization.homepage,
        &from,
        &request.user.email,
        html,
    );
    mail::deliver(ctx.mailer.as_ref(), &email).await?;

    let forward = request.url(ctx, OVERVIEW_PATH, &[("show_option", "email_dispatch")]);
    Ok(MessagePresenter::new(&request.l10n, request.page(ctx))
        .set_forward_target(forward, 0)
        .render(&request.l10n.get("SYS_EMAIL_SEND"), None)
        .await)
}

pub async fn backup_database(ctx: &ApiContext) -> Result<DatabaseExport, AdminError> {
    let database_name = ctx
        .storage
        .database_file()
        .and_then(|file| file.file_stem())
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "memory".to_string());
    maintenance::create_backup(ctx.dumper.as_ref(), &database_name).await
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
