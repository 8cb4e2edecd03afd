//! Field tables and markup of the preference forms.

use std::collections::HashMap;

use handlebars::RenderError;
use shared::{
    domain::{flag_is_enabled, OrganizationField, SettingDestination, CSRF_FIELD},
    protocol::PreferenceForm,
};
use storage::StoredOrganization;

use crate::{
    l10n::Localization,
    page::HtmlForm,
    paths::InstallPaths,
    templates::{template_label, template_options},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionSource {
    Themes,
    Languages,
    MailTemplates,
    EcardTemplates,
    PasswordStrength,
    SendMethods,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text { max_length: Option<usize>, required: bool },
    Email,
    Url,
    Number,
    Checkbox,
    TextArea,
    Select(OptionSource),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
}

const fn field(name: &'static str, label: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, label, kind }
}

const TEXT: FieldKind = FieldKind::Text {
    max_length: None,
    required: false,
};

const COMMON_FIELDS: &[FieldSpec] = &[
    field("theme", "ORG_THEME", FieldKind::Select(OptionSource::Themes)),
    field("homepage_logout", "ORG_HOMEPAGE_VISITORS", TEXT),
    field("homepage_login", "ORG_HOMEPAGE_REGISTERED_USERS", TEXT),
    field("enable_rss", "ORG_ENABLE_RSS_FEEDS", FieldKind::Checkbox),
    field("system_cookie_note", "SYS_COOKIE_NOTE", FieldKind::Checkbox),
    field("system_search_similar", "SYS_SEARCH_SIMILAR_NAMES", FieldKind::Checkbox),
];

const SECURITY_FIELDS: &[FieldSpec] = &[
    field("logout_minutes", "ORG_AUTOMATIC_LOGOUT_AFTER", FieldKind::Number),
    field("enable_auto_login", "ORG_LOGIN_AUTOMATICALLY", FieldKind::Checkbox),
    field("enable_password_recovery", "SYS_PASSWORD_FORGOTTEN", FieldKind::Checkbox),
    field(
        "password_min_strength",
        "ORG_PASSWORD_MIN_STRENGTH",
        FieldKind::Select(OptionSource::PasswordStrength),
    ),
];

const REGIONAL_SETTINGS_FIELDS: &[FieldSpec] = &[
    field("system_language", "SYS_LANGUAGE", FieldKind::Select(OptionSource::Languages)),
    field("default_country", "SYS_DEFAULT_COUNTRY", TEXT),
    field("system_date", "ORG_DATE_FORMAT", TEXT),
    field("system_time", "ORG_TIME_FORMAT", TEXT),
    field("system_currency", "SYS_CURRENCY", TEXT),
];

const ORGANIZATION_FIELDS: &[FieldSpec] = &[
    field(
        "org_longname",
        "SYS_NAME",
        FieldKind::Text {
            max_length: Some(50),
            required: true,
        },
    ),
    field("org_homepage", "SYS_HOMEPAGE", FieldKind::Url),
    field(
        "system_organization_select",
        "ORG_SHOW_ORGANIZATION_SELECT",
        FieldKind::Checkbox,
    ),
];

const EMAIL_DISPATCH_FIELDS: &[FieldSpec] = &[
    field("mail_send_method", "SYS_SEND_EMAILS", FieldKind::Select(OptionSource::SendMethods)),
    field("email_administrator", "SYS_SENDER_EMAIL", FieldKind::Email),
    field("mail_smtp_host", "SYS_SMTP_HOST", TEXT),
    field("mail_smtp_port", "SYS_SMTP_PORT", FieldKind::Number),
    field(
        "mail_html_registered_users",
        "SYS_HTML_MAILS_REGISTERED_USERS",
        FieldKind::Checkbox,
    ),
];

const SYSTEM_NOTIFICATION_FIELDS: &[FieldSpec] = &[
    field("system_notifications_enabled", "SYS_ENABLE_NOTIFICATIONS", FieldKind::Checkbox),
    field(
        "SYSMAIL_REGISTRATION_CONFIRMATION",
        "SYS_NOTIFICATION_REGISTRATION_CONFIRMATION",
        FieldKind::TextArea,
    ),
    field("SYSMAIL_REGISTRATION_NEW", "SYS_NOTIFICATION_REGISTRATION_NEW", FieldKind::TextArea),
    field(
        "SYSMAIL_REGISTRATION_APPROVED",
        "SYS_NOTIFICATION_REGISTRATION_APPROVED",
        FieldKind::TextArea,
    ),
    field("SYSMAIL_PASSWORD_RESET", "SYS_NOTIFICATION_PASSWORD_RESET", FieldKind::TextArea),
];

const MESSAGE_FIELDS: &[FieldSpec] = &[
    field("mail_module_enabled", "SYS_ENABLE_EMAIL_MODULE", FieldKind::Checkbox),
    field("mail_template", "ORG_EMAIL_TEMPLATE", FieldKind::Select(OptionSource::MailTemplates)),
    field("mail_max_receiver", "SYS_MAX_RECEIVER", FieldKind::Number),
];

const PHOTO_FIELDS: &[FieldSpec] = &[
    field("photo_module_enabled", "PHO_DISPLAY_PHOTOS", FieldKind::Checkbox),
    field("photo_ecard_enabled", "PHO_ENABLE_GREETING_CARDS", FieldKind::Checkbox),
    field(
        "photo_ecard_template",
        "PHO_TEMPLATE",
        FieldKind::Select(OptionSource::EcardTemplates),
    ),
];

pub fn fields(form: PreferenceForm) -> &'static [FieldSpec] {
    match form {
        PreferenceForm::Common => COMMON_FIELDS,
        PreferenceForm::Security => SECURITY_FIELDS,
        PreferenceForm::RegionalSettings => REGIONAL_SETTINGS_FIELDS,
        PreferenceForm::Organization => ORGANIZATION_FIELDS,
        PreferenceForm::EmailDispatch => EMAIL_DISPATCH_FIELDS,
        PreferenceForm::SystemNotifications => SYSTEM_NOTIFICATION_FIELDS,
        PreferenceForm::Messages => MESSAGE_FIELDS,
        PreferenceForm::Photos => PHOTO_FIELDS,
    }
}

/// Checkbox names of a form; unchecked boxes are missing from a submission.
pub fn checkbox_fields(form: PreferenceForm) -> impl Iterator<Item = &'static str> {
    fields(form)
        .iter()
        .filter(|entry| entry.kind == FieldKind::Checkbox)
        .map(|entry| entry.name)
}

pub fn section_title_key(form: PreferenceForm) -> &'static str {
    match form {
        PreferenceForm::Common => "ORG_COMMON",
        PreferenceForm::Security => "SYS_SECURITY",
        PreferenceForm::RegionalSettings => "ORG_REGIONAL_SETTINGS",
        PreferenceForm::Organization => "SYS_ORGANIZATION",
        PreferenceForm::EmailDispatch => "SYS_EMAIL_DISPATCH",
        PreferenceForm::SystemNotifications => "SYS_SYSTEM_MAILS",
        PreferenceForm::Messages => "SYS_MESSAGES",
        PreferenceForm::Photos => "SYS_PHOTOS",
    }
}

/// Current values and links a form is rendered with.
pub struct FormView<'a> {
    pub l10n: &'a Localization,
    pub paths: &'a InstallPaths,
    pub organization: &'a StoredOrganization,
    pub preferences: &'a HashMap<String, String>,
    pub texts: &'a HashMap<String, String>,
    pub csrf_token: &'a str,
    pub save_url: String,
    pub test_email_url: String,
    pub new_organization_url: String,
}

impl FormView<'_> {
    fn value(&self, name: &str) -> String {
        match SettingDestination::for_key(name) {
            SettingDestination::Organization => match OrganizationField::from_key(name) {
                Some(OrganizationField::LongName) => self.organization.long_name.clone(),
                Some(OrganizationField::Homepage) => self.organization.homepage.clone(),
                None => String::new(),
            },
            SettingDestination::SystemText => self.texts.get(name).cloned().unwrap_or_default(),
            SettingDestination::Preference | SettingDestination::Reserved => {
                self.preferences.get(name).cloned().unwrap_or_default()
            }
        }
    }

    fn options(&self, source: OptionSource) -> Vec<(String, String)> {
        match source {
            OptionSource::Themes => pairs(self.paths.installed_themes()),
            OptionSource::Languages => pairs(self.paths.installed_languages()),
            OptionSource::MailTemplates => template_options(&self.paths.mail_templates_dir()),
            OptionSource::EcardTemplates => template_options(&self.paths.ecard_templates_dir()),
            OptionSource::PasswordStrength => (0..=4)
                .map(|level| (level.to_string(), level.to_string()))
                .collect(),
            OptionSource::SendMethods => vec![
                ("smtp".to_string(), "SMTP".to_string()),
                ("log".to_string(), "Log".to_string()),
            ],
        }
    }
}

fn pairs(values: Vec<String>) -> Vec<(String, String)> {
    values.into_iter().map(|value| (value.clone(), value)).collect()
}

pub fn render_form(form: PreferenceForm, view: &FormView<'_>) -> Result<String, RenderError> {
    match form {
        PreferenceForm::Common => common_form(view),
        PreferenceForm::Security => security_form(view),
        PreferenceForm::RegionalSettings => regional_settings_form(view),
        PreferenceForm::Organization => organization_form(view),
        PreferenceForm::EmailDispatch => email_dispatch_form(view),
        PreferenceForm::SystemNotifications => system_notifications_form(view),
        PreferenceForm::Messages => messages_form(view),
        PreferenceForm::Photos => photos_form(view),
    }
}

fn common_form(view: &FormView<'_>) -> Result<String, RenderError> {
    finish(base_form(PreferenceForm::Common, view), view)
}

fn security_form(view: &FormView<'_>) -> Result<String, RenderError> {
    finish(base_form(PreferenceForm::Security, view), view)
}

fn regional_settings_form(view: &FormView<'_>) -> Result<String, RenderError> {
    finish(base_form(PreferenceForm::RegionalSettings, view), view)
}

fn organization_form(view: &FormView<'_>) -> Result<String, RenderError> {
    let mut form = base_form(PreferenceForm::Organization, view);
    form.add_link(
        "add_another_organization",
        &view.new_organization_url,
        &view.l10n.get("INS_ADD_ORGANIZATION"),
    );
    finish(form, view)
}

fn email_dispatch_form(view: &FormView<'_>) -> Result<String, RenderError> {
    let mut form = base_form(PreferenceForm::EmailDispatch, view);
    form.add_link(
        "send_test_email",
        &view.test_email_url,
        &view.l10n.get("SYS_SEND_TEST_EMAIL"),
    );
    finish(form, view)
}

fn system_notifications_form(view: &FormView<'_>) -> Result<String, RenderError> {
    finish(base_form(PreferenceForm::SystemNotifications, view), view)
}

fn messages_form(view: &FormView<'_>) -> Result<String, RenderError> {
    finish(base_form(PreferenceForm::Messages, view), view)
}

fn photos_form(view: &FormView<'_>) -> Result<String, RenderError> {
    finish(base_form(PreferenceForm::Photos, view), view)
}

fn base_form(form: PreferenceForm, view: &FormView<'_>) -> HtmlForm {
    let mut html = HtmlForm::new(&format!("{}_preferences_form", form.show_option()), &view.save_url);
    html.add_hidden(CSRF_FIELD, view.csrf_token);
    for entry in fields(form) {
        add_field(&mut html, entry, view);
    }
    html
}

fn finish(mut form: HtmlForm, view: &FormView<'_>) -> Result<String, RenderError> {
    form.add_submit_button("btn_save", &view.l10n.get("SYS_SAVE"), "bi-check-lg");
    form.show()
}

fn add_field(form: &mut HtmlForm, entry: &FieldSpec, view: &FormView<'_>) {
    let label = view.l10n.get(entry.label);
    let value = view.value(entry.name);
    match entry.kind {
        FieldKind::Text {
            max_length,
            required,
        } => form.add_input(entry.name, &label, &value, "text", max_length, required),
        FieldKind::Email => form.add_input(entry.name, &label, &value, "email", Some(50), false),
        FieldKind::Url => form.add_input(entry.name, &label, &value, "url", Some(250), false),
        FieldKind::Number => form.add_input(entry.name, &label, &value, "number", None, false),
        FieldKind::Checkbox => form.add_checkbox(entry.name, &label, flag_is_enabled(Some(&value))),
        FieldKind::TextArea => form.add_textarea(entry.name, &label, &value, 6),
        FieldKind::Select(source) => {
            let selected = match source {
                OptionSource::MailTemplates | OptionSource::EcardTemplates => template_label(&value),
                _ => value,
            };
            form.add_select(entry.name, &label, &view.options(source), &selected);
        }
    }
}

#[cfg(test)]
#[path = "tests/forms_tests.rs"]
mod tests;
