//! Full pages rendered by the preferences module.

use handlebars::RenderError;
use serde::Serialize;
use serde_json::json;
use shared::{domain::CSRF_FIELD, protocol::PreferenceForm};

use crate::{
    forms::section_title_key,
    l10n::Localization,
    page::{escape_html, render, HtmlForm, HtmlPage, PageContext},
    provisioning::{
        NewOrganizationRequest, EMAIL_MAX_LENGTH, LONG_NAME_MAX_LENGTH, SHORT_NAME_MAX_LENGTH,
    },
};

const OVERVIEW_TEMPLATE: &str = include_str!("../markup/preferences_overview.hbs");
/// Localized texts may carry `<strong>` from `#VARn_BOLD#`.
const LEAD_TEMPLATE: &str = "<p class=\"lead\">{{{text}}}</p>\n";

#[derive(Serialize)]
struct OverviewSection<'a> {
    id: &'static str,
    title: String,
    open: bool,
    markup: &'a str,
}

pub fn new_organization_dialog(
    page: PageContext,
    l10n: &Localization,
    csrf_token: &str,
    action_url: &str,
    values: &NewOrganizationRequest,
) -> Result<String, RenderError> {
    let headline = l10n.get("INS_ADD_ORGANIZATION");
    let mut html = HtmlPage::new("admidio-new-organization", &headline, page);
    html.add_html(&lead(&l10n.get("ORG_NEW_ORGANIZATION_DESC"))?);

    let mut form = HtmlForm::new("add_new_organization_form", action_url);
    form.add_hidden(CSRF_FIELD, csrf_token);
    form.add_input(
        "orga_short_name",
        &l10n.get("SYS_NAME_ABBREVIATION"),
        &values.orga_short_name,
        "text",
        Some(SHORT_NAME_MAX_LENGTH),
        true,
    );
    form.add_input(
        "orga_long_name",
        &l10n.get("SYS_NAME"),
        &values.orga_long_name,
        "text",
        Some(LONG_NAME_MAX_LENGTH),
        true,
    );
    form.add_input(
        "orga_email",
        &l10n.get("SYS_EMAIL_ADMINISTRATOR"),
        &values.orga_email,
        "email",
        Some(EMAIL_MAX_LENGTH),
        true,
    );
    form.add_submit_button("btn_forward", &l10n.get("INS_SET_UP_ORGANIZATION"), "bi-wrench");
    html.add_html(&form.show()?);
    html.show()
}

pub fn organization_created_page(
    page: PageContext,
    l10n: &Localization,
    long_name: &str,
    next_url: &str,
) -> Result<String, RenderError> {
    let mut html = HtmlPage::new(
        "admidio-new-organization-successful",
        &l10n.get("INS_SETUP_WAS_SUCCESSFUL"),
        page,
    );
    html.add_html(&lead(&l10n.get_with(
        "ORG_ORGANIZATION_SUCCESSFULLY_ADDED",
        &[&escape_html(long_name)],
    ))?);
    let mut form = HtmlForm::new("add_new_organization_form", next_url);
    form.add_submit_button("btn_forward", &l10n.get("SYS_NEXT"), "bi-arrow-right-circle-fill");
    html.add_html(&form.show()?);
    html.show()
}

/// All preference forms, one collapsible section each; `show_option` opens one of them.
pub fn preferences_overview(
    page: PageContext,
    l10n: &Localization,
    sections: &[(PreferenceForm, String)],
    show_option: Option<PreferenceForm>,
) -> Result<String, RenderError> {
    let open = show_option.unwrap_or(PreferenceForm::Common);
    let sections: Vec<OverviewSection<'_>> = sections
        .iter()
        .map(|(form, markup)| OverviewSection {
            id: form.show_option(),
            title: l10n.get(section_title_key(*form)),
            open: *form == open,
            markup: markup.as_str(),
        })
        .collect();
    let mut html = HtmlPage::new("admidio-preferences", &l10n.get("SYS_SETTINGS"), page);
    html.add_html(&render(OVERVIEW_TEMPLATE, &json!({ "sections": sections }))?);
    html.show()
}

fn lead(text: &str) -> Result<String, RenderError> {
    render(LEAD_TEMPLATE, &json!({ "text": text }))
}
