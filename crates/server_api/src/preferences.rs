use std::collections::HashMap;

use shared::{
    domain::{
        flag_is_enabled, OrganizationField, OrganizationId, SettingDestination, AUTO_LOGIN_KEY,
        SYSTEM_LANGUAGE_KEY,
    },
    protocol::{PreferenceForm, SubmittedForm},
};
use storage::{SettingWrite, Storage};
use tracing::info;

use crate::{
    defaults::{ECARD_TEMPLATE_KEY, MAIL_TEMPLATE_KEY, THEME_KEY},
    error::AdminError,
    forms::checkbox_fields,
    l10n::Localization,
    paths::{is_valid_folder_name, InstallPaths},
    templates::resolve_template_file,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaveOutcome {
    pub written_keys: usize,
    pub purged_auto_logins: bool,
    pub language_changed: bool,
}

/// Validates and persists one submitted preferences form of an organization.
pub struct PreferenceUpdater<'a> {
    storage: &'a Storage,
    paths: &'a InstallPaths,
    organization_id: OrganizationId,
}

impl<'a> PreferenceUpdater<'a> {
    pub fn new(storage: &'a Storage, paths: &'a InstallPaths, organization_id: OrganizationId) -> Self {
        Self {
            storage,
            paths,
            organization_id,
        }
    }

    /// Nothing is written when validation fails; all writes share one transaction.
    /// On success `l10n` follows a changed `system_language`.
    pub async fn apply(
        &self,
        form: PreferenceForm,
        mut submitted: SubmittedForm,
        current: &HashMap<String, String>,
        l10n: &mut Localization,
    ) -> Result<SaveOutcome, AdminError> {
        normalize_checkboxes(form, &mut submitted);
        validate_form(form, &mut submitted, current, self.paths)?;
        let writes = plan_writes(&submitted, current)?;

        self.storage
            .apply_setting_writes(self.organization_id, &writes)
            .await?;

        let purged_auto_logins = writes.contains(&SettingWrite::PurgeAutoLogins);
        let written_keys = writes
            .iter()
            .filter(|write| **write != SettingWrite::PurgeAutoLogins)
            .count();

        let language = submitted
            .get(SYSTEM_LANGUAGE_KEY)
            .or_else(|| current.get(SYSTEM_LANGUAGE_KEY));
        let language_changed = match language {
            Some(language) if language != l10n.language() => {
                l10n.set_language(language);
                true
            }
            _ => false,
        };

        info!(
            organization_id = %self.organization_id,
            %form,
            written_keys,
            purged_auto_logins,
            "preferences saved"
        );
        Ok(SaveOutcome {
            written_keys,
            purged_auto_logins,
            language_changed,
        })
    }
}

/// Unchecked boxes are not part of an HTML form submission; they are stored as `0`.
pub fn normalize_checkboxes(form: PreferenceForm, submitted: &mut SubmittedForm) {
    for name in checkbox_fields(form) {
        submitted
            .entry(name.to_string())
            .or_insert_with(|| "0".to_string());
    }
}

/// Per-form checks. Template labels of `Messages` and `Photos` are replaced by file names.
pub fn validate_form(
    form: PreferenceForm,
    submitted: &mut SubmittedForm,
    current: &HashMap<String, String>,
    paths: &InstallPaths,
) -> Result<(), AdminError> {
    match form {
        PreferenceForm::Common => {
            let theme = submitted.get(THEME_KEY).map(String::as_str).unwrap_or_default();
            if !paths.theme_exists(theme) {
                return Err(AdminError::InvalidTheme);
            }
        }
        PreferenceForm::RegionalSettings => {
            let language = submitted
                .get(SYSTEM_LANGUAGE_KEY)
                .map(String::as_str)
                .unwrap_or_default();
            if !is_valid_folder_name(language) || !paths.language_exists(language) {
                return Err(AdminError::MissingRequiredField("SYS_LANGUAGE"));
            }
        }
        PreferenceForm::Messages => {
            resolve_template(submitted, current, MAIL_TEMPLATE_KEY, paths.mail_templates_dir());
        }
        PreferenceForm::Photos => {
            resolve_template(submitted, current, ECARD_TEMPLATE_KEY, paths.ecard_templates_dir());
        }
        // token purge of a disabled auto login is planned together with the writes
        PreferenceForm::Security
        | PreferenceForm::Organization
        | PreferenceForm::EmailDispatch
        | PreferenceForm::SystemNotifications => {}
    }
    Ok(())
}

fn resolve_template(
    submitted: &mut SubmittedForm,
    current: &HashMap<String, String>,
    key: &str,
    dir: std::path::PathBuf,
) {
    let Some(label) = submitted.get_mut(key) else {
        return;
    };
    if current.get(key) != Some(label) {
        *label = resolve_template_file(&dir, label);
    }
}

/// Routes every submitted key to its store. Unknown organization fields fail the whole plan.
pub fn plan_writes(
    submitted: &SubmittedForm,
    current: &HashMap<String, String>,
) -> Result<Vec<SettingWrite>, AdminError> {
    let mut writes = Vec::with_capacity(submitted.len() + 1);
    for (key, value) in submitted {
        match SettingDestination::for_key(key) {
            SettingDestination::Reserved => {}
            SettingDestination::Organization => {
                let field = OrganizationField::from_key(key)
                    .ok_or_else(|| AdminError::UnknownOrganizationField(key.clone()))?;
                writes.push(SettingWrite::Organization {
                    field,
                    value: value.clone(),
                });
            }
            SettingDestination::SystemText => writes.push(SettingWrite::SystemText {
                name: key.clone(),
                value: value.clone(),
            }),
            SettingDestination::Preference => {
                if key == AUTO_LOGIN_KEY
                    && !flag_is_enabled(Some(value))
                    && flag_is_enabled(current.get(AUTO_LOGIN_KEY).map(String::as_str))
                {
                    writes.push(SettingWrite::PurgeAutoLogins);
                }
                writes.push(SettingWrite::Preference {
                    name: key.clone(),
                    value: value.clone(),
                });
            }
        }
    }
    Ok(writes)
}

#[cfg(test)]
#[path = "tests/preferences_tests.rs"]
mod tests;
