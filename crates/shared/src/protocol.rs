use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Untyped key-value body of a submitted form.
pub type SubmittedForm = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferencesMode {
    Save,
    HtmlForm,
    NewOrgDialog,
    NewOrgCreate,
    Htaccess,
    TestEmail,
    Backup,
}

impl PreferencesMode {
    pub const ALL: [PreferencesMode; 7] = [
        PreferencesMode::Save,
        PreferencesMode::HtmlForm,
        PreferencesMode::NewOrgDialog,
        PreferencesMode::NewOrgCreate,
        PreferencesMode::Htaccess,
        PreferencesMode::TestEmail,
        PreferencesMode::Backup,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Save => "save",
            Self::HtmlForm => "html_form",
            Self::NewOrgDialog => "new_org_dialog",
            Self::NewOrgCreate => "new_org_create",
            Self::Htaccess => "htaccess",
            Self::TestEmail => "test_email",
            Self::Backup => "backup",
        }
    }
}

impl FromStr for PreferencesMode {
    type Err = UnknownPreferenceForm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| UnknownPreferenceForm(s.to_string()))
    }
}

/// Preference form kinds. Query strings carry the variant name verbatim (`form=RegionalSettings`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PreferenceForm {
    Common,
    Security,
    RegionalSettings,
    Organization,
    EmailDispatch,
    SystemNotifications,
    Messages,
    Photos,
}

impl PreferenceForm {
    pub const ALL: [PreferenceForm; 8] = [
        PreferenceForm::Common,
        PreferenceForm::Security,
        PreferenceForm::RegionalSettings,
        PreferenceForm::Organization,
        PreferenceForm::EmailDispatch,
        PreferenceForm::SystemNotifications,
        PreferenceForm::Messages,
        PreferenceForm::Photos,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Common => "Common",
            Self::Security => "Security",
            Self::RegionalSettings => "RegionalSettings",
            Self::Organization => "Organization",
            Self::EmailDispatch => "EmailDispatch",
            Self::SystemNotifications => "SystemNotifications",
            Self::Messages => "Messages",
            Self::Photos => "Photos",
        }
    }

    /// Value of the `show_option` parameter that opens this form on the overview page.
    pub fn show_option(self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Security => "security",
            Self::RegionalSettings => "regional_settings",
            Self::Organization => "organization",
            Self::EmailDispatch => "email_dispatch",
            Self::SystemNotifications => "system_notifications",
            Self::Messages => "messages",
            Self::Photos => "photos",
        }
    }
}

impl fmt::Display for PreferenceForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPreferenceForm(pub String);

impl fmt::Display for UnknownPreferenceForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown preference form '{}'", self.0)
    }
}

impl std::error::Error for UnknownPreferenceForm {}

impl FromStr for PreferenceForm {
    type Err = UnknownPreferenceForm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|form| form.as_str() == s)
            .ok_or_else(|| UnknownPreferenceForm(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveStatus {
    Success,
    Error,
}

/// JSON reply of the `save` mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveResponse {
    pub status: SaveStatus,
    pub message: String,
}

impl SaveResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: SaveStatus::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: SaveStatus::Error,
            message: message.into(),
        }
    }
}

impl From<ApiError> for SaveResponse {
    fn from(value: ApiError) -> Self {
        Self::error(value.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preference_form_parses_variant_names() {
        for form in PreferenceForm::ALL {
            assert_eq!(form.as_str().parse::<PreferenceForm>(), Ok(form));
        }
        assert!("common".parse::<PreferenceForm>().is_err());
        assert!("createCommonForm".parse::<PreferenceForm>().is_err());
    }

    #[test]
    fn save_response_serializes_status_in_snake_case() {
        let json = serde_json::to_value(SaveResponse::success("ok")).expect("json");
        assert_eq!(json, serde_json::json!({ "status": "success", "message": "ok" }));
    }

    #[test]
    fn mode_deserializes_from_snake_case() {
        let mode: PreferencesMode = serde_json::from_str("\"new_org_create\"").expect("mode");
        assert_eq!(mode, PreferencesMode::NewOrgCreate);
        assert_eq!("htaccess".parse::<PreferencesMode>(), Ok(PreferencesMode::Htaccess));
        assert!("Save".parse::<PreferencesMode>().is_err());
    }
}
