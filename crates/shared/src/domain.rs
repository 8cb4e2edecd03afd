use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(OrganizationId);
id_newtype!(CategoryId);
id_newtype!(RoleId);

pub const ORGANIZATION_FIELD_PREFIX: &str = "org_";
pub const SYSTEM_TEXT_PREFIX: &str = "SYSMAIL_";
pub const AUTO_LOGIN_KEY: &str = "enable_auto_login";
pub const SYSTEM_LANGUAGE_KEY: &str = "system_language";
pub const ORGANIZATION_SELECT_KEY: &str = "system_organization_select";
pub const CSRF_FIELD: &str = "csrf_token";

/// Submitted keys that drive the request itself and are never persisted.
pub const RESERVED_FORM_KEYS: [&str; 2] = ["save", CSRF_FIELD];

/// Store that receives a submitted preference key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingDestination {
    Reserved,
    Organization,
    SystemText,
    Preference,
}

impl SettingDestination {
    pub fn for_key(key: &str) -> Self {
        if RESERVED_FORM_KEYS.contains(&key) {
            Self::Reserved
        } else if key.starts_with(ORGANIZATION_FIELD_PREFIX) {
            Self::Organization
        } else if key.starts_with(SYSTEM_TEXT_PREFIX) {
            Self::SystemText
        } else {
            Self::Preference
        }
    }
}

/// Columns of the organization record that preferences may overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationField {
    LongName,
    Homepage,
}

impl OrganizationField {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "org_longname" => Some(Self::LongName),
            "org_homepage" => Some(Self::Homepage),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::LongName => "org_longname",
            Self::Homepage => "org_homepage",
        }
    }
}

/// Absent, empty, `0` and `false` count as disabled; everything else is enabled.
pub fn flag_is_enabled(value: Option<&str>) -> bool {
    match value.map(str::trim) {
        None | Some("") | Some("0") => false,
        Some(v) => !v.eq_ignore_ascii_case("false"),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationSummary {
    pub organization_id: OrganizationId,
    pub short_name: String,
    pub long_name: String,
    pub homepage: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_keys_by_prefix_only() {
        assert_eq!(SettingDestination::for_key("save"), SettingDestination::Reserved);
        assert_eq!(SettingDestination::for_key(CSRF_FIELD), SettingDestination::Reserved);
        assert_eq!(SettingDestination::for_key("org_longname"), SettingDestination::Organization);
        assert_eq!(SettingDestination::for_key("org_unknown"), SettingDestination::Organization);
        assert_eq!(
            SettingDestination::for_key("SYSMAIL_PASSWORD_RESET"),
            SettingDestination::SystemText
        );
        assert_eq!(SettingDestination::for_key("sysmail_lower"), SettingDestination::Preference);
        assert_eq!(SettingDestination::for_key(AUTO_LOGIN_KEY), SettingDestination::Preference);
        assert_eq!(SettingDestination::for_key("theme"), SettingDestination::Preference);
    }

    #[test]
    fn flag_coercion() {
        assert!(!flag_is_enabled(None));
        assert!(!flag_is_enabled(Some("")));
        assert!(!flag_is_enabled(Some("0")));
        assert!(!flag_is_enabled(Some(" FALSE ")));
        assert!(flag_is_enabled(Some("1")));
        assert!(flag_is_enabled(Some("true")));
        assert!(flag_is_enabled(Some("on")));
    }

    #[test]
    fn organization_fields_round_trip_through_keys() {
        for field in [OrganizationField::LongName, OrganizationField::Homepage] {
            assert_eq!(OrganizationField::from_key(field.key()), Some(field));
        }
        assert_eq!(OrganizationField::from_key("org_shortname"), None);
    }
}
