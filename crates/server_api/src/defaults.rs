//! Seed data of a freshly created organization.

use shared::domain::{AUTO_LOGIN_KEY, ORGANIZATION_SELECT_KEY, SYSTEM_LANGUAGE_KEY};
use storage::{CategorySeed, ROLE_CATEGORY_TYPE};

pub const EMAIL_ADMINISTRATOR_KEY: &str = "email_administrator";
pub const THEME_KEY: &str = "theme";
pub const MAIL_TEMPLATE_KEY: &str = "mail_template";
pub const ECARD_TEMPLATE_KEY: &str = "photo_ecard_template";
pub const HTML_MAIL_KEY: &str = "mail_html_registered_users";

pub const DEFAULT_PREFERENCES: &[(&str, &str)] = &[
    // common
    (THEME_KEY, "simple"),
    ("homepage_logout", "modules/overview.php"),
    ("homepage_login", "modules/overview.php"),
    ("enable_rss", "1"),
    ("system_cookie_note", "1"),
    ("system_search_similar", "1"),
    // security
    ("logout_minutes", "20"),
    (AUTO_LOGIN_KEY, "1"),
    ("enable_password_recovery", "1"),
    ("password_min_strength", "1"),
    // regional settings
    (SYSTEM_LANGUAGE_KEY, "en"),
    ("default_country", "DEU"),
    ("system_date", "d.m.Y"),
    ("system_time", "H:i"),
    ("system_currency", "€"),
    // organization
    (ORGANIZATION_SELECT_KEY, "0"),
    // email dispatch
    ("mail_send_method", "smtp"),
    (EMAIL_ADMINISTRATOR_KEY, "administrator@example.com"),
    ("mail_smtp_host", ""),
    ("mail_smtp_port", "587"),
    (HTML_MAIL_KEY, "1"),
    // system notifications
    ("system_notifications_enabled", "1"),
    // messages
    ("mail_module_enabled", "1"),
    (MAIL_TEMPLATE_KEY, "default.html"),
    ("mail_max_receiver", "10"),
    // photos
    ("photo_module_enabled", "1"),
    ("photo_ecard_enabled", "1"),
    (ECARD_TEMPLATE_KEY, "postcard.tpl"),
];

pub const DEFAULT_SYSTEM_TEXTS: &[(&str, &str)] = &[
    (
        "SYSMAIL_REGISTRATION_CONFIRMATION",
        "Hello #user_first_name#,\n\nthank you for your registration at #organization_long_name#. Your registration will be reviewed by an administrator.\n\nRegards\nThe team of #organization_long_name#",
    ),
    (
        "SYSMAIL_REGISTRATION_NEW",
        "A new user has registered at #organization_long_name#:\n\n#user_first_name# #user_last_name# (#user_email#)\n\nPlease review the registration.",
    ),
    (
        "SYSMAIL_REGISTRATION_APPROVED",
        "Hello #user_first_name#,\n\nyour registration at #organization_long_name# was approved. You can now log in with your user name #user_login_name#.",
    ),
    (
        "SYSMAIL_PASSWORD_RESET",
        "Hello #user_first_name#,\n\na new password was requested for your account at #organization_long_name#. Follow this link to set it: #variable1#",
    ),
];

/// `(type, internal name, label key)`; category names stay translation keys.
const DEFAULT_CATEGORIES: &[(&str, &str, &str)] = &[
    (ROLE_CATEGORY_TYPE, "COMMON", "SYS_COMMON"),
    (ROLE_CATEGORY_TYPE, "GROUPS", "SYS_GROUPS"),
    (ROLE_CATEGORY_TYPE, "COURSES", "SYS_COURSES"),
    (ROLE_CATEGORY_TYPE, "TEAMS", "SYS_TEAMS"),
    ("USF", "BASIC_DATA", "SYS_BASIC_DATA"),
    ("USF", "SOCIAL", "SYS_SOCIAL_NETWORKS"),
];

pub fn default_preferences(admin_email: &str, system_language: &str) -> Vec<(String, String)> {
    DEFAULT_PREFERENCES
        .iter()
        .map(|(name, value)| {
            let value = match *name {
                EMAIL_ADMINISTRATOR_KEY => admin_email,
                SYSTEM_LANGUAGE_KEY => system_language,
                _ => value,
            };
            ((*name).to_string(), value.to_string())
        })
        .collect()
}

pub fn default_system_texts() -> Vec<(String, String)> {
    DEFAULT_SYSTEM_TEXTS
        .iter()
        .map(|(name, text)| ((*name).to_string(), (*text).to_string()))
        .collect()
}

pub fn default_categories() -> Vec<CategorySeed> {
    DEFAULT_CATEGORIES
        .iter()
        .map(|(category_type, name_intern, name)| CategorySeed {
            category_type: (*category_type).to_string(),
            name_intern: (*name_intern).to_string(),
            name: (*name).to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_administrator_email_and_language() {
        let preferences = default_preferences("boss@acme.test", "de");
        let get = |key: &str| {
            preferences
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value.as_str())
        };
        assert_eq!(get(EMAIL_ADMINISTRATOR_KEY), Some("boss@acme.test"));
        assert_eq!(get(SYSTEM_LANGUAGE_KEY), Some("de"));
        assert_eq!(get(ORGANIZATION_SELECT_KEY), Some("0"));
        assert_eq!(preferences.len(), DEFAULT_PREFERENCES.len());
    }

    #[test]
    fn first_category_holds_roles() {
        let categories = default_categories();
        assert_eq!(categories[0].category_type, ROLE_CATEGORY_TYPE);
        assert!(default_system_texts()
            .iter()
            .all(|(name, _)| name.starts_with(shared::domain::SYSTEM_TEXT_PREFIX)));
    }
}
