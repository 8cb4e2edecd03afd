use std::{collections::HashMap, fs, path::PathBuf};

use anyhow::Context;
use tracing::warn;

use crate::paths::{is_valid_folder_name, InstallPaths};

pub const FALLBACK_LANGUAGE: &str = "en";

const BUILTIN_CATALOG: &[(&str, &str)] = &[
    ("SYS_NOTE", "Note"),
    ("SYS_YES", "Yes"),
    ("SYS_NO", "No"),
    ("SYS_NEXT", "Next"),
    ("SYS_BACK", "Back"),
    ("SYS_CLOSE", "Close"),
    ("SYS_SAVE", "Save"),
    ("SYS_ON", "On"),
    ("SYS_OFF", "Off"),
    ("SYS_SETTINGS", "Settings"),
    ("SYS_NO_RIGHTS", "You do not have the necessary rights to perform this action."),
    ("SYS_INVALID_PAGE_VIEW", "This page was called incorrectly. Please go back and try again."),
    ("SYS_ORGANIZATION_NOT_FOUND", "The requested organization does not exist."),
    ("SYS_DATABASE_ERROR", "A database error occurred. Your changes were not saved."),
    ("SYS_MODULE_DISABLED", "This module is not available on this installation."),
    ("SYS_ERROR", "An error has occurred. Please try again later."),
    ("SYS_SAVE_DATA", "Your data has been successfully saved."),
    ("SYS_FIELD_EMPTY", "The field #VAR1_BOLD# is empty."),
    (
        "SYS_FIELD_INVALID_CHAR",
        "The field #VAR1_BOLD# contains invalid characters. Only letters, digits and .-_+@ are allowed.",
    ),
    ("ORG_FIELD_NOT_EDITABLE", "The field #VAR1_BOLD# cannot be changed here."),
    ("ORG_INVALID_THEME", "The selected theme could not be found."),
    ("SYS_LANGUAGE", "Language"),
    ("SYS_NAME", "Name"),
    ("SYS_NAME_ABBREVIATION", "Abbreviation"),
    ("SYS_HOMEPAGE", "Homepage"),
    ("SYS_ADMINISTRATOR", "Administrator"),
    ("SYS_MEMBER", "Member"),
    ("SYS_EMAIL_ADMINISTRATOR", "Email address of the administrator"),
    ("SYS_COMMON", "Common"),
    ("SYS_GROUPS", "Groups"),
    ("SYS_COURSES", "Courses"),
    ("SYS_TEAMS", "Teams"),
    ("SYS_BASIC_DATA", "Basic data"),
    ("SYS_SOCIAL_NETWORKS", "Social networks"),
    ("INS_ADD_ORGANIZATION", "Add organization"),
    (
        "ORG_NEW_ORGANIZATION_DESC",
        "Enter the abbreviation, the name and the administrator email of the new organization. All preferences are copied from the defaults and can be changed afterwards.",
    ),
    ("INS_SET_UP_ORGANIZATION", "Set up organization"),
    ("INS_ORGANIZATION_NAME_NOT_COMPLETELY", "The name of the organization was not entered completely."),
    ("INS_ORGA_SHORTNAME_EXISTS", "An organization with the abbreviation #VAR1_BOLD# already exists."),
    ("INS_SETUP_WAS_SUCCESSFUL", "Setup was successful"),
    ("ORG_ORGANIZATION_SUCCESSFULLY_ADDED", "The organization #VAR1_BOLD# was successfully added."),
    ("SYS_EMAIL_FUNCTION_TEST", "Test of the email function of #VAR1#"),
    (
        "SYS_EMAIL_FUNCTION_TEST_CONTENT",
        "Hello,\n\nthis is a test email of the membership administration at #VAR1# (#VAR2#). If you can read this message, the email settings are working.",
    ),
    ("SYS_EMAIL_SEND", "The email was sent successfully."),
    ("SYS_EMAIL_NOT_SEND", "The email could not be sent to #VAR1#. (#VAR2#)"),
    ("SYS_SEND_TEST_EMAIL", "Send test email"),
    ("ORG_THEME", "Theme"),
    ("ORG_HOMEPAGE_VISITORS", "Start page for visitors"),
    ("ORG_HOMEPAGE_REGISTERED_USERS", "Start page for registered users"),
    ("ORG_ENABLE_RSS_FEEDS", "Enable RSS feeds"),
    ("SYS_COOKIE_NOTE", "Show cookie note"),
    ("SYS_SEARCH_SIMILAR_NAMES", "Search for similar names"),
    ("ORG_AUTOMATIC_LOGOUT_AFTER", "Automatic logout after (minutes)"),
    ("ORG_LOGIN_AUTOMATICALLY", "Allow automatic login"),
    ("SYS_PASSWORD_FORGOTTEN", "Enable password recovery"),
    ("ORG_PASSWORD_MIN_STRENGTH", "Minimum password strength"),
    ("SYS_DEFAULT_COUNTRY", "Default country"),
    ("ORG_DATE_FORMAT", "Date format"),
    ("ORG_TIME_FORMAT", "Time format"),
    ("SYS_CURRENCY", "Currency"),
    ("ORG_SHOW_ORGANIZATION_SELECT", "Show organization selection at login"),
    ("SYS_SEND_EMAILS", "Send emails via"),
    ("SYS_SENDER_EMAIL", "Sender email address"),
    ("SYS_SMTP_HOST", "SMTP host"),
    ("SYS_SMTP_PORT", "SMTP port"),
    ("SYS_HTML_MAILS_REGISTERED_USERS", "Send HTML emails to registered users"),
    ("SYS_ENABLE_NOTIFICATIONS", "Enable system notifications"),
    ("SYS_NOTIFICATION_REGISTRATION_CONFIRMATION", "Confirmation of registration"),
    ("SYS_NOTIFICATION_REGISTRATION_NEW", "Notification of a new registration"),
    ("SYS_NOTIFICATION_REGISTRATION_APPROVED", "Registration approved"),
    ("SYS_NOTIFICATION_PASSWORD_RESET", "Password reset"),
    ("SYS_ENABLE_EMAIL_MODULE", "Enable email module"),
    ("ORG_EMAIL_TEMPLATE", "Email template"),
    ("SYS_MAX_RECEIVER", "Maximum number of recipients"),
    ("PHO_DISPLAY_PHOTOS", "Display photos"),
    ("PHO_ENABLE_GREETING_CARDS", "Enable greeting cards"),
    ("PHO_TEMPLATE", "Greeting card template"),
    ("ORG_COMMON", "Common"),
    ("SYS_SECURITY", "Security"),
    ("ORG_REGIONAL_SETTINGS", "Regional settings"),
    ("SYS_ORGANIZATION", "Organization"),
    ("SYS_EMAIL_DISPATCH", "Email dispatch"),
    ("SYS_SYSTEM_MAILS", "System notifications"),
    ("SYS_MESSAGES", "Messages"),
    ("SYS_PHOTOS", "Photos"),
];

/// Message catalog of one language, layered over the built-in English texts.
#[derive(Debug, Clone)]
pub struct Localization {
    language: String,
    languages_dir: Option<PathBuf>,
    entries: HashMap<String, String>,
}

impl Localization {
    /// English texts only, without reading any catalog file.
    pub fn builtin() -> Self {
        Self {
            language: FALLBACK_LANGUAGE.to_string(),
            languages_dir: None,
            entries: builtin_entries(),
        }
    }

    pub fn load(paths: &InstallPaths, language: &str) -> Self {
        let mut l10n = Self {
            language: FALLBACK_LANGUAGE.to_string(),
            languages_dir: Some(paths.languages_dir()),
            entries: builtin_entries(),
        };
        l10n.set_language(language);
        l10n
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Switches the catalog; unknown or unreadable languages keep the built-in texts.
    pub fn set_language(&mut self, language: &str) {
        self.language = language.to_string();
        self.entries = builtin_entries();

        let Some(dir) = &self.languages_dir else {
            return;
        };
        if !is_valid_folder_name(language) {
            return;
        }
        let file = dir.join(format!("{language}.toml"));
        if !file.is_file() {
            return;
        }
        match read_catalog(&file) {
            Ok(entries) => self.entries.extend(entries),
            Err(error) => warn!(%language, error = %format!("{error:#}"), "failed to read language catalog"),
        }
    }

    pub fn get(&self, key: &str) -> String {
        self.entries
            .get(key)
            .cloned()
            .unwrap_or_else(|| format!("#{key}#"))
    }

    /// Replaces `#VAR1#`, `#VAR2#`, … with `args`; `#VARn_BOLD#` wraps the value in `<strong>`.
    pub fn get_with(&self, key: &str, args: &[&str]) -> String {
        let mut text = self.get(key);
        for (index, arg) in args.iter().enumerate() {
            let n = index + 1;
            text = text
                .replace(&format!("#VAR{n}_BOLD#"), &format!("<strong>{arg}</strong>"))
                .replace(&format!("#VAR{n}#"), arg);
        }
        text
    }
}

fn builtin_entries() -> HashMap<String, String> {
    BUILTIN_CATALOG
        .iter()
        .map(|(key, text)| ((*key).to_string(), (*text).to_string()))
        .collect()
}

fn read_catalog(path: &std::path::Path) -> anyhow::Result<HashMap<String, String>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    toml::from_str::<HashMap<String, String>>(&raw)
        .with_context(|| format!("failed to parse '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_texts_and_placeholders() {
        let l10n = Localization::builtin();
        assert_eq!(l10n.get("SYS_NOTE"), "Note");
        assert_eq!(l10n.get("UNKNOWN_KEY"), "#UNKNOWN_KEY#");
        assert_eq!(
            l10n.get_with("SYS_FIELD_EMPTY", &["Language"]),
            "The field <strong>Language</strong> is empty."
        );
        assert_eq!(
            l10n.get_with("SYS_EMAIL_NOT_SEND", &["a@example.com", "timeout"]),
            "The email could not be sent to a@example.com. (timeout)"
        );
    }

    #[test]
    fn language_files_override_builtin_texts() {
        let root = tempfile::tempdir().expect("tempdir");
        let paths = InstallPaths::new(root.path());
        fs::create_dir_all(paths.languages_dir()).expect("dir");
        fs::write(
            paths.language_file("de"),
            "SYS_NOTE = \"Hinweis\"\nSYS_YES = \"Ja\"\n",
        )
        .expect("catalog");

        let mut l10n = Localization::load(&paths, "de");
        assert_eq!(l10n.language(), "de");
        assert_eq!(l10n.get("SYS_NOTE"), "Hinweis");
        assert_eq!(l10n.get("SYS_NO"), "No");

        l10n.set_language("en");
        assert_eq!(l10n.language(), "en");
        assert_eq!(l10n.get("SYS_NOTE"), "Note");
    }

    #[test]
    fn broken_catalog_falls_back_to_builtin() {
        let root = tempfile::tempdir().expect("tempdir");
        let paths = InstallPaths::new(root.path());
        fs::create_dir_all(paths.languages_dir()).expect("dir");
        fs::write(paths.language_file("xx"), "not = [valid").expect("catalog");

        let l10n = Localization::load(&paths, "xx");
        assert_eq!(l10n.get("SYS_NOTE"), "Note");
    }
}
