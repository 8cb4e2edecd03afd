use super::*;
use crate::provisioning::{NewOrganizationRequest, OrganizationProvisioner};
use std::fs;

struct Fixture {
    storage: Storage,
    organization_id: OrganizationId,
    paths: InstallPaths,
    _root: tempfile::TempDir,
}

async fn fixture() -> Fixture {
    let storage = Storage::new("sqlite::memory:").await.expect("storage");
    let creator = storage
        .create_user("admin", "Ada", "Admin", "admin@acme.test")
        .await
        .expect("user");
    let l10n = Localization::builtin();
    let organization_id = OrganizationProvisioner::new(&storage, "http://localhost/", &l10n)
        .create(
            &NewOrganizationRequest {
                orga_short_name: "acme".into(),
                orga_long_name: "Acme".into(),
                orga_email: "boss@acme.test".into(),
            },
            creator,
            "en",
        )
        .await
        .expect("organization");

    let root = tempfile::tempdir().expect("tempdir");
    let paths = InstallPaths::new(root.path());
    fs::create_dir_all(paths.themes_dir().join("simple")).expect("theme");
    fs::write(paths.theme_entry("simple"), "").expect("theme entry");
    fs::create_dir_all(paths.languages_dir()).expect("languages");
    fs::write(paths.language_file("en"), "").expect("en");
    fs::write(paths.language_file("de"), "SYS_SAVE_DATA = \"Gespeichert\"\n").expect("de");
    fs::create_dir_all(paths.mail_templates_dir()).expect("mail templates");
    fs::write(paths.mail_templates_dir().join("default.html"), "").expect("template");
    fs::write(paths.mail_templates_dir().join("news_letter.html"), "").expect("template");
    fs::create_dir_all(paths.ecard_templates_dir()).expect("ecard templates");
    fs::write(paths.ecard_templates_dir().join("postcard.tpl"), "").expect("ecard");
    fs::write(paths.ecard_templates_dir().join("greeting_card.tpl"), "").expect("ecard");

    Fixture {
        storage,
        organization_id,
        paths,
        _root: root,
    }
}

impl Fixture {
    async fn apply(
        &self,
        form: PreferenceForm,
        entries: &[(&str, &str)],
        l10n: &mut Localization,
    ) -> Result<SaveOutcome, AdminError> {
        let current = self
            .storage
            .preferences(self.organization_id)
            .await
            .expect("current");
        let submitted: SubmittedForm = entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        PreferenceUpdater::new(&self.storage, &self.paths, self.organization_id)
            .apply(form, submitted, &current, l10n)
            .await
    }

    async fn preference(&self, name: &str) -> Option<String> {
        self.storage
            .preference(self.organization_id, name)
            .await
            .expect("preference")
    }
}

#[tokio::test]
async fn nonexistent_theme_is_rejected_without_writes() {
    let fx = fixture().await;
    let mut l10n = Localization::builtin();
    let err = fx
        .apply(
            PreferenceForm::Common,
            &[("theme", "nonexistent-theme"), ("homepage_login", "changed")],
            &mut l10n,
        )
        .await
        .expect_err("invalid theme");
    assert!(matches!(err, AdminError::InvalidTheme));
    assert_eq!(fx.preference("theme").await.as_deref(), Some("simple"));
    assert_eq!(
        fx.preference("homepage_login").await.as_deref(),
        Some("modules/overview.php")
    );
}

#[tokio::test]
async fn absent_auto_login_checkbox_purges_tokens() {
    let fx = fixture().await;
    let user = fx
        .storage
        .create_user("member", "Max", "Member", "max@acme.test")
        .await
        .expect("user");
    fx.storage
        .create_auto_login(user, fx.organization_id)
        .await
        .expect("token");
    fx.storage
        .create_auto_login(user, fx.organization_id)
        .await
        .expect("token");

    let mut l10n = Localization::builtin();
    let outcome = fx
        .apply(
            PreferenceForm::Security,
            &[("logout_minutes", "30"), ("csrf_token", "x"), ("save", "")],
            &mut l10n,
        )
        .await
        .expect("save");

    assert!(outcome.purged_auto_logins);
    assert_eq!(fx.storage.count_auto_logins().await.expect("count"), 0);
    assert_eq!(fx.preference("enable_auto_login").await.as_deref(), Some("0"));
    assert_eq!(fx.preference("enable_password_recovery").await.as_deref(), Some("0"));
    assert_eq!(fx.preference("logout_minutes").await.as_deref(), Some("30"));
    assert_eq!(fx.preference("csrf_token").await, None);
    assert_eq!(fx.preference("save").await, None);
    assert_eq!(outcome.written_keys, 3);
}

#[tokio::test]
async fn keeping_auto_login_enabled_keeps_tokens() {
    let fx = fixture().await;
    let user = fx
        .storage
        .create_user("member", "Max", "Member", "max@acme.test")
        .await
        .expect("user");
    fx.storage
        .create_auto_login(user, fx.organization_id)
        .await
        .expect("token");

    let mut l10n = Localization::builtin();
    let outcome = fx
        .apply(
            PreferenceForm::Security,
            &[("enable_auto_login", "1")],
            &mut l10n,
        )
        .await
        .expect("save");
    assert!(!outcome.purged_auto_logins);
    assert_eq!(fx.storage.count_auto_logins().await.expect("count"), 1);
}

#[tokio::test]
async fn language_must_be_installed_and_switches_localization() {
    let fx = fixture().await;
    let mut l10n = Localization::load(&fx.paths, "en");

    let err = fx
        .apply(
            PreferenceForm::RegionalSettings,
            &[("system_language", "../../etc")],
            &mut l10n,
        )
        .await
        .expect_err("invalid language");
    assert!(matches!(err, AdminError::MissingRequiredField("SYS_LANGUAGE")));
    assert_eq!(
        err.localized_message(&l10n),
        "The field <strong>Language</strong> is empty."
    );

    let outcome = fx
        .apply(
            PreferenceForm::RegionalSettings,
            &[("system_language", "de"), ("system_currency", "EUR")],
            &mut l10n,
        )
        .await
        .expect("save");
    assert!(outcome.language_changed);
    assert_eq!(l10n.language(), "de");
    assert_eq!(l10n.get("SYS_SAVE_DATA"), "Gespeichert");
    assert_eq!(fx.preference("system_currency").await.as_deref(), Some("EUR"));
}

#[tokio::test]
async fn template_labels_are_stored_as_file_names() {
    let fx = fixture().await;
    let mut l10n = Localization::builtin();

    fx.apply(
        PreferenceForm::Messages,
        &[("mail_template", "News letter"), ("mail_module_enabled", "1")],
        &mut l10n,
    )
    .await
    .expect("save");
    assert_eq!(
        fx.preference("mail_template").await.as_deref(),
        Some("news_letter.html")
    );

    fx.apply(
        PreferenceForm::Photos,
        &[("photo_ecard_template", "Unknown card")],
        &mut l10n,
    )
    .await
    .expect("save");
    assert_eq!(fx.preference("photo_ecard_template").await.as_deref(), Some(""));
    assert_eq!(fx.preference("photo_module_enabled").await.as_deref(), Some("0"));

    // an unchanged stored file name is kept as is
    fx.apply(
        PreferenceForm::Messages,
        &[("mail_template", "news_letter.html")],
        &mut l10n,
    )
    .await
    .expect("save");
    assert_eq!(
        fx.preference("mail_template").await.as_deref(),
        Some("news_letter.html")
    );
}

#[tokio::test]
async fn organization_fields_and_system_texts_reach_their_stores() {
    let fx = fixture().await;
    let mut l10n = Localization::builtin();

    fx.apply(
        PreferenceForm::Organization,
        &[
            ("org_longname", "Acme Sports Club"),
            ("org_homepage", "https://acme.test/"),
        ],
        &mut l10n,
    )
    .await
    .expect("organization");
    let organization = fx
        .storage
        .organization(fx.organization_id)
        .await
        .expect("lookup")
        .expect("organization");
    assert_eq!(organization.long_name, "Acme Sports Club");
    assert_eq!(organization.homepage, "https://acme.test/");
    assert_eq!(fx.preference("org_longname").await, None);
    assert_eq!(
        fx.preference("system_organization_select").await.as_deref(),
        Some("0")
    );

    fx.apply(
        PreferenceForm::SystemNotifications,
        &[("SYSMAIL_PASSWORD_RESET", "New text")],
        &mut l10n,
    )
    .await
    .expect("texts");
    assert_eq!(
        fx.storage
            .text(fx.organization_id, "SYSMAIL_PASSWORD_RESET")
            .await
            .expect("text")
            .as_deref(),
        Some("New text")
    );
    assert_eq!(fx.preference("SYSMAIL_PASSWORD_RESET").await, None);
}

#[tokio::test]
async fn unknown_organization_field_rejects_the_whole_save() {
    let fx = fixture().await;
    let mut l10n = Localization::builtin();
    let err = fx
        .apply(
            PreferenceForm::Organization,
            &[("org_longname", "Renamed"), ("org_shortname", "hijack")],
            &mut l10n,
        )
        .await
        .expect_err("unknown field");
    assert!(matches!(err, AdminError::UnknownOrganizationField(ref key) if key == "org_shortname"));

    let organization = fx
        .storage
        .organization(fx.organization_id)
        .await
        .expect("lookup")
        .expect("organization");
    assert_eq!(organization.long_name, "Acme");
    assert_eq!(organization.short_name, "acme");
}

#[test]
fn planning_routes_each_key_once() {
    let current = HashMap::from([("enable_auto_login".to_string(), "1".to_string())]);
    let submitted: SubmittedForm = [
        ("csrf_token", "t"),
        ("enable_auto_login", "false"),
        ("org_homepage", "https://acme.test/"),
        ("SYSMAIL_REGISTRATION_NEW", "hi"),
        ("theme", "simple"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let writes = plan_writes(&submitted, &current).expect("plan");
    assert_eq!(
        writes,
        vec![
            SettingWrite::SystemText {
                name: "SYSMAIL_REGISTRATION_NEW".into(),
                value: "hi".into(),
            },
            SettingWrite::PurgeAutoLogins,
            SettingWrite::Preference {
                name: "enable_auto_login".into(),
                value: "false".into(),
            },
            SettingWrite::Organization {
                field: OrganizationField::Homepage,
                value: "https://acme.test/".into(),
            },
            SettingWrite::Preference {
                name: "theme".into(),
                value: "simple".into(),
            },
        ]
    );
}

#[test]
fn normalization_only_fills_missing_checkboxes() {
    let mut submitted = SubmittedForm::from([("enable_auto_login".to_string(), "1".to_string())]);
    normalize_checkboxes(PreferenceForm::Security, &mut submitted);
    assert_eq!(submitted["enable_auto_login"], "1");
    assert_eq!(submitted["enable_password_recovery"], "0");
    assert!(!submitted.contains_key("logout_minutes"));
}
