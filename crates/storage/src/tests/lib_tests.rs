use super::*;

fn seed(short_name: &str, administrator: UserId) -> OrganizationSeed {
    OrganizationSeed {
        short_name: short_name.to_string(),
        long_name: format!("{short_name} club"),
        homepage: "http://localhost/".to_string(),
        preferences: vec![
            ("theme".to_string(), "simple".to_string()),
            (ORGANIZATION_SELECT_KEY.to_string(), "0".to_string()),
        ],
        system_texts: vec![("SYSMAIL_PASSWORD_RESET".to_string(), "Reset".to_string())],
        categories: vec![
            CategorySeed {
                category_type: "USF".to_string(),
                name_intern: "BASIC_DATA".to_string(),
                name: "Basic data".to_string(),
            },
            CategorySeed {
                category_type: ROLE_CATEGORY_TYPE.to_string(),
                name_intern: "COMMON".to_string(),
                name: "Common".to_string(),
            },
        ],
        administrator,
        administrator_role_name: "Administrator".to_string(),
        member_role_name: "Member".to_string(),
    }
}

async fn storage_with_org() -> (Storage, OrganizationId, UserId) {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let admin = storage
        .create_user("admin", "Ada", "Admin", "ada@example.com")
        .await
        .expect("user");
    let org = storage
        .provision_organization(&seed("ACME", admin))
        .await
        .expect("org");
    (storage, org, admin)
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
    assert!(storage.database_file().is_none());
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("storage.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    assert!(storage.database_file().is_some());
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );
}

#[tokio::test]
async fn create_user_is_idempotent_per_login_name() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let first = storage
        .create_user("bob", "Bob", "One", "bob@example.com")
        .await
        .expect("user");
    let second = storage
        .create_user("bob", "Bob", "Two", "bob2@example.com")
        .await
        .expect("user");
    assert_eq!(first, second);

    let user = storage.user(first).await.expect("load").expect("exists");
    assert_eq!(user.last_name, "Two");
    assert_eq!(user.full_name(), "Bob Two");
}

#[tokio::test]
async fn provisioning_seeds_preferences_roles_and_administrator() {
    let (storage, org, admin) = storage_with_org().await;

    let prefs = storage.preferences(org).await.expect("prefs");
    assert_eq!(prefs.get("theme").map(String::as_str), Some("simple"));
    assert_eq!(
        storage
            .text(org, "SYSMAIL_PASSWORD_RESET")
            .await
            .expect("text")
            .as_deref(),
        Some("Reset")
    );
    assert!(storage.is_administrator(org, admin).await.expect("admin"));

    let outsider = storage
        .create_user("outsider", "", "", "")
        .await
        .expect("user");
    assert!(!storage.is_administrator(org, outsider).await.expect("admin"));
}

#[tokio::test]
async fn second_organization_enables_organization_select_everywhere() {
    let (storage, first, admin) = storage_with_org().await;
    assert_eq!(
        storage
            .preference(first, ORGANIZATION_SELECT_KEY)
            .await
            .expect("pref")
            .as_deref(),
        Some("0")
    );

    let second = storage
        .provision_organization(&seed("BETA", admin))
        .await
        .expect("second org");
    let third = storage
        .provision_organization(&seed("GAMMA", admin))
        .await
        .expect("third org");

    for org in [first, second, third] {
        assert_eq!(
            storage
                .preference(org, ORGANIZATION_SELECT_KEY)
                .await
                .expect("pref")
                .as_deref(),
            Some("1"),
            "organization {org} should show the organization select"
        );
    }
    assert_eq!(storage.count_organizations().await.expect("count"), 3);
}

#[tokio::test]
async fn failed_provisioning_leaves_no_partial_rows() {
    let (storage, _org, admin) = storage_with_org().await;
    let mut broken = seed("BROKEN", admin);
    broken
        .preferences
        .push(("theme".to_string(), "duplicate".to_string()));

    storage
        .provision_organization(&broken)
        .await
        .expect_err("duplicate preference must abort");

    assert!(storage
        .organization_by_short_name("BROKEN")
        .await
        .expect("lookup")
        .is_none());
    assert_eq!(storage.count_organizations().await.expect("count"), 1);
}

#[tokio::test]
async fn provisioning_requires_a_role_category() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let admin = storage.create_user("admin", "", "", "").await.expect("user");
    let mut no_roles = seed("NOROLES", admin);
    no_roles
        .categories
        .retain(|category| category.category_type != ROLE_CATEGORY_TYPE);

    storage
        .provision_organization(&no_roles)
        .await
        .expect_err("role category is mandatory");
    assert_eq!(storage.count_organizations().await.expect("count"), 0);
}

#[tokio::test]
async fn setting_writes_reach_their_stores() {
    let (storage, org, admin) = storage_with_org().await;
    storage.create_auto_login(admin, org).await.expect("token");
    storage.create_auto_login(admin, org).await.expect("token");
    assert_eq!(storage.count_auto_logins().await.expect("count"), 2);

    storage
        .apply_setting_writes(
            org,
            &[
                SettingWrite::Organization {
                    field: OrganizationField::LongName,
                    value: "Acme Renamed".to_string(),
                },
                SettingWrite::SystemText {
                    name: "SYSMAIL_REGISTRATION_NEW".to_string(),
                    value: "Welcome".to_string(),
                },
                SettingWrite::PurgeAutoLogins,
                SettingWrite::Preference {
                    name: "enable_auto_login".to_string(),
                    value: "0".to_string(),
                },
            ],
        )
        .await
        .expect("writes");

    let organization = storage.organization(org).await.expect("org").expect("exists");
    assert_eq!(organization.long_name, "Acme Renamed");
    assert_eq!(
        storage
            .text(org, "SYSMAIL_REGISTRATION_NEW")
            .await
            .expect("text")
            .as_deref(),
        Some("Welcome")
    );
    assert_eq!(
        storage
            .preference(org, "enable_auto_login")
            .await
            .expect("pref")
            .as_deref(),
        Some("0")
    );
    assert_eq!(storage.count_auto_logins().await.expect("count"), 0);
}

#[tokio::test]
async fn failed_setting_write_rolls_back_the_batch() {
    let (storage, org, admin) = storage_with_org().await;
    storage.create_auto_login(admin, org).await.expect("token");

    let missing = OrganizationId(org.0 + 100);
    storage
        .apply_setting_writes(
            missing,
            &[
                SettingWrite::PurgeAutoLogins,
                SettingWrite::Organization {
                    field: OrganizationField::Homepage,
                    value: "https://example.com".to_string(),
                },
            ],
        )
        .await
        .expect_err("unknown organization");

    assert_eq!(storage.count_auto_logins().await.expect("count"), 1);
}

#[tokio::test]
async fn set_preferences_overwrites_existing_values() {
    let (storage, org, _admin) = storage_with_org().await;
    storage
        .set_preferences(
            org,
            &[
                ("theme".to_string(), "dark".to_string()),
                ("logout_minutes".to_string(), "30".to_string()),
            ],
        )
        .await
        .expect("set many");
    storage
        .set_preference(org, "logout_minutes", "45")
        .await
        .expect("set one");

    let prefs = storage.preferences(org).await.expect("prefs");
    assert_eq!(prefs.get("theme").map(String::as_str), Some("dark"));
    assert_eq!(prefs.get("logout_minutes").map(String::as_str), Some("45"));
}

#[tokio::test]
async fn vacuum_into_writes_a_copy() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let database_url = format!(
        "sqlite://{}",
        temp_root
            .path()
            .join("source.db")
            .to_string_lossy()
            .replace('\\', "/")
    );
    let storage = Storage::new(&database_url).await.expect("db");
    storage
        .create_user("copy", "", "", "")
        .await
        .expect("user");

    let target = temp_root.path().join("copy.db");
    storage.vacuum_into(&target).await.expect("vacuum");
    assert!(target.exists());
}
