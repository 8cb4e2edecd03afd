use shared::domain::{OrganizationField, AUTO_LOGIN_KEY};
use storage::{CategorySeed, OrganizationSeed, SettingWrite, Storage, ROLE_CATEGORY_TYPE};

#[tokio::test]
async fn organization_lifecycle_acceptance() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let admin = storage
        .create_user("acceptance-admin", "Grace", "Hopper", "grace@example.com")
        .await
        .expect("admin");

    let organization = storage
        .provision_organization(&OrganizationSeed {
            short_name: "acme".to_string(),
            long_name: "Acme Sports Club".to_string(),
            homepage: "https://acme.example.com/".to_string(),
            preferences: vec![(AUTO_LOGIN_KEY.to_string(), "1".to_string())],
            system_texts: Vec::new(),
            categories: vec![CategorySeed {
                category_type: ROLE_CATEGORY_TYPE.to_string(),
                name_intern: "COMMON".to_string(),
                name: "Common".to_string(),
            }],
            administrator: admin,
            administrator_role_name: "Administrator".to_string(),
            member_role_name: "Member".to_string(),
        })
        .await
        .expect("provision");

    let stored = storage
        .organization_by_short_name("acme")
        .await
        .expect("lookup")
        .expect("exists");
    assert_eq!(stored.organization_id, organization);
    assert!(storage
        .organization_by_short_name("ACME")
        .await
        .expect("lookup")
        .is_none());

    storage
        .create_auto_login(admin, organization)
        .await
        .expect("auto login");

    storage
        .apply_setting_writes(
            organization,
            &[
                SettingWrite::Organization {
                    field: OrganizationField::Homepage,
                    value: "https://acme.example.org/".to_string(),
                },
                SettingWrite::PurgeAutoLogins,
                SettingWrite::Preference {
                    name: AUTO_LOGIN_KEY.to_string(),
                    value: "0".to_string(),
                },
            ],
        )
        .await
        .expect("save");

    let summary: shared::domain::OrganizationSummary = storage
        .organization(organization)
        .await
        .expect("load")
        .expect("exists")
        .into();
    assert_eq!(summary.homepage, "https://acme.example.org/");
    assert_eq!(storage.count_auto_logins().await.expect("count"), 0);
}
