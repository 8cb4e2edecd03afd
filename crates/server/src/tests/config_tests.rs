use super::*;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn defaults_apply_without_file_or_environment() {
    let settings = build_settings(&HashMap::new(), env_from(&[]));
    assert_eq!(settings.server_bind, "127.0.0.1:8080");
    assert_eq!(settings.database_url, "sqlite://./data/admin.db");
    assert_eq!(settings.default_language, "en");
    assert_eq!(settings.csrf_token, None);
    assert!(settings.smtp().expect("smtp").is_none());
}

#[test]
fn environment_overrides_file_values() {
    let file_cfg = HashMap::from([
        ("bind_addr".to_string(), "0.0.0.0:9000".to_string()),
        ("public_url".to_string(), "https://club.test/".to_string()),
        ("default_language".to_string(), "de".to_string()),
    ]);
    let settings = build_settings(
        &file_cfg,
        env_from(&[
            ("SERVER_BIND", "0.0.0.0:9001"),
            ("APP__BIND_ADDR", "0.0.0.0:9002"),
            ("APP__CSRF_TOKEN", "fixed"),
        ]),
    );
    assert_eq!(settings.server_bind, "0.0.0.0:9002");
    assert_eq!(settings.public_url, "https://club.test/");
    assert_eq!(settings.default_language, "de");
    assert_eq!(settings.csrf_token.as_deref(), Some("fixed"));
}

#[test]
fn smtp_settings_build_a_relay_config() {
    let settings = build_settings(
        &HashMap::from([("smtp_host".to_string(), "mail.club.test".to_string())]),
        env_from(&[("APP__SMTP_PORT", "465"), ("APP__SMTP_TLS", "tls")]),
    );
    let smtp = settings.smtp().expect("smtp").expect("configured");
    assert_eq!(smtp.host, "mail.club.test");
    assert_eq!(smtp.port, 465);
    assert_eq!(smtp.tls, SmtpTls::Implicit);

    let broken = Settings {
        smtp_tls: "ssl3".into(),
        ..settings
    };
    assert!(broken.smtp().is_err());
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
    assert_eq!(
        normalize_database_url("sqlite:data\\admin.db"),
        "sqlite://data/admin.db"
    );
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
    assert_eq!(normalize_database_url("  "), "sqlite://./data/admin.db");
}

#[test]
fn creates_parent_dir_for_sqlite_file() {
    let root = tempfile::tempdir().expect("tempdir");
    let db_path = root.path().join("nested").join("admin.db");
    let url = prepare_database_url(&db_path.display().to_string()).expect("prepare db url");
    assert!(url.starts_with("sqlite://"));
    assert!(root.path().join("nested").is_dir());
}

#[test]
fn memory_database_has_no_file() {
    assert_eq!(sqlite_path("sqlite::memory:"), None);
    assert_eq!(
        sqlite_path("sqlite://./data/admin.db?mode=rwc"),
        Some(PathBuf::from("./data/admin.db"))
    );
}
