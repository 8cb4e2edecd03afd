use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use server_api::mail::{SmtpConfig, SmtpTls};

const DEFAULT_SMTP_PORT: u16 = 587;

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_bind: String,
    pub database_url: String,
    pub public_url: String,
    pub install_root: PathBuf,
    pub default_language: String,
    pub csrf_token: Option<String>,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_tls: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8080".into(),
            database_url: "sqlite://./data/admin.db".into(),
            public_url: "http://127.0.0.1:8080/".into(),
            install_root: PathBuf::from("."),
            default_language: "en".into(),
            csrf_token: None,
            smtp_host: None,
            smtp_port: DEFAULT_SMTP_PORT,
            smtp_username: None,
            smtp_password: None,
            smtp_tls: "starttls".into(),
        }
    }
}

impl Settings {
    /// SMTP relay settings, `None` when no host is configured.
    pub fn smtp(&self) -> anyhow::Result<Option<SmtpConfig>> {
        let Some(host) = self.smtp_host.as_ref().filter(|host| !host.is_empty()) else {
            return Ok(None);
        };
        let tls = self
            .smtp_tls
            .parse::<SmtpTls>()
            .with_context(|| format!("invalid smtp_tls '{}'", self.smtp_tls))?;
        Ok(Some(SmtpConfig {
            host: host.clone(),
            port: self.smtp_port,
            username: self.smtp_username.clone(),
            password: self.smtp_password.clone(),
            tls,
        }))
    }
}

pub fn load_settings() -> Settings {
    let file_cfg = fs::read_to_string("server.toml")
        .ok()
        .and_then(|raw| toml::from_str::<HashMap<String, String>>(&raw).ok())
        .unwrap_or_default();
    build_settings(&file_cfg, |key| std::env::var(key).ok())
}

/// Layers the file table and then the environment over the defaults.
fn build_settings(file_cfg: &HashMap<String, String>, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    let lookup = |file_key: &str, env_keys: &[&str]| -> Option<String> {
        env_keys
            .iter()
            .rev()
            .find_map(|&key| env(key))
            .or_else(|| file_cfg.get(file_key).cloned())
    };

    if let Some(v) = lookup("bind_addr", &["SERVER_BIND", "APP__BIND_ADDR"]) {
        settings.server_bind = v;
    }
    if let Some(v) = lookup("database_url", &["DATABASE_URL", "APP__DATABASE_URL"]) {
        settings.database_url = v;
    }
    if let Some(v) = lookup("public_url", &["APP__PUBLIC_URL"]) {
        settings.public_url = v;
    }
    if let Some(v) = lookup("install_root", &["APP__INSTALL_ROOT"]) {
        settings.install_root = PathBuf::from(v);
    }
    if let Some(v) = lookup("default_language", &["APP__DEFAULT_LANGUAGE"]) {
        settings.default_language = v;
    }
    settings.csrf_token = lookup("csrf_token", &["APP__CSRF_TOKEN"]).filter(|v| !v.is_empty());

    settings.smtp_host = lookup("smtp_host", &["APP__SMTP_HOST"]);
    if let Some(v) = lookup("smtp_port", &["APP__SMTP_PORT"]) {
        if let Ok(parsed) = v.parse::<u16>() {
            settings.smtp_port = parsed;
        }
    }
    settings.smtp_username = lookup("smtp_username", &["APP__SMTP_USERNAME"]);
    settings.smtp_password = lookup("smtp_password", &["APP__SMTP_PASSWORD"]);
    if let Some(v) = lookup("smtp_tls", &["APP__SMTP_TLS"]) {
        settings.smtp_tls = v;
    }

    settings
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    ensure_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    let path = raw_database_url
        .strip_prefix("sqlite:")
        .unwrap_or(raw_database_url)
        .replace('\\', "/");
    format!("sqlite://{path}")
}

fn ensure_parent_dir_exists(database_url: &str) -> anyhow::Result<()> {
    let Some(parent) = sqlite_path(database_url)
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
    else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }

    fs::create_dir_all(&parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(PathBuf::from(path))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
