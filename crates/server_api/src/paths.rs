use std::{
    fs,
    path::{Path, PathBuf},
};

/// Filesystem layout of an installation (themes, language catalogs, data folder).
#[derive(Debug, Clone)]
pub struct InstallPaths {
    root: PathBuf,
}

impl InstallPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn themes_dir(&self) -> PathBuf {
        self.root.join("themes")
    }

    pub fn theme_entry(&self, theme: &str) -> PathBuf {
        self.themes_dir().join(theme).join("index.html")
    }

    pub fn languages_dir(&self) -> PathBuf {
        self.root.join("languages")
    }

    pub fn language_file(&self, language: &str) -> PathBuf {
        self.languages_dir().join(format!("{language}.toml"))
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn mail_templates_dir(&self) -> PathBuf {
        self.data_dir().join("mail_templates")
    }

    pub fn ecard_templates_dir(&self) -> PathBuf {
        self.data_dir().join("ecard_templates")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.data_dir().join("backup")
    }

    pub fn theme_exists(&self, theme: &str) -> bool {
        is_valid_folder_name(theme) && self.theme_entry(theme).is_file()
    }

    pub fn language_exists(&self, language: &str) -> bool {
        is_valid_folder_name(language) && self.language_file(language).is_file()
    }

    pub fn installed_themes(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.themes_dir()) else {
            return Vec::new();
        };
        let mut themes: Vec<String> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| self.theme_exists(name))
            .collect();
        themes.sort();
        themes
    }

    pub fn installed_languages(&self) -> Vec<String> {
        let mut languages: Vec<String> = list_files(&self.languages_dir())
            .into_iter()
            .filter_map(|name| name.strip_suffix(".toml").map(str::to_string))
            .filter(|language| is_valid_folder_name(language))
            .collect();
        languages.sort();
        languages
    }
}

/// Folder-name token: ASCII letters, digits, `_`, `-` and `.`, no leading dot, no `..`.
pub fn is_valid_folder_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains("..")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Sorted names of the regular files directly inside `dir`.
pub fn list_files(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    files.sort();
    files
}
