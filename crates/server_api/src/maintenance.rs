//! Data-folder protection and database backups.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use storage::Storage;
use tracing::{info, warn};

use crate::{error::AdminError, l10n::Localization};

const HTACCESS_FILE: &str = ".htaccess";

const HTACCESS_RULES: &str = "<IfModule mod_version.c>
    <IfVersion < 2.4>
        Order deny,allow
        Deny from all
    </IfVersion>
    <IfVersion >= 2.4>
        Require all denied
    </IfVersion>
</IfModule>
<IfModule !mod_version.c>
    <IfModule !mod_authz_core.c>
        Order deny,allow
        Deny from all
    </IfModule>
    <IfModule mod_authz_core.c>
        Require all denied
    </IfModule>
</IfModule>
";

#[async_trait]
pub trait FolderProtector: Send + Sync {
    async fn is_protected(&self) -> bool;

    async fn protect(&self) -> Result<()>;
}

/// Denies web access to a folder with an Apache `.htaccess` file.
#[derive(Debug, Clone)]
pub struct HtaccessProtector {
    folder: PathBuf,
}

impl HtaccessProtector {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    fn file(&self) -> PathBuf {
        self.folder.join(HTACCESS_FILE)
    }
}

#[async_trait]
impl FolderProtector for HtaccessProtector {
    async fn is_protected(&self) -> bool {
        tokio::fs::metadata(self.file())
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    async fn protect(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.folder)
            .await
            .with_context(|| format!("failed to create '{}'", self.folder.display()))?;
        let file = self.file();
        tokio::fs::write(&file, HTACCESS_RULES)
            .await
            .with_context(|| format!("failed to write '{}'", file.display()))
    }
}

/// Localized `SYS_ON` when the folder is protected afterwards, `SYS_OFF` otherwise.
pub async fn protect_folder(protector: &dyn FolderProtector, l10n: &Localization) -> String {
    if protector.is_protected().await {
        return l10n.get("SYS_ON");
    }
    match protector.protect().await {
        Ok(()) => l10n.get("SYS_ON"),
        Err(error) => {
            warn!(error = %format!("{error:#}"), "htaccess file could not be created");
            l10n.get("SYS_OFF")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseExport {
    pub file_name: String,
    pub content: Vec<u8>,
}

#[async_trait]
pub trait DatabaseDumper: Send + Sync {
    fn is_supported(&self) -> bool;

    async fn create(&self, file_name: &str) -> Result<PathBuf>;

    async fn export(&self, dump: &Path) -> Result<DatabaseExport>;

    async fn cleanup(&self, dump: &Path) -> Result<()>;
}

/// Copies the live SQLite database into the backup folder with `VACUUM INTO`.
#[derive(Clone)]
pub struct SqliteDumper {
    storage: Storage,
    backup_dir: PathBuf,
}

impl SqliteDumper {
    pub fn new(storage: Storage, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage,
            backup_dir: backup_dir.into(),
        }
    }
}

#[async_trait]
impl DatabaseDumper for SqliteDumper {
    fn is_supported(&self) -> bool {
        self.storage.database_file().is_some()
    }

    async fn create(&self, file_name: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.backup_dir)
            .await
            .with_context(|| format!("failed to create '{}'", self.backup_dir.display()))?;
        let target = self.backup_dir.join(file_name);
        if tokio::fs::metadata(&target).await.is_ok() {
            tokio::fs::remove_file(&target)
                .await
                .with_context(|| format!("failed to replace '{}'", target.display()))?;
        }
        self.storage.vacuum_into(&target).await?;
        Ok(target)
    }

    async fn export(&self, dump: &Path) -> Result<DatabaseExport> {
        let content = tokio::fs::read(dump)
            .await
            .with_context(|| format!("failed to read '{}'", dump.display()))?;
        let file_name = dump
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(DatabaseExport { file_name, content })
    }

    async fn cleanup(&self, dump: &Path) -> Result<()> {
        tokio::fs::remove_file(dump)
            .await
            .with_context(|| format!("failed to delete '{}'", dump.display()))
    }
}

pub fn dump_file_name(database_name: &str) -> String {
    format!(
        "admidio_dump_{database_name}_{}.sqlite",
        Utc::now().format("%Y-%m-%d_%H%M%S")
    )
}

/// Creates a dump, reads it back for download and removes the file again.
pub async fn create_backup(
    dumper: &dyn DatabaseDumper,
    database_name: &str,
) -> Result<DatabaseExport, AdminError> {
    if !dumper.is_supported() {
        return Err(AdminError::UnsupportedConfiguration);
    }

    let dump = dumper.create(&dump_file_name(database_name)).await?;
    let export = dumper.export(&dump).await;
    if let Err(error) = dumper.cleanup(&dump).await {
        warn!(error = %format!("{error:#}"), dump = %dump.display(), "failed to remove dump file");
    }
    let export = export?;
    info!(file = %export.file_name, bytes = export.content.len(), "database backup exported");
    Ok(export)
}

#[cfg(test)]
#[path = "tests/maintenance_tests.rs"]
mod tests;
