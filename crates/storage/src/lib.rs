use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite, SqliteConnection,
};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use uuid::Uuid;

use shared::domain::{
    OrganizationField, OrganizationId, OrganizationSummary, UserId, ORGANIZATION_SELECT_KEY,
};

pub type StoreTransaction = sqlx::Transaction<'static, Sqlite>;

/// Category type whose first entry receives the seeded roles.
pub const ROLE_CATEGORY_TYPE: &str = "ROL";

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
    database_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct StoredOrganization {
    pub organization_id: OrganizationId,
    pub short_name: String,
    pub long_name: String,
    pub homepage: String,
    pub created_at: DateTime<Utc>,
}

impl From<StoredOrganization> for OrganizationSummary {
    fn from(value: StoredOrganization) -> Self {
        Self {
            organization_id: value.organization_id,
            short_name: value.short_name,
            long_name: value.long_name,
            homepage: value.homepage,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoredUser {
    pub user_id: UserId,
    pub uuid: String,
    pub login_name: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl StoredUser {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// One routed write of a preferences save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingWrite {
    Organization {
        field: OrganizationField,
        value: String,
    },
    SystemText {
        name: String,
        value: String,
    },
    Preference {
        name: String,
        value: String,
    },
    PurgeAutoLogins,
}

#[derive(Debug, Clone)]
pub struct CategorySeed {
    pub category_type: String,
    pub name_intern: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct OrganizationSeed {
    pub short_name: String,
    pub long_name: String,
    pub homepage: String,
    pub preferences: Vec<(String, String)>,
    pub system_texts: Vec<(String, String)>,
    pub categories: Vec<CategorySeed>,
    pub administrator: UserId,
    pub administrator_role_name: String,
    pub member_role_name: String,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self {
            pool,
            database_file: sqlite_path(database_url),
        })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Path of the backing file, `None` for in-memory databases.
    pub fn database_file(&self) -> Option<&Path> {
        self.database_file.as_deref()
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn begin(&self) -> Result<StoreTransaction> {
        self.pool
            .begin()
            .await
            .context("failed to open transaction")
    }

    pub async fn create_user(
        &self,
        login_name: &str,
        first_name: &str,
        last_name: &str,
        email: &str,
    ) -> Result<UserId> {
        let rec = sqlx::query(
            "INSERT INTO users (uuid, login_name, first_name, last_name, email) VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(login_name) DO UPDATE SET
                first_name=excluded.first_name,
                last_name=excluded.last_name,
                email=excluded.email
             RETURNING id",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(login_name)
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(UserId(rec.get::<i64, _>(0)))
    }

    pub async fn user(&self, user_id: UserId) -> Result<Option<StoredUser>> {
        let row = sqlx::query(
            "SELECT id, uuid, login_name, first_name, last_name, email FROM users WHERE id = ?",
        )
        .bind(user_id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| StoredUser {
            user_id: UserId(r.get::<i64, _>(0)),
            uuid: r.get::<String, _>(1),
            login_name: r.get::<String, _>(2),
            first_name: r.get::<String, _>(3),
            last_name: r.get::<String, _>(4),
            email: r.get::<String, _>(5),
        }))
    }

    pub async fn is_administrator(
        &self,
        organization_id: OrganizationId,
        user_id: UserId,
    ) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*)
             FROM members m
             INNER JOIN roles r ON r.id = m.role_id
             INNER JOIN categories c ON c.id = r.cat_id
             WHERE m.user_id = ? AND c.org_id = ? AND r.is_administrator = 1",
        )
        .bind(user_id.0)
        .bind(organization_id.0)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn organization(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Option<StoredOrganization>> {
        let row = sqlx::query(
            "SELECT id, shortname, longname, homepage, created_at FROM organizations WHERE id = ?",
        )
        .bind(organization_id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(organization_from_row))
    }

    pub async fn organization_by_short_name(
        &self,
        short_name: &str,
    ) -> Result<Option<StoredOrganization>> {
        let row = sqlx::query(
            "SELECT id, shortname, longname, homepage, created_at FROM organizations WHERE shortname = ?",
        )
        .bind(short_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(organization_from_row))
    }

    pub async fn list_organizations(&self) -> Result<Vec<StoredOrganization>> {
        let rows = sqlx::query(
            "SELECT id, shortname, longname, homepage, created_at FROM organizations ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(organization_from_row).collect())
    }

    pub async fn first_organization(&self) -> Result<Option<StoredOrganization>> {
        Ok(self.list_organizations().await?.into_iter().next())
    }

    pub async fn count_organizations(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM organizations")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn preference(
        &self,
        organization_id: OrganizationId,
        name: &str,
    ) -> Result<Option<String>> {
        let value = sqlx::query_scalar("SELECT value FROM preferences WHERE org_id = ? AND name = ?")
            .bind(organization_id.0)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    pub async fn preferences(
        &self,
        organization_id: OrganizationId,
    ) -> Result<HashMap<String, String>> {
        let rows = sqlx::query("SELECT name, value FROM preferences WHERE org_id = ?")
            .bind(organization_id.0)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| (r.get::<String, _>(0), r.get::<String, _>(1)))
            .collect())
    }

    pub async fn set_preference(
        &self,
        organization_id: OrganizationId,
        name: &str,
        value: &str,
    ) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        upsert_preference(&mut conn, organization_id, name, value).await
    }

    pub async fn set_preferences(
        &self,
        organization_id: OrganizationId,
        entries: &[(String, String)],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for (name, value) in entries {
            upsert_preference(&mut tx, organization_id, name, value).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn text(&self, organization_id: OrganizationId, name: &str) -> Result<Option<String>> {
        let value = sqlx::query_scalar("SELECT text FROM texts WHERE org_id = ? AND name = ?")
            .bind(organization_id.0)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    pub async fn texts(&self, organization_id: OrganizationId) -> Result<HashMap<String, String>> {
        let rows = sqlx::query("SELECT name, text FROM texts WHERE org_id = ?")
            .bind(organization_id.0)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| (r.get::<String, _>(0), r.get::<String, _>(1)))
            .collect())
    }

    pub async fn set_text(&self, organization_id: OrganizationId, name: &str, text: &str) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        upsert_text(&mut conn, organization_id, name, text).await
    }

    pub async fn create_auto_login(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
    ) -> Result<String> {
        let token = Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO auto_logins (user_id, org_id, token) VALUES (?, ?, ?)")
            .bind(user_id.0)
            .bind(organization_id.0)
            .bind(&token)
            .execute(&self.pool)
            .await?;
        Ok(token)
    }

    pub async fn count_auto_logins(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM auto_logins")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Applies every write of one preferences save in a single transaction.
    pub async fn apply_setting_writes(
        &self,
        organization_id: OrganizationId,
        writes: &[SettingWrite],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for write in writes {
            match write {
                SettingWrite::Organization { field, value } => {
                    let sql = match field {
                        OrganizationField::LongName => {
                            "UPDATE organizations SET longname = ? WHERE id = ?"
                        }
                        OrganizationField::Homepage => {
                            "UPDATE organizations SET homepage = ? WHERE id = ?"
                        }
                    };
                    let result = sqlx::query(sql)
                        .bind(value)
                        .bind(organization_id.0)
                        .execute(&mut *tx)
                        .await
                        .with_context(|| format!("failed to update {}", field.key()))?;
                    if result.rows_affected() == 0 {
                        bail!("organization {organization_id} not found");
                    }
                }
                SettingWrite::SystemText { name, value } => {
                    upsert_text(&mut tx, organization_id, name, value).await?;
                }
                SettingWrite::Preference { name, value } => {
                    upsert_preference(&mut tx, organization_id, name, value).await?;
                }
                SettingWrite::PurgeAutoLogins => {
                    sqlx::query("DELETE FROM auto_logins")
                        .execute(&mut *tx)
                        .await
                        .context("failed to purge auto logins")?;
                }
            }
        }
        tx.commit().await?;
        Ok(())
    }

    /// Creates an organization with its preferences and reference data. Nothing is
    /// written unless every step succeeds.
    pub async fn provision_organization(&self, seed: &OrganizationSeed) -> Result<OrganizationId> {
        let mut tx = self.pool.begin().await?;

        let rec = sqlx::query(
            "INSERT INTO organizations (shortname, longname, homepage) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(&seed.short_name)
        .bind(&seed.long_name)
        .bind(&seed.homepage)
        .fetch_one(&mut *tx)
        .await
        .context("failed to insert organization")?;
        let organization_id = OrganizationId(rec.get::<i64, _>(0));

        for (name, value) in &seed.preferences {
            sqlx::query("INSERT INTO preferences (org_id, name, value) VALUES (?, ?, ?)")
                .bind(organization_id.0)
                .bind(name)
                .bind(value)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("failed to seed preference '{name}'"))?;
        }

        for (name, text) in &seed.system_texts {
            sqlx::query("INSERT INTO texts (org_id, name, text) VALUES (?, ?, ?)")
                .bind(organization_id.0)
                .bind(name)
                .bind(text)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("failed to seed text '{name}'"))?;
        }

        let mut role_category = None;
        for (index, category) in seed.categories.iter().enumerate() {
            let rec = sqlx::query(
                "INSERT INTO categories (org_id, type, name_intern, name, sequence, is_system)
                 VALUES (?, ?, ?, ?, ?, 1) RETURNING id",
            )
            .bind(organization_id.0)
            .bind(&category.category_type)
            .bind(&category.name_intern)
            .bind(&category.name)
            .bind(i64::try_from(index + 1).unwrap_or(i64::MAX))
            .fetch_one(&mut *tx)
            .await
            .with_context(|| format!("failed to seed category '{}'", category.name_intern))?;
            if role_category.is_none() && category.category_type == ROLE_CATEGORY_TYPE {
                role_category = Some(rec.get::<i64, _>(0));
            }
        }
        let Some(role_category) = role_category else {
            bail!("seed data has no {ROLE_CATEGORY_TYPE} category for the default roles");
        };

        let administrator_role: i64 = sqlx::query_scalar(
            "INSERT INTO roles (cat_id, name, is_administrator, is_default) VALUES (?, ?, 1, 0) RETURNING id",
        )
        .bind(role_category)
        .bind(&seed.administrator_role_name)
        .fetch_one(&mut *tx)
        .await
        .context("failed to create administrator role")?;
        sqlx::query("INSERT INTO roles (cat_id, name, is_administrator, is_default) VALUES (?, ?, 0, 1)")
            .bind(role_category)
            .bind(&seed.member_role_name)
            .execute(&mut *tx)
            .await
            .context("failed to create member role")?;
        sqlx::query("INSERT INTO members (role_id, user_id, is_leader) VALUES (?, ?, 0)")
            .bind(administrator_role)
            .bind(seed.administrator.0)
            .execute(&mut *tx)
            .await
            .context("failed to assign administrator")?;

        let organizations: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM organizations")
            .fetch_one(&mut *tx)
            .await?;
        if organizations >= 2 {
            sqlx::query("UPDATE preferences SET value = '1' WHERE name = ?")
                .bind(ORGANIZATION_SELECT_KEY)
                .execute(&mut *tx)
                .await
                .context("failed to enable organization select")?;
        }

        tx.commit().await?;
        Ok(organization_id)
    }

    /// Writes a consistent copy of the database to `target`.
    pub async fn vacuum_into(&self, target: &Path) -> Result<()> {
        let target = target.to_string_lossy().to_string();
        sqlx::query("VACUUM INTO ?")
            .bind(&target)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to copy database into '{target}'"))?;
        Ok(())
    }
}

async fn upsert_preference(
    conn: &mut SqliteConnection,
    organization_id: OrganizationId,
    name: &str,
    value: &str,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO preferences (org_id, name, value) VALUES (?, ?, ?)
         ON CONFLICT(org_id, name) DO UPDATE SET value=excluded.value",
    )
    .bind(organization_id.0)
    .bind(name)
    .bind(value)
    .execute(&mut *conn)
    .await
    .with_context(|| format!("failed to write preference '{name}'"))?;
    Ok(())
}

async fn upsert_text(
    conn: &mut SqliteConnection,
    organization_id: OrganizationId,
    name: &str,
    text: &str,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO texts (org_id, name, text) VALUES (?, ?, ?)
         ON CONFLICT(org_id, name) DO UPDATE SET text=excluded.text",
    )
    .bind(organization_id.0)
    .bind(name)
    .bind(text)
    .execute(&mut *conn)
    .await
    .with_context(|| format!("failed to write text '{name}'"))?;
    Ok(())
}

fn organization_from_row(r: sqlx::sqlite::SqliteRow) -> StoredOrganization {
    StoredOrganization {
        organization_id: OrganizationId(r.get::<i64, _>(0)),
        short_name: r.get::<String, _>(1),
        long_name: r.get::<String, _>(2),
        homepage: r.get::<String, _>(3),
        created_at: r.get::<DateTime<Utc>, _>(4),
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:")
        || database_url.contains("mode=memory")
        || !database_url.starts_with("sqlite:")
    {
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

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
