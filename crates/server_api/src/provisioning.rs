use std::time::{Duration, Instant};

use serde::Deserialize;
use shared::domain::{OrganizationId, UserId};
use storage::{OrganizationSeed, Storage};
use tracing::{info, warn};

use crate::{
    defaults::{default_categories, default_preferences, default_system_texts},
    error::AdminError,
    l10n::Localization,
};

/// Expected upper bound of one provisioning run. Only logged when exceeded.
pub const PROVISIONING_TIME_ALLOWANCE: Duration = Duration::from_secs(120);

pub const SHORT_NAME_MAX_LENGTH: usize = 10;
pub const LONG_NAME_MAX_LENGTH: usize = 50;
pub const EMAIL_MAX_LENGTH: usize = 50;

/// Fields of the "add organization" form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewOrganizationRequest {
    pub orga_short_name: String,
    pub orga_long_name: String,
    pub orga_email: String,
}

pub struct OrganizationProvisioner<'a> {
    storage: &'a Storage,
    homepage: &'a str,
    l10n: &'a Localization,
}

impl<'a> OrganizationProvisioner<'a> {
    pub fn new(storage: &'a Storage, homepage: &'a str, l10n: &'a Localization) -> Self {
        Self {
            storage,
            homepage,
            l10n,
        }
    }

    pub async fn create(
        &self,
        request: &NewOrganizationRequest,
        creator: UserId,
        system_language: &str,
    ) -> Result<OrganizationId, AdminError> {
        // The short name is checked and stored untrimmed.
        let short_name = request.orga_short_name.as_str();
        let long_name = request.orga_long_name.trim();
        if short_name.trim().is_empty() || long_name.is_empty() {
            return Err(AdminError::IncompleteName);
        }
        if self
            .storage
            .organization_by_short_name(short_name)
            .await?
            .is_some()
        {
            return Err(AdminError::DuplicateShortName(short_name.to_string()));
        }
        if !is_valid_short_name(short_name) {
            return Err(AdminError::InvalidCharacters("SYS_NAME_ABBREVIATION"));
        }

        let started = Instant::now();
        let seed = OrganizationSeed {
            short_name: short_name.to_string(),
            long_name: long_name.to_string(),
            homepage: self.homepage.to_string(),
            preferences: default_preferences(request.orga_email.trim(), system_language),
            system_texts: default_system_texts(),
            categories: default_categories(),
            administrator: creator,
            administrator_role_name: self.l10n.get("SYS_ADMINISTRATOR"),
            member_role_name: self.l10n.get("SYS_MEMBER"),
        };
        let organization_id = self.storage.provision_organization(&seed).await?;

        let elapsed = started.elapsed();
        if elapsed > PROVISIONING_TIME_ALLOWANCE {
            warn!(
                %organization_id,
                elapsed_ms = elapsed.as_millis() as u64,
                "organization provisioning exceeded its time allowance"
            );
        }
        info!(%organization_id, short_name, %creator, "organization created");
        Ok(organization_id)
    }
}

/// Letters, digits and `.-_+@` only.
pub fn is_valid_short_name(short_name: &str) -> bool {
    short_name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+' | '@'))
}

#[cfg(test)]
#[path = "tests/provisioning_tests.rs"]
mod tests;
