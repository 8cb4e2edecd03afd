use shared::error::{ApiError, ErrorCode};
use thiserror::Error;
use tracing::error;

use crate::{l10n::Localization, page::escape_html};

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("user is not an administrator of this organization")]
    NotAuthorized,
    #[error("organization not found")]
    UnknownOrganization,
    #[error("invalid page view")]
    InvalidPageView,
    #[error("theme is not a valid installed theme")]
    InvalidTheme,
    #[error("required field {0} is missing or invalid")]
    MissingRequiredField(&'static str),
    #[error("organization field '{0}' cannot be changed")]
    UnknownOrganizationField(String),
    #[error("organization name is incomplete")]
    IncompleteName,
    #[error("organization short name '{0}' already exists")]
    DuplicateShortName(String),
    #[error("field {0} contains invalid characters")]
    InvalidCharacters(&'static str),
    #[error("email to {recipient} could not be delivered: {reason}")]
    DeliveryFailure { recipient: String, reason: String },
    #[error("database backup is not supported for this database")]
    UnsupportedConfiguration,
    #[error("page could not be rendered")]
    Render(#[from] handlebars::RenderError),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl AdminError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotAuthorized => ErrorCode::NotAuthorized,
            Self::UnknownOrganization => ErrorCode::NotFound,
            Self::InvalidPageView
            | Self::InvalidTheme
            | Self::MissingRequiredField(_)
            | Self::UnknownOrganizationField(_)
            | Self::IncompleteName
            | Self::InvalidCharacters(_) => ErrorCode::InvalidInput,
            Self::DuplicateShortName(_) => ErrorCode::DuplicateResource,
            Self::DeliveryFailure { .. } => ErrorCode::DeliveryFailure,
            Self::UnsupportedConfiguration => ErrorCode::UnsupportedConfiguration,
            Self::Render(_) => ErrorCode::Internal,
            Self::Storage(_) => ErrorCode::TransactionFailure,
        }
    }

    /// User-facing text. Storage details are logged here and never returned.
    pub fn localized_message(&self, l10n: &Localization) -> String {
        match self {
            Self::NotAuthorized => l10n.get("SYS_NO_RIGHTS"),
            Self::UnknownOrganization => l10n.get("SYS_ORGANIZATION_NOT_FOUND"),
            Self::InvalidPageView => l10n.get("SYS_INVALID_PAGE_VIEW"),
            Self::InvalidTheme => l10n.get("ORG_INVALID_THEME"),
            Self::MissingRequiredField(label) => {
                l10n.get_with("SYS_FIELD_EMPTY", &[&l10n.get(label)])
            }
            Self::UnknownOrganizationField(field) => {
                l10n.get_with("ORG_FIELD_NOT_EDITABLE", &[&escape_html(field)])
            }
            Self::IncompleteName => l10n.get("INS_ORGANIZATION_NAME_NOT_COMPLETELY"),
            Self::DuplicateShortName(short_name) => {
                l10n.get_with("INS_ORGA_SHORTNAME_EXISTS", &[&escape_html(short_name)])
            }
            Self::InvalidCharacters(label) => {
                l10n.get_with("SYS_FIELD_INVALID_CHAR", &[&l10n.get(label)])
            }
            Self::DeliveryFailure { recipient, reason } => {
                l10n.get_with(
                    "SYS_EMAIL_NOT_SEND",
                    &[&escape_html(recipient), &escape_html(reason)],
                )
            }
            Self::UnsupportedConfiguration => l10n.get("SYS_MODULE_DISABLED"),
            Self::Render(err) => {
                error!(error = %err, "page rendering failed");
                l10n.get("SYS_ERROR")
            }
            Self::Storage(err) => {
                error!(error = %format!("{err:#}"), "storage operation failed");
                l10n.get("SYS_DATABASE_ERROR")
            }
        }
    }

    pub fn to_api_error(&self, l10n: &Localization) -> ApiError {
        ApiError::new(self.code(), self.localized_message(l10n))
    }
}
