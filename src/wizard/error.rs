/// Error types for the creation wizard
use thiserror::Error;

use crate::services::StoreError;

use super::step::Step;

/// Errors that can occur while driving the wizard
#[derive(Debug, Error)]
pub enum WizardError {
    /// An entry id that is not in the registry
    #[error("Unknown wizard entry: {0}")]
    UnknownEntry(String),

    /// Step-two resources were requested before step one validated
    #[error("Step one has not been completed")]
    StepOneIncomplete,

    /// The hidden current-step field is missing or does not match the session
    #[error("ManagementForm data is missing or has been tampered with")]
    ManagementForm,

    /// Save was attempted on a form that did not validate
    #[error("The form for step {0} is not valid")]
    InvalidForm(Step),

    /// The acting user may not use the selected entry
    #[error("You do not have permission to create {0}")]
    PermissionDenied(String),

    /// Content store failure; the surrounding transaction was rolled back
    #[error("Content store error: {0}")]
    Store(#[from] StoreError),

    /// Staging or reading an uploaded file failed
    #[error("Upload staging error: {0}")]
    Files(#[from] std::io::Error),

    /// Rendering a wizard template failed
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

impl WizardError {
    /// Whether the error was caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            WizardError::UnknownEntry(_)
                | WizardError::ManagementForm
                | WizardError::PermissionDenied(_)
        )
    }
}
