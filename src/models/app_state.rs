use std::sync::Arc;

use crate::services::ContentStore;
use crate::wizard::{EntryRegistry, FileStaging, LanguageSettings, WizardContext, WizardStorage};

#[derive(Clone)]
pub struct AppState {
    /// Wizard entries; fixed once the server starts.
    pub registry: Arc<EntryRegistry>,
    pub store: ContentStore,
    pub wizard_sessions: WizardStorage,
    pub files: FileStaging,
    pub languages: Arc<LanguageSettings>,
    pub public_base_url: String,
    /// Header carrying the acting user's name, set by the upstream proxy.
    pub remote_user_header: String,
    pub remote_role_header: String,
}

impl AppState {
    pub fn wizard_context(&self) -> WizardContext<'_> {
        WizardContext {
            registry: &self.registry,
            store: &self.store,
            files: &self.files,
        }
    }
}
