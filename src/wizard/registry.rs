//! Entry registry.
//!
//! Entries are registered once through a [`RegistryBuilder`] while the
//! application starts; the built [`EntryRegistry`] is read-only and shared
//! through the application state.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::models::{CurrentUser, Page};

use super::error::WizardError;
use super::forms::EntryForm;

/// Template used for step two when an entry does not name its own.
pub const DEFAULT_ENTRY_TEMPLATE: &str = "wizard/create.html";

pub type SuccessUrlFn = Arc<dyn Fn(&Page, &str) -> String + Send + Sync>;
pub type PermissionFn = Arc<dyn Fn(&CurrentUser, Option<&Page>) -> bool + Send + Sync>;

/// A registrable content-creation option.
#[derive(Clone)]
pub struct EntryDescriptor {
    id: String,
    title: String,
    description: String,
    weight: i32,
    form: Arc<dyn EntryForm>,
    template_name: String,
    success_url: SuccessUrlFn,
    permission: PermissionFn,
}

impl fmt::Debug for EntryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryDescriptor")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("weight", &self.weight)
            .field("template_name", &self.template_name)
            .finish_non_exhaustive()
    }
}

impl EntryDescriptor {
    /// An entry redirecting to the created page and open to every user who
    /// may add content.
    pub fn new(id: &str, title: &str, form: impl EntryForm + 'static) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            weight: 100,
            form: Arc::new(form),
            template_name: DEFAULT_ENTRY_TEMPLATE.to_string(),
            success_url: Arc::new(|page: &Page, language: &str| page.absolute_url(language)),
            permission: Arc::new(|user: &CurrentUser, _page: Option<&Page>| user.can_add_content()),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Lower weights are listed first.
    pub fn with_weight(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_template(mut self, template_name: &str) -> Self {
        self.template_name = template_name.to_string();
        self
    }

    pub fn with_success_url<F>(mut self, f: F) -> Self
    where
        F: Fn(&Page, &str) -> String + Send + Sync + 'static,
    {
        self.success_url = Arc::new(f);
        self
    }

    pub fn with_permission<F>(mut self, f: F) -> Self
    where
        F: Fn(&CurrentUser, Option<&Page>) -> bool + Send + Sync + 'static,
    {
        self.permission = Arc::new(f);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn weight(&self) -> i32 {
        self.weight
    }

    pub fn form(&self) -> Arc<dyn EntryForm> {
        Arc::clone(&self.form)
    }

    pub fn template_name(&self) -> &str {
        &self.template_name
    }

    pub fn get_success_url(&self, obj: &Page, language: &str) -> String {
        (self.success_url)(obj, language)
    }

    pub fn user_has_add_permission(&self, user: &CurrentUser, page: Option<&Page>) -> bool {
        (self.permission)(user, page)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("Entry '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("Invalid entry id '{0}'")]
    InvalidId(String),
}

/// Collects entries during startup.
#[derive(Default)]
pub struct RegistryBuilder {
    entries: Vec<EntryDescriptor>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entry: EntryDescriptor) -> Result<&mut Self, RegistryError> {
        let id = entry.id();
        if id.is_empty() || id.chars().any(|c| c.is_whitespace()) {
            return Err(RegistryError::InvalidId(id.to_string()));
        }
        if self.entries.iter().any(|e| e.id() == id) {
            return Err(RegistryError::AlreadyRegistered(id.to_string()));
        }
        tracing::debug!(entry = id, "Registered wizard entry");
        self.entries.push(entry);
        Ok(self)
    }

    pub fn build(self) -> EntryRegistry {
        let mut entries: Vec<Arc<EntryDescriptor>> = self.entries.into_iter().map(Arc::new).collect();
        entries.sort_by(|a, b| a.weight().cmp(&b.weight()).then_with(|| a.title().cmp(b.title())));
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id().to_string(), i))
            .collect();
        EntryRegistry { entries, index }
    }
}

/// Read-only lookup of registered entries.
#[derive(Debug, Default)]
pub struct EntryRegistry {
    entries: Vec<Arc<EntryDescriptor>>,
    index: HashMap<String, usize>,
}

impl EntryRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Fails with [`WizardError::UnknownEntry`] for unregistered ids.
    pub fn get_entry(&self, id: &str) -> Result<Arc<EntryDescriptor>, WizardError> {
        self.index
            .get(id)
            .map(|&i| Arc::clone(&self.entries[i]))
            .ok_or_else(|| WizardError::UnknownEntry(id.to_string()))
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// All entries ordered by weight, then title.
    pub fn entries(&self) -> &[Arc<EntryDescriptor>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use crate::services::Transaction;
    use crate::wizard::forms::{CleanedData, FieldSpec, FormKwargs};

    struct Noop;

    impl EntryForm for Noop {
        fn fields(&self, _kwargs: &FormKwargs) -> Vec<FieldSpec> {
            Vec::new()
        }

        fn save(&self, _cleaned: &CleanedData, _kwargs: &FormKwargs, _tx: &mut Transaction) -> Result<Page, WizardError> {
            Err(WizardError::StepOneIncomplete)
        }
    }

    #[test]
    fn entries_sorted_by_weight_then_title() {
        let mut builder = EntryRegistry::builder();
        builder
            .register(EntryDescriptor::new("b", "Beta", Noop).with_weight(20))
            .unwrap()
            .register(EntryDescriptor::new("z", "Zulu", Noop).with_weight(10))
            .unwrap()
            .register(EntryDescriptor::new("a", "Alpha", Noop).with_weight(20))
            .unwrap();
        let registry = builder.build();
        let ids: Vec<_> = registry.entries().iter().map(|e| e.id().to_string()).collect();
        assert_eq!(ids, vec!["z", "a", "b"]);
        assert_eq!(registry.get_entry("a").unwrap().title(), "Alpha");
    }

    #[test]
    fn duplicate_and_blank_ids_are_rejected() {
        let mut builder = EntryRegistry::builder();
        builder.register(EntryDescriptor::new("page", "Page", Noop)).unwrap();
        assert_eq!(
            builder.register(EntryDescriptor::new("page", "Again", Noop)).err(),
            Some(RegistryError::AlreadyRegistered("page".into()))
        );
        assert!(matches!(
            builder.register(EntryDescriptor::new("", "Blank", Noop)),
            Err(RegistryError::InvalidId(_))
        ));
    }

    #[test]
    fn unknown_entry_is_an_error() {
        let registry = EntryRegistry::builder().build();
        assert!(matches!(registry.get_entry("nope"), Err(WizardError::UnknownEntry(id)) if id == "nope"));
    }

    #[test]
    fn default_permission_follows_role() {
        let entry = EntryDescriptor::new("page", "Page", Noop);
        assert!(entry.user_has_add_permission(&CurrentUser::new("e", UserRole::Editor), None));
        assert!(!entry.user_has_add_permission(&CurrentUser::anonymous(), None));
    }
}
