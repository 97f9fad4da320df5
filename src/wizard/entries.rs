//! Built-in entries: a new page next to the current one, and a new page
//! below it.

use crate::models::{CurrentUser, NewPage, Page};
use crate::services::{slugify, Transaction};

use super::error::WizardError;
use super::forms::{CleanedData, EntryForm, FieldSpec, FormErrors, FormKwargs};
use super::registry::{EntryDescriptor, RegistryBuilder, RegistryError};

pub const PAGE_ENTRY_ID: &str = "cms-page-wizard";
pub const SUB_PAGE_ENTRY_ID: &str = "cms-sub-page-wizard";

const TITLE_MAX_LENGTH: usize = 255;

/// Creates a page. A sub page hangs below the context page; a regular page
/// becomes its sibling (or a root page without context).
#[derive(Clone, Copy, Debug)]
pub struct PageForm {
    sub_page: bool,
}

impl PageForm {
    pub fn page() -> Self {
        Self { sub_page: false }
    }

    pub fn sub_page() -> Self {
        Self { sub_page: true }
    }

    fn parent_id(&self, kwargs: &FormKwargs) -> Option<u64> {
        let page = kwargs.page.as_ref()?;
        if self.sub_page {
            Some(page.id)
        } else {
            page.parent_id
        }
    }
}

impl EntryForm for PageForm {
    fn fields(&self, _kwargs: &FormKwargs) -> Vec<FieldSpec> {
        vec![
            FieldSpec::text("title", "Title")
                .max_length(TITLE_MAX_LENGTH)
                .help("Provide a title for the new page."),
            FieldSpec::text("slug", "Slug")
                .max_length(TITLE_MAX_LENGTH)
                .optional()
                .help("Leave empty to derive the slug from the title."),
            FieldSpec::textarea("content", "Content")
                .optional()
                .help("Optional. Initial text of the new page."),
        ]
    }

    fn clean(&self, cleaned: &mut CleanedData, kwargs: &FormKwargs, errors: &mut FormErrors) {
        if self.sub_page && kwargs.page.is_none() {
            errors.add_non_field("A sub page needs a parent; start the wizard from an existing page.");
        }
        let source = cleaned
            .get("slug")
            .or_else(|| cleaned.get("title"))
            .cloned()
            .unwrap_or_default();
        if !source.is_empty() {
            let slug = slugify(&source);
            if slug.is_empty() {
                errors.add("slug", "Enter a slug consisting of letters or numbers.");
            } else {
                cleaned.insert("slug".into(), slug);
            }
        }
    }

    fn save(&self, cleaned: &CleanedData, kwargs: &FormKwargs, tx: &mut Transaction) -> Result<Page, WizardError> {
        let title = cleaned.get("title").cloned().unwrap_or_default();
        let parent_id = self.parent_id(kwargs);
        let base = cleaned.get("slug").cloned().unwrap_or_else(|| slugify(&title));
        let slug = available_slug(tx, parent_id, &base);
        let page = tx.insert_page(NewPage {
            title,
            slug,
            parent_id,
            language: kwargs.language.clone(),
            content: cleaned.get("content").cloned().unwrap_or_default(),
            created_by: kwargs.user.username.clone(),
        })?;
        tracing::info!(page_id = page.id, path = %page.path, "Created page");
        Ok(page)
    }
}

/// `base`, or `base-2`, `base-3`, ... if a sibling already uses it.
fn available_slug(tx: &Transaction, parent_id: Option<u64>, base: &str) -> String {
    let mut candidate = base.to_string();
    let mut n = 1;
    while tx.slug_taken(parent_id, &candidate) {
        n += 1;
        candidate = format!("{}-{}", base, n);
    }
    candidate
}

fn can_add_sub_page(user: &CurrentUser, page: Option<&Page>) -> bool {
    user.can_add_content() && page.is_some()
}

/// Register the built-in page entries.
pub fn register_defaults(builder: &mut RegistryBuilder) -> Result<(), RegistryError> {
    builder
        .register(
            EntryDescriptor::new(PAGE_ENTRY_ID, "New page", PageForm::page())
                .with_description("Create a new page next to the current page.")
                .with_weight(100),
        )?
        .register(
            EntryDescriptor::new(SUB_PAGE_ENTRY_ID, "New sub page", PageForm::sub_page())
                .with_description("Create a page below the current page.")
                .with_weight(110)
                .with_permission(can_add_sub_page),
        )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use crate::services::ContentStore;
    use crate::wizard::registry::EntryRegistry;

    fn kwargs(page: Option<Page>) -> FormKwargs {
        FormKwargs {
            user: CurrentUser::new("ed", UserRole::Editor),
            language: "de".into(),
            page,
        }
    }

    fn cleaned(pairs: &[(&str, &str)]) -> CleanedData {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults_register_both_entries() {
        let mut builder = EntryRegistry::builder();
        register_defaults(&mut builder).unwrap();
        let registry = builder.build();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.entries()[0].id(), PAGE_ENTRY_ID);
        let sub = registry.get_entry(SUB_PAGE_ENTRY_ID).unwrap();
        let editor = CurrentUser::new("ed", UserRole::Editor);
        assert!(!sub.user_has_add_permission(&editor, None));
    }

    #[test]
    fn sub_page_requires_context() {
        let mut data = cleaned(&[("title", "Team")]);
        let mut errors = FormErrors::default();
        PageForm::sub_page().clean(&mut data, &kwargs(None), &mut errors);
        assert_eq!(errors.non_field_errors().len(), 1);
    }

    #[test]
    fn clean_derives_slug_from_title() {
        let mut data = cleaned(&[("title", "Hello World")]);
        let mut errors = FormErrors::default();
        PageForm::page().clean(&mut data, &kwargs(None), &mut errors);
        assert!(errors.is_empty());
        assert_eq!(data.get("slug").map(String::as_str), Some("hello-world"));
    }

    #[tokio::test]
    async fn sub_page_is_created_below_context() {
        let store = ContentStore::in_memory();
        let parent = store
            .atomic(|tx| PageForm::page().save(&cleaned(&[("title", "About")]), &kwargs(None), tx))
            .await
            .unwrap();
        let child = store
            .atomic(|tx| {
                PageForm::sub_page().save(&cleaned(&[("title", "Team"), ("slug", "team")]), &kwargs(Some(parent.clone())), tx)
            })
            .await
            .unwrap();
        assert_eq!(child.parent_id, Some(parent.id));
        assert_eq!(child.language, "de");
        assert_eq!(child.created_by, "ed");
        assert_eq!(child.absolute_url("de"), "/de/about/team/");
    }

    #[tokio::test]
    async fn clashing_slugs_get_a_suffix() {
        let store = ContentStore::in_memory();
        for _ in 0..2 {
            store
                .atomic(|tx| PageForm::page().save(&cleaned(&[("title", "News")]), &kwargs(None), tx))
                .await
                .unwrap();
        }
        let mut slugs: Vec<_> = store.pages().into_iter().map(|p| p.slug).collect();
        slugs.sort();
        assert_eq!(slugs, vec!["news", "news-2"]);
    }
}
