use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{NewPage, Page};

/// Errors raised by the content store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access content file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Content file is not valid JSON: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Page {0} does not exist")]
    NotFound(u64),

    #[error("A page with slug '{slug}' already exists at this level")]
    DuplicateSlug { slug: String },

    #[error("Invalid page: {0}")]
    Invalid(String),
}

/// Everything the store persists. Cloned wholesale for each transaction.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ContentDb {
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    pages: BTreeMap<u64, Page>,
}

/// A working copy of the content database. Changes become visible to other
/// readers only when the surrounding [`ContentStore::atomic`] call commits.
pub struct Transaction {
    db: ContentDb,
    created: Vec<u64>,
}

impl Transaction {
    fn new(db: ContentDb) -> Self {
        Self {
            db,
            created: Vec::new(),
        }
    }

    pub fn get_page(&self, id: u64) -> Option<&Page> {
        self.db.pages.get(&id)
    }

    /// Ids of the pages inserted so far in this transaction.
    pub fn created(&self) -> &[u64] {
        &self.created
    }

    /// Whether a page below `parent_id` already uses `slug`.
    pub fn slug_taken(&self, parent_id: Option<u64>, slug: &str) -> bool {
        self.db
            .pages
            .values()
            .any(|p| p.parent_id == parent_id && p.slug == slug)
    }

    pub fn insert_page(&mut self, new: NewPage) -> Result<Page, StoreError> {
        let slug = slugify(if new.slug.trim().is_empty() { &new.title } else { &new.slug });
        if slug.is_empty() {
            return Err(StoreError::Invalid("a page needs a title or slug".into()));
        }
        let parent_path = match new.parent_id {
            Some(pid) => self
                .db
                .pages
                .get(&pid)
                .map(|p| p.path.clone())
                .ok_or(StoreError::NotFound(pid))?,
            None => String::new(),
        };
        if self.slug_taken(new.parent_id, &slug) {
            return Err(StoreError::DuplicateSlug { slug });
        }
        let path = if parent_path.is_empty() {
            slug.clone()
        } else {
            format!("{}/{}", parent_path, slug)
        };
        self.db.next_id += 1;
        let page = Page {
            id: self.db.next_id,
            title: new.title.trim().to_string(),
            slug,
            path,
            parent_id: new.parent_id,
            language: new.language,
            content: new.content,
            created_by: new.created_by,
            created_at: now_iso8601(),
        };
        self.db.pages.insert(page.id, page.clone());
        self.created.push(page.id);
        Ok(page)
    }
}

/// Page storage shared by all requests, optionally backed by a JSON file.
#[derive(Clone)]
pub struct ContentStore {
    db: Arc<Mutex<ContentDb>>,
    path: Option<PathBuf>,
    write_gate: Arc<tokio::sync::Mutex<()>>,
}

impl ContentStore {
    pub fn in_memory() -> Self {
        Self {
            db: Arc::new(Mutex::new(ContentDb::default())),
            path: None,
            write_gate: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Load the store from `path`. A missing file yields an empty store that
    /// will be created on the first commit.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let db = if path.exists() {
            let text = tokio::fs::read_to_string(&path).await?;
            if text.trim().is_empty() {
                ContentDb::default()
            } else {
                serde_json::from_str::<ContentDb>(&text)?
            }
        } else {
            ContentDb::default()
        };
        tracing::info!(path = %path.display(), pages = db.pages.len(), "Loaded content store");
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            path: Some(path),
            write_gate: Arc::new(tokio::sync::Mutex::new(())),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get_page(&self, id: u64) -> Option<Page> {
        self.db.lock().unwrap().pages.get(&id).cloned()
    }

    /// Look a page up by a raw primary key. Missing, blank or malformed keys
    /// all yield `None`.
    pub fn find_page(&self, pk: Option<&str>) -> Option<Page> {
        let raw = pk?.trim();
        if raw.is_empty() {
            return None;
        }
        match raw.parse::<u64>() {
            Ok(id) => self.get_page(id),
            Err(_) => {
                tracing::debug!(pk = raw, "Ignoring malformed page key");
                None
            }
        }
    }

    pub fn pages(&self) -> Vec<Page> {
        self.db.lock().unwrap().pages.values().cloned().collect()
    }

    pub fn page_count(&self) -> usize {
        self.db.lock().unwrap().pages.len()
    }

    /// Run `f` against a snapshot of the store and commit the result only if
    /// `f` succeeds and the content file (if any) was written. Transactions
    /// are serialized.
    pub async fn atomic<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Transaction) -> Result<T, E>,
        E: From<StoreError>,
    {
        let _gate = self.write_gate.lock().await;
        let snapshot = self.db.lock().unwrap().clone();
        let mut tx = Transaction::new(snapshot);
        let value = match f(&mut tx) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(discarded = tx.created.len(), "Transaction rolled back");
                return Err(e);
            }
        };
        if let Some(path) = &self.path {
            if let Err(e) = persist_db(path, &tx.db).await {
                tracing::error!(%e, path = %path.display(), "Failed to persist content; rolling back");
                return Err(E::from(e));
            }
        }
        *self.db.lock().unwrap() = tx.db;
        Ok(value)
    }
}

async fn persist_db(path: &Path, db: &ContentDb) -> Result<(), StoreError> {
    let content = serde_json::to_string_pretty(db)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, content).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Generate a URL-safe slug from a display name.
/// Converts to lowercase, replaces spaces and special chars with `-`,
/// and trims leading/trailing dashes.
pub fn slugify(name: &str) -> String {
    let slug: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                '-'
            }
        })
        .collect();
    slug.split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Returns the current UTC timestamp as an ISO-8601 string.
pub fn now_iso8601() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_page(title: &str, parent_id: Option<u64>) -> NewPage {
        NewPage {
            title: title.into(),
            parent_id,
            language: "en".into(),
            ..Default::default()
        }
    }

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("Production Team"), "production-team");
        assert_eq!(slugify("My Page!!! 2024"), "my-page-2024");
    }

    #[test]
    fn find_page_tolerates_bad_keys() {
        let store = ContentStore::in_memory();
        assert!(store.find_page(None).is_none());
        assert!(store.find_page(Some("")).is_none());
        assert!(store.find_page(Some("abc")).is_none());
        assert!(store.find_page(Some("-3")).is_none());
        assert!(store.find_page(Some("42")).is_none());
    }

    #[tokio::test]
    async fn commit_builds_nested_paths() {
        let store = ContentStore::in_memory();
        let parent = store
            .atomic(|tx| tx.insert_page(new_page("About", None)))
            .await
            .unwrap();
        let child = store
            .atomic(|tx| tx.insert_page(new_page("Our Team", Some(parent.id))))
            .await
            .unwrap();
        assert_eq!(child.path, "about/our-team");
        assert_eq!(store.find_page(Some(&child.id.to_string())), Some(child));
    }

    #[tokio::test]
    async fn failed_closure_discards_inserts() {
        let store = ContentStore::in_memory();
        let result: Result<(), StoreError> = store
            .atomic(|tx| {
                tx.insert_page(new_page("Draft", None))?;
                Err(StoreError::Invalid("boom".into()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(store.page_count(), 0);
    }

    #[tokio::test]
    async fn duplicate_sibling_slug_is_rejected() {
        let store = ContentStore::in_memory();
        store
            .atomic(|tx| tx.insert_page(new_page("News", None)))
            .await
            .unwrap();
        let err = store
            .atomic(|tx| tx.insert_page(new_page("news", None)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateSlug { .. }));
    }

    #[tokio::test]
    async fn missing_parent_is_rejected() {
        let store = ContentStore::in_memory();
        let err = store
            .atomic(|tx| tx.insert_page(new_page("Orphan", Some(9))))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(9)));
    }

    #[tokio::test]
    async fn file_backed_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("content.json");
        let store = ContentStore::open(&path).await.unwrap();
        store
            .atomic(|tx| tx.insert_page(new_page("Home", None)))
            .await
            .unwrap();
        let reopened = ContentStore::open(&path).await.unwrap();
        assert_eq!(reopened.page_count(), 1);
        assert_eq!(reopened.pages()[0].slug, "home");
    }

    #[tokio::test]
    async fn unwritable_file_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        // The target path is a directory, so the rename fails.
        let path = dir.path().join("content.json");
        std::fs::create_dir(&path).unwrap();
        let store = ContentStore {
            db: Arc::new(Mutex::new(ContentDb::default())),
            path: Some(path),
            write_gate: Arc::new(tokio::sync::Mutex::new(())),
        };
        let result = store
            .atomic(|tx| tx.insert_page(new_page("Home", None)))
            .await;
        assert!(result.is_err());
        assert_eq!(store.page_count(), 0);
    }
}
