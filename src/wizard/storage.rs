use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use hex::encode as hex_encode;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::services::now_iso8601;

use super::files::{FileStaging, StagedFiles};
use super::forms::RawData;
use super::step::Step;

/// Cookie carrying the wizard session id.
pub const SESSION_COOKIE: &str = "wizard_session";

/// Per-user wizard progress kept between requests.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WizardSession {
    pub id: String,
    /// `None` until the wizard has rendered its first step.
    #[serde(default)]
    pub current_step: Option<Step>,
    /// Raw submissions of completed steps; cleaned data is re-derived from
    /// these whenever it is needed.
    #[serde(default)]
    pub step_data: HashMap<Step, RawData>,
    #[serde(default)]
    pub step_files: HashMap<Step, StagedFiles>,
    /// Language of the request that last touched the session.
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub created_at: String,
    /// Last time the session was stored; expiry is measured from here.
    #[serde(default)]
    pub updated_at: String,
}

impl WizardSession {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            current_step: None,
            step_data: HashMap::new(),
            step_files: HashMap::new(),
            language: None,
            created_at: now_iso8601(),
            updated_at: now_iso8601(),
        }
    }

    /// Whether the session has been idle for longer than `max_age` at `now`.
    /// Sessions without a readable timestamp count as expired.
    pub fn is_expired(&self, max_age: chrono::Duration, now: DateTime<Utc>) -> bool {
        let stamp = if self.updated_at.is_empty() {
            &self.created_at
        } else {
            &self.updated_at
        };
        match DateTime::parse_from_rfc3339(stamp) {
            Ok(seen) => now.signed_duration_since(seen.with_timezone(&Utc)) > max_age,
            Err(_) => true,
        }
    }

    /// Forget all progress. Staged files must be discarded separately.
    pub fn reset(&mut self) {
        self.current_step = Some(Step::first());
        self.step_data.clear();
        self.step_files.clear();
    }

    pub fn data_for_step(&self, step: Step) -> Option<&RawData> {
        self.step_data.get(&step)
    }

    pub fn files_for_step(&self, step: Step) -> StagedFiles {
        self.step_files.get(&step).cloned().unwrap_or_default()
    }

    pub fn set_step_data(&mut self, step: Step, data: RawData) {
        self.step_data.insert(step, data);
    }

    pub fn set_step_files(&mut self, step: Step, files: StagedFiles) {
        self.step_files.insert(step, files);
    }
}

pub fn random_session_id() -> String {
    let mut b = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut b);
    hex_encode(b)
}

/// In-process session store shared by all requests.
#[derive(Clone, Default)]
pub struct WizardStorage {
    sessions: Arc<Mutex<HashMap<String, WizardSession>>>,
}

impl WizardStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self, id: &str) -> Option<WizardSession> {
        self.sessions.lock().unwrap().get(id).cloned()
    }

    /// Load `id` or start a fresh session under a new id.
    pub fn load_or_create(&self, id: Option<&str>) -> WizardSession {
        id.and_then(|id| self.load(id))
            .unwrap_or_else(|| WizardSession::new(random_session_id()))
    }

    pub fn save(&self, mut session: WizardSession) {
        session.updated_at = now_iso8601();
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id.clone(), session);
    }

    pub fn remove(&self, id: &str) -> Option<WizardSession> {
        self.sessions.lock().unwrap().remove(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop sessions idle for longer than `max_age`, together with their
    /// staged uploads. Returns how many were dropped.
    pub async fn purge_expired(&self, files: &FileStaging, max_age: chrono::Duration, now: DateTime<Utc>) -> usize {
        let expired: Vec<String> = {
            let mut sessions = self.sessions.lock().unwrap();
            let ids: Vec<String> = sessions
                .values()
                .filter(|s| s.is_expired(max_age, now))
                .map(|s| s.id.clone())
                .collect();
            for id in &ids {
                sessions.remove(id);
            }
            ids
        };
        for id in &expired {
            if let Err(e) = files.discard_session(id).await {
                tracing::warn!(%e, session = %id, "Failed to discard staged files of expired session");
            }
        }
        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "Purged expired wizard sessions");
        }
        expired.len()
    }

    /// Run [`WizardStorage::purge_expired`] every `every` until the runtime stops.
    pub fn spawn_sweeper(&self, files: FileStaging, every: Duration, max_age: chrono::Duration) -> tokio::task::JoinHandle<()> {
        let storage = self.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(every);
            loop {
                tick.tick().await;
                storage.purge_expired(&files, max_age, Utc::now()).await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_hex() {
        let id = random_session_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn unknown_id_starts_new_session() {
        let storage = WizardStorage::new();
        let session = storage.load_or_create(Some("missing"));
        assert_ne!(session.id, "missing");
        assert!(session.current_step.is_none());
    }

    #[test]
    fn reset_clears_progress() {
        let storage = WizardStorage::new();
        let mut session = storage.load_or_create(None);
        session.current_step = Some(Step::Two);
        session.set_step_data(Step::One, RawData::from([("0-entry".to_string(), "x".to_string())]));
        storage.save(session.clone());

        let mut loaded = storage.load(&session.id).unwrap();
        assert!(loaded.data_for_step(Step::One).is_some());
        loaded.reset();
        assert_eq!(loaded.current_step, Some(Step::One));
        assert!(loaded.step_data.is_empty());
    }

    #[tokio::test]
    async fn idle_sessions_and_their_uploads_are_purged() {
        let tmp = tempfile::tempdir().unwrap();
        let files = FileStaging::new(tmp.path());
        let storage = WizardStorage::new();
        let session = WizardSession::new("abc123");
        files
            .stage(
                &session.id,
                crate::wizard::files::UploadedFile {
                    field: "1-attachment".into(),
                    file_name: "a.txt".into(),
                    content_type: "text/plain".into(),
                    bytes: b"hi".to_vec(),
                },
            )
            .await
            .unwrap();
        storage.save(session);
        storage.save(WizardSession::new("def456"));
        let max_age = chrono::Duration::hours(2);

        assert_eq!(storage.purge_expired(&files, max_age, Utc::now()).await, 0);
        assert_eq!(storage.len(), 2);

        let later = Utc::now() + chrono::Duration::hours(3);
        assert_eq!(storage.purge_expired(&files, max_age, later).await, 2);
        assert!(storage.is_empty());
        assert!(!tmp.path().join("abc123").exists());
    }

    #[test]
    fn unreadable_timestamps_count_as_expired() {
        let mut session = WizardSession::new("abc123");
        session.updated_at = "yesterday".into();
        assert!(session.is_expired(chrono::Duration::hours(1), Utc::now()));
    }
}
