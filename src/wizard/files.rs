use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// An upload received with a step submission, before staging.
#[derive(Clone, Debug)]
pub struct UploadedFile {
    /// Step-prefixed field name, e.g. `1-attachment`.
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// An upload written to the staging area and kept until the wizard ends.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StagedFile {
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub size: u64,
    pub path: PathBuf,
}

/// Staged uploads keyed by step-prefixed field name.
pub type StagedFiles = HashMap<String, StagedFile>;

/// Stages uploads below `<root>/<session id>/`.
#[derive(Clone, Debug)]
pub struct FileStaging {
    root: PathBuf,
}

impl FileStaging {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn session_dir(&self, session_id: &str) -> io::Result<PathBuf> {
        if session_id.is_empty() || !session_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "invalid session id"));
        }
        Ok(self.root.join(session_id))
    }

    pub async fn stage(&self, session_id: &str, upload: UploadedFile) -> io::Result<StagedFile> {
        let dir = self.session_dir(session_id)?;
        tokio::fs::create_dir_all(&dir).await?;
        let suffix = Path::new(&upload.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|e| format!(".{}", e))
            .unwrap_or_default();
        let UploadedFile {
            field,
            file_name,
            content_type,
            bytes,
        } = upload;
        let size = bytes.len() as u64;
        let path = tokio::task::spawn_blocking(move || -> io::Result<PathBuf> {
            let mut tmp = tempfile::Builder::new()
                .prefix("upload-")
                .suffix(&suffix)
                .tempfile_in(&dir)?;
            tmp.write_all(&bytes)?;
            let (_file, path) = tmp.keep().map_err(|e| e.error)?;
            Ok(path)
        })
        .await
        .map_err(io::Error::other)??;
        tracing::debug!(%field, path = %path.display(), size, "Staged wizard upload");
        Ok(StagedFile {
            field,
            file_name,
            content_type,
            size,
            path,
        })
    }

    /// Remove everything staged for `session_id`. Missing directories are fine.
    pub async fn discard_session(&self, session_id: &str) -> io::Result<()> {
        let dir = self.session_dir(session_id)?;
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str) -> UploadedFile {
        UploadedFile {
            field: "1-attachment".into(),
            file_name: name.into(),
            content_type: "text/plain".into(),
            bytes: b"hello".to_vec(),
        }
    }

    #[tokio::test]
    async fn stage_and_discard() {
        let dir = tempfile::tempdir().unwrap();
        let staging = FileStaging::new(dir.path());
        let staged = staging.stage("abc123", upload("notes.txt")).await.unwrap();
        assert_eq!(staged.size, 5);
        assert!(staged.path.starts_with(dir.path().join("abc123")));
        assert_eq!(staged.path.extension().and_then(|e| e.to_str()), Some("txt"));
        assert_eq!(std::fs::read(&staged.path).unwrap(), b"hello");

        staging.discard_session("abc123").await.unwrap();
        assert!(!staged.path.exists());
        // Discarding twice is harmless.
        staging.discard_session("abc123").await.unwrap();
    }

    #[tokio::test]
    async fn rejects_path_like_session_ids() {
        let dir = tempfile::tempdir().unwrap();
        let staging = FileStaging::new(dir.path());
        let err = staging.stage("../etc", upload("x.txt")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
