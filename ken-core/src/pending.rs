//! Pending-workspace cache.
//!
//! Creating a workspace is a two-step hand-off: the home screen records what to
//! create (a ticker, an uploaded file, or both) under a fresh id, then switches
//! to the workspace screen, which reads the entry, issues the create request
//! and removes the entry once the request succeeds. The cache is owned by the
//! application state and passed by reference to both screens.

use std::collections::HashMap;
use std::path::Path;

use rand::distr::Alphanumeric;
use rand::Rng;

/// Length of generated workspace ids.
pub const WORKSPACE_ID_LEN: usize = 8;

/// A file selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// Reads `path` into memory.
    pub fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_owned());
        Ok(Self { name, bytes })
    }
}

/// Parameters for a workspace that has not been created yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWorkspace {
    pub workspace_id: String,
    pub ticker: Option<String>,
    pub file: Option<UploadFile>,
}

/// Workspace-creation parameters keyed by client-generated id.
#[derive(Debug, Default)]
pub struct PendingWorkspaces {
    entries: HashMap<String, PendingWorkspace>,
}

impl PendingWorkspaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `pending`, replacing any entry with the same id.
    pub fn insert(&mut self, pending: PendingWorkspace) {
        self.entries.insert(pending.workspace_id.clone(), pending);
    }

    pub fn get(&self, workspace_id: &str) -> Option<&PendingWorkspace> {
        self.entries.get(workspace_id)
    }

    pub fn remove(&mut self, workspace_id: &str) -> Option<PendingWorkspace> {
        self.entries.remove(workspace_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Returns a random id of [`WORKSPACE_ID_LEN`] ASCII letters and digits.
pub fn generate_workspace_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(WORKSPACE_ID_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_eight_alphanumerics() {
        let id = generate_workspace_id();
        assert_eq!(id.len(), WORKSPACE_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(id, generate_workspace_id());
    }

    #[test]
    fn insert_get_remove() {
        let mut cache = PendingWorkspaces::new();
        let id = generate_workspace_id();
        cache.insert(PendingWorkspace {
            workspace_id: id.clone(),
            ticker: Some("AAPL".into()),
            file: None,
        });
        assert_eq!(cache.get(&id).and_then(|p| p.ticker.as_deref()), Some("AAPL"));
        assert!(cache.get("missing").is_none());
        assert!(cache.remove(&id).is_some());
        assert!(cache.is_empty());
        assert!(cache.remove(&id).is_none());
    }

    #[test]
    fn upload_file_reads_name_and_bytes() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("filings.zip");
        std::fs::write(&path, b"PK\x03\x04").unwrap();
        let file = UploadFile::read(&path).unwrap();
        assert_eq!(file.name, "filings.zip");
        assert_eq!(file.bytes, b"PK\x03\x04");
    }
}
