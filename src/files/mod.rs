//! Temporary file hand-off for tools that produce files.
//!
//! A tool writes its file somewhere under the temp directory and returns a
//! [`FileArtifact`]. The HTTP transport registers it here, receives a random
//! single-use token and publishes `/api/files/download/{token}`.

use crate::config::ServerSettings;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// A file produced by a tool, ready to be served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileArtifact {
    pub path: PathBuf,
    pub filename: String,
    pub mime_type: String,
}

impl FileArtifact {
    /// Describe a file on disk, guessing the MIME type from its name.
    pub fn new(path: PathBuf, filename: impl Into<String>) -> Self {
        let filename = filename.into();
        let mime_type = mime_guess::from_path(&filename)
            .first_or_octet_stream()
            .to_string();
        Self {
            path,
            filename,
            mime_type,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    artifact: FileArtifact,
    expires_at: DateTime<Utc>,
}

/// Longest token lifetime accepted; larger settings are clamped to one year.
const MAX_TTL_MINUTES: u64 = 60 * 24 * 365;

/// Token registry for downloadable files.
pub struct FileStore {
    entries: RwLock<HashMap<String, Entry>>,
    ttl_minutes: u64,
    delete_after: Duration,
}

impl FileStore {
    pub fn new(ttl_minutes: u64, delete_after: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl_minutes: ttl_minutes.min(MAX_TTL_MINUTES),
            delete_after,
        }
    }

    pub fn from_settings(settings: &ServerSettings) -> Self {
        Self::new(
            settings.file_ttl_minutes,
            Duration::from_secs(settings.delete_after_download_secs),
        )
    }

    /// Human-readable token lifetime, as reported to clients.
    pub fn expires_in_label(&self) -> String {
        format!("{} minutes", self.ttl_minutes)
    }

    /// Register a file and return its download token.
    pub fn register(&self, artifact: FileArtifact) -> String {
        self.register_at(artifact, Utc::now())
    }

    fn register_at(&self, artifact: FileArtifact, now: DateTime<Utc>) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let expires_at = ChronoDuration::try_minutes(self.ttl_minutes as i64)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let expired = {
            let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
            let expired = Self::purge(&mut entries, now);
            debug!("Registered {} as {}", artifact.filename, token);
            entries.insert(token.clone(), Entry { artifact, expires_at });
            expired
        };
        discard(expired);
        token
    }

    /// Redeem a token. Each token works once; expired tokens resolve to nothing.
    pub fn take(&self, token: &str) -> Option<FileArtifact> {
        self.take_at(token, Utc::now())
    }

    fn take_at(&self, token: &str, now: DateTime<Utc>) -> Option<FileArtifact> {
        let (expired, taken) = {
            let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
            let expired = Self::purge(&mut entries, now);
            (expired, entries.remove(token).map(|entry| entry.artifact))
        };
        discard(expired);
        taken
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop expired entries and hand back their paths for deletion.
    fn purge(entries: &mut HashMap<String, Entry>, now: DateTime<Utc>) -> Vec<PathBuf> {
        let mut expired = Vec::new();
        entries.retain(|token, entry| {
            let live = entry.expires_at > now;
            if !live {
                debug!("Download token {} expired", token);
                expired.push(entry.artifact.path.clone());
            }
            live
        });
        expired
    }

    /// Delete a served file once the configured grace period has passed.
    pub fn schedule_removal(&self, path: PathBuf) {
        let delay = self.delete_after;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            remove_file(path).await;
        });
    }
}

/// Delete expired files. Called after the entry lock is released.
fn discard(paths: Vec<PathBuf>) {
    if paths.is_empty() {
        return;
    }
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                for path in paths {
                    remove_file(path).await;
                }
            });
        }
        // No runtime, delete inline.
        Err(_) => {
            for path in paths {
                if let Err(e) = std::fs::remove_file(&path) {
                    log_removal_error(&path, e);
                }
            }
        }
    }
}

async fn remove_file(path: PathBuf) {
    if let Err(e) = tokio::fs::remove_file(&path).await {
        log_removal_error(&path, e);
    }
}

fn log_removal_error(path: &Path, e: std::io::Error) {
    if e.kind() != std::io::ErrorKind::NotFound {
        warn!("Failed to remove {}: {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(dir: &Path, name: &str) -> FileArtifact {
        let path = dir.join(name);
        std::fs::write(&path, b"data").unwrap();
        FileArtifact::new(path, name)
    }

    #[test]
    fn test_token_is_single_use() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(15, Duration::from_secs(0));
        let token = store.register(artifact(dir.path(), "a.png"));

        let first = store.take(&token).unwrap();
        assert_eq!(first.filename, "a.png");
        assert_eq!(first.mime_type, "image/png");
        assert!(store.take(&token).is_none());
        assert!(store.take("unknown").is_none());
    }

    #[test]
    fn test_expired_tokens_are_purged() {
        let dir = tempfile::tempdir().unwrap();
        let file = artifact(dir.path(), "report.pdf");
        let path = file.path.clone();

        let store = FileStore::new(15, Duration::from_secs(0));
        let now = Utc::now();
        let token = store.register_at(file, now);

        assert!(store.take_at(&token, now + ChronoDuration::minutes(16)).is_none());
        assert!(store.is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn test_expires_in_label() {
        let store = FileStore::new(15, Duration::from_secs(30));
        assert_eq!(store.expires_in_label(), "15 minutes");
    }

    #[test]
    fn test_mime_type_from_filename() {
        let mime = |name: &str| FileArtifact::new(PathBuf::from(name), name).mime_type;
        assert_eq!(mime("Shot.JPG"), "image/jpeg");
        assert_eq!(mime("notes"), "application/octet-stream");
        assert_eq!(mime("data.csv"), "text/csv");
        assert_eq!(mime("scan.tiff"), "image/tiff");
        assert!(mime("take.wav").starts_with("audio/"));
        assert_ne!(mime("pipeline.yaml"), "application/octet-stream");
    }

    #[test]
    fn test_huge_ttl_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(u64::MAX, Duration::from_secs(0));
        assert_eq!(store.expires_in_label(), format!("{} minutes", MAX_TTL_MINUTES));

        let now = Utc::now();
        let token = store.register_at(artifact(dir.path(), "big.bin"), now);
        assert!(store.take_at(&token, now + ChronoDuration::days(364)).is_some());
    }

    #[tokio::test]
    async fn test_expired_files_are_deleted_off_the_lock() {
        let dir = tempfile::tempdir().unwrap();
        let file = artifact(dir.path(), "old.txt");
        let path = file.path.clone();

        let store = FileStore::new(1, Duration::from_secs(0));
        let now = Utc::now();
        store.register_at(file, now);

        let later = now + ChronoDuration::minutes(2);
        let token = store.register_at(artifact(dir.path(), "new.txt"), later);
        assert_eq!(store.len(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!path.exists());
        assert!(store.take_at(&token, later).is_some());
    }

    #[tokio::test]
    async fn test_schedule_removal_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = artifact(dir.path(), "x.txt");
        let store = FileStore::new(15, Duration::from_millis(10));

        store.schedule_removal(file.path.clone());
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!file.path.exists());
    }
}
