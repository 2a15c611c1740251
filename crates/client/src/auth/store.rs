// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Secret persistence: opaque key-value store for session credentials.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, warn};

/// Store key for the access token.
pub const ACCESS_KEY: &str = "access";
/// Store key for the refresh token.
pub const REFRESH_KEY: &str = "refresh";
/// Store key for the issuance time (epoch ms). Persisting the issuance time
/// lets a restarted process re-derive the reissue deadline instead of
/// trusting a countdown that did not survive suspension.
pub const ISSUED_AT_KEY: &str = "issued_at_ms";

/// Durable key-value store for opaque session secrets.
///
/// Absence is `None`, not an error; writes are idempotent and safe to call
/// from any task. Implementations log failures rather than propagating them —
/// a missed persist degrades to an in-memory session.
pub trait SecretStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn delete(&self, key: &str);
}

/// In-memory store: tests, or callers that opt out of persistence.
#[derive(Default)]
pub struct MemorySecretStore {
    entries: Mutex<HashMap<String, String>>,
}

impl SecretStore for MemorySecretStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries.lock().insert(key.to_owned(), value.to_owned());
    }

    fn delete(&self, key: &str) {
        self.entries.lock().remove(key);
    }
}

/// File-backed store: a JSON map written atomically (tmp + rename).
pub struct FileSecretStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileSecretStore {
    /// Open a store at `path`, loading any existing contents.
    pub fn open(path: &Path) -> Self {
        let entries = match std::fs::read_to_string(path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(map) => map,
                Err(e) => {
                    warn!(path = %path.display(), "failed to parse secret store: {e}");
                    HashMap::new()
                }
            },
            Err(e) => {
                debug!(path = %path.display(), "no persisted secrets: {e}");
                HashMap::new()
            }
        };
        Self { path: path.to_owned(), entries: Mutex::new(entries) }
    }

    /// Write the current map to disk atomically.
    ///
    /// Uses a unique temp filename (PID + counter) so concurrent saves cannot
    /// race on the same `.tmp` file and leave trailing bytes behind.
    fn flush(&self, entries: &HashMap<String, String>) {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        let json = match serde_json::to_string_pretty(entries) {
            Ok(j) => j,
            Err(e) => {
                warn!("failed to serialize secrets: {e}");
                return;
            }
        };
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp_name = format!(
            "{}.{}.{}.tmp",
            self.path.file_name().unwrap_or_default().to_string_lossy(),
            std::process::id(),
            seq,
        );
        let tmp_path = self.path.with_file_name(tmp_name);
        if let Err(e) = std::fs::write(&tmp_path, json) {
            warn!(path = %tmp_path.display(), "failed to write secrets: {e}");
            return;
        }
        if let Err(e) = std::fs::rename(&tmp_path, &self.path) {
            warn!(path = %self.path.display(), "failed to rename secrets file: {e}");
        }
    }
}

impl SecretStore for FileSecretStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut entries = self.entries.lock();
        entries.insert(key.to_owned(), value.to_owned());
        self.flush(&entries);
    }

    fn delete(&self, key: &str) {
        let mut entries = self.entries.lock();
        if entries.remove(key).is_some() {
            self.flush(&entries);
        }
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
