//! Durable resume cache.
//!
//! One JSON file maps each logical sandbox name to the resumable state of
//! its in-flight operation. The file is rewritten synchronously after every
//! mutation — crash-safety over write throughput — so a process killed
//! mid-operation leaves the last successfully written snapshot resumable.
//!
//! An entry's absence means "nothing to resume". Its presence means the
//! last known remote state as of the last successful read, which is not
//! necessarily the true current remote state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::CacheError;
use crate::job::JobSnapshot;
use crate::request::{SandboxAction, SandboxRequest};

/// File name of the sandbox-process store inside the tool directory.
pub const CACHE_FILE: &str = "sandbox-process.json";

/// Display and side-effect preferences captured at submission time, so a
/// resume attempt never has to re-prompt the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default)]
    pub set_default: bool,
    #[serde(default)]
    pub tracks_source: bool,
}

/// Everything needed to reconstruct a resume attempt for one logical key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeCacheEntry {
    pub sandbox_name: String,
    /// Username of the production org the job was submitted against
    pub prod_org_username: String,
    pub action: SandboxAction,
    /// Last known remote snapshot, superseded wholesale on every update
    pub job: JobSnapshot,
    pub request: SandboxRequest,
    #[serde(default)]
    pub prefs: UserPreferences,
}

/// One stored record: the entry plus its recency markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedRecord {
    /// Monotonic write sequence; greatest value is the most recent write
    pub seq: u64,
    pub updated_at: DateTime<Utc>,
    pub entry: ResumeCacheEntry,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    #[serde(default)]
    next_seq: u64,
    #[serde(default)]
    entries: BTreeMap<String, CachedRecord>,
}

/// The sandbox-process store: logical key → resumable entry.
#[derive(Debug)]
pub struct ResumeCache {
    path: PathBuf,
    file: CacheFile,
}

impl ResumeCache {
    /// Open the store at `path`. A missing file is the empty store; an
    /// unreadable or unparseable file is fatal — resumability cannot be
    /// silently defaulted away.
    pub fn open(path: PathBuf) -> Result<Self, CacheError> {
        let file = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).map_err(|source| CacheError::Corrupt {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => CacheFile::default(),
            Err(source) => {
                return Err(CacheError::Unreadable {
                    path: path.clone(),
                    source,
                });
            }
        };
        Ok(Self { path, file })
    }

    /// Open the store under a tool directory, using the conventional
    /// file name.
    pub fn open_in(dir: &Path) -> Result<Self, CacheError> {
        Self::open(dir.join(CACHE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&ResumeCacheEntry> {
        self.file.entries.get(key).map(|record| &record.entry)
    }

    /// Insert or wholesale-overwrite the entry for its sandbox name,
    /// writing the store to disk before returning.
    pub fn set(&mut self, entry: ResumeCacheEntry) -> Result<(), CacheError> {
        let key = entry.sandbox_name.clone();
        let seq = self.file.next_seq;
        self.file.next_seq += 1;
        self.file.entries.insert(
            key.clone(),
            CachedRecord {
                seq,
                updated_at: Utc::now(),
                entry,
            },
        );
        debug!(key = %key, seq, "resume cache updated");
        self.write_out()
    }

    /// Remove the entry for `key`, if present, writing the store to disk
    /// before returning. Returns whether an entry was removed.
    pub fn unset(&mut self, key: &str) -> Result<bool, CacheError> {
        if self.file.entries.remove(key).is_none() {
            return Ok(false);
        }
        debug!(key = %key, "resume cache entry cleared");
        self.write_out()?;
        Ok(true)
    }

    /// The most recently written entry, by write sequence.
    pub fn most_recent(&self) -> Option<(&str, &ResumeCacheEntry)> {
        self.file
            .entries
            .iter()
            .max_by_key(|(_, record)| record.seq)
            .map(|(key, record)| (key.as_str(), &record.entry))
    }

    /// All stored records, most recent first.
    pub fn records(&self) -> Vec<(&str, &CachedRecord)> {
        let mut records: Vec<_> = self
            .file
            .entries
            .iter()
            .map(|(key, record)| (key.as_str(), record))
            .collect();
        records.sort_by(|a, b| b.1.seq.cmp(&a.1.seq));
        records
    }

    pub fn is_empty(&self) -> bool {
        self.file.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.file.entries.len()
    }

    fn write_out(&self) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| CacheError::WriteFailed {
                path: self.path.clone(),
                source,
            })?;
        }
        let text = serde_json::to_string_pretty(&self.file).map_err(|source| {
            CacheError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;
        std::fs::write(&self.path, text).map_err(|source| CacheError::WriteFailed {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(name: &str) -> ResumeCacheEntry {
        ResumeCacheEntry {
            sandbox_name: name.to_string(),
            prod_org_username: "admin@example.com".to_string(),
            action: SandboxAction::Create,
            job: JobSnapshot {
                job_id: format!("0GR-{name}"),
                sandbox_name: name.to_string(),
                status: "Pending".to_string(),
                progress_percent: 0,
                created_date: None,
                modified_date: None,
            },
            request: SandboxRequest {
                sandbox_name: name.to_string(),
                license_type: "Developer".to_string(),
                description: None,
                source_sandbox: None,
                apex_class_id: None,
            },
            prefs: UserPreferences::default(),
        }
    }

    fn open_temp() -> (ResumeCache, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let cache = ResumeCache::open_in(dir.path()).unwrap();
        (cache, dir)
    }

    #[test]
    fn missing_file_is_the_empty_store() {
        let (cache, _dir) = open_temp();
        assert!(cache.is_empty());
        assert!(cache.most_recent().is_none());
    }

    #[test]
    fn set_then_get_round_trips() {
        let (mut cache, _dir) = open_temp();
        cache.set(entry("dev1")).unwrap();

        let stored = cache.get("dev1").unwrap();
        assert_eq!(stored.job.job_id, "0GR-dev1");
        assert!(cache.get("other").is_none());
    }

    #[test]
    fn set_overwrites_wholesale_not_field_by_field() {
        let (mut cache, _dir) = open_temp();
        cache.set(entry("dev1")).unwrap();

        let mut updated = entry("dev1");
        updated.job.status = "Processing".to_string();
        updated.job.progress_percent = 40;
        cache.set(updated).unwrap();

        assert_eq!(cache.len(), 1);
        let stored = cache.get("dev1").unwrap();
        assert_eq!(stored.job.status, "Processing");
        assert_eq!(stored.job.progress_percent, 40);
    }

    #[test]
    fn unset_removes_and_reports() {
        let (mut cache, _dir) = open_temp();
        cache.set(entry("dev1")).unwrap();

        assert!(cache.unset("dev1").unwrap());
        assert!(cache.get("dev1").is_none());
        assert!(!cache.unset("dev1").unwrap());
    }

    #[test]
    fn most_recent_follows_write_order_not_key_order() {
        let (mut cache, _dir) = open_temp();
        cache.set(entry("zz-first")).unwrap();
        cache.set(entry("mm-second")).unwrap();
        cache.set(entry("aa-third")).unwrap();

        let (key, _) = cache.most_recent().unwrap();
        assert_eq!(key, "aa-third");
    }

    #[test]
    fn rewriting_an_entry_refreshes_its_recency() {
        let (mut cache, _dir) = open_temp();
        cache.set(entry("first")).unwrap();
        cache.set(entry("second")).unwrap();
        cache.set(entry("first")).unwrap();

        let (key, _) = cache.most_recent().unwrap();
        assert_eq!(key, "first");
    }

    #[test]
    fn records_are_most_recent_first() {
        let (mut cache, _dir) = open_temp();
        cache.set(entry("a")).unwrap();
        cache.set(entry("b")).unwrap();

        let keys: Vec<&str> = cache.records().iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn store_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let mut cache = ResumeCache::open_in(dir.path()).unwrap();
            cache.set(entry("dev1")).unwrap();
            cache.set(entry("dev2")).unwrap();
        }
        {
            let cache = ResumeCache::open_in(dir.path()).unwrap();
            assert_eq!(cache.len(), 2);
            let (key, _) = cache.most_recent().unwrap();
            assert_eq!(key, "dev2");
        }
    }

    #[test]
    fn sequence_keeps_increasing_across_reopen() {
        let dir = tempdir().unwrap();
        {
            let mut cache = ResumeCache::open_in(dir.path()).unwrap();
            cache.set(entry("dev1")).unwrap();
        }
        {
            let mut cache = ResumeCache::open_in(dir.path()).unwrap();
            cache.set(entry("dev2")).unwrap();
            let (key, _) = cache.most_recent().unwrap();
            assert_eq!(key, "dev2");
        }
    }

    #[test]
    fn corrupt_file_is_a_fatal_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE);
        std::fs::write(&path, "{ this is not json").unwrap();

        let err = ResumeCache::open(path).unwrap_err();
        assert!(matches!(err, CacheError::Corrupt { .. }));
    }

    #[test]
    fn entry_prefs_survive_round_trip() {
        let dir = tempdir().unwrap();
        let mut e = entry("dev1");
        e.prefs = UserPreferences {
            alias: Some("dev".to_string()),
            set_default: true,
            tracks_source: false,
        };
        {
            let mut cache = ResumeCache::open_in(dir.path()).unwrap();
            cache.set(e.clone()).unwrap();
        }
        let cache = ResumeCache::open_in(dir.path()).unwrap();
        assert_eq!(cache.get("dev1"), Some(&e));
    }
}
