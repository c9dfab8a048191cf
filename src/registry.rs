//! Append-only registry of build requests.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::errors::BuildError;
use crate::target::BuildTarget;

/// One build request, as recorded in the registry file.
///
/// Field names mirror the on-disk JSON schema (`{"UUID": ..., "Hostname": ...}`),
/// kept for compatibility with registry files written by earlier deployments.
/// `Hostname` carries the requested target platform. Both fields default to
/// empty so records written by older or newer versions still parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    #[serde(rename = "UUID", default)]
    pub id: String,
    #[serde(rename = "Hostname", default)]
    pub platform: String,
}

impl ClientRecord {
    pub fn new(id: Uuid, target: BuildTarget) -> Self {
        Self {
            id: id.to_string(),
            platform: target.to_string(),
        }
    }
}

/// Placeholder written when a listing finds no registry file yet, so the
/// clients endpoint always has at least one well-formed record to serve.
fn seed_record() -> ClientRecord {
    ClientRecord {
        id: "00000000-0000-4000-8000-000000000000".to_string(),
        platform: "seed".to_string(),
    }
}

/// Append-only log of build requests, one JSON object per line.
///
/// All file access is serialized through a single async mutex: each append is
/// one locked open-write-flush cycle, so concurrent requests cannot interleave
/// partial lines, and listing takes the same lock so it never observes a torn
/// tail. Records are flushed to the file before `append` returns but not
/// fsynced; an OS crash can lose the most recent entries.
pub struct ClientRegistry {
    path: PathBuf,
    file_lock: Mutex<()>,
}

impl ClientRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Durably record one build request.
    ///
    /// The serialized record and its trailing newline go out in a single
    /// write, and the file is flushed before the lock is released.
    pub async fn append(&self, record: &ClientRecord) -> Result<(), BuildError> {
        let io_err = |source: std::io::Error| BuildError::RegistryAppend {
            path: self.path.clone(),
            source,
        };

        let mut line = serde_json::to_string(record).map_err(|e| io_err(e.into()))?;
        line.push('\n');

        let _guard = self.file_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(io_err)?;
        file.write_all(line.as_bytes()).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)?;
        Ok(())
    }

    /// Read back every parseable record, in file order.
    ///
    /// A missing registry file is first seeded with one placeholder record.
    /// Lines that fail to parse are logged and skipped rather than failing
    /// the whole listing.
    pub async fn list_all(&self) -> Result<Vec<ClientRecord>, BuildError> {
        let io_err = |source: std::io::Error| BuildError::RegistryRead {
            path: self.path.clone(),
            source,
        };

        let _guard = self.file_lock.lock().await;

        if !self.path.exists() {
            let mut line =
                serde_json::to_string(&seed_record()).map_err(|e| io_err(e.into()))?;
            line.push('\n');
            tokio::fs::write(&self.path, line).await.map_err(io_err)?;
        }

        let content = tokio::fs::read_to_string(&self.path).await.map_err(io_err)?;
        let mut records = Vec::new();
        for (number, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<ClientRecord>(line) {
                Ok(record) => records.push(record),
                Err(error) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        line = number + 1,
                        %error,
                        "skipping unparseable registry line"
                    );
                }
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn registry_in(dir: &TempDir) -> ClientRegistry {
        ClientRegistry::new(dir.path().join("clients.jsonl"))
    }

    #[tokio::test]
    async fn append_then_list_round_trips() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(&dir);

        let id = Uuid::parse_str("f3b9c2d4-1a2b-4c3d-8e4f-5a6b7c8d9e0f").unwrap();
        let record = ClientRecord::new(id, BuildTarget::Linux);
        registry.append(&record).await.unwrap();

        let records = registry.list_all().await.unwrap();
        assert_eq!(records.len(), 1, "file already exists, no seed expected");
        assert_eq!(records[0].id, "f3b9c2d4-1a2b-4c3d-8e4f-5a6b7c8d9e0f");
        assert_eq!(records[0].platform, "linux");
        assert_eq!(records[0], record);
    }

    #[tokio::test]
    async fn records_use_on_disk_field_names() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(&dir);

        let record = ClientRecord::new(Uuid::nil(), BuildTarget::Windows);
        registry.append(&record).await.unwrap();

        let raw = std::fs::read_to_string(registry.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(raw.trim()).unwrap();
        assert_eq!(
            value.get("UUID").and_then(|v| v.as_str()),
            Some("00000000-0000-0000-0000-000000000000")
        );
        assert_eq!(value.get("Hostname").and_then(|v| v.as_str()), Some("windows"));
    }

    #[tokio::test]
    async fn listing_missing_file_seeds_placeholder() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(&dir);

        let records = registry.list_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "00000000-0000-4000-8000-000000000000");
        assert_eq!(records[0].platform, "seed");
        assert!(registry.path().exists(), "seed listing must create the file");

        // A second listing reads the seeded file instead of seeding again.
        let again = registry.list_all().await.unwrap();
        assert_eq!(again, records);
    }

    #[tokio::test]
    async fn corrupt_line_is_skipped_and_order_kept() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(&dir);

        std::fs::write(
            registry.path(),
            concat!(
                "{\"UUID\":\"first\",\"Hostname\":\"linux\"}\n",
                "{this is not json\n",
                "{\"UUID\":\"second\",\"Hostname\":\"macos\"}\n",
            ),
        )
        .unwrap();

        let records = registry.list_all().await.unwrap();
        assert_eq!(records.len(), 2, "corrupt middle line must be dropped");
        assert_eq!(records[0].id, "first");
        assert_eq!(records[1].id, "second");
    }

    #[tokio::test]
    async fn blank_lines_are_ignored() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(&dir);

        std::fs::write(
            registry.path(),
            "\n{\"UUID\":\"a\",\"Hostname\":\"linux\"}\n\n   \n{\"UUID\":\"b\",\"Hostname\":\"windows\"}\n",
        )
        .unwrap();

        let records = registry.list_all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "a");
        assert_eq!(records[1].id, "b");
    }

    #[tokio::test]
    async fn tolerates_missing_and_unknown_fields() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(&dir);

        std::fs::write(
            registry.path(),
            concat!(
                "{\"UUID\":\"only-id\"}\n",
                "{\"Hostname\":\"only-platform\"}\n",
                "{\"UUID\":\"x\",\"Hostname\":\"y\",\"Extra\":42}\n",
            ),
        )
        .unwrap();

        let records = registry.list_all().await.unwrap();
        assert_eq!(records.len(), 3, "partial and extended schemas must all parse");
        assert_eq!(records[0].id, "only-id");
        assert_eq!(records[0].platform, "");
        assert_eq!(records[1].platform, "only-platform");
        assert_eq!(records[2].id, "x");
    }

    #[tokio::test]
    async fn concurrent_appends_never_tear_lines() {
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(registry_in(&dir));

        let mut handles = Vec::new();
        for n in 0..50 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                let record = ClientRecord {
                    id: format!("request-{n:02}"),
                    platform: "linux".to_string(),
                };
                registry.append(&record).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // Every raw line must parse; nothing interleaved, nothing lost.
        let raw = std::fs::read_to_string(registry.path()).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 50);
        for line in &lines {
            serde_json::from_str::<ClientRecord>(line)
                .unwrap_or_else(|e| panic!("torn registry line {line:?}: {e}"));
        }

        let ids: HashSet<String> = registry
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids.len(), 50, "all 50 appended records must read back");
    }
}
