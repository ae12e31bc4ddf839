// ── On-disk persistence collaborator ──
//
// One JSON document per namespace, stored as `<dir>/<namespace>.json`
// under the platform data dir. Writes go through a temp file + rename
// so a crash mid-write never corrupts the stored list.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use camwall_core::CoreError;
use camwall_core::store::Persistence;

/// File-backed implementation of the core's [`Persistence`] seam.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Open the store in the platform data directory.
    pub fn open_default() -> Result<Self, CoreError> {
        let dir = crate::data_path();
        fs::create_dir_all(&dir).map_err(|e| CoreError::Persistence {
            message: format!("cannot create data dir {}: {e}", dir.display()),
        })?;
        Ok(Self::new(dir))
    }

    fn namespace_path(&self, namespace: &str) -> PathBuf {
        self.dir.join(format!("{namespace}.json"))
    }
}

impl Persistence for FileStore {
    fn load(&self, namespace: &str) -> Result<Option<serde_json::Value>, CoreError> {
        let path = self.namespace_path(namespace);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CoreError::Persistence {
                    message: format!("cannot read {}: {e}", path.display()),
                });
            }
        };

        let value = serde_json::from_str(&raw).map_err(|e| CoreError::Persistence {
            message: format!("{} is not valid JSON: {e}", path.display()),
        })?;
        Ok(Some(value))
    }

    fn store(&self, namespace: &str, value: &serde_json::Value) -> Result<(), CoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| CoreError::Persistence {
            message: format!("cannot create data dir {}: {e}", self.dir.display()),
        })?;

        let path = self.namespace_path(namespace);
        let tmp = self.dir.join(format!("{namespace}.json.tmp"));
        let raw = serde_json::to_string_pretty(value).map_err(|e| CoreError::Persistence {
            message: format!("cannot serialize {namespace}: {e}"),
        })?;

        fs::write(&tmp, raw).map_err(|e| CoreError::Persistence {
            message: format!("cannot write {}: {e}", tmp.display()),
        })?;
        fs::rename(&tmp, &path).map_err(|e| CoreError::Persistence {
            message: format!("cannot move {} into place: {e}", tmp.display()),
        })?;
        Ok(())
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn load_of_absent_namespace_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf());
        assert!(store.load("cameras").unwrap().is_none());
    }

    #[test]
    fn store_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf());
        let doc = serde_json::json!([
            {"id": "CAM-001", "address": "http://192.168.0.150/stream", "order": 0}
        ]);

        store.store("cameras", &doc).unwrap();
        assert_eq!(store.load("cameras").unwrap(), Some(doc));
    }

    #[test]
    fn namespaces_live_in_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf());

        store.store("cameras", &serde_json::json!([])).unwrap();
        store.store("bus", &serde_json::json!({"topic": "camera/ip"})).unwrap();

        assert!(dir.path().join("cameras.json").exists());
        assert!(dir.path().join("bus.json").exists());
    }

    #[test]
    fn corrupt_document_surfaces_a_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf());
        fs::write(dir.path().join("cameras.json"), "{ nope").unwrap();

        let err = store.load("cameras").unwrap_err();
        assert!(matches!(err, CoreError::Persistence { .. }));
    }

    #[test]
    fn store_replaces_previous_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf());

        store.store("cameras", &serde_json::json!([1, 2])).unwrap();
        store.store("cameras", &serde_json::json!([3])).unwrap();

        assert_eq!(
            store.load("cameras").unwrap(),
            Some(serde_json::json!([3]))
        );
    }
}
