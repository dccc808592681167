//! JSON snapshot store for trained models.
//!
//! Writes `model.json` plus a `manifest.json` binding it by SHA-256. Each
//! file is written to a temp file in the same directory and renamed into
//! place, so neither is ever half-written. The two renames are separate: a
//! crash between them leaves a new model next to the previous manifest, which
//! loads as [`StorageError::Integrity`] until the next successful `save`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::engine::ModelSnapshot;
use crate::ports::ModelStore;

const MODEL_FILE: &str = "model.json";
const MANIFEST_FILE: &str = "manifest.json";
const MANIFEST_VERSION: u32 = 1;

/// Environment variable selecting the snapshot directory.
pub const MODEL_DIR_ENV: &str = "DIAGNOSTICA_MODEL_DIR";
const DEFAULT_MODEL_DIR: &str = "models";

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Integrity check failed: {0}")]
    Integrity(String),

    #[error("Invalid snapshot shape: {0}")]
    Shape(String),

    #[error("Session store lock poisoned")]
    LockPoisoned,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotManifest {
    version: u32,
    created_at: i64,
    files: BTreeMap<String, String>,
}

fn sha256_hex_bytes(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn constant_time_eq_str(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes().iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Write `bytes` to `path` via a sibling temp file and rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| StorageError::Serialization(format!("Invalid snapshot path {path:?}")))?;
    let tmp = path.with_file_name(format!(".{name}.tmp"));
    fs::write(&tmp, bytes)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

/// File-backed [`ModelStore`].
#[derive(Debug, Clone)]
pub struct JsonModelStore {
    dir: PathBuf,
}

impl JsonModelStore {
    #[must_use]
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted at `DIAGNOSTICA_MODEL_DIR`, or `models/`.
    #[must_use]
    pub fn from_env_or_default() -> Self {
        let dir = std::env::var(MODEL_DIR_ENV)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL_DIR.to_string());
        Self::new(dir)
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn model_path(&self) -> PathBuf {
        self.dir.join(MODEL_FILE)
    }

    fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    /// Check `model_bytes` against the manifest, if one exists.
    fn verify_manifest(&self, model_bytes: &[u8]) -> Result<(), StorageError> {
        let manifest_path = self.manifest_path();
        if !manifest_path.exists() {
            tracing::warn!("No manifest next to {}, skipping hash check", self.model_path().display());
            return Ok(());
        }

        let content = fs::read(&manifest_path)?;
        let manifest: SnapshotManifest = serde_json::from_slice(&content)
            .map_err(|e| StorageError::Serialization(format!("Invalid manifest.json format: {e}")))?;
        if manifest.version != MANIFEST_VERSION {
            return Err(StorageError::Integrity(format!(
                "Unsupported manifest version: {}",
                manifest.version
            )));
        }
        let expected = manifest.files.get(MODEL_FILE).ok_or_else(|| {
            StorageError::Integrity(format!("{MANIFEST_FILE} does not bind {MODEL_FILE}"))
        })?;

        if !constant_time_eq_str(&sha256_hex_bytes(model_bytes), expected) {
            return Err(StorageError::Integrity(format!("File hash mismatch for {MODEL_FILE}")));
        }
        Ok(())
    }
}

impl ModelStore for JsonModelStore {
    type Error = StorageError;

    fn try_load(&self) -> Result<Option<ModelSnapshot>, Self::Error> {
        let model_path = self.model_path();
        if !model_path.exists() {
            tracing::debug!("No snapshot at {}", model_path.display());
            return Ok(None);
        }

        let bytes = fs::read(&model_path)?;
        self.verify_manifest(&bytes)?;

        let snapshot: ModelSnapshot = serde_json::from_slice(&bytes)
            .map_err(|e| StorageError::Serialization(format!("Invalid {MODEL_FILE}: {e}")))?;
        if snapshot.network.len() != 2 {
            return Err(StorageError::Shape(format!(
                "Expected 2 layers, found {}",
                snapshot.network.len()
            )));
        }

        tracing::info!("Loaded model snapshot from {}", model_path.display());
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &ModelSnapshot) -> Result<(), Self::Error> {
        fs::create_dir_all(&self.dir)?;

        let bytes = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| StorageError::Serialization(format!("Failed to serialize model: {e}")))?;
        write_atomic(&self.model_path(), &bytes)?;

        let manifest = SnapshotManifest {
            version: MANIFEST_VERSION,
            created_at: chrono::Utc::now().timestamp(),
            files: BTreeMap::from([(MODEL_FILE.to_string(), sha256_hex_bytes(&bytes))]),
        };
        let manifest_bytes = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| StorageError::Serialization(format!("Failed to serialize manifest: {e}")))?;
        write_atomic(&self.manifest_path(), &manifest_bytes)?;

        tracing::info!("Saved model snapshot to {}", self.model_path().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FeatureVector, NUM_FEATURES};
    use crate::engine::{Network, TrainedModel};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use tempfile::tempdir;

    fn test_model() -> TrainedModel {
        let mut rng = ChaCha20Rng::seed_from_u64(17);
        let network = Network::initialize(NUM_FEATURES, 6, 11, &mut rng);
        TrainedModel::new(network, 1.5, 0.3, 40).expect("Should build model")
    }

    #[test]
    fn test_missing_snapshot_is_none() {
        let dir = tempdir().expect("Should create temp dir");
        let store = JsonModelStore::new(dir.path().join("nested"));
        assert!(store.try_load().expect("Should not fail").is_none());
    }

    #[test]
    fn test_round_trip_gives_identical_inference() {
        let dir = tempdir().expect("Should create temp dir");
        let store = JsonModelStore::new(dir.path());
        let model = test_model();

        store.save(&model.to_snapshot()).expect("Should save");
        let snapshot = store.try_load().expect("Should load").expect("Should exist");
        let restored = TrainedModel::from_snapshot(snapshot, 11).expect("Should restore");

        let mut fv = FeatureVector::new();
        fv.set(0, 0.9);
        fv.set(16, 0.7);
        assert_eq!(model.predict_proba(&fv), restored.predict_proba(&fv));

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .expect("Should list dir")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_corrupt_snapshot_is_error() {
        let dir = tempdir().expect("Should create temp dir");
        let store = JsonModelStore::new(dir.path());
        fs::write(store.model_path(), b"{\"config\": 12").expect("Should write");
        assert!(matches!(store.try_load(), Err(StorageError::Serialization(_))));
    }

    #[test]
    fn test_tampered_snapshot_fails_manifest_check() {
        let dir = tempdir().expect("Should create temp dir");
        let store = JsonModelStore::new(dir.path());
        store.save(&test_model().to_snapshot()).expect("Should save");

        let mut snapshot = test_model().to_snapshot();
        snapshot.config.temperature = 2.0;
        let bytes = serde_json::to_vec_pretty(&snapshot).expect("Should serialize");
        fs::write(store.model_path(), bytes).expect("Should write");

        assert!(matches!(store.try_load(), Err(StorageError::Integrity(_))));
    }

    #[test]
    fn test_model_with_previous_manifest_is_rejected_until_resaved() {
        let dir = tempdir().expect("Should create temp dir");
        let store = JsonModelStore::new(dir.path());
        store.save(&test_model().to_snapshot()).expect("Should save");
        let previous_manifest = fs::read(store.manifest_path()).expect("Should read manifest");

        let mut newer = test_model().to_snapshot();
        newer.config.epochs = 99;
        store.save(&newer).expect("Should save");
        // state after the model rename but before the manifest rename
        fs::write(store.manifest_path(), &previous_manifest).expect("Should write");
        assert!(matches!(store.try_load(), Err(StorageError::Integrity(_))));

        store.save(&newer).expect("Should save");
        let loaded = store.try_load().expect("Should load").expect("Should exist");
        assert_eq!(loaded.config.epochs, 99);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq_str("abc", "abc"));
        assert!(!constant_time_eq_str("abc", "abd"));
        assert!(!constant_time_eq_str("abc", "ab"));
    }
}
