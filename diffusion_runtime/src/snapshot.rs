//! State snapshots — deterministic, hash-verified checkpoints.
//!
//! A snapshot file carries the serde-encoded state plus the kernel's
//! canonical hash. No timestamps anywhere (determinism).
//!
//! - `encode_state` / `decode_state`: strict JSON codec, no defaults
//! - `restore_state`: decode + invariant validation
//! - `save_snapshot` / `load_snapshot` / `load_latest_snapshot`: files
//! - `verify_snapshot`: recompute and compare the embedded hash

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use diffusion_engine::domain::DiffusionState;
use diffusion_engine::hashing::canonical_hash;
use diffusion_engine::invariants::try_validate_invariants;
use diffusion_engine::FORMAT_VERSION;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// All possible snapshot failures.
#[derive(Debug)]
pub enum SnapshotError {
    /// JSON serialization failed.
    SerializationError(String),
    /// JSON deserialization failed (malformed, missing or unknown fields).
    DeserializationError(String),
    /// Loaded state violates kernel invariants.
    InvariantViolation(String),
    /// The embedded hash does not match the decoded state.
    HashMismatch { stored: String, computed: String },
    /// File I/O error.
    IoError(String),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::SerializationError(msg) => {
                write!(f, "SerializationError: {}", msg)
            }
            SnapshotError::DeserializationError(msg) => {
                write!(f, "DeserializationError: {}", msg)
            }
            SnapshotError::InvariantViolation(msg) => {
                write!(f, "InvariantViolation: {}", msg)
            }
            SnapshotError::HashMismatch { stored, computed } => write!(
                f,
                "HashMismatch: snapshot stores {} but state hashes to {}",
                stored, computed
            ),
            SnapshotError::IoError(msg) => write!(f, "IoError: {}", msg),
        }
    }
}

impl From<io::Error> for SnapshotError {
    fn from(err: io::Error) -> Self {
        SnapshotError::IoError(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Encode a DiffusionState to a JSON string.
///
/// BTreeMap keys keep the mass entries sorted; output is deterministic
/// for equal states.
pub fn encode_state(state: &DiffusionState) -> Result<String, SnapshotError> {
    serde_json::to_string(state)
        .map_err(|e| SnapshotError::SerializationError(e.to_string()))
}

/// Decode a JSON string into a DiffusionState.
///
/// Strict deserialization: `deny_unknown_fields` rejects unexpected
/// fields, missing required fields cause failure. No silent defaults.
/// No invariant validation — use `restore_state` for validated loading.
pub fn decode_state(json: &str) -> Result<DiffusionState, SnapshotError> {
    serde_json::from_str::<DiffusionState>(json)
        .map_err(|e| SnapshotError::DeserializationError(e.to_string()))
}

/// Decode a JSON string and validate invariants immediately.
///
/// The safe entry point for loading state from untrusted sources.
pub fn restore_state(json: &str) -> Result<DiffusionState, SnapshotError> {
    let state = decode_state(json)?;
    try_validate_invariants(&state).map_err(SnapshotError::InvariantViolation)?;
    Ok(state)
}

// ---------------------------------------------------------------------------
// Snapshot files
// ---------------------------------------------------------------------------

/// Snapshot on-disk format.
#[derive(Serialize, Deserialize)]
pub struct Snapshot {
    /// Step sequence number at which this snapshot was taken.
    pub sequence: u64,
    /// Serde-encoded state JSON.
    pub state_json: String,
    /// SHA-256 of `state_json` — file-integrity check, cheap to verify
    /// without decoding.
    pub state_sha256: String,
    /// Kernel canonical hash of the state.
    pub hash: String,
    /// Format version at snapshot time.
    pub format_version: u32,
}

/// Lowercase hex SHA-256 of a byte payload.
fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Save a deterministic snapshot of the current state.
pub fn save_snapshot(
    dir: &Path,
    sequence: u64,
    state: &DiffusionState,
) -> Result<PathBuf, SnapshotError> {
    fs::create_dir_all(dir)?;

    let state_json = encode_state(state)?;
    let snap = Snapshot {
        sequence,
        state_sha256: sha256_hex(state_json.as_bytes()),
        state_json,
        hash: canonical_hash(state),
        format_version: FORMAT_VERSION,
    };

    let filename = format!("state_{:06}.json", sequence);
    let path = dir.join(&filename);

    let content = serde_json::to_string(&snap)
        .map_err(|e| SnapshotError::SerializationError(e.to_string()))?;

    let mut file = File::create(&path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;

    Ok(path)
}

/// Load a snapshot at a specific sequence number.
/// Returns None if no snapshot exists at that sequence.
pub fn load_snapshot(dir: &Path, sequence: u64) -> Result<Option<Snapshot>, SnapshotError> {
    let filename = format!("state_{:06}.json", sequence);
    let path = dir.join(&filename);

    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&path)?;
    let snap: Snapshot = serde_json::from_str(&content)
        .map_err(|e| SnapshotError::DeserializationError(e.to_string()))?;

    Ok(Some(snap))
}

/// Load the latest snapshot in a directory.
/// Scans for state_NNNNNN.json files and returns the highest sequence.
pub fn load_latest_snapshot(dir: &Path) -> Result<Option<Snapshot>, SnapshotError> {
    if !dir.exists() {
        return Ok(None);
    }

    let mut best_seq: Option<u64> = None;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        if let Some(seq_str) = name_str
            .strip_prefix("state_")
            .and_then(|s| s.strip_suffix(".json"))
        {
            if let Ok(seq) = seq_str.parse::<u64>() {
                match best_seq {
                    Some(best) if seq > best => best_seq = Some(seq),
                    None => best_seq = Some(seq),
                    _ => {}
                }
            }
        }
    }

    match best_seq {
        Some(seq) => load_snapshot(dir, seq),
        None => Ok(None),
    }
}

/// Verify a snapshot's internal consistency: the payload must match
/// its integrity hash, and the decoded state must produce the stored
/// canonical hash.
pub fn verify_snapshot(snap: &Snapshot) -> bool {
    if sha256_hex(snap.state_json.as_bytes()) != snap.state_sha256 {
        return false;
    }
    match decode_state(&snap.state_json) {
        Ok(state) => canonical_hash(&state) == snap.hash,
        Err(_) => false,
    }
}

/// Decode, validate invariants, and check both embedded hashes.
pub fn restore_snapshot(snap: &Snapshot) -> Result<DiffusionState, SnapshotError> {
    let payload = sha256_hex(snap.state_json.as_bytes());
    if payload != snap.state_sha256 {
        return Err(SnapshotError::HashMismatch {
            stored: snap.state_sha256.clone(),
            computed: payload,
        });
    }
    let state = restore_state(&snap.state_json)?;
    let computed = canonical_hash(&state);
    if computed != snap.hash {
        return Err(SnapshotError::HashMismatch {
            stored: snap.hash.clone(),
            computed,
        });
    }
    Ok(state)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use diffusion_engine::arithmetic::SCALE;
    use diffusion_engine::graph::WeightedGraph;
    use diffusion_engine::state::create_initial_state;

    /// Build a minimal valid state for testing.
    fn make_test_state() -> DiffusionState {
        let graph = WeightedGraph::from_matrix(
            vec!["alpha".into(), "beta".into(), "gamma".into()],
            vec![
                vec![0, SCALE, 0],
                vec![SCALE, 0, SCALE / 2],
                vec![0, SCALE / 2, 0],
            ],
        )
        .unwrap();
        create_initial_state(graph, "alpha", SCALE)
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join("diffusion_snapshot_tests")
            .join(name);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).expect("Failed to create temp dir");
        dir
    }

    #[test]
    fn roundtrip_produces_identical_json() {
        let state = make_test_state();
        let json1 = encode_state(&state).unwrap();
        let decoded = decode_state(&json1).unwrap();
        let json2 = encode_state(&decoded).unwrap();
        assert_eq!(json1, json2, "Roundtrip must produce identical JSON");
    }

    #[test]
    fn broken_conservation_returns_invariant_violation() {
        let mut state = make_test_state();
        state.mass.insert("beta".to_string(), 1);
        let json = encode_state(&state).unwrap();
        let result = restore_state(&json);
        match result.unwrap_err() {
            SnapshotError::InvariantViolation(msg) => {
                assert!(msg.contains("mass_conservation"), "got: {}", msg);
            }
            other => panic!("Expected InvariantViolation, got: {:?}", other),
        }
    }

    #[test]
    fn corrupted_json_returns_deserialization_error() {
        let result = decode_state("{ not valid json !!!}");
        assert!(matches!(
            result.unwrap_err(),
            SnapshotError::DeserializationError(_)
        ));
    }

    #[test]
    fn missing_field_returns_deserialization_error() {
        let result = decode_state(r#"{"source":"alpha"}"#);
        assert!(matches!(
            result.unwrap_err(),
            SnapshotError::DeserializationError(_)
        ));
    }

    #[test]
    fn file_roundtrip_verifies_and_restores() {
        let state = make_test_state();
        let dir = temp_dir("file_roundtrip");

        save_snapshot(&dir, 3, &state).unwrap();
        let loaded = load_snapshot(&dir, 3).unwrap().expect("snapshot exists");

        assert!(verify_snapshot(&loaded));
        let restored = restore_snapshot(&loaded).unwrap();
        assert_eq!(canonical_hash(&restored), canonical_hash(&state));
    }

    #[test]
    fn latest_snapshot_wins() {
        let state = make_test_state();
        let dir = temp_dir("latest");
        save_snapshot(&dir, 2, &state).unwrap();
        save_snapshot(&dir, 10, &state).unwrap();
        let latest = load_latest_snapshot(&dir).unwrap().unwrap();
        assert_eq!(latest.sequence, 10);
    }

    #[test]
    fn tampered_snapshot_fails_verification() {
        let state = make_test_state();
        let dir = temp_dir("tampered");
        save_snapshot(&dir, 1, &state).unwrap();
        let mut snap = load_snapshot(&dir, 1).unwrap().unwrap();
        snap.state_json = snap.state_json.replace("10000", "10001");
        assert!(!verify_snapshot(&snap));
    }
}
