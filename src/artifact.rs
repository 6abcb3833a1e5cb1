//! Whole-file artifact replacement.
//!
//! Every stage output is written to a sibling `.<name>.tmp` file and renamed
//! over the target, so a failed or interrupted run leaves the previous
//! artifact intact.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{ArtifactError, ArtifactResult};

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".into());
    path.with_file_name(format!(".{name}.tmp"))
}

/// Atomically replace `path` with `contents`.
pub fn write_atomic(path: &Path, contents: &[u8]) -> ArtifactResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ArtifactError::Write {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let tmp = temp_sibling(path);
    std::fs::write(&tmp, contents).map_err(|e| ArtifactError::Write {
        path: tmp.display().to_string(),
        source: e,
    })?;
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        ArtifactError::Write {
            path: path.display().to_string(),
            source: e,
        }
    })?;

    tracing::debug!(path = %path.display(), bytes = contents.len(), "artifact replaced");
    Ok(())
}

/// Serialize `value` as pretty JSON and atomically replace `path`.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> ArtifactResult<()> {
    let mut json =
        serde_json::to_string_pretty(value).map_err(|e| ArtifactError::Serialization {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    json.push('\n');
    write_atomic(path, json.as_bytes())
}

/// Read and deserialize a JSON artifact.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> ArtifactResult<T> {
    let content = std::fs::read_to_string(path).map_err(|e| ArtifactError::Read {
        path: path.display().to_string(),
        source: e,
    })?;
    serde_json::from_str(&content).map_err(|e| ArtifactError::Serialization {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}
