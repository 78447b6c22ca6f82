use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::domain::Role;
use crate::error::{EzgError, Result};
use crate::store::results::ModelResultStore;

pub const MANIFEST_NAME: &str = "manifest.json";

#[derive(Debug, Serialize)]
struct ManifestEntry<'a> {
    role: Role,
    file: &'static str,
    reference: &'a str,
    size: usize,
    blake3: String,
}

/// Write every stored model to `dest` under its download name, plus a
/// `manifest.json` describing them. Returns the written paths, manifest last.
pub fn export_models(store: &ModelResultStore, dest: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dest)?;

    let mut written = Vec::new();
    let mut manifest = Vec::new();
    for role in Role::ALL {
        let Some(reference) = store.get(role) else {
            continue;
        };
        let bytes = store
            .resolve(role)
            .ok_or_else(|| EzgError::Format(format!("{role} reference {reference} was revoked")))?;

        let path = dest.join(role.download_name());
        fs::write(&path, &bytes)?;
        tracing::info!(%role, path = %path.display(), size = bytes.len(), "model written");

        manifest.push(ManifestEntry {
            role,
            file: role.download_name(),
            reference: reference.as_str(),
            size: bytes.len(),
            blake3: hex::encode(blake3::hash(&bytes).as_bytes()),
        });
        written.push(path);
    }

    if manifest.is_empty() {
        return Ok(written);
    }
    let path = dest.join(MANIFEST_NAME);
    let json = serde_json::to_vec_pretty(&manifest)
        .map_err(|e| EzgError::Format(format!("manifest: {e}")))?;
    fs::write(&path, json)?;
    written.push(path);
    Ok(written)
}
