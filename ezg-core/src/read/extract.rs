use std::io::Read;

use crate::domain::{ArchivePayload, ExtractedMesh, MeshFormat, Role};
use crate::error::{EzgError, Result};
use crate::list::{PayloadArchive, entry_names, open_archive};

pub const HEAD_ENTRY: &str = "person.stl";
pub const ELECTRODE_ENTRY: &str = "electrode.stl";

/// Largest mesh entry accepted, checked against both the declared and the
/// actual uncompressed size.
pub const MAX_ENTRY_SIZE: u64 = 512 * 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedMeshes {
    pub head: ExtractedMesh,
    pub electrode: ExtractedMesh,
}

/// Pick the head and electrode entries out of the archive listing.
///
/// 1. `person.stl` and `electrode.stl` when both exist, by exact name.
/// 2. Otherwise the first two entries ending in `.stl` (any case), in
///    enumeration order, as head then electrode.
/// 3. Otherwise fail, naming every entry found.
pub fn resolve(names: &[String]) -> Result<(&str, &str)> {
    let has = |wanted: &str| names.iter().any(|n| n == wanted);
    if has(HEAD_ENTRY) && has(ELECTRODE_ENTRY) {
        return Ok((HEAD_ENTRY, ELECTRODE_ENTRY));
    }

    let mut stls = names.iter().filter(|n| MeshFormat::Stl.matches_name(n));
    match (stls.next(), stls.next()) {
        (Some(head), Some(electrode)) => Ok((head.as_str(), electrode.as_str())),
        _ => Err(EzgError::Unresolved {
            entries: names.to_vec(),
        }),
    }
}

pub fn extract_meshes(payload: &ArchivePayload) -> Result<ResolvedMeshes> {
    let mut archive = open_archive(payload.as_bytes())?;
    let names = entry_names(&mut archive)?;
    tracing::debug!(entries = ?names, "archive opened");

    let (head_name, electrode_name) = resolve(&names)?;
    let head = read_entry(&mut archive, Role::Head, head_name)?;
    let electrode = read_entry(&mut archive, Role::Electrode, electrode_name)?;
    tracing::info!(
        head = %head.name,
        head_bytes = head.bytes.len(),
        electrode = %electrode.name,
        electrode_bytes = electrode.bytes.len(),
        "meshes extracted"
    );
    Ok(ResolvedMeshes { head, electrode })
}

fn read_entry(archive: &mut PayloadArchive<'_>, role: Role, name: &str) -> Result<ExtractedMesh> {
    let mut entry = archive
        .by_name(name)
        .map_err(|e| EzgError::Archive(format!("{name}: {e}")))?;
    if entry.size() > MAX_ENTRY_SIZE {
        return Err(EzgError::Archive(format!(
            "{name}: declared size {} exceeds limit {MAX_ENTRY_SIZE}",
            entry.size()
        )));
    }
    let mut bytes = Vec::new();
    entry
        .by_ref()
        .take(MAX_ENTRY_SIZE + 1)
        .read_to_end(&mut bytes)
        .map_err(|e| EzgError::Archive(format!("{name}: {e}")))?;
    if bytes.len() as u64 > MAX_ENTRY_SIZE {
        return Err(EzgError::Archive(format!(
            "{name}: uncompressed size exceeds limit {MAX_ENTRY_SIZE}"
        )));
    }
    Ok(ExtractedMesh {
        role,
        name: name.to_string(),
        bytes,
    })
}
