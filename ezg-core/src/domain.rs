// ezg_core/src/domain.rs
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EzgError, Result};

/// Upload slot of the wizard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Image,
    Mesh,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Image => f.write_str("face image"),
            Slot::Mesh => f.write_str("head model"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeshFormat {
    /// Raw triangle soup, no hierarchy or materials.
    Stl,
    /// Binary glTF scene bundle.
    Glb,
}

impl MeshFormat {
    pub const ALL: [MeshFormat; 2] = [MeshFormat::Stl, MeshFormat::Glb];

    pub fn extension(self) -> &'static str {
        match self {
            MeshFormat::Stl => "stl",
            MeshFormat::Glb => "glb",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            MeshFormat::Stl => "model/stl",
            MeshFormat::Glb => "model/gltf-binary",
        }
    }

    /// Suffix match on a file name; case-insensitive.
    pub fn matches_name(self, name: &str) -> bool {
        let suffix = format!(".{}", self.extension());
        let name = name.as_bytes();
        name.len() >= suffix.len()
            && name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix.as_bytes())
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.matches_name(name))
    }
}

impl fmt::Display for MeshFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// What a slot is willing to accept.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpectedKind {
    Png,
    Mesh(MeshFormat),
}

impl fmt::Display for ExpectedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedKind::Png => f.write_str("PNG"),
            ExpectedKind::Mesh(format) => write!(f, ".{}", format.extension()),
        }
    }
}

/// Logical purpose of a produced mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Head,
    Electrode,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Head, Role::Electrode];

    /// Key under which the role's reference is kept in the result store.
    pub fn storage_key(self) -> &'static str {
        match self {
            Role::Head => "headModelUrl",
            Role::Electrode => "electrodeModelUrl",
        }
    }

    /// File name used when the mesh is exported for download.
    pub fn download_name(self) -> &'static str {
        match self {
            Role::Head => "head_model.stl",
            Role::Electrode => "electrode_model.stl",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Head => f.write_str("head"),
            Role::Electrode => f.write_str("electrode"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    /// Declared media type, as the picker reported it.
    pub mime: String,
    pub content: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            content,
        }
    }

    /// Read a file from disk. Without an explicit type the declared type is
    /// guessed from the extension, the way a file picker would report it.
    pub fn from_path(path: &Path, mime: Option<&str>) -> Result<Self> {
        let content = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| EzgError::Format(format!("not a file: {}", path.display())))?;
        let mime = mime.map(str::to_string).unwrap_or_else(|| guess_mime(&name).to_string());
        Ok(Self::new(name, mime, content))
    }
}

pub fn guess_mime(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "stl" => MeshFormat::Stl.mime(),
        "glb" => MeshFormat::Glb.mime(),
        _ => "application/octet-stream",
    }
}

/// One face image plus one head mesh, both already validated.
#[derive(Clone, Debug)]
pub struct ProcessingRequest {
    image: UploadedFile,
    mesh: UploadedFile,
    mesh_format: MeshFormat,
}

impl ProcessingRequest {
    pub fn new(
        image: Option<UploadedFile>,
        mesh: Option<(UploadedFile, MeshFormat)>,
    ) -> Result<Self> {
        let image = image.ok_or(EzgError::MissingInput(Slot::Image))?;
        let (mesh, mesh_format) = mesh.ok_or(EzgError::MissingInput(Slot::Mesh))?;
        Ok(Self {
            image,
            mesh,
            mesh_format,
        })
    }

    pub fn image(&self) -> &UploadedFile {
        &self.image
    }

    pub fn mesh(&self) -> &UploadedFile {
        &self.mesh
    }

    pub fn mesh_format(&self) -> MeshFormat {
        self.mesh_format
    }
}

/// Raw bytes of the archive returned by the processing endpoint.
#[derive(Clone, Debug)]
pub struct ArchivePayload {
    bytes: Vec<u8>,
}

impl ArchivePayload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedMesh {
    pub role: Role,
    /// Archive entry the bytes came from.
    pub name: String,
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_suffix_is_case_insensitive() {
        assert!(MeshFormat::Stl.matches_name("scan.stl"));
        assert!(MeshFormat::Stl.matches_name("SCAN.STL"));
        assert!(MeshFormat::Glb.matches_name("head.GlB"));
        assert!(!MeshFormat::Glb.matches_name("head.gltf"));
        assert!(!MeshFormat::Stl.matches_name("stl"));
        assert_eq!(MeshFormat::from_name("a.b.glb"), Some(MeshFormat::Glb));
    }

    #[test]
    fn request_requires_both_slots() {
        let png = UploadedFile::new("face.png", "image/png", vec![1]);
        let stl = UploadedFile::new("head.stl", "model/stl", vec![2]);

        let err = ProcessingRequest::new(None, Some((stl.clone(), MeshFormat::Stl))).unwrap_err();
        assert!(matches!(err, EzgError::MissingInput(Slot::Image)));

        let err = ProcessingRequest::new(Some(png.clone()), None).unwrap_err();
        assert!(matches!(err, EzgError::MissingInput(Slot::Mesh)));

        let req = ProcessingRequest::new(Some(png), Some((stl, MeshFormat::Stl))).unwrap();
        assert_eq!(req.mesh_format(), MeshFormat::Stl);
        assert_eq!(req.image().name, "face.png");
    }

    #[test]
    fn mime_guess_follows_extension() {
        assert_eq!(guess_mime("face.PNG"), "image/png");
        assert_eq!(guess_mime("face.jpeg"), "image/jpeg");
        assert_eq!(guess_mime("head.glb"), "model/gltf-binary");
        assert_eq!(guess_mime("README"), "application/octet-stream");
    }
}
