use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::MeshFormat;
use crate::error::{EzgError, Result};

/// Environment variable that overrides the configured endpoint.
pub const ENDPOINT_ENV: &str = "EZG_ENDPOINT";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Base address of the processing service, e.g. `http://127.0.0.1:8080`.
    pub endpoint: String,
    pub upload_path: String,
    /// Multipart part carrying the head mesh.
    pub mesh_field: String,
    /// Multipart part carrying the face image.
    pub image_field: String,
    /// Mesh formats the mesh slot takes; one entry per wizard variant.
    pub accepted_meshes: Vec<MeshFormat>,
    pub timeout_secs: u64,
    /// Size STL meshes are normalised to in the viewer.
    pub target_extent: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080".to_string(),
            upload_path: "/upload".to_string(),
            mesh_field: "model".to_string(),
            image_field: "image".to_string(),
            accepted_meshes: MeshFormat::ALL.to_vec(),
            timeout_secs: 120,
            target_extent: 2.0,
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| EzgError::Config(format!("invalid config: {e}")))
    }

    /// Load from an optional TOML file, then apply `EZG_ENDPOINT`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p).map_err(|e| {
                    EzgError::Config(format!("cannot read {}: {e}", p.display()))
                })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            if !endpoint.trim().is_empty() {
                cfg.endpoint = endpoint;
            }
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(EzgError::Config(format!(
                "endpoint must be an http(s) address, got {:?}",
                self.endpoint
            )));
        }
        if self.accepted_meshes.is_empty() {
            return Err(EzgError::Config("accepted_meshes must not be empty".into()));
        }
        if self.mesh_field.is_empty() || self.image_field.is_empty() {
            return Err(EzgError::Config("multipart field names must not be empty".into()));
        }
        if self.timeout_secs == 0 {
            return Err(EzgError::Config("timeout_secs must be at least 1".into()));
        }
        if !(self.target_extent.is_finite() && self.target_extent > 0.0) {
            return Err(EzgError::Config(format!(
                "target_extent must be positive, got {}",
                self.target_extent
            )));
        }
        Ok(())
    }

    /// Full address of the upload route.
    pub fn upload_url(&self) -> String {
        let base = self.endpoint.trim_end_matches('/');
        let path = self.upload_path.trim_start_matches('/');
        format!("{base}/{path}")
    }
}
