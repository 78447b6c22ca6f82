use glam::Vec3;
use serde::Serialize;

use crate::domain::{MeshFormat, Role};
use crate::error::{EzgError, Result};
use crate::mesh::glb::decode_glb;
use crate::mesh::stl::decode_stl;
use crate::mesh::trimesh::{Aabb, TriMesh};
use crate::store::blob::ModelReference;
use crate::store::results::ModelResultStore;
use crate::viewer::camera::OrbitCamera;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Material {
    pub color: [f32; 3],
    pub opacity: f32,
}

impl Material {
    pub fn for_role(role: Role) -> Self {
        match role {
            // neutral grey, see-through so markers stay visible
            Role::Head => Material {
                color: [0.82, 0.82, 0.85],
                opacity: 0.55,
            },
            Role::Electrode => Material {
                color: [1.0, 0.15, 0.2],
                opacity: 0.85,
            },
        }
    }
}

#[derive(Clone, Debug)]
pub struct SceneMesh {
    pub role: Role,
    pub format: MeshFormat,
    pub mesh: TriMesh,
    pub material: Material,
    /// Uniform scale baked into `mesh`.
    pub scale: f32,
    pub visible: bool,
}

#[derive(Clone, Debug)]
pub struct ViewerSource {
    pub role: Role,
    pub format: MeshFormat,
    pub reference: ModelReference,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum ViewerStatus {
    NoModel,
    Loaded(usize),
    /// Nothing could be shown; carries the failure reason.
    Failed(String),
}

#[derive(Clone, Debug, Serialize)]
pub struct MeshSummary {
    pub role: Role,
    pub format: MeshFormat,
    pub triangles: usize,
    pub scale: f32,
    pub bounds_min: [f32; 3],
    pub bounds_max: [f32; 3],
    pub visible: bool,
    pub material: Material,
}

/// Everything a caller needs to show the outcome of a mount or load.
#[derive(Clone, Debug, Serialize)]
pub struct ViewerReport {
    pub status: ViewerStatus,
    pub meshes: Vec<MeshSummary>,
    pub errors: Vec<(Role, String)>,
}

#[derive(Clone, Copy, Debug)]
pub struct ViewerOptions {
    /// Longest side STL meshes are scaled to.
    pub target_extent: f32,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self { target_extent: 2.0 }
    }
}

/// Scene holding up to one mesh per role, with per-mesh visibility and an
/// orbit camera.
#[derive(Debug)]
pub struct MeshViewer {
    options: ViewerOptions,
    meshes: Vec<SceneMesh>,
    errors: Vec<(Role, String)>,
    consumed: Vec<(Role, ModelReference)>,
    camera: OrbitCamera,
}

impl MeshViewer {
    pub fn new(options: ViewerOptions) -> Self {
        Self {
            options,
            meshes: Vec::new(),
            errors: Vec::new(),
            consumed: Vec::new(),
            camera: OrbitCamera::default(),
        }
    }

    /// Build the view from stored references. A mesh that fails to load is
    /// recorded and does not stop the others.
    pub fn mount(store: &ModelResultStore, sources: &[ViewerSource], options: ViewerOptions) -> Self {
        let mut viewer = Self::new(options);
        for src in sources {
            viewer.consumed.push((src.role, src.reference.clone()));
            let Some(bytes) = store.resolve_reference(&src.reference) else {
                viewer.record_error(src.role, "model reference has been released".into());
                continue;
            };
            if let Err(e) = viewer.load(src.role, src.format, &bytes) {
                viewer.record_error(src.role, e.to_string());
            }
        }
        viewer
    }

    /// Every stored role, read as STL (the archive contract).
    pub fn mount_results(store: &ModelResultStore, options: ViewerOptions) -> Self {
        let sources: Vec<ViewerSource> = Role::ALL
            .into_iter()
            .filter_map(|role| {
                store.get(role).map(|r| ViewerSource {
                    role,
                    format: MeshFormat::Stl,
                    reference: r.clone(),
                })
            })
            .collect();
        Self::mount(store, &sources, options)
    }

    /// Decode, centre, scale and add a mesh, replacing any mesh of that role.
    pub fn load(&mut self, role: Role, format: MeshFormat, bytes: &[u8]) -> Result<()> {
        let decoded = match format {
            MeshFormat::Stl => decode_stl(bytes),
            MeshFormat::Glb => decode_glb(bytes),
        };
        let mut mesh = decoded.map_err(|e| EzgError::MeshDecode {
            role,
            reason: match e {
                EzgError::Format(msg) => msg,
                other => other.to_string(),
            },
        })?;
        let bounds = mesh.bounds().ok_or_else(|| EzgError::MeshDecode {
            role,
            reason: "mesh has no vertices".into(),
        })?;

        mesh.translate(-bounds.center());
        let scale = match format {
            MeshFormat::Stl if bounds.max_extent() > f32::EPSILON => {
                self.options.target_extent / bounds.max_extent()
            }
            _ => 1.0,
        };
        mesh.scale(scale);

        tracing::info!(
            %role,
            %format,
            triangles = mesh.triangle_count(),
            scale,
            "mesh loaded"
        );
        self.meshes.retain(|m| m.role != role);
        self.errors.retain(|(r, _)| *r != role);
        self.meshes.push(SceneMesh {
            role,
            format,
            mesh,
            material: Material::for_role(role),
            scale,
            visible: true,
        });
        self.meshes.sort_by_key(|m| m.role);
        self.reframe();
        Ok(())
    }

    /// Note a mesh that could not be shown. It counts towards `status()`
    /// and is dropped once that role loads successfully.
    pub fn record_error(&mut self, role: Role, reason: String) {
        tracing::warn!(%role, %reason, "mesh failed to load");
        self.errors.push((role, reason));
    }

    fn reframe(&mut self) {
        if let Some(bounds) = self.scene_bounds() {
            self.camera.frame(&bounds);
        }
    }

    pub fn status(&self) -> ViewerStatus {
        match (self.meshes.len(), self.errors.first()) {
            (0, None) => ViewerStatus::NoModel,
            (0, Some((role, reason))) => ViewerStatus::Failed(format!("{role}: {reason}")),
            (n, _) => ViewerStatus::Loaded(n),
        }
    }

    pub fn meshes(&self) -> &[SceneMesh] {
        &self.meshes
    }

    pub fn errors(&self) -> &[(Role, String)] {
        &self.errors
    }

    pub fn mesh(&self, role: Role) -> Option<&SceneMesh> {
        self.meshes.iter().find(|m| m.role == role)
    }

    /// Returns false when no mesh of that role is loaded.
    pub fn set_visible(&mut self, role: Role, visible: bool) -> bool {
        match self.meshes.iter_mut().find(|m| m.role == role) {
            Some(m) => {
                let changed = m.visible != visible;
                m.visible = visible;
                if changed {
                    self.reframe();
                }
                true
            }
            None => false,
        }
    }

    pub fn toggle(&mut self, role: Role) -> Option<bool> {
        let m = self.meshes.iter_mut().find(|m| m.role == role)?;
        m.visible = !m.visible;
        let visible = m.visible;
        self.reframe();
        Some(visible)
    }

    pub fn visible_meshes(&self) -> impl Iterator<Item = &SceneMesh> {
        self.meshes.iter().filter(|m| m.visible)
    }

    /// Union of the visible meshes' bounds.
    pub fn scene_bounds(&self) -> Option<Aabb> {
        self.visible_meshes()
            .filter_map(|m| m.mesh.bounds())
            .reduce(|a, b| a.union(&b))
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    /// Orbit/pan/zoom controls; unavailable until a mesh is loaded.
    pub fn controls(&mut self) -> Option<&mut OrbitCamera> {
        if self.meshes.is_empty() {
            None
        } else {
            Some(&mut self.camera)
        }
    }

    pub fn summary(&self) -> Vec<MeshSummary> {
        self.meshes
            .iter()
            .map(|m| {
                let b = m.mesh.bounds().unwrap_or(Aabb {
                    min: Vec3::ZERO,
                    max: Vec3::ZERO,
                });
                MeshSummary {
                    role: m.role,
                    format: m.format,
                    triangles: m.mesh.triangle_count(),
                    scale: m.scale,
                    bounds_min: b.min.to_array(),
                    bounds_max: b.max.to_array(),
                    visible: m.visible,
                    material: m.material,
                }
            })
            .collect()
    }

    pub fn report(&self) -> ViewerReport {
        ViewerReport {
            status: self.status(),
            meshes: self.summary(),
            errors: self.errors.clone(),
        }
    }

    /// Tear down the view, releasing the references it was mounted with.
    pub fn unmount(self, store: &mut ModelResultStore) {
        for (role, reference) in self.consumed {
            if store.get(role) == Some(&reference) {
                store.clear(role);
            } else {
                store.release(&reference);
            }
        }
    }
}
