//! Binary glTF decoding.
//!
//! Every triangle primitive reachable from the default scene is flattened
//! into one mesh with node world transforms applied.

use glam::{Mat4, Vec3};
use gltf::buffer::Data;
use gltf::mesh::Mode;

use crate::error::{EzgError, Result};
use crate::mesh::export::to_binary_stl;
use crate::mesh::trimesh::TriMesh;

pub fn decode_glb(bytes: &[u8]) -> Result<TriMesh> {
    let gltf::Gltf { document, blob } =
        gltf::Gltf::from_slice(bytes).map_err(|e| EzgError::Format(format!("invalid GLB: {e}")))?;
    let buffers = gltf::import_buffers(&document, None, blob)
        .map_err(|e| EzgError::Format(format!("GLB buffers: {e}")))?;

    let mut out = TriMesh::new();
    match document.default_scene().or_else(|| document.scenes().next()) {
        Some(scene) => {
            for node in scene.nodes() {
                visit(&node, Mat4::IDENTITY, &buffers, &mut out)?;
            }
        }
        // no scene graph; take meshes as authored
        None => {
            for mesh in document.meshes() {
                for prim in mesh.primitives() {
                    append_primitive(&prim, Mat4::IDENTITY, &buffers, &mut out)?;
                }
            }
        }
    }

    if out.is_empty() {
        return Err(EzgError::Format("GLB contains no triangle meshes".into()));
    }
    Ok(out)
}

fn visit(node: &gltf::Node<'_>, parent: Mat4, buffers: &[Data], out: &mut TriMesh) -> Result<()> {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        for prim in mesh.primitives() {
            append_primitive(&prim, world, buffers, out)?;
        }
    }
    for child in node.children() {
        visit(&child, world, buffers, out)?;
    }
    Ok(())
}

fn append_primitive(
    prim: &gltf::Primitive<'_>,
    transform: Mat4,
    buffers: &[Data],
    out: &mut TriMesh,
) -> Result<()> {
    if prim.mode() != Mode::Triangles {
        tracing::debug!(mode = ?prim.mode(), "skipping non-triangle primitive");
        return Ok(());
    }
    let reader = prim.reader(|buffer| buffers.get(buffer.index()).map(|d| d.0.as_slice()));
    let Some(positions) = reader.read_positions() else {
        return Ok(());
    };

    let mut part = TriMesh::new();
    part.positions = positions.map(Vec3::from_array).collect();
    let count = part.positions.len() as u32;
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..count).collect(),
    };
    for tri in indices.chunks_exact(3) {
        if let Some(bad) = tri.iter().find(|&&i| i >= count) {
            return Err(EzgError::Format(format!(
                "GLB index {bad} out of range for {count} vertices"
            )));
        }
        part.triangles.push([tri[0], tri[1], tri[2]]);
    }

    out.append_transformed(&part, transform);
    Ok(())
}

/// Flatten a GLB scene and re-encode it as binary STL.
pub fn glb_to_stl(bytes: &[u8]) -> Result<Vec<u8>> {
    let mesh = decode_glb(bytes)?;
    tracing::info!(triangles = mesh.triangle_count(), "converted GLB scene to STL");
    Ok(to_binary_stl(&mesh, "ezg glb-to-stl"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::stl::decode_stl;
    use glb_fixtures::{GlbBuilder, NodeSpec, single_mesh};

    const UNIT_TRIANGLE: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];

    #[test]
    fn decodes_indexed_primitive() {
        let bytes = single_mesh(&UNIT_TRIANGLE, &[[0, 1, 2]]);
        let m = decode_glb(&bytes).unwrap();
        assert_eq!(m.triangle_count(), 1);
        assert_eq!(m.positions, vec![Vec3::ZERO, Vec3::X, Vec3::Y]);
    }

    #[test]
    fn applies_node_transforms_down_the_hierarchy() {
        let mut b = GlbBuilder::new();
        let mesh = b.mesh(&UNIT_TRIANGLE, &[]);
        let child = b.node(NodeSpec {
            mesh: Some(mesh),
            scale: Some([2.0, 2.0, 2.0]),
            ..NodeSpec::default()
        });
        let parent = b.node(NodeSpec {
            translation: Some([0.0, 0.0, 5.0]),
            children: vec![child],
            ..NodeSpec::default()
        });
        b.root(parent);

        let m = decode_glb(&b.build().unwrap()).unwrap();
        assert_eq!(m.triangle_count(), 1);
        assert_eq!(m.positions[0], Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(m.positions[1], Vec3::new(2.0, 0.0, 5.0));
    }

    #[test]
    fn converts_to_stl() {
        let stl = glb_to_stl(&single_mesh(&UNIT_TRIANGLE, &[[0, 1, 2]])).unwrap();
        let back = decode_stl(&stl).unwrap();
        assert_eq!(back.triangle_count(), 1);
        assert_eq!(back.positions[2], Vec3::Y);
    }

    #[test]
    fn rejects_non_glb() {
        assert!(matches!(decode_glb(b"not a gltf"), Err(EzgError::Format(_))));
    }
}
