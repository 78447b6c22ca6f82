use glam::Vec3;

use crate::mesh::trimesh::TriMesh;

fn triangle_normal([a, b, c]: [Vec3; 3]) -> Vec3 {
    (b - a).cross(c - a).normalize_or_zero()
}

/// Serialise as binary STL. The header text is truncated to 80 bytes and
/// NUL padded.
pub fn to_binary_stl(mesh: &TriMesh, header: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(84 + mesh.triangle_count() * 50);

    let mut head = [0u8; 80];
    let name = header.as_bytes();
    let n = name.len().min(head.len());
    head[..n].copy_from_slice(&name[..n]);
    out.extend_from_slice(&head);

    out.extend_from_slice(&(mesh.triangle_count() as u32).to_le_bytes());

    for tri in mesh.corners() {
        for v in std::iter::once(triangle_normal(tri)).chain(tri) {
            out.extend_from_slice(&v.x.to_le_bytes());
            out.extend_from_slice(&v.y.to_le_bytes());
            out.extend_from_slice(&v.z.to_le_bytes());
        }
        out.extend_from_slice(&0u16.to_le_bytes());
    }

    out
}
