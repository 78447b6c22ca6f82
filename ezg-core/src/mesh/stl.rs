//! STL decoding, binary and ASCII.
//!
//! Binary layout: 80-byte header, `u32` triangle count, then 50 bytes per
//! triangle (normal, three vertices, attribute word), all little-endian.

use glam::Vec3;

use crate::error::{EzgError, Result};
use crate::mesh::trimesh::TriMesh;

const HEADER_SIZE: usize = 80;
const TRIANGLE_SIZE: usize = 50;

pub fn decode_stl(bytes: &[u8]) -> Result<TriMesh> {
    if bytes.len() < 6 {
        return Err(EzgError::Format("file too small to be valid STL".into()));
    }
    if looks_ascii(bytes) {
        decode_ascii(bytes)
    } else {
        decode_binary(bytes)
    }
}

// Some binary exporters write "solid" into the header, so the size check
// and NULs in the header take precedence over the keyword.
fn looks_ascii(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(HEADER_SIZE)];
    let starts_solid = String::from_utf8_lossy(head).trim_start().starts_with("solid");
    if !starts_solid || head.contains(&0) {
        return false;
    }
    binary_face_count(bytes)
        .map(|n| HEADER_SIZE + 4 + n * TRIANGLE_SIZE != bytes.len())
        .unwrap_or(true)
}

fn binary_face_count(bytes: &[u8]) -> Option<usize> {
    let raw = bytes.get(HEADER_SIZE..HEADER_SIZE + 4)?;
    Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize)
}

fn decode_binary(bytes: &[u8]) -> Result<TriMesh> {
    let count = binary_face_count(bytes).ok_or_else(|| {
        EzgError::Format(format!(
            "invalid STL header: expected {} bytes, got {}",
            HEADER_SIZE + 4,
            bytes.len()
        ))
    })?;
    let body = &bytes[HEADER_SIZE + 4..];
    let available = body.len() / TRIANGLE_SIZE;
    if available < count {
        return Err(EzgError::Format(format!(
            "truncated STL: header declares {count} triangles, found {available}"
        )));
    }

    let mut mesh = TriMesh::with_capacity(count * 3, count);
    for tri in body.chunks_exact(TRIANGLE_SIZE).take(count) {
        // skip the stored normal
        mesh.push_triangle(
            read_vertex(&tri[12..24]),
            read_vertex(&tri[24..36]),
            read_vertex(&tri[36..48]),
        );
    }
    Ok(mesh)
}

fn read_vertex(buf: &[u8]) -> Vec3 {
    let f = |i: usize| f32::from_le_bytes([buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]);
    Vec3::new(f(0), f(4), f(8))
}

fn decode_ascii(bytes: &[u8]) -> Result<TriMesh> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| EzgError::Format(format!("ASCII STL is not UTF-8: {e}")))?;

    let mut mesh = TriMesh::new();
    let mut corners: Vec<Vec3> = Vec::with_capacity(3);
    let mut in_loop = false;

    for (lineno, line) in text.lines().enumerate() {
        let mut parts = line.split_whitespace();
        let Some(keyword) = parts.next() else {
            continue;
        };
        match keyword.to_ascii_lowercase().as_str() {
            "outer" => {
                in_loop = true;
                corners.clear();
            }
            "vertex" if in_loop => {
                let mut coord = || -> Result<f32> {
                    let s = parts.next().ok_or_else(|| {
                        EzgError::Format(format!("line {}: vertex needs 3 coordinates", lineno + 1))
                    })?;
                    s.parse::<f32>().map_err(|e| {
                        EzgError::Format(format!("line {}: bad coordinate {s:?}: {e}", lineno + 1))
                    })
                };
                let v = Vec3::new(coord()?, coord()?, coord()?);
                corners.push(v);
            }
            "endloop" => in_loop = false,
            "endfacet" => {
                if corners.len() == 3 {
                    mesh.push_triangle(corners[0], corners[1], corners[2]);
                }
                corners.clear();
            }
            "endsolid" => break,
            _ => {}
        }
    }

    if mesh.is_empty() {
        return Err(EzgError::Format("ASCII STL contains no facets".into()));
    }
    Ok(mesh)
}
