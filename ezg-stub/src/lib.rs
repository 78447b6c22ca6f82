//! Local stand-in for the processing service.
//!
//! Accepts the same multipart upload as the real endpoint and answers with a
//! zip of meshes. The head mesh is the uploaded one (GLB is converted to
//! binary STL); electrodes are small tetrahedra on an ellipsoid fitted to the
//! head's bounds.

use std::io::{Cursor, Write};
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use glam::Vec3;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use ezg_core::mesh::export::to_binary_stl;
use ezg_core::mesh::glb::decode_glb;
use ezg_core::mesh::stl::decode_stl;
use ezg_core::mesh::trimesh::{Aabb, TriMesh};
use ezg_core::{MeshFormat, PipelineConfig};

const UPLOAD_LIMIT: usize = 256 * 1024 * 1024;

/// How the stub answers an otherwise valid upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StubMode {
    /// `person.stl` + `electrode.stl`.
    Canonical,
    /// Meshes under non-canonical names (`model_a.stl`, `model_b.stl`).
    Fallback,
    /// A zip without any STL entry.
    NoMeshes,
    Fail { status: u16, body: String },
}

struct StubState {
    mode: StubMode,
    mesh_field: String,
    image_field: String,
}

pub fn router(mode: StubMode) -> Router {
    let config = PipelineConfig::default();
    let state = Arc::new(StubState {
        mode,
        mesh_field: config.mesh_field,
        image_field: config.image_field,
    });
    Router::new()
        .route(&config.upload_path, post(upload))
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(listener: TcpListener, mode: StubMode) -> std::io::Result<()> {
    axum::serve(listener, router(mode)).await
}

/// Bind an ephemeral port on loopback and serve in the background.
pub async fn spawn(mode: StubMode) -> std::io::Result<SocketAddr> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = serve(listener, mode).await {
            tracing::error!(error = %e, "stub server stopped");
        }
    });
    Ok(addr)
}

fn text(status: StatusCode, body: impl Into<String>) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body.into(),
    )
        .into_response()
}

struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

async fn upload(State(state): State<Arc<StubState>>, mut multipart: Multipart) -> Response {
    let mut mesh: Option<Upload> = None;
    let mut image: Option<Upload> = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return text(StatusCode::BAD_REQUEST, format!("malformed multipart body: {e}")),
        };
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = match field.bytes().await {
            Ok(b) => b.to_vec(),
            Err(e) => return text(StatusCode::BAD_REQUEST, format!("failed to read {name}: {e}")),
        };
        let slot = if name == state.mesh_field {
            &mut mesh
        } else if name == state.image_field {
            &mut image
        } else {
            tracing::debug!(field = %name, "ignoring unknown part");
            continue;
        };
        *slot = Some(Upload { file_name, bytes });
    }

    let Some(mesh) = mesh else {
        return text(StatusCode::BAD_REQUEST, format!("missing '{}' part", state.mesh_field));
    };
    let Some(image) = image else {
        return text(StatusCode::BAD_REQUEST, format!("missing '{}' part", state.image_field));
    };
    tracing::info!(
        mesh = %mesh.file_name,
        mesh_bytes = mesh.bytes.len(),
        image = %image.file_name,
        mode = ?state.mode,
        "upload received"
    );

    if let StubMode::Fail { status, body } = &state.mode {
        let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return text(status, body.clone());
    }

    let (head_stl, head) = match head_mesh(&mesh) {
        Ok(h) => h,
        Err(e) => return text(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
    };
    let Some(bounds) = head.bounds() else {
        return text(StatusCode::UNPROCESSABLE_ENTITY, "head mesh has no vertices");
    };
    let electrode_stl = to_binary_stl(&electrodes(&bounds), "ezg-stub electrodes");

    let entries = match state.mode {
        StubMode::Fallback => vec![
            ("readme.txt", b"generated by ezg-stub\n".to_vec()),
            ("model_a.stl", head_stl),
            ("model_b.stl", electrode_stl),
        ],
        StubMode::NoMeshes => vec![("photo.png", image.bytes)],
        _ => vec![("person.stl", head_stl), ("electrode.stl", electrode_stl)],
    };
    match build_zip(&entries) {
        Ok(zip) => (
            [
                (header::CONTENT_TYPE, "application/zip"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"result.zip\""),
            ],
            zip,
        )
            .into_response(),
        Err(e) => text(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// The head mesh as binary STL bytes plus its decoded geometry.
fn head_mesh(upload: &Upload) -> ezg_core::Result<(Vec<u8>, TriMesh)> {
    match MeshFormat::from_name(&upload.file_name) {
        Some(MeshFormat::Glb) => {
            let mesh = decode_glb(&upload.bytes)?;
            Ok((to_binary_stl(&mesh, "ezg-stub head"), mesh))
        }
        _ => {
            let mesh = decode_stl(&upload.bytes)?;
            Ok((upload.bytes.clone(), mesh))
        }
    }
}

// (polar angle from +Y, azimuth from +Z) in degrees, roughly the 10-20 layout.
const ELECTRODE_SITES: [(f32, f32); 19] = [
    (0.0, 0.0),
    (45.0, 0.0),
    (45.0, 180.0),
    (45.0, 90.0),
    (45.0, -90.0),
    (50.0, 40.0),
    (50.0, -40.0),
    (50.0, 140.0),
    (50.0, -140.0),
    (72.0, 18.0),
    (72.0, -18.0),
    (72.0, 162.0),
    (72.0, -162.0),
    (72.0, 54.0),
    (72.0, -54.0),
    (72.0, 126.0),
    (72.0, -126.0),
    (72.0, 90.0),
    (72.0, -90.0),
];

pub fn electrode_positions(bounds: &Aabb) -> Vec<Vec3> {
    let half = bounds.size() * 0.5;
    let center = bounds.center();
    ELECTRODE_SITES
        .iter()
        .map(|&(polar, azimuth)| {
            let (sp, cp) = polar.to_radians().sin_cos();
            let (sa, ca) = azimuth.to_radians().sin_cos();
            center + half * Vec3::new(sp * sa, cp, sp * ca)
        })
        .collect()
}

pub fn electrodes(bounds: &Aabb) -> TriMesh {
    let r = bounds.max_extent() * 0.015;
    let mut mesh = TriMesh::with_capacity(ELECTRODE_SITES.len() * 12, ELECTRODE_SITES.len() * 4);
    for p in electrode_positions(bounds) {
        let [a, b, c, d] = [
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(-1.0, -1.0, 1.0),
        ]
        .map(|v| p + v * r);
        mesh.push_triangle(a, b, c);
        mesh.push_triangle(a, d, b);
        mesh.push_triangle(a, c, d);
        mesh.push_triangle(b, d, c);
    }
    mesh
}

fn build_zip(entries: &[(&str, Vec<u8>)]) -> zip::result::ZipResult<Vec<u8>> {
    let mut w = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        w.start_file(*name, SimpleFileOptions::default())?;
        w.write_all(data)?;
    }
    Ok(w.finish()?.into_inner())
}
