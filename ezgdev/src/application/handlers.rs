use std::fs;
use std::path::{Path, PathBuf};

use ezg_core::domain::ExpectedKind;
use ezg_core::error::{EzgError, Result};
use ezg_core::mesh::glb::glb_to_stl;
use ezg_core::validate::{Verdict, validate};
use ezg_core::{
    ArchivePayload, HttpProcessor, MeshFormat, MeshViewer, ModelResultStore, PipelineConfig, Role,
    Slot, TracingSurface, UploadedFile, ViewerOptions, ViewerReport, ViewerStatus,
    WizardController, export_models, extract_meshes, list,
};

use crate::presentation::cli::{KindArg, RoleArg};

fn expected_kind(kind: KindArg) -> ExpectedKind {
    match kind {
        KindArg::Png => ExpectedKind::Png,
        KindArg::Stl => ExpectedKind::Mesh(MeshFormat::Stl),
        KindArg::Glb => ExpectedKind::Mesh(MeshFormat::Glb),
    }
}

fn role(arg: RoleArg) -> Role {
    match arg {
        RoleArg::Head => Role::Head,
        RoleArg::Electrode => Role::Electrode,
    }
}

pub fn handle_validate(file: PathBuf, kind: KindArg, mime: Option<String>) -> Result<()> {
    let upload = UploadedFile::from_path(&file, mime.as_deref())?;
    let expected = expected_kind(kind);
    match validate(&upload, expected) {
        Verdict::Accept => {
            println!("{}: accepted as {expected}", upload.name);
            Ok(())
        }
        Verdict::Reject(reason) => Err(EzgError::Rejected {
            slot: match expected {
                ExpectedKind::Png => Slot::Image,
                ExpectedKind::Mesh(_) => Slot::Mesh,
            },
            reason,
        }),
    }
}

/// Runs the wizard against `config`, exporting into `out` when given.
/// Returns the viewer report and the written paths.
fn submit(
    config: &PipelineConfig,
    image: &Path,
    mesh: &Path,
    out: Option<&Path>,
) -> Result<(ViewerReport, Vec<PathBuf>)> {
    let processor = HttpProcessor::new(config)?;
    let mut wizard = WizardController::new(config.accepted_meshes.clone(), TracingSurface);
    wizard.select_image(UploadedFile::from_path(image, None)?)?;
    wizard.select_mesh(UploadedFile::from_path(mesh, None)?)?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(wizard.submit(&processor))?;

    let viewer = wizard.mount_viewer(ViewerOptions {
        target_extent: config.target_extent,
    });
    let report = viewer.report();
    let written = match out {
        Some(dir) => export_models(wizard.store(), dir)?,
        None => Vec::new(),
    };
    viewer.unmount(wizard.store_mut());
    Ok((report, written))
}

pub fn handle_submit(
    image: PathBuf,
    mesh: PathBuf,
    endpoint: Option<String>,
    config: Option<PathBuf>,
    out: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let mut cfg = PipelineConfig::load(config.as_deref())?;
    if let Some(endpoint) = endpoint {
        cfg.endpoint = endpoint;
        cfg.validate()?;
    }
    let (report, written) = submit(&cfg, &image, &mesh, out.as_deref())?;
    for p in &written {
        eprintln!("wrote {}", p.display());
    }
    print_report(&report, json)
}

fn read_archive(archive: &Path) -> Result<ArchivePayload> {
    Ok(ArchivePayload::new(fs::read(archive)?))
}

pub fn handle_extract(archive: PathBuf, dest: PathBuf) -> Result<()> {
    let meshes = extract_meshes(&read_archive(&archive)?)?;
    let mut store = ModelResultStore::new();
    eprintln!("head: {}", meshes.head.name);
    eprintln!("electrode: {}", meshes.electrode.name);
    store.put_bytes(Role::Head, meshes.head.bytes);
    store.put_bytes(Role::Electrode, meshes.electrode.bytes);
    for p in export_models(&store, &dest)? {
        println!("{}", p.display());
    }
    Ok(())
}

pub fn handle_list(archive: PathBuf) -> Result<()> {
    for name in list(read_archive(&archive)?.as_bytes())? {
        println!("{name}");
    }
    Ok(())
}

fn load_file(viewer: &mut MeshViewer, role: Role, file: &Path) -> Result<()> {
    let name = file.display().to_string();
    let format = MeshFormat::from_name(&name)
        .ok_or_else(|| EzgError::Format(format!("{name}: expected .stl or .glb")))?;
    viewer.load(role, format, &fs::read(file)?)
}

/// Loads each file under the next role. A file that fails is recorded on the
/// viewer and the rest still load.
fn view(files: &[PathBuf], hide: &[RoleArg], target_extent: f32) -> MeshViewer {
    let mut viewer = MeshViewer::new(ViewerOptions { target_extent });
    for (file, role) in files.iter().zip(Role::ALL) {
        if let Err(e) = load_file(&mut viewer, role, file) {
            viewer.record_error(role, e.to_string());
        }
    }
    for &r in hide {
        viewer.set_visible(role(r), false);
    }
    viewer
}

pub fn handle_view(
    files: Vec<PathBuf>,
    hide: Vec<RoleArg>,
    target_extent: f32,
    json: bool,
) -> Result<()> {
    let viewer = view(&files, &hide, target_extent);
    print_report(&viewer.report(), json)?;
    let cam = viewer.camera();
    eprintln!(
        "camera: target={:?} radius={:.3}",
        cam.target.to_array(),
        cam.radius
    );
    Ok(())
}

pub fn handle_convert(input: PathBuf, out: Option<PathBuf>) -> Result<()> {
    if !MeshFormat::Glb.matches_name(&input.display().to_string()) {
        return Err(EzgError::Format(format!(
            "{}: expected a .glb file",
            input.display()
        )));
    }
    let stl = glb_to_stl(&fs::read(&input)?)?;
    let out = out.unwrap_or_else(|| input.with_extension("stl"));
    fs::write(&out, &stl)?;
    eprintln!("convert: {} -> {} ({} bytes)", input.display(), out.display(), stl.len());
    Ok(())
}

/// Prints loaded meshes to stdout and load errors to stderr. Fails when
/// nothing could be shown.
fn print_report(report: &ViewerReport, json: bool) -> Result<()> {
    if json {
        let text = serde_json::to_string_pretty(report)
            .map_err(|e| EzgError::Format(format!("report: {e}")))?;
        println!("{text}");
    } else {
        print_rows(report);
    }
    match &report.status {
        ViewerStatus::Failed(reason) => Err(EzgError::Format(format!("nothing to show: {reason}"))),
        _ => Ok(()),
    }
}

fn print_rows(report: &ViewerReport) {
    for (role, reason) in &report.errors {
        eprintln!("{role}: {reason}");
    }
    for m in &report.meshes {
        println!(
            "{:<9} {:<3} tris={:<7} scale={:<8.4} visible={} color={:?} opacity={}",
            m.role.to_string(),
            m.format.to_string(),
            m.triangles,
            m.scale,
            m.visible,
            m.material.color,
            m.material.opacity
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ezg_core::mesh::export::to_binary_stl;
    use ezg_core::mesh::trimesh::TriMesh;
    use ezg_stub::StubMode;
    use glam::Vec3;
    use std::net::SocketAddr;

    fn tri() -> TriMesh {
        let mut m = TriMesh::new();
        m.push_triangle(Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0), Vec3::new(0.0, 8.0, 2.0));
        m
    }

    fn tri_glb() -> Vec<u8> {
        glb_fixtures::single_mesh(&[[0.0, 0.0, 0.0], [4.0, 0.0, 0.0], [0.0, 8.0, 2.0]], &[[0, 1, 2]])
    }

    // The handler owns its runtime, so the stub runs on a thread of its own.
    fn stub(mode: StubMode) -> SocketAddr {
        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async move {
                tx.send(ezg_stub::spawn(mode).await.unwrap()).unwrap();
                std::future::pending::<()>().await
            });
        });
        rx.recv().unwrap()
    }

    fn inputs(dir: &Path) -> (PathBuf, PathBuf) {
        let image = dir.join("face.png");
        let mesh = dir.join("head.stl");
        fs::write(&image, b"\x89PNG\r\n\x1a\n").unwrap();
        fs::write(&mesh, to_binary_stl(&tri(), "")).unwrap();
        (image, mesh)
    }

    fn config(addr: SocketAddr) -> PipelineConfig {
        PipelineConfig {
            endpoint: format!("http://{addr}"),
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn submit_loads_and_exports_both_meshes() {
        let dir = tempfile::tempdir().unwrap();
        let (image, mesh) = inputs(dir.path());
        let out = dir.path().join("out");

        let addr = stub(StubMode::Canonical);
        let (report, written) = submit(&config(addr), &image, &mesh, Some(&out)).unwrap();

        assert_eq!(report.status, ViewerStatus::Loaded(2));
        assert_eq!(report.meshes[0].role, Role::Head);
        assert!(report.meshes.iter().all(|m| m.visible));
        assert!(report.errors.is_empty());
        assert_eq!(written.len(), 3);
        assert_eq!(fs::read(out.join("head_model.stl")).unwrap(), fs::read(&mesh).unwrap());
    }

    #[test]
    fn submit_surfaces_server_message() {
        let dir = tempfile::tempdir().unwrap();
        let (image, mesh) = inputs(dir.path());
        let addr = stub(StubMode::Fail {
            status: 500,
            body: "server overloaded".into(),
        });
        let err = submit(&config(addr), &image, &mesh, None).unwrap_err();
        assert_eq!(err.to_string(), "server returned HTTP 500: server overloaded");
    }

    #[test]
    fn submit_rejects_wrong_image_type_before_uploading() {
        let dir = tempfile::tempdir().unwrap();
        let (_, mesh) = inputs(dir.path());
        let jpg = dir.path().join("face.jpg");
        fs::write(&jpg, b"jpeg").unwrap();
        // nothing listens here; validation fails first
        let cfg = config("127.0.0.1:9".parse().unwrap());
        let err = submit(&cfg, &jpg, &mesh, None).unwrap_err();
        assert!(matches!(err, EzgError::Rejected { slot: Slot::Image, .. }));
    }

    #[test]
    fn view_hides_requested_roles() {
        let dir = tempfile::tempdir().unwrap();
        let head = dir.path().join("head.glb");
        let electrode = dir.path().join("electrode.stl");
        fs::write(&head, tri_glb()).unwrap();
        fs::write(&electrode, to_binary_stl(&tri(), "")).unwrap();

        let viewer = view(&[head, electrode], &[RoleArg::Electrode], 2.0);
        assert_eq!(viewer.meshes().len(), 2);
        assert_eq!(viewer.mesh(Role::Head).unwrap().scale, 1.0);
        assert!(!viewer.mesh(Role::Electrode).unwrap().visible);
        assert_eq!(viewer.visible_meshes().count(), 1);
    }

    #[test]
    fn view_keeps_the_mesh_that_decodes() {
        let dir = tempfile::tempdir().unwrap();
        let head = dir.path().join("head.stl");
        let electrode = dir.path().join("electrode.stl");
        fs::write(&head, to_binary_stl(&tri(), "")).unwrap();
        fs::write(&electrode, b"garbage").unwrap();

        let viewer = view(&[head, electrode], &[], 2.0);
        assert_eq!(viewer.status(), ViewerStatus::Loaded(1));
        assert!(viewer.mesh(Role::Head).is_some());
        assert_eq!(viewer.errors().len(), 1);
        assert_eq!(viewer.errors()[0].0, Role::Electrode);
        assert!(print_report(&viewer.report(), true).is_ok());
    }

    #[test]
    fn view_with_nothing_loadable_fails_with_reason() {
        let dir = tempfile::tempdir().unwrap();
        let head = dir.path().join("head.obj");
        let electrode = dir.path().join("missing.stl");
        fs::write(&head, b"o").unwrap();

        let viewer = view(&[head, electrode], &[], 2.0);
        assert_eq!(viewer.errors().len(), 2);
        assert!(matches!(viewer.status(), ViewerStatus::Failed(_)));
        let err = print_report(&viewer.report(), false).unwrap_err();
        assert!(err.to_string().contains("expected .stl or .glb"), "{err}");
    }

    #[test]
    fn convert_defaults_to_sibling_stl() {
        let dir = tempfile::tempdir().unwrap();
        let glb = dir.path().join("scan.glb");
        fs::write(&glb, tri_glb()).unwrap();
        handle_convert(glb, None).unwrap();
        let stl = fs::read(dir.path().join("scan.stl")).unwrap();
        assert_eq!(stl.len(), 84 + 50);

        let stl_in = dir.path().join("scan.stl");
        assert!(matches!(handle_convert(stl_in, None), Err(EzgError::Format(_))));
    }

    #[test]
    fn validate_reports_slot() {
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("head.obj");
        fs::write(&f, b"o").unwrap();
        let err = handle_validate(f.clone(), KindArg::Stl, None).unwrap_err();
        assert_eq!(err.to_string(), "head model rejected: expected .stl");
        assert!(handle_validate(f, KindArg::Png, Some("image/png".into())).is_ok());
    }
}
