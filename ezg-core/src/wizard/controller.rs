use std::collections::BTreeMap;

use crate::domain::{MeshFormat, ProcessingRequest, Role, Slot, UploadedFile};
use crate::error::{EzgError, Result};
use crate::read::extract::extract_meshes;
use crate::remote::client::RemoteProcessor;
use crate::store::results::ModelResultStore;
use crate::validate::{accept_image, accept_mesh};
use crate::viewer::scene::{MeshViewer, ViewerOptions};
use crate::wizard::surface::{UiSurface, WizardEvent};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Submitting,
    ExtractingArchive,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WizardFailure {
    pub stage: Stage,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WizardState {
    AwaitingInputs,
    Submitting,
    ExtractingArchive,
    Ready,
    Error(WizardFailure),
}

impl WizardState {
    /// A request or its extraction is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, WizardState::Submitting | WizardState::ExtractingArchive)
    }

    pub fn name(&self) -> &'static str {
        match self {
            WizardState::AwaitingInputs => "awaiting inputs",
            WizardState::Submitting => "submitting",
            WizardState::ExtractingArchive => "extracting archive",
            WizardState::Ready => "ready",
            WizardState::Error(_) => "in error",
        }
    }
}

/// Drives collect → validate → submit → extract → store.
///
/// Nothing is retried; after an error the inputs are kept and the user
/// submits again. If a `submit` future is dropped mid-flight, call
/// [`WizardController::abandon`] before reusing the controller.
pub struct WizardController<S> {
    accepted: Vec<MeshFormat>,
    image: Option<UploadedFile>,
    mesh: Option<(UploadedFile, MeshFormat)>,
    slot_errors: BTreeMap<Slot, String>,
    state: WizardState,
    store: ModelResultStore,
    surface: S,
}

impl<S: UiSurface> WizardController<S> {
    pub fn new(accepted: Vec<MeshFormat>, surface: S) -> Self {
        Self {
            accepted,
            image: None,
            mesh: None,
            slot_errors: BTreeMap::new(),
            state: WizardState::AwaitingInputs,
            store: ModelResultStore::new(),
            surface,
        }
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    fn transition(&mut self, next: WizardState) {
        tracing::debug!(from = self.state.name(), to = next.name(), "wizard transition");
        self.state = next.clone();
        self.surface.report(WizardEvent::StateChanged(next));
    }

    fn fail(&mut self, stage: Stage, err: EzgError) -> EzgError {
        self.transition(WizardState::Error(WizardFailure {
            stage,
            message: err.to_string(),
        }));
        err
    }

    fn guard_inputs(&mut self) -> Result<()> {
        if self.state.is_busy() {
            self.surface
                .report(WizardEvent::Notice("inputs are locked while processing".into()));
            return Err(EzgError::Busy);
        }
        Ok(())
    }

    fn slot_result<T>(&mut self, slot: Slot, name: &str, r: Result<T>) -> Result<T> {
        match &r {
            Ok(_) => {
                self.slot_errors.remove(&slot);
                self.surface.report(WizardEvent::SlotAccepted {
                    slot,
                    name: name.to_string(),
                });
            }
            Err(EzgError::Rejected { reason, .. }) => {
                self.slot_errors.insert(slot, reason.clone());
                self.surface.report(WizardEvent::SlotRejected {
                    slot,
                    reason: reason.clone(),
                });
            }
            Err(_) => {}
        }
        r
    }

    /// A rejected file is never stored; a previously accepted one stays.
    pub fn select_image(&mut self, file: UploadedFile) -> Result<()> {
        self.guard_inputs()?;
        let r = accept_image(&file);
        self.slot_result(Slot::Image, &file.name, r)?;
        self.image = Some(file);
        Ok(())
    }

    pub fn select_mesh(&mut self, file: UploadedFile) -> Result<MeshFormat> {
        self.guard_inputs()?;
        let r = accept_mesh(&file, &self.accepted);
        let format = self.slot_result(Slot::Mesh, &file.name, r)?;
        self.mesh = Some((file, format));
        Ok(format)
    }

    pub fn clear_slot(&mut self, slot: Slot) -> Result<()> {
        self.guard_inputs()?;
        match slot {
            Slot::Image => self.image = None,
            Slot::Mesh => self.mesh = None,
        }
        self.slot_errors.remove(&slot);
        Ok(())
    }

    pub fn has_input(&self, slot: Slot) -> bool {
        match slot {
            Slot::Image => self.image.is_some(),
            Slot::Mesh => self.mesh.is_some(),
        }
    }

    pub fn slot_error(&self, slot: Slot) -> Option<&str> {
        self.slot_errors.get(&slot).map(String::as_str)
    }

    pub fn can_submit(&self) -> bool {
        matches!(
            self.state,
            WizardState::AwaitingInputs | WizardState::Error(_)
        ) && self.image.is_some()
            && self.mesh.is_some()
    }

    pub async fn submit<P: RemoteProcessor>(&mut self, processor: &P) -> Result<()> {
        match self.state {
            WizardState::AwaitingInputs => {}
            WizardState::Error(_) => self.dismiss_error(),
            WizardState::Submitting | WizardState::ExtractingArchive => return Err(EzgError::Busy),
            WizardState::Ready => return Err(EzgError::InvalidTransition(self.state.name())),
        }
        let request = match ProcessingRequest::new(self.image.clone(), self.mesh.clone()) {
            Ok(r) => r,
            Err(e) => {
                self.surface.report(WizardEvent::Notice(e.to_string()));
                return Err(e);
            }
        };

        self.transition(WizardState::Submitting);
        let payload = match processor.process(&request).await {
            Ok(p) => p,
            Err(e) => return Err(self.fail(Stage::Submitting, e)),
        };
        drop(request);

        self.transition(WizardState::ExtractingArchive);
        let meshes = match extract_meshes(&payload) {
            Ok(m) => m,
            Err(e) => return Err(self.fail(Stage::ExtractingArchive, e)),
        };
        drop(payload);

        self.store.put_bytes(Role::Head, meshes.head.bytes);
        self.store.put_bytes(Role::Electrode, meshes.electrode.bytes);
        self.transition(WizardState::Ready);
        Ok(())
    }

    /// Error → AwaitingInputs, keeping the selected files.
    pub fn dismiss_error(&mut self) {
        if matches!(self.state, WizardState::Error(_)) {
            self.transition(WizardState::AwaitingInputs);
        }
    }

    /// Back to the input step from a finished or failed run.
    pub fn restart(&mut self) {
        if matches!(self.state, WizardState::Ready | WizardState::Error(_)) {
            self.transition(WizardState::AwaitingInputs);
        }
    }

    /// The user navigated away. Anything still arriving for the old run is
    /// dropped with its future; the wizard unlocks.
    pub fn abandon(&mut self) {
        if self.state.is_busy() {
            tracing::info!(state = self.state.name(), "in-flight submission abandoned");
            self.transition(WizardState::AwaitingInputs);
        }
    }

    pub fn store(&self) -> &ModelResultStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ModelResultStore {
        &mut self.store
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn mount_viewer(&self, options: ViewerOptions) -> MeshViewer {
        MeshViewer::mount_results(&self.store, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ArchivePayload;
    use crate::mesh::export::to_binary_stl;
    use crate::mesh::trimesh::TriMesh;
    use crate::viewer::scene::ViewerStatus;
    use glam::Vec3;
    use std::cell::Cell;
    use std::future::Future;
    use std::io::{Cursor, Write};
    use std::pin::pin;
    use std::task::{Context, Poll, Waker};
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    enum Reply {
        Archive(Vec<(&'static str, Vec<u8>)>),
        Fail(u16, &'static str),
    }

    struct Canned {
        reply: Reply,
        calls: Cell<usize>,
    }

    impl Canned {
        fn new(reply: Reply) -> Self {
            Self {
                reply,
                calls: Cell::new(0),
            }
        }
    }

    impl RemoteProcessor for Canned {
        async fn process(&self, _request: &ProcessingRequest) -> Result<ArchivePayload> {
            self.calls.set(self.calls.get() + 1);
            match &self.reply {
                Reply::Archive(entries) => {
                    let mut w = ZipWriter::new(Cursor::new(Vec::new()));
                    for (name, data) in entries {
                        w.start_file(*name, SimpleFileOptions::default()).unwrap();
                        w.write_all(data).unwrap();
                    }
                    Ok(ArchivePayload::new(w.finish().unwrap().into_inner()))
                }
                Reply::Fail(status, body) => Err(EzgError::Status {
                    status: *status,
                    message: Some(body.to_string()),
                }),
            }
        }
    }

    fn tri_stl() -> Vec<u8> {
        let mut m = TriMesh::new();
        m.push_triangle(Vec3::ZERO, Vec3::X, Vec3::Y);
        to_binary_stl(&m, "")
    }

    fn png() -> UploadedFile {
        UploadedFile::new("face.png", "image/png", vec![0x89, b'P', b'N', b'G'])
    }

    fn stl() -> UploadedFile {
        UploadedFile::new("head.stl", "model/stl", tri_stl())
    }

    fn wizard() -> WizardController<Vec<WizardEvent>> {
        WizardController::new(MeshFormat::ALL.to_vec(), Vec::new())
    }

    // Canned processors never suspend, so a no-op waker is enough.
    fn block_on<F: Future>(f: F) -> F::Output {
        let mut f = pin!(f);
        let mut cx = Context::from_waker(Waker::noop());
        loop {
            if let Poll::Ready(v) = f.as_mut().poll(&mut cx) {
                return v;
            }
        }
    }

    #[test]
    fn cannot_submit_with_an_empty_slot() {
        let mut w = wizard();
        let canned = Canned::new(Reply::Fail(500, "unused"));
        assert!(!w.can_submit());

        let err = block_on(w.submit(&canned)).unwrap_err();
        assert!(matches!(err, EzgError::MissingInput(Slot::Image)));

        w.select_image(png()).unwrap();
        assert!(!w.can_submit());
        let err = block_on(w.submit(&canned)).unwrap_err();
        assert!(matches!(err, EzgError::MissingInput(Slot::Mesh)));

        assert_eq!(canned.calls.get(), 0);
        assert_eq!(w.state(), &WizardState::AwaitingInputs);
    }

    #[test]
    fn rejected_files_block_submission_and_show_inline() {
        let mut w = wizard();
        let err = w
            .select_image(UploadedFile::new("face.jpg", "image/jpeg", vec![1]))
            .unwrap_err();
        assert!(matches!(err, EzgError::Rejected { slot: Slot::Image, .. }));
        assert_eq!(w.slot_error(Slot::Image), Some("expected PNG"));
        assert!(!w.has_input(Slot::Image));

        w.select_mesh(UploadedFile::new("head.obj", "", vec![1])).unwrap_err();
        assert_eq!(w.slot_error(Slot::Mesh), Some("expected .stl or .glb"));
        assert!(!w.can_submit());

        w.select_image(png()).unwrap();
        assert_eq!(w.slot_error(Slot::Image), None);
        assert!(w.surface().contains(&WizardEvent::SlotRejected {
            slot: Slot::Mesh,
            reason: "expected .stl or .glb".into()
        }));
    }

    #[test]
    fn accepted_formats_follow_the_variant() {
        let mut w = WizardController::new(vec![MeshFormat::Glb], Vec::<WizardEvent>::new());
        assert!(w.select_mesh(stl()).is_err());
        let fmt = w
            .select_mesh(UploadedFile::new("scan.GLB", "", vec![1]))
            .unwrap();
        assert_eq!(fmt, MeshFormat::Glb);
    }

    #[test]
    fn happy_path_reaches_ready_with_two_references() {
        let mut w = wizard();
        w.select_image(png()).unwrap();
        w.select_mesh(stl()).unwrap();
        assert!(w.can_submit());

        let canned = Canned::new(Reply::Archive(vec![
            ("person.stl", tri_stl()),
            ("electrode.stl", tri_stl()),
        ]));
        block_on(w.submit(&canned)).unwrap();

        assert_eq!(w.state(), &WizardState::Ready);
        assert!(!w.can_submit());
        assert_eq!(w.store().entries().len(), 2);

        let viewer = w.mount_viewer(ViewerOptions::default());
        assert_eq!(viewer.status(), ViewerStatus::Loaded(2));
        assert!(viewer.meshes().iter().all(|m| m.visible));

        let states: Vec<_> = w
            .surface()
            .iter()
            .filter_map(|e| match e {
                WizardEvent::StateChanged(s) => Some(s.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(
            states,
            vec![
                WizardState::Submitting,
                WizardState::ExtractingArchive,
                WizardState::Ready
            ]
        );
    }

    #[test]
    fn server_error_is_recoverable() {
        let mut w = wizard();
        w.select_image(png()).unwrap();
        w.select_mesh(stl()).unwrap();

        let failing = Canned::new(Reply::Fail(500, "server overloaded"));
        block_on(w.submit(&failing)).unwrap_err();
        match w.state() {
            WizardState::Error(f) => {
                assert_eq!(f.stage, Stage::Submitting);
                assert!(f.message.contains("server overloaded"), "{}", f.message);
            }
            other => panic!("unexpected state {other:?}"),
        }
        assert!(w.can_submit());

        let ok = Canned::new(Reply::Archive(vec![
            ("model_a.stl", tri_stl()),
            ("model_b.stl", tri_stl()),
        ]));
        block_on(w.submit(&ok)).unwrap();
        assert_eq!(w.state(), &WizardState::Ready);
    }

    #[test]
    fn unresolved_archive_fails_in_extraction() {
        let mut w = wizard();
        w.select_image(png()).unwrap();
        w.select_mesh(stl()).unwrap();

        let canned = Canned::new(Reply::Archive(vec![("photo.png", vec![1, 2])]));
        block_on(w.submit(&canned)).unwrap_err();
        match w.state() {
            WizardState::Error(f) => {
                assert_eq!(f.stage, Stage::ExtractingArchive);
                assert!(f.message.contains("photo.png"));
            }
            other => panic!("unexpected state {other:?}"),
        }
        assert!(w.store().entries().is_empty());
        assert_eq!(w.store().blobs().live_count(), 0);
    }

    #[test]
    fn second_run_replaces_previous_references() {
        let mut w = wizard();
        w.select_image(png()).unwrap();
        w.select_mesh(stl()).unwrap();
        let canned = Canned::new(Reply::Archive(vec![
            ("person.stl", tri_stl()),
            ("electrode.stl", tri_stl()),
        ]));
        block_on(w.submit(&canned)).unwrap();
        let first = w.store().entries();

        assert!(matches!(
            block_on(w.submit(&canned)),
            Err(EzgError::InvalidTransition("ready"))
        ));
        w.restart();
        block_on(w.submit(&canned)).unwrap();

        let second = w.store().entries();
        assert_ne!(first, second);
        assert_eq!(w.store().blobs().live_count(), 2);
    }

    #[test]
    fn clearing_a_slot_drops_its_input_and_error() {
        let mut w = wizard();
        w.select_image(png()).unwrap();
        w.select_mesh(UploadedFile::new("head.obj", "", vec![1])).unwrap_err();
        assert!(w.slot_error(Slot::Mesh).is_some());

        w.clear_slot(Slot::Mesh).unwrap();
        assert_eq!(w.slot_error(Slot::Mesh), None);
        w.clear_slot(Slot::Image).unwrap();
        assert!(!w.has_input(Slot::Image));
        assert!(!w.can_submit());
    }

    #[test]
    fn clearing_a_slot_is_refused_while_submitting() {
        let mut w = wizard();
        w.select_image(png()).unwrap();
        w.select_mesh(stl()).unwrap();
        w.transition(WizardState::Submitting);

        assert!(matches!(w.clear_slot(Slot::Mesh), Err(EzgError::Busy)));
        assert!(w.has_input(Slot::Mesh));
    }

    #[test]
    fn abandon_unlocks_a_dropped_submission() {
        let mut w = wizard();
        w.select_image(png()).unwrap();
        w.select_mesh(stl()).unwrap();
        w.transition(WizardState::Submitting);

        assert!(matches!(w.select_image(png()), Err(EzgError::Busy)));
        let canned = Canned::new(Reply::Fail(500, "unused"));
        assert!(matches!(block_on(w.submit(&canned)), Err(EzgError::Busy)));

        w.abandon();
        assert_eq!(w.state(), &WizardState::AwaitingInputs);
        assert!(w.can_submit());
    }
}
