#![forbid(unsafe_code)]

pub mod config;
pub mod domain;
pub mod error;
pub mod validate;

pub mod mesh {
    pub mod export;
    pub mod glb;
    pub mod stl;
    pub mod trimesh;
}

pub mod remote {
    pub mod client;
    pub mod http;
}

pub mod read {
    pub mod extract;
}

pub mod list;

pub mod store {
    pub mod blob;
    pub mod results;
}

pub mod viewer {
    pub mod camera;
    pub mod scene;
}

pub mod wizard {
    pub mod controller;
    pub mod surface;
}

pub mod download;

// Re-exports: stable API surface
pub use config::PipelineConfig;
pub use domain::{ArchivePayload, MeshFormat, ProcessingRequest, Role, Slot, UploadedFile};
pub use download::export_models;
pub use error::{EzgError, Result};
pub use list::list;
pub use read::extract::extract_meshes;
pub use remote::client::RemoteProcessor;
pub use remote::http::HttpProcessor;
pub use store::results::ModelResultStore;
pub use viewer::scene::{MeshViewer, ViewerOptions, ViewerReport, ViewerStatus};
pub use wizard::controller::{WizardController, WizardState};
pub use wizard::surface::{TracingSurface, UiSurface, WizardEvent};
