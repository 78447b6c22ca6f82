use std::time::Duration;

use reqwest::multipart::{Form, Part};

use crate::config::PipelineConfig;
use crate::domain::{ArchivePayload, ProcessingRequest, UploadedFile};
use crate::error::{EzgError, Result};
use crate::remote::client::RemoteProcessor;

/// Multipart upload to `<endpoint>/upload`.
#[derive(Clone, Debug)]
pub struct HttpProcessor {
    client: reqwest::Client,
    url: String,
    mesh_field: String,
    image_field: String,
}

impl HttpProcessor {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EzgError::Config(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: config.upload_url(),
            mesh_field: config.mesh_field.clone(),
            image_field: config.image_field.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn part(file: &UploadedFile) -> Result<Part> {
    Part::bytes(file.content.clone())
        .file_name(file.name.clone())
        .mime_str(&file.mime)
        .map_err(|e| EzgError::Format(format!("bad media type {:?}: {e}", file.mime)))
}

impl RemoteProcessor for HttpProcessor {
    async fn process(&self, request: &ProcessingRequest) -> Result<ArchivePayload> {
        let form = Form::new()
            .part(self.mesh_field.clone(), part(request.mesh())?)
            .part(self.image_field.clone(), part(request.image())?);

        tracing::info!(
            url = %self.url,
            mesh = %request.mesh().name,
            image = %request.image().name,
            "submitting processing request"
        );
        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| EzgError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .ok()
                .map(|body| body.trim().to_string())
                .filter(|body| !body.is_empty());
            tracing::warn!(status = status.as_u16(), ?message, "processing request failed");
            return Err(EzgError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| EzgError::Body(e.to_string()))?;
        tracing::info!(bytes = body.len(), "archive received");
        Ok(ArchivePayload::new(body.to_vec()))
    }
}
