use crate::domain::{ArchivePayload, ProcessingRequest};
use crate::error::Result;

/// Remote step of the pipeline: one request in, one archive out.
///
/// Implementations make a single attempt; retrying is the caller's decision.
#[allow(async_fn_in_trait)]
pub trait RemoteProcessor {
    async fn process(&self, request: &ProcessingRequest) -> Result<ArchivePayload>;
}
