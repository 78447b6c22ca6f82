use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

const SCHEME: &str = "blob:ezg/";

/// Dereferenceable handle to bytes held by a [`BlobRegistry`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ModelReference(String);

impl ModelReference {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// In-process analogue of object URLs: mint a handle for some bytes, resolve
/// it while live, revoke it when done. Handles are never reused.
#[derive(Debug, Default)]
pub struct BlobRegistry {
    blobs: HashMap<String, Arc<[u8]>>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, bytes: Vec<u8>) -> ModelReference {
        let url = format!("{SCHEME}{}", Uuid::new_v4());
        tracing::debug!(%url, len = bytes.len(), "blob created");
        self.blobs.insert(url.clone(), Arc::from(bytes));
        ModelReference(url)
    }

    pub fn resolve(&self, reference: &ModelReference) -> Option<Arc<[u8]>> {
        self.blobs.get(reference.as_str()).cloned()
    }

    /// Release the bytes behind `reference`; revoking twice is a no-op.
    pub fn revoke(&mut self, reference: &ModelReference) -> bool {
        let removed = self.blobs.remove(reference.as_str()).is_some();
        if removed {
            tracing::debug!(url = %reference, "blob revoked");
        }
        removed
    }

    pub fn is_live(&self, reference: &ModelReference) -> bool {
        self.blobs.contains_key(reference.as_str())
    }

    pub fn live_count(&self) -> usize {
        self.blobs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_resolve_revoke() {
        let mut reg = BlobRegistry::new();
        let a = reg.create(vec![1, 2, 3]);
        let b = reg.create(vec![1, 2, 3]);
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("blob:ezg/"));
        assert_eq!(&*reg.resolve(&a).unwrap(), &[1, 2, 3]);

        assert!(reg.revoke(&a));
        assert!(!reg.revoke(&a));
        assert!(reg.resolve(&a).is_none());
        assert!(reg.is_live(&b));
        assert_eq!(reg.live_count(), 1);
    }
}
