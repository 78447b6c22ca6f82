use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::Role;
use crate::store::blob::{BlobRegistry, ModelReference};

/// Role → reference table for the most recent result.
///
/// A role never holds two references: the previous one is revoked before the
/// new one is stored.
#[derive(Debug, Default)]
pub struct ModelResultStore {
    blobs: BlobRegistry,
    entries: BTreeMap<Role, ModelReference>,
}

impl ModelResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a reference for `bytes` without storing it under a role.
    pub fn mint(&mut self, bytes: Vec<u8>) -> ModelReference {
        self.blobs.create(bytes)
    }

    pub fn put(&mut self, role: Role, reference: ModelReference) {
        if let Some(prev) = self.entries.remove(&role) {
            if prev != reference {
                self.blobs.revoke(&prev);
            }
        }
        tracing::debug!(%role, url = %reference, "model reference stored");
        self.entries.insert(role, reference);
    }

    /// Mint and store in one step.
    pub fn put_bytes(&mut self, role: Role, bytes: Vec<u8>) -> ModelReference {
        let reference = self.mint(bytes);
        self.put(role, reference.clone());
        reference
    }

    pub fn get(&self, role: Role) -> Option<&ModelReference> {
        self.entries.get(&role)
    }

    pub fn resolve(&self, role: Role) -> Option<Arc<[u8]>> {
        self.get(role).and_then(|r| self.blobs.resolve(r))
    }

    pub fn resolve_reference(&self, reference: &ModelReference) -> Option<Arc<[u8]>> {
        self.blobs.resolve(reference)
    }

    /// Release an unstored reference, e.g. one minted for an aborted result.
    pub fn release(&mut self, reference: &ModelReference) -> bool {
        if self.entries.values().any(|r| r == reference) {
            return false;
        }
        self.blobs.revoke(reference)
    }

    pub fn clear(&mut self, role: Role) -> bool {
        match self.entries.remove(&role) {
            Some(prev) => {
                self.blobs.revoke(&prev);
                tracing::debug!(%role, "model reference cleared");
                true
            }
            None => false,
        }
    }

    pub fn clear_all(&mut self) {
        for role in Role::ALL {
            self.clear(role);
        }
    }

    /// The persisted layout: one named string entry per held reference.
    pub fn entries(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|(role, r)| (role.storage_key().to_string(), r.as_str().to_string()))
            .collect()
    }

    pub fn blobs(&self) -> &BlobRegistry {
        &self.blobs
    }
}
