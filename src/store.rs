//! In-memory [`CatalogStore`] and [`RegistrationStore`] implementations.
//!
//! Backed by `HashMap`s behind `std::sync::RwLock`. Used by the CLI and the
//! tests; a persistent deployment plugs its own store in through the same
//! traits.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::model::{Catalog, Registration};
use crate::traits::{CatalogStore, RegistrationStore, StoreError};

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, StoreError> {
    lock.read()
        .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, StoreError> {
    lock.write()
        .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
}

// ============================================================================
// Catalogs
// ============================================================================

/// Catalogs keyed by owner id.
#[derive(Default)]
pub struct InMemoryCatalogStore {
    catalogs: RwLock<HashMap<String, Catalog>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn find_by_owner(&self, owner_id: &str) -> Result<Option<Catalog>, StoreError> {
        Ok(read(&self.catalogs)?.get(owner_id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Catalog>, StoreError> {
        let mut all: Vec<Catalog> = read(&self.catalogs)?.values().cloned().collect();
        all.sort_by(|a, b| a.owner_id.cmp(&b.owner_id));
        Ok(all)
    }

    async fn save(&self, catalog: Catalog) -> Result<Catalog, StoreError> {
        write(&self.catalogs)?.insert(catalog.owner_id.clone(), catalog.clone());
        Ok(catalog)
    }

    async fn delete(&self, catalog: &Catalog) -> Result<(), StoreError> {
        write(&self.catalogs)?.remove(&catalog.owner_id);
        Ok(())
    }
}

// ============================================================================
// Registrations
// ============================================================================

/// Registrations keyed by `(owner_id, spec_uri)`.
#[derive(Default)]
pub struct InMemoryRegistrationStore {
    registrations: RwLock<HashMap<(String, String), Registration>>,
}

impl InMemoryRegistrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.registrations.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every registration, ordered by owner then URI.
    pub fn all(&self) -> Vec<Registration> {
        let mut all: Vec<Registration> = self
            .registrations
            .read()
            .map(|r| r.values().cloned().collect())
            .unwrap_or_default();
        all.sort_by(|a, b| (&a.owner_id, &a.spec_uri).cmp(&(&b.owner_id, &b.spec_uri)));
        all
    }
}

#[async_trait]
impl RegistrationStore for InMemoryRegistrationStore {
    async fn find_by_owner_and_spec_uri(
        &self,
        owner_id: &str,
        spec_uri: &str,
    ) -> Result<Option<Registration>, StoreError> {
        let key = (owner_id.to_string(), spec_uri.to_string());
        Ok(read(&self.registrations)?.get(&key).cloned())
    }

    async fn save(&self, registration: Registration) -> Result<Registration, StoreError> {
        let key = (registration.owner_id.clone(), registration.spec_uri.clone());
        write(&self.registrations)?.insert(key, registration.clone());
        Ok(registration)
    }
}
