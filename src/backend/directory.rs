//! Backend directory.
//!
//! # Responsibilities
//! - Publish the authoritative list of configured backends
//! - Filter backends by routing group and active flag
//! - Replace the whole list atomically on config reload
//! - Add, update and remove single backends from the admin API

use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;

use crate::backend::descriptor::{normalize_address, BackendDescriptor};
use crate::config::BackendConfig;
use crate::error::DirectoryError;
use crate::routing::ADHOC;

/// Read access to configured backends.
#[async_trait]
pub trait BackendDirectory: Send + Sync {
    /// All configured backends, active or not.
    async fn get_all_backends(&self) -> Result<Vec<BackendDescriptor>, DirectoryError>;

    /// Active backends in `routing_group`.
    async fn get_active_backends(
        &self,
        routing_group: &str,
    ) -> Result<Vec<BackendDescriptor>, DirectoryError> {
        Ok(self
            .get_all_backends()
            .await?
            .into_iter()
            .filter(|b| b.active && b.routing_group == routing_group)
            .collect())
    }

    /// Active backends in the default routing group.
    async fn get_active_adhoc_backends(&self) -> Result<Vec<BackendDescriptor>, DirectoryError> {
        self.get_active_backends(ADHOC).await
    }

    /// Active backends across all routing groups.
    async fn get_all_active_backends(&self) -> Result<Vec<BackendDescriptor>, DirectoryError> {
        Ok(self
            .get_all_backends()
            .await?
            .into_iter()
            .filter(|b| b.active)
            .collect())
    }
}

/// Backend directory held in memory and seeded from configuration.
#[derive(Debug)]
pub struct InMemoryBackendDirectory {
    backends: ArcSwap<Vec<BackendDescriptor>>,
}

impl InMemoryBackendDirectory {
    pub fn new(backends: Vec<BackendDescriptor>) -> Self {
        Self {
            backends: ArcSwap::from_pointee(backends),
        }
    }

    /// Build a directory from backend configuration entries.
    pub fn from_config(configs: &[BackendConfig]) -> Self {
        Self::new(configs.iter().map(BackendDescriptor::from).collect())
    }

    /// Replace every backend at once (config reload).
    pub fn replace_all(&self, backends: Vec<BackendDescriptor>) {
        tracing::info!(count = backends.len(), "Backend directory replaced");
        self.backends.store(Arc::new(backends));
    }

    /// Mark a backend as taking traffic.
    pub fn activate_backend(&self, name: &str) -> Result<(), DirectoryError> {
        self.set_active(name, true)
    }

    /// Take a backend out of rotation.
    pub fn deactivate_backend(&self, name: &str) -> Result<(), DirectoryError> {
        self.set_active(name, false)
    }

    /// Register a new backend. Names are unique.
    pub fn add_backend(&self, backend: BackendDescriptor) -> Result<BackendDescriptor, DirectoryError> {
        let backend = normalized(backend)?;
        self.modify(|backends| {
            if backends.iter().any(|b| b.name == backend.name) {
                return Err(DirectoryError::DuplicateBackend(backend.name.clone()));
            }
            let mut next = backends.to_vec();
            next.push(backend.clone());
            Ok(next)
        })?;
        tracing::info!(
            backend = %backend.name,
            address = %backend.address,
            group = %backend.routing_group,
            "Backend added"
        );
        Ok(backend)
    }

    /// Replace the backend that has the same name as `backend`.
    pub fn update_backend(
        &self,
        backend: BackendDescriptor,
    ) -> Result<BackendDescriptor, DirectoryError> {
        let backend = normalized(backend)?;
        self.modify(|backends| {
            let position = backends
                .iter()
                .position(|b| b.name == backend.name)
                .ok_or_else(|| DirectoryError::BackendNotFound(backend.name.clone()))?;
            let mut next = backends.to_vec();
            next[position] = backend.clone();
            Ok(next)
        })?;
        tracing::info!(
            backend = %backend.name,
            address = %backend.address,
            group = %backend.routing_group,
            active = backend.active,
            "Backend updated"
        );
        Ok(backend)
    }

    /// Drop a backend from the directory.
    pub fn remove_backend(&self, name: &str) -> Result<(), DirectoryError> {
        self.modify(|backends| {
            if !backends.iter().any(|b| b.name == name) {
                return Err(DirectoryError::BackendNotFound(name.to_string()));
            }
            Ok(backends.iter().filter(|b| b.name != name).cloned().collect())
        })?;
        tracing::info!(backend = %name, "Backend removed");
        Ok(())
    }

    fn set_active(&self, name: &str, active: bool) -> Result<(), DirectoryError> {
        self.modify(|backends| {
            if !backends.iter().any(|b| b.name == name) {
                return Err(DirectoryError::BackendNotFound(name.to_string()));
            }
            Ok(backends
                .iter()
                .map(|b| {
                    let mut b = b.clone();
                    if b.name == name {
                        b.active = active;
                    }
                    b
                })
                .collect())
        })?;
        tracing::info!(backend = %name, active, "Backend state changed");
        Ok(())
    }

    /// Apply `change` to the current list and swap the result in. `change` is
    /// re-run against the newer list if another edit lands first.
    fn modify<F>(&self, change: F) -> Result<(), DirectoryError>
    where
        F: Fn(&[BackendDescriptor]) -> Result<Vec<BackendDescriptor>, DirectoryError>,
    {
        let mut outcome = Ok(());
        self.backends.rcu(|current| match change(current) {
            Ok(next) => {
                outcome = Ok(());
                Arc::new(next)
            }
            Err(e) => {
                outcome = Err(e);
                Arc::clone(current)
            }
        });
        outcome
    }
}

fn normalized(mut backend: BackendDescriptor) -> Result<BackendDescriptor, DirectoryError> {
    backend.address = normalize_address(&backend.address)
        .ok_or_else(|| DirectoryError::InvalidAddress(backend.address.clone()))?;
    Ok(backend)
}

#[async_trait]
impl BackendDirectory for InMemoryBackendDirectory {
    async fn get_all_backends(&self) -> Result<Vec<BackendDescriptor>, DirectoryError> {
        Ok(self.backends.load().as_ref().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> InMemoryBackendDirectory {
        InMemoryBackendDirectory::new(vec![
            BackendDescriptor::new("a1", "http://a1:8080", "adhoc", true),
            BackendDescriptor::new("a2", "http://a2:8080", "adhoc", false),
            BackendDescriptor::new("e1", "http://e1:8080", "etl", true),
        ])
    }

    #[tokio::test]
    async fn test_filters_by_group_and_flag() {
        let dir = directory();
        assert_eq!(dir.get_all_backends().await.unwrap().len(), 3);

        let adhoc = dir.get_active_adhoc_backends().await.unwrap();
        assert_eq!(adhoc.len(), 1);
        assert_eq!(adhoc[0].name, "a1");

        let etl = dir.get_active_backends("etl").await.unwrap();
        assert_eq!(etl.len(), 1);
        assert!(dir.get_active_backends("missing").await.unwrap().is_empty());
        assert_eq!(dir.get_all_active_backends().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_activate_and_deactivate() {
        let dir = directory();
        dir.activate_backend("a2").unwrap();
        assert_eq!(dir.get_active_adhoc_backends().await.unwrap().len(), 2);

        dir.deactivate_backend("a1").unwrap();
        let adhoc = dir.get_active_adhoc_backends().await.unwrap();
        assert_eq!(adhoc.len(), 1);
        assert_eq!(adhoc[0].name, "a2");

        assert!(matches!(
            dir.deactivate_backend("nope"),
            Err(DirectoryError::BackendNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_add_backend() {
        let dir = directory();
        let added = dir
            .add_backend(BackendDescriptor::new("e2", "http://e2:8080/", "etl", true))
            .unwrap();
        assert_eq!(added.address, "http://e2:8080");
        assert_eq!(dir.get_active_backends("etl").await.unwrap().len(), 2);

        assert!(matches!(
            dir.add_backend(BackendDescriptor::new("e2", "http://other:8080", "etl", true)),
            Err(DirectoryError::DuplicateBackend(name)) if name == "e2"
        ));
        assert!(matches!(
            dir.add_backend(BackendDescriptor::new("e3", "e3:8080", "etl", true)),
            Err(DirectoryError::InvalidAddress(_))
        ));
        assert_eq!(dir.get_all_backends().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_update_backend() {
        let dir = directory();
        dir.update_backend(BackendDescriptor::new("a2", "http://a2-new:8080", "etl", true))
            .unwrap();

        let all = dir.get_all_backends().await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[1].address, "http://a2-new:8080");
        assert_eq!(all[1].routing_group, "etl");
        assert!(all[1].active);

        assert!(matches!(
            dir.update_backend(BackendDescriptor::new("nope", "http://n:1", "etl", true)),
            Err(DirectoryError::BackendNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_backend() {
        let dir = directory();
        dir.remove_backend("e1").unwrap();
        assert!(dir.get_active_backends("etl").await.unwrap().is_empty());
        assert!(matches!(
            dir.remove_backend("e1"),
            Err(DirectoryError::BackendNotFound(_))
        ));
        assert_eq!(dir.get_all_backends().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_adds_keep_names_unique() {
        let dir = Arc::new(directory());
        let adds: Vec<_> = (0..16)
            .map(|i| {
                let dir = dir.clone();
                std::thread::spawn(move || {
                    dir.add_backend(BackendDescriptor::new(
                        "shared",
                        format!("http://s{i}:8080"),
                        "etl",
                        true,
                    ))
                    .is_ok()
                })
            })
            .collect();

        let accepted = adds.into_iter().map(|a| a.join().unwrap()).filter(|ok| *ok).count();
        assert_eq!(accepted, 1);
        let all = dir.get_all_backends().await.unwrap();
        assert_eq!(all.iter().filter(|b| b.name == "shared").count(), 1);
    }

    #[tokio::test]
    async fn test_replace_all() {
        let dir = directory();
        dir.replace_all(vec![BackendDescriptor::new("x", "http://x:1", "adhoc", true)]);
        let all = dir.get_all_backends().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "x");
    }
}
