//! Mesh provider abstraction.
//!
//! A provider hands the session a fully built [`TerrainMesh`]. Loading is
//! async because real providers read files or fetch remote assets; the mesh
//! itself is plain data once loaded.

use async_trait::async_trait;

use crate::mesh::TerrainMesh;

/// Error type for mesh loading.
#[derive(Debug)]
pub struct MeshLoadError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for MeshLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for MeshLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl MeshLoadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

#[async_trait]
pub trait MeshProvider: Send + Sync {
    /// Human-readable origin of the mesh, for logs and notices.
    fn describe(&self) -> String;

    async fn load(&self) -> Result<TerrainMesh, MeshLoadError>;
}

/// Provider over an already-built mesh.
#[derive(Debug, Clone)]
pub struct StaticMeshProvider {
    name: String,
    mesh: TerrainMesh,
}

impl StaticMeshProvider {
    pub fn new(name: impl Into<String>, mesh: TerrainMesh) -> Self {
        Self {
            name: name.into(),
            mesh,
        }
    }
}

#[async_trait]
impl MeshProvider for StaticMeshProvider {
    fn describe(&self) -> String {
        self.name.clone()
    }

    async fn load(&self) -> Result<TerrainMesh, MeshLoadError> {
        Ok(self.mesh.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::{MeshLoadError, MeshProvider, StaticMeshProvider};
    use crate::mesh::{MeshError, TerrainMesh};

    #[tokio::test]
    async fn static_provider_returns_its_mesh() {
        let mesh = TerrainMesh::flat(0.0, 1.0, 0.0, 1.0, 2.0).expect("mesh");
        let provider = StaticMeshProvider::new("unit quad", mesh);
        assert_eq!(provider.describe(), "unit quad");
        let loaded = provider.load().await.expect("load");
        assert_eq!(loaded.triangle_count(), 2);
    }

    #[test]
    fn load_error_keeps_source() {
        let err = MeshLoadError::with_source("bad mesh", MeshError::Empty);
        assert_eq!(err.to_string(), "bad mesh");
        assert!(err.source().is_some());
        assert!(MeshLoadError::new("x").source().is_none());
    }
}
