use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use terrain::{GridError, MeshError, MeshLoadError, MeshProvider, TerrainMesh};
use tracing::info;

use crate::document::TerrainDocument;
use crate::obj::parse_obj;

#[derive(Debug)]
pub enum MeshFileError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    Obj {
        line: usize,
        message: String,
    },
    UnsupportedVersion {
        found: String,
    },
    UnsupportedExtension {
        path: PathBuf,
    },
    Grid(GridError),
    Mesh(MeshError),
}

impl fmt::Display for MeshFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshFileError::Io { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
            MeshFileError::Parse(err) => write!(f, "terrain document parse error: {err}"),
            MeshFileError::Obj { line, message } => write!(f, "OBJ line {line}: {message}"),
            MeshFileError::UnsupportedVersion { found } => {
                write!(f, "Unsupported terrain document version: {found}")
            }
            MeshFileError::UnsupportedExtension { path } => {
                write!(f, "no terrain format for {}", path.display())
            }
            MeshFileError::Grid(err) => write!(f, "invalid height grid: {err}"),
            MeshFileError::Mesh(err) => write!(f, "invalid terrain mesh: {err}"),
        }
    }
}

impl std::error::Error for MeshFileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MeshFileError::Io { source, .. } => Some(source),
            MeshFileError::Parse(err) => Some(err),
            MeshFileError::Grid(err) => Some(err),
            MeshFileError::Mesh(err) => Some(err),
            MeshFileError::Obj { .. }
            | MeshFileError::UnsupportedVersion { .. }
            | MeshFileError::UnsupportedExtension { .. } => None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MeshFormat {
    /// [`TerrainDocument`] JSON (`.json`).
    Json,
    /// Wavefront OBJ (`.obj`).
    Obj,
}

impl MeshFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(MeshFormat::Json),
            "obj" => Some(MeshFormat::Obj),
            _ => None,
        }
    }
}

pub fn parse_mesh(format: MeshFormat, payload: &str) -> Result<TerrainMesh, MeshFileError> {
    match format {
        MeshFormat::Json => TerrainDocument::from_json_str(payload)?.into_mesh(),
        MeshFormat::Obj => parse_obj(payload),
    }
}

pub async fn load_mesh_file(path: impl AsRef<Path>) -> Result<TerrainMesh, MeshFileError> {
    let path = path.as_ref();
    let format = MeshFormat::from_path(path).ok_or_else(|| MeshFileError::UnsupportedExtension {
        path: path.to_path_buf(),
    })?;
    let payload = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| MeshFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let mesh = parse_mesh(format, &payload)?;
    info!(
        path = %path.display(),
        triangles = mesh.triangle_count(),
        "terrain mesh loaded"
    );
    Ok(mesh)
}

/// Mesh provider backed by a terrain file on disk.
#[derive(Debug, Clone)]
pub struct FileMeshProvider {
    path: PathBuf,
}

impl FileMeshProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl MeshProvider for FileMeshProvider {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn load(&self) -> Result<TerrainMesh, MeshLoadError> {
        load_mesh_file(&self.path).await.map_err(|err| {
            let message = format!("failed to load {}: {err}", self.path.display());
            MeshLoadError::with_source(message, err)
        })
    }
}
