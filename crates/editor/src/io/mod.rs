//! File import/export: scene documents, model formats, GLB export

pub mod glb;
pub mod obj;
pub mod stl;

pub use glb::build_glb;

use shared::ModelFormat;
use thiserror::Error;

use crate::viewport::mesh::MeshData;

/// Anything that can go wrong turning bytes into scene content
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("scene document must be an array of objects or a mesh object")]
    UnsupportedDocument,

    #[error("invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("unsupported file type: {0}")]
    UnsupportedFile(String),

    #[error("failed to parse {format:?} model: {reason}")]
    Parse { format: ModelFormat, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ImportError {
    pub(crate) fn parse(format: ModelFormat, reason: impl Into<String>) -> Self {
        ImportError::Parse {
            format,
            reason: reason.into(),
        }
    }
}

/// What a dropped or opened file is, judged by its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// `.json`: scene array or single mesh document
    Document,
    Model(ModelFormat),
}

/// Classify a file name by extension (case-insensitive)
pub fn classify(name: &str) -> Result<FileKind, ImportError> {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .ok_or_else(|| ImportError::UnsupportedFile(name.to_string()))?;
    if ext.eq_ignore_ascii_case("json") {
        return Ok(FileKind::Document);
    }
    ModelFormat::from_extension(ext)
        .map(FileKind::Model)
        .ok_or_else(|| ImportError::UnsupportedFile(name.to_string()))
}

/// Decode model bytes into a single mesh
pub fn parse_model(format: ModelFormat, bytes: &[u8]) -> Result<MeshData, ImportError> {
    let mesh = match format {
        ModelFormat::Glb => glb::parse_glb(bytes)?,
        ModelFormat::Gltf => glb::parse_gltf(bytes)?,
        ModelFormat::Obj => obj::parse_obj(bytes)?,
        ModelFormat::Stl => stl::parse_stl(bytes)?,
    };
    if mesh.is_empty() {
        return Err(ImportError::parse(format, "no triangles found"));
    }
    tracing::debug!(
        ?format,
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        "parsed model"
    );
    Ok(mesh)
}
