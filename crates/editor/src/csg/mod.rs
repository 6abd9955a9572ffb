//! Boolean operations between two generated objects.
//!
//! Clipping runs in `csgrs`; this module places operands in world space and
//! wraps the result as a derived solid centred on its bounding box.

mod brush;

pub use brush::{world_matrix, Brush};

use serde::{Deserialize, Serialize};
use shared::{Appearance, ObjectKind, SceneObject, ShapeType, SourcePayload, Transform};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::build::build_object_mesh;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BooleanOp {
    Union,
    /// First operand minus the second
    Difference,
    Intersection,
}

impl BooleanOp {
    pub fn label(&self) -> &'static str {
        match self {
            BooleanOp::Union => "Union",
            BooleanOp::Difference => "Difference",
            BooleanOp::Intersection => "Intersection",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CsgError {
    #[error("Select exactly two objects for a boolean operation ({0} selected)")]
    SelectionCount(usize),

    #[error("CSG only supports primitives/shapes")]
    UnsupportedOperand,

    #[error("Object {0} not found")]
    MissingOperand(String),

    #[error("Boolean operation produced no geometry")]
    EmptyResult,
}

/// Evaluate `a <op> b` in world space and wrap the result in a new derived
/// object positioned at the result's bounding-box centroid.
#[instrument(skip(a, b), fields(a_id = %a.id, b_id = %b.id))]
pub fn evaluate(op: BooleanOp, a: &SceneObject, b: &SceneObject) -> Result<SceneObject, CsgError> {
    if !a.kind.is_generated() || !b.kind.is_generated() {
        return Err(CsgError::UnsupportedOperand);
    }
    let mesh_a = build_object_mesh(a).ok_or(CsgError::UnsupportedOperand)?;
    let mesh_b = build_object_mesh(b).ok_or(CsgError::UnsupportedOperand)?;

    let brush_a = Brush::from_mesh(&mesh_a, &a.transform);
    let brush_b = Brush::from_mesh(&mesh_b, &b.transform);

    let result = match op {
        BooleanOp::Union => brush_a.union(&brush_b),
        BooleanOp::Difference => brush_a.difference(&brush_b),
        BooleanOp::Intersection => brush_a.intersection(&brush_b),
    };

    let mut mesh = result.to_mesh();
    let aabb = mesh.aabb().ok_or(CsgError::EmptyResult)?;
    if mesh.is_empty() {
        return Err(CsgError::EmptyResult);
    }

    let centroid = aabb.center();
    mesh.translate(-centroid);
    debug!(
        triangles = mesh.triangle_count(),
        centroid = ?centroid,
        "boolean result"
    );

    Ok(SceneObject {
        id: uuid::Uuid::new_v4().to_string(),
        kind: ObjectKind::DerivedSolid,
        shape_type: ShapeType::RawMesh,
        transform: Transform::at(centroid.as_dvec3().to_array()),
        appearance: Appearance::default(),
        extrusion_profile: None,
        mirror: None,
        source_payload: Some(SourcePayload::Inline {
            document: mesh.to_document(),
        }),
        display_name: None,
    })
}
