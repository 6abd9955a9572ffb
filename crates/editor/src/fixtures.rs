//! Factory functions for scene objects used in tests and scripted runs.

use shared::*;

// ── Object factories ────────────────────────────────────────────

/// Primitive shape at the origin, white, identity transform.
pub fn primitive(id: &str, shape: ShapeType) -> SceneObject {
    SceneObject {
        id: id.to_string(),
        kind: ObjectKind::PrimitiveShape,
        shape_type: shape,
        transform: Transform::new(),
        appearance: Appearance::default(),
        extrusion_profile: None,
        mirror: None,
        source_payload: None,
        display_name: None,
    }
}

/// Primitive shape at a position.
pub fn primitive_at(id: &str, shape: ShapeType, position: [f64; 3]) -> SceneObject {
    SceneObject {
        transform: Transform::at(position),
        ..primitive(id, shape)
    }
}

/// Extruded profile shape with default extrusion settings.
pub fn extruded(id: &str, shape: ShapeType) -> SceneObject {
    SceneObject {
        kind: ObjectKind::ExtrudedShape,
        extrusion_profile: Some(ExtrusionProfile::default()),
        ..primitive(id, shape)
    }
}

/// Imported model backed by an external file.
pub fn imported_reference(id: &str, url: &str, format: ModelFormat) -> SceneObject {
    SceneObject {
        kind: ObjectKind::ImportedModel,
        source_payload: Some(SourcePayload::Reference {
            url: url.to_string(),
            format,
        }),
        display_name: Some(url.to_string()),
        ..primitive(id, format.shape_type())
    }
}

/// Derived solid carrying an inline mesh.
pub fn raw_mesh_object(id: &str, document: MeshDocument) -> SceneObject {
    SceneObject {
        kind: ObjectKind::DerivedSolid,
        source_payload: Some(SourcePayload::Inline { document }),
        ..primitive(id, ShapeType::RawMesh)
    }
}

// ── Mesh documents ──────────────────────────────────────────────

/// Axis-aligned unit cube centred on the origin, outward winding, no normals.
pub fn unit_cube_document() -> MeshDocument {
    #[rustfmt::skip]
    let positions = vec![
        -0.5, -0.5, -0.5,
         0.5, -0.5, -0.5,
         0.5,  0.5, -0.5,
        -0.5,  0.5, -0.5,
        -0.5, -0.5,  0.5,
         0.5, -0.5,  0.5,
         0.5,  0.5,  0.5,
        -0.5,  0.5,  0.5,
    ];
    #[rustfmt::skip]
    let indices = vec![
        0, 2, 1,  0, 3, 2, // -Z
        4, 5, 6,  4, 6, 7, // +Z
        0, 1, 5,  0, 5, 4, // -Y
        3, 7, 6,  3, 6, 2, // +Y
        0, 4, 7,  0, 7, 3, // -X
        1, 2, 6,  1, 6, 5, // +X
    ];
    MeshDocument {
        version: 1,
        positions,
        indices,
        normals: Vec::new(),
    }
}

/// Scene with one object of every generated shape, laid out along X.
pub fn showcase_scene() -> Vec<SceneObject> {
    ShapeType::PRIMITIVES
        .iter()
        .map(|&s| primitive(s.label(), s))
        .chain(ShapeType::PROFILES.iter().map(|&s| extruded(s.label(), s)))
        .enumerate()
        .map(|(i, mut obj)| {
            obj.transform.position = [i as f64 * 1.5, 0.0, 0.0];
            obj
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::MeshValidator;
    use crate::viewport::mesh::MeshData;

    #[test]
    fn test_unit_cube_document_is_closed_and_outward() {
        let mesh = MeshData::from_document(&unit_cube_document()).unwrap();
        let v = MeshValidator::new(&mesh);
        assert!(v.validate_all().is_empty());
        assert!((v.signed_volume() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_showcase_covers_generated_shapes() {
        let scene = showcase_scene();
        assert_eq!(
            scene.len(),
            ShapeType::PRIMITIVES.len() + ShapeType::PROFILES.len()
        );
        assert!(scene.iter().all(|o| o.kind.is_generated()));
    }
}
