//! Geometry factory: scene object → geometry descriptor → triangle mesh.
//!
//! Only generated kinds (primitives and extruded profiles) have a descriptor.
//! Imported models and derived solids carry their own mesh payload.

mod extrude_builder;
mod primitives;
mod profiles;

pub use extrude_builder::{extrude, triangulate, MIN_DEPTH};
pub use primitives::PlatonicSolid;
pub use profiles::outline;

use shared::{ExtrusionProfile, ObjectKind, SceneObject, ShapeType};

use crate::viewport::mesh::MeshData;

/// Parameters for one tessellated solid, in object-local space
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryDescriptor {
    Box {
        width: f64,
        height: f64,
        depth: f64,
    },
    Sphere {
        radius: f64,
        width_segments: u32,
        height_segments: u32,
    },
    /// Cylinder along Y; a zero radius gives a cone
    Cylinder {
        radius_top: f64,
        radius_bottom: f64,
        height: f64,
        radial_segments: u32,
    },
    Torus {
        radius: f64,
        tube: f64,
        radial_segments: u32,
        tubular_segments: u32,
    },
    Polyhedron {
        solid: PlatonicSolid,
        radius: f64,
    },
    Extrusion {
        outline: Vec<[f64; 2]>,
        profile: ExtrusionProfile,
    },
}

impl GeometryDescriptor {
    pub fn unit_cube() -> Self {
        GeometryDescriptor::Box {
            width: 1.0,
            height: 1.0,
            depth: 1.0,
        }
    }
}

/// Descriptor for a primitive shape tag; anything that is not a primitive
/// gets the unit cube.
pub fn primitive_descriptor(shape: ShapeType) -> GeometryDescriptor {
    match shape {
        ShapeType::Cube => GeometryDescriptor::unit_cube(),
        ShapeType::Sphere => GeometryDescriptor::Sphere {
            radius: 0.6,
            width_segments: 32,
            height_segments: 32,
        },
        ShapeType::Cylinder => GeometryDescriptor::Cylinder {
            radius_top: 0.5,
            radius_bottom: 0.5,
            height: 1.0,
            radial_segments: 32,
        },
        ShapeType::Cone => GeometryDescriptor::Cylinder {
            radius_top: 0.0,
            radius_bottom: 0.5,
            height: 1.0,
            radial_segments: 32,
        },
        ShapeType::Torus => GeometryDescriptor::Torus {
            radius: 0.5,
            tube: 0.2,
            radial_segments: 16,
            tubular_segments: 64,
        },
        ShapeType::Tetrahedron => polyhedron(PlatonicSolid::Tetrahedron),
        ShapeType::Octahedron => polyhedron(PlatonicSolid::Octahedron),
        ShapeType::Dodecahedron => polyhedron(PlatonicSolid::Dodecahedron),
        ShapeType::Icosahedron => polyhedron(PlatonicSolid::Icosahedron),
        ShapeType::Rectangle
        | ShapeType::Circle
        | ShapeType::Triangle
        | ShapeType::Hexagon
        | ShapeType::Star
        | ShapeType::Heart
        | ShapeType::Gltf
        | ShapeType::Glb
        | ShapeType::Obj
        | ShapeType::Stl
        | ShapeType::RawMesh
        | ShapeType::Unknown => GeometryDescriptor::unit_cube(),
    }
}

fn polyhedron(solid: PlatonicSolid) -> GeometryDescriptor {
    GeometryDescriptor::Polyhedron { solid, radius: 0.6 }
}

/// Pure mapping from an object to the geometry that represents it.
/// `None` for imported and derived objects.
pub fn shape_descriptor_for(object: &SceneObject) -> Option<GeometryDescriptor> {
    match object.kind {
        ObjectKind::PrimitiveShape => Some(primitive_descriptor(object.shape_type)),
        ObjectKind::ExtrudedShape => Some(match outline(object.shape_type) {
            Some(points) => GeometryDescriptor::Extrusion {
                outline: points.iter().map(|p| [p.x, p.y]).collect(),
                profile: object.extrusion_profile.clone().unwrap_or_default(),
            },
            None => GeometryDescriptor::unit_cube(),
        }),
        ObjectKind::ImportedModel | ObjectKind::DerivedSolid => None,
    }
}

/// Tessellate a descriptor
pub fn build_mesh(descriptor: &GeometryDescriptor) -> MeshData {
    match descriptor {
        GeometryDescriptor::Box {
            width,
            height,
            depth,
        } => primitives::cube(*width as f32, *height as f32, *depth as f32),
        GeometryDescriptor::Sphere {
            radius,
            width_segments,
            height_segments,
        } => primitives::sphere(*radius as f32, *width_segments, *height_segments),
        GeometryDescriptor::Cylinder {
            radius_top,
            radius_bottom,
            height,
            radial_segments,
        } => primitives::cylinder(
            *radius_top as f32,
            *radius_bottom as f32,
            *height as f32,
            *radial_segments,
        ),
        GeometryDescriptor::Torus {
            radius,
            tube,
            radial_segments,
            tubular_segments,
        } => primitives::torus(*radius as f32, *tube as f32, *radial_segments, *tubular_segments),
        GeometryDescriptor::Polyhedron { solid, radius } => {
            primitives::polyhedron(*solid, *radius as f32)
        }
        GeometryDescriptor::Extrusion { outline, profile } => {
            let points: Vec<kurbo::Point> =
                outline.iter().map(|p| kurbo::Point::new(p[0], p[1])).collect();
            extrude(&points, profile)
        }
    }
}

/// Local-space mesh for a generated object
pub fn build_object_mesh(object: &SceneObject) -> Option<MeshData> {
    shape_descriptor_for(object).map(|d| build_mesh(&d))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::validation::MeshValidator;

    #[test]
    fn test_imported_and_derived_have_no_descriptor() {
        let imported = fixtures::imported_reference("m", "duck.glb", shared::ModelFormat::Glb);
        assert!(shape_descriptor_for(&imported).is_none());
        let derived = fixtures::raw_mesh_object("d", fixtures::unit_cube_document());
        assert!(shape_descriptor_for(&derived).is_none());
    }

    #[test]
    fn test_unknown_shape_falls_back_to_cube() {
        let mut obj = fixtures::primitive("x", ShapeType::Unknown);
        assert_eq!(shape_descriptor_for(&obj), Some(GeometryDescriptor::unit_cube()));

        obj.kind = ObjectKind::ExtrudedShape;
        obj.shape_type = ShapeType::Torus;
        assert_eq!(shape_descriptor_for(&obj), Some(GeometryDescriptor::unit_cube()));
    }

    #[test]
    fn test_descriptor_is_deterministic() {
        let obj = fixtures::extruded("s", ShapeType::Star);
        assert_eq!(shape_descriptor_for(&obj), shape_descriptor_for(&obj));
    }

    #[test]
    fn test_extruded_uses_object_settings() {
        let mut obj = fixtures::extruded("s", ShapeType::Circle);
        obj.extrusion_profile = Some(ExtrusionProfile {
            depth: 2.0,
            bevel_enabled: false,
            ..ExtrusionProfile::default()
        });
        let mesh = build_object_mesh(&obj).unwrap();
        let dims = MeshValidator::new(&mesh).dimensions();
        assert!((dims[2] - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_every_primitive_builds_valid_mesh() {
        for shape in ShapeType::PRIMITIVES {
            let mesh = build_mesh(&primitive_descriptor(shape));
            let v = MeshValidator::new(&mesh);
            assert!(!mesh.is_empty(), "{shape:?}");
            assert!(v.validate_all().is_empty(), "{shape:?}");
            assert!(v.signed_volume() > 0.0, "{shape:?}");
        }
    }

    #[test]
    fn test_unit_cube_dimensions() {
        let mesh = build_mesh(&GeometryDescriptor::unit_cube());
        assert!(MeshValidator::new(&mesh).assert_dimensions_approx([1.0; 3], 1e-6));
    }
}
