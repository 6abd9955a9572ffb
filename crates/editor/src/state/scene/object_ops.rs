//! Object-level mutations: add, edit, delete, select, import, move, boolean

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use shared::{
    Appearance, Axis, Color, ExtrusionProfile, MirrorModifier, ModelFormat, ObjectId, ObjectKind,
    SceneObject, ShapeType, SourcePayload, Transform,
};
use tracing::{info, warn};

use super::SceneStore;
use crate::helpers::{parse_real, short_id, PALETTE};
use crate::state::Tool;

/// Which transform vector an edit addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformKind {
    Position,
    Rotation,
    Scale,
}

/// Whole-field appearance or naming edit
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectField {
    Color(Color),
    Wireframe(bool),
    /// `None` or empty resets to the shape label
    Name(Option<String>),
}

/// Extrusion edit; numeric values arrive as raw text
#[derive(Debug, Clone, PartialEq)]
pub enum ExtrusionSetting {
    Depth(String),
    BevelEnabled(bool),
    BevelThickness(String),
    BevelSize(String),
    BevelSegments(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MirrorSetting {
    Enabled(bool),
    Axis(Axis),
}

impl SceneStore {
    /// Apply `edit` to object `id` and log it. Missing ids change nothing.
    fn edit_object(
        &mut self,
        id: &str,
        label: &str,
        edit: impl FnOnce(&mut SceneObject),
    ) -> bool {
        if !self.snapshot.contains(id) {
            warn!(id = short_id(id), "{label}: object not found");
            return false;
        }
        let next = self.snapshot.with_objects(|objects| {
            if let Some(obj) = objects.iter_mut().find(|o| o.id == id) {
                edit(obj);
            }
        });
        self.commit(label, next);
        true
    }

    /// Add a generated shape at a random spot on the ground plane.
    /// The new object becomes the sole selection and the move tool is activated.
    /// Model formats cannot be added this way and return `None`.
    pub fn add_object(&mut self, shape: ShapeType) -> Option<ObjectId> {
        let kind = shape.default_kind();
        if kind == ObjectKind::ImportedModel {
            warn!(?shape, "model shapes are imported, not added");
            return None;
        }

        let x = self.rng.gen_range(-2.0..=2.0);
        let z = self.rng.gen_range(-2.0..=2.0);
        let color = PALETTE.choose(&mut self.rng).copied().unwrap_or(Color::WHITE);

        let object = SceneObject {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            shape_type: shape,
            transform: Transform::at([x, 0.0, z]),
            appearance: Appearance {
                color,
                wireframe: false,
            },
            extrusion_profile: (kind == ObjectKind::ExtrudedShape)
                .then(ExtrusionProfile::default),
            mirror: None,
            source_payload: None,
            display_name: None,
        };
        let id = object.id.clone();

        let next = self.snapshot.with_objects(|objects| objects.push(object));
        self.commit(format!("Add {}", shape.label()), next);
        self.selection.select(id.clone());
        self.tool = Tool::Move;
        info!(id = short_id(&id), ?shape, "added object");
        Some(id)
    }

    /// Replace one component of position, rotation or scale with the
    /// number parsed from `raw` (unparsable input becomes 0).
    pub fn update_transform_axis(
        &mut self,
        id: &str,
        kind: TransformKind,
        axis: Axis,
        raw: &str,
    ) -> bool {
        let value = parse_real(raw);
        self.edit_object(id, "Update Transform", |obj| {
            let target = match kind {
                TransformKind::Position => &mut obj.transform.position,
                TransformKind::Rotation => &mut obj.transform.rotation,
                TransformKind::Scale => &mut obj.transform.scale,
            };
            target[axis.index()] = value;
        })
    }

    pub fn update_field(&mut self, id: &str, field: ObjectField) -> bool {
        let label = match &field {
            ObjectField::Color(_) => "Update Color",
            ObjectField::Wireframe(_) => "Update Wireframe",
            ObjectField::Name(_) => "Rename Object",
        };
        self.edit_object(id, label, |obj| match field {
            ObjectField::Color(c) => obj.appearance.color = c,
            ObjectField::Wireframe(w) => obj.appearance.wireframe = w,
            ObjectField::Name(name) => {
                obj.display_name = name.filter(|n| !n.trim().is_empty());
            }
        })
    }

    /// Edit extrusion settings of an extruded shape
    pub fn update_extrusion_setting(&mut self, id: &str, setting: ExtrusionSetting) -> bool {
        match self.snapshot.get(id) {
            Some(obj) if obj.kind == ObjectKind::ExtrudedShape => {}
            Some(_) => {
                warn!(id = short_id(id), "extrusion settings only apply to extruded shapes");
                return false;
            }
            None => return false,
        }

        self.edit_object(id, "Update Extrusion", |obj| {
            let profile = obj.extrusion_profile.get_or_insert_with(ExtrusionProfile::default);
            match setting {
                ExtrusionSetting::Depth(raw) => profile.depth = parse_real(&raw),
                ExtrusionSetting::BevelEnabled(on) => profile.bevel_enabled = on,
                ExtrusionSetting::BevelThickness(raw) => {
                    profile.bevel_thickness = parse_real(&raw).max(0.0)
                }
                ExtrusionSetting::BevelSize(raw) => profile.bevel_size = parse_real(&raw).max(0.0),
                ExtrusionSetting::BevelSegments(raw) => {
                    profile.bevel_segments = ExtrusionProfile::clamp_segments(parse_real(&raw))
                }
            }
        })
    }

    /// Merge a setting into the mirror modifier, creating it disabled on X if absent
    pub fn update_mirror(&mut self, id: &str, setting: MirrorSetting) -> bool {
        self.edit_object(id, "Update Mirror", |obj| {
            let mirror = obj.mirror.get_or_insert_with(MirrorModifier::default);
            match setting {
                MirrorSetting::Enabled(on) => mirror.enabled = on,
                MirrorSetting::Axis(axis) => mirror.axis = axis,
            }
        })
    }

    pub fn delete_object(&mut self, id: &str) -> bool {
        if !self.snapshot.contains(id) {
            return false;
        }
        let next = self.snapshot.with_objects(|objects| objects.retain(|o| o.id != id));
        self.commit("Delete Object", next);
        true
    }

    /// Delete every selected object in one history entry
    pub fn delete_selected(&mut self) -> bool {
        let doomed: Vec<ObjectId> = self
            .selection
            .all()
            .iter()
            .filter(|id| self.snapshot.contains(id))
            .cloned()
            .collect();
        if doomed.is_empty() {
            return false;
        }
        let next = self
            .snapshot
            .with_objects(|objects| objects.retain(|o| !doomed.contains(&o.id)));
        let label = if doomed.len() == 1 {
            "Delete Object"
        } else {
            "Delete Objects"
        };
        self.commit(label, next);
        true
    }

    /// Selection update from a click or list interaction.
    /// `None` clears in single mode and is a no-op in multi mode; a plain
    /// id replaces the selection; multi toggles. Unknown ids are ignored.
    pub fn set_selection(&mut self, id: Option<&str>, multi: bool) {
        match id {
            None if multi => {}
            None => self.selection.clear(),
            Some(id) if !self.snapshot.contains(id) => {}
            Some(id) if multi => self.selection.toggle(id.to_string()),
            Some(id) => self.selection.select(id.to_string()),
        }
    }

    /// Add an imported model at the origin and select it
    pub fn import_model(
        &mut self,
        name: &str,
        format: Option<ModelFormat>,
        payload: SourcePayload,
    ) -> ObjectId {
        let object = SceneObject {
            id: uuid::Uuid::new_v4().to_string(),
            kind: ObjectKind::ImportedModel,
            shape_type: format.map(|f| f.shape_type()).unwrap_or(ShapeType::RawMesh),
            transform: Transform::new(),
            appearance: Appearance::default(),
            extrusion_profile: None,
            mirror: None,
            source_payload: Some(payload),
            display_name: Some(name.to_string()),
        };
        let id = object.id.clone();
        let label = match format {
            Some(_) => format!("Import {name}"),
            None => "Import Mesh".to_string(),
        };
        let next = self.snapshot.with_objects(|objects| objects.push(object));
        self.commit(label, next);
        self.selection.select(id.clone());
        info!(id = short_id(&id), name, "imported model");
        id
    }

    /// Commit the final position of a drag. Unchanged positions log nothing.
    pub fn commit_move(&mut self, id: &str, position: [f64; 3]) -> bool {
        match self.snapshot.get(id) {
            Some(obj) if obj.transform.position != position => {}
            _ => return false,
        }
        self.edit_object(id, "Move Object", |obj| obj.transform.position = position)
    }

    /// Replace both operands with the derived object and select it
    pub fn apply_boolean(&mut self, a: &str, b: &str, derived: SceneObject) -> bool {
        if !self.snapshot.contains(a) || !self.snapshot.contains(b) {
            return false;
        }
        let id = derived.id.clone();
        let next = self.snapshot.with_objects(|objects| {
            objects.retain(|o| o.id != a && o.id != b);
            objects.push(derived);
        });
        self.commit("CSG Operation", next);
        self.selection.select(id);
        true
    }
}
