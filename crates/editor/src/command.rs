//! JSON command protocol for scripted and agent-driven editing.

use serde::{Deserialize, Serialize};
use shared::{Axis, Color, ModelFormat, ShapeType};

use crate::csg::BooleanOp;
use crate::editor::Editor;
use crate::state::{ExtrusionSetting, MirrorSetting, ObjectField, Tool, TransformKind};

/// Numeric field input as typed by a user: a number or any text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl RawValue {
    fn as_text(&self) -> String {
        match self {
            RawValue::Number(n) => n.to_string(),
            RawValue::Text(s) => s.clone(),
        }
    }
}

/// Extrusion field addressed by [`AgentCommand::UpdateExtrusion`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtrusionField {
    Depth,
    BevelThickness,
    BevelSize,
    BevelSegments,
}

/// A command that can be executed against the editor.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum AgentCommand {
    /// Add a primitive or extruded shape
    AddObject { shape: ShapeType },
    /// Set one axis of position, rotation or scale
    UpdateTransform {
        id: String,
        kind: TransformKind,
        axis: Axis,
        value: RawValue,
    },
    SetColor { id: String, color: String },
    SetWireframe { id: String, enabled: bool },
    /// Empty or missing name resets to the shape label
    Rename {
        id: String,
        #[serde(default)]
        name: Option<String>,
    },
    UpdateExtrusion {
        id: String,
        field: ExtrusionField,
        value: RawValue,
    },
    SetBevel { id: String, enabled: bool },
    SetMirror {
        id: String,
        #[serde(default)]
        enabled: Option<bool>,
        #[serde(default)]
        axis: Option<Axis>,
    },
    Delete { id: String },
    DeleteSelected,
    /// Click-style selection; `multi` toggles
    Select {
        id: String,
        #[serde(default)]
        multi: bool,
    },
    ClearSelection,
    SetTool { tool: Tool },
    /// Combine the two selected objects
    Boolean { op: BooleanOp },
    Undo,
    Redo,
    /// Restore the scene to a history entry
    Restore { entry: u64 },
    /// List history entries, oldest first
    History,
    /// List scene objects
    Inspect,
    ExportScene,
    /// Replace the scene with a serialized object list
    LoadScene { scene: serde_json::Value },
    /// Import a model file by URL or path
    ImportUrl {
        url: String,
        #[serde(default)]
        format: Option<ModelFormat>,
    },
}

/// Response from executing a command.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl CommandResponse {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
            data: None,
        }
    }

    fn ok_with_data(data: serde_json::Value) -> Self {
        Self {
            success: true,
            error: None,
            data: Some(data),
        }
    }

    fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(msg.into()),
            data: None,
        }
    }

    /// Success when `applied`, otherwise an error naming the target
    fn applied(applied: bool, id: &str) -> Self {
        if applied {
            Self::ok()
        } else {
            Self::err(format!("No change applied to object {id}"))
        }
    }
}

/// Execute a single command on the editor.
pub fn execute_command(editor: &mut Editor, cmd: AgentCommand) -> CommandResponse {
    match cmd {
        AgentCommand::AddObject { shape } => match editor.edit(|s| s.add_object(shape)) {
            Some(id) => CommandResponse::ok_with_data(serde_json::json!({ "id": id })),
            None => CommandResponse::err(format!("{} cannot be added directly", shape.label())),
        },

        AgentCommand::UpdateTransform {
            id,
            kind,
            axis,
            value,
        } => {
            let applied =
                editor.edit(|s| s.update_transform_axis(&id, kind, axis, &value.as_text()));
            CommandResponse::applied(applied, &id)
        }

        AgentCommand::SetColor { id, color } => {
            let Some(color) = Color::parse(&color) else {
                return CommandResponse::err(format!("Invalid color: {color}"));
            };
            let applied = editor.edit(|s| s.update_field(&id, ObjectField::Color(color)));
            CommandResponse::applied(applied, &id)
        }

        AgentCommand::SetWireframe { id, enabled } => {
            let applied = editor.edit(|s| s.update_field(&id, ObjectField::Wireframe(enabled)));
            CommandResponse::applied(applied, &id)
        }

        AgentCommand::Rename { id, name } => {
            let applied = editor.edit(|s| s.update_field(&id, ObjectField::Name(name)));
            CommandResponse::applied(applied, &id)
        }

        AgentCommand::UpdateExtrusion { id, field, value } => {
            let text = value.as_text();
            let setting = match field {
                ExtrusionField::Depth => ExtrusionSetting::Depth(text),
                ExtrusionField::BevelThickness => ExtrusionSetting::BevelThickness(text),
                ExtrusionField::BevelSize => ExtrusionSetting::BevelSize(text),
                ExtrusionField::BevelSegments => ExtrusionSetting::BevelSegments(text),
            };
            let applied = editor.edit(|s| s.update_extrusion_setting(&id, setting));
            CommandResponse::applied(applied, &id)
        }

        AgentCommand::SetBevel { id, enabled } => {
            let applied = editor.edit(|s| {
                s.update_extrusion_setting(&id, ExtrusionSetting::BevelEnabled(enabled))
            });
            CommandResponse::applied(applied, &id)
        }

        AgentCommand::SetMirror { id, enabled, axis } => {
            if enabled.is_none() && axis.is_none() {
                return CommandResponse::err("set_mirror needs `enabled` or `axis`");
            }
            let applied = editor.edit(|s| {
                let mut applied = true;
                if let Some(axis) = axis {
                    applied &= s.update_mirror(&id, MirrorSetting::Axis(axis));
                }
                if let Some(enabled) = enabled {
                    applied &= s.update_mirror(&id, MirrorSetting::Enabled(enabled));
                }
                applied
            });
            CommandResponse::applied(applied, &id)
        }

        AgentCommand::Delete { id } => {
            let removed = editor.edit(|s| s.delete_object(&id));
            CommandResponse::ok_with_data(serde_json::json!({ "removed": removed }))
        }

        AgentCommand::DeleteSelected => {
            let removed = editor.edit(|s| s.delete_selected());
            CommandResponse::ok_with_data(serde_json::json!({ "removed": removed }))
        }

        AgentCommand::Select { id, multi } => {
            editor.edit(|s| s.set_selection(Some(id.as_str()), multi));
            CommandResponse::ok_with_data(serde_json::json!({
                "selected": editor.store().selection().all(),
            }))
        }

        AgentCommand::ClearSelection => {
            editor.edit(|s| s.set_selection(None, false));
            CommandResponse::ok()
        }

        AgentCommand::SetTool { tool } => {
            editor.edit(|s| s.set_tool(tool));
            CommandResponse::ok()
        }

        AgentCommand::Boolean { op } => match editor.boolean(op) {
            Ok(id) => CommandResponse::ok_with_data(serde_json::json!({ "id": id })),
            Err(e) => CommandResponse::err(e.to_string()),
        },

        AgentCommand::Undo => {
            let success = editor.edit(|s| s.undo());
            CommandResponse::ok_with_data(serde_json::json!({ "undone": success }))
        }

        AgentCommand::Redo => {
            let success = editor.edit(|s| s.redo());
            CommandResponse::ok_with_data(serde_json::json!({ "redone": success }))
        }

        AgentCommand::Restore { entry } => {
            if editor.edit(|s| s.restore_snapshot(entry)) {
                CommandResponse::ok()
            } else {
                CommandResponse::err(format!("No history entry {entry}"))
            }
        }

        AgentCommand::History => {
            let history = editor.store().history();
            let cursor = history.cursor();
            let entries: Vec<serde_json::Value> = history
                .entries()
                .map(|e| {
                    serde_json::json!({
                        "id": e.id,
                        "label": e.label,
                        "timestamp": e.timestamp,
                        "object_count": e.snapshot.len(),
                        "current": Some(e.id) == cursor,
                    })
                })
                .collect();
            CommandResponse::ok_with_data(serde_json::json!({
                "entry_count": entries.len(),
                "entries": entries,
            }))
        }

        AgentCommand::Inspect => {
            let store = editor.store();
            let objects: Vec<serde_json::Value> = store
                .snapshot()
                .iter()
                .map(|obj| {
                    serde_json::json!({
                        "id": obj.id,
                        "name": obj.name(),
                        "kind": obj.kind,
                        "shape_type": obj.shape_type,
                        "position": obj.transform.position,
                        "selected": store.selection().is_selected(&obj.id),
                    })
                })
                .collect();
            CommandResponse::ok_with_data(serde_json::json!({
                "object_count": objects.len(),
                "objects": objects,
                "renderable_count": editor.viewport().renderables().len(),
            }))
        }

        AgentCommand::ExportScene => match editor.export_scene_json() {
            Ok(json) => CommandResponse::ok_with_data(serde_json::json!({ "scene_json": json })),
            Err(e) => CommandResponse::err(e.to_string()),
        },

        AgentCommand::LoadScene { scene } => match editor.edit(|s| s.load_scene_document(scene)) {
            Ok(()) => CommandResponse::ok(),
            Err(e) => CommandResponse::err(e.to_string()),
        },

        AgentCommand::ImportUrl { url, format } => {
            let result = match format {
                Some(format) => Ok(editor.import_reference(&url, format)),
                None => editor.import_url(&url),
            };
            match result {
                Ok(id) => CommandResponse::ok_with_data(serde_json::json!({ "id": id })),
                Err(e) => CommandResponse::err(e.to_string()),
            }
        }
    }
}

/// Parse and execute a single JSON command string.
pub fn execute_json(editor: &mut Editor, json: &str) -> Result<CommandResponse, String> {
    let cmd: AgentCommand =
        serde_json::from_str(json).map_err(|e| format!("Invalid command JSON: {e}"))?;
    Ok(execute_command(editor, cmd))
}

/// Parse and execute multiple JSON commands (array).
pub fn execute_json_batch(editor: &mut Editor, json: &str) -> Result<Vec<CommandResponse>, String> {
    let cmds: Vec<AgentCommand> =
        serde_json::from_str(json).map_err(|e| format!("Invalid commands JSON: {e}"))?;
    Ok(cmds
        .into_iter()
        .map(|cmd| execute_command(editor, cmd))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{EditorSettings, SceneStore};
    use crate::viewport::loader::QueuedLoader;

    fn editor() -> Editor {
        Editor::with_store(
            EditorSettings::default(),
            SceneStore::with_seed(20, 3),
            Box::new(QueuedLoader::new()),
        )
    }

    fn run(editor: &mut Editor, json: &str) -> CommandResponse {
        execute_json(editor, json).unwrap()
    }

    fn added_id(resp: &CommandResponse) -> String {
        resp.data.as_ref().unwrap()["id"].as_str().unwrap().to_string()
    }

    #[test]
    fn test_command_serde_undo() {
        let json = r#"{"command": "undo"}"#;
        let cmd: AgentCommand = serde_json::from_str(json).unwrap();
        assert!(matches!(cmd, AgentCommand::Undo));
    }

    #[test]
    fn test_command_serde_update_transform_text() {
        let json = r#"{"command": "update_transform", "id": "a", "kind": "scale", "axis": "y", "value": "1.5"}"#;
        let cmd: AgentCommand = serde_json::from_str(json).unwrap();
        match cmd {
            AgentCommand::UpdateTransform {
                kind, axis, value, ..
            } => {
                assert_eq!(kind, TransformKind::Scale);
                assert_eq!(axis, Axis::Y);
                assert_eq!(value, RawValue::Text("1.5".into()));
            }
            _ => panic!("Expected UpdateTransform"),
        }
    }

    #[test]
    fn test_invalid_json() {
        let mut e = editor();
        assert!(execute_json(&mut e, r#"{"command": "fly"}"#).is_err());
    }

    #[test]
    fn test_add_and_inspect() {
        let mut e = editor();
        let resp = run(&mut e, r#"{"command": "add_object", "shape": "torus"}"#);
        assert!(resp.success);
        let id = added_id(&resp);

        let resp = run(&mut e, r#"{"command": "inspect"}"#);
        let data = resp.data.unwrap();
        assert_eq!(data["object_count"], 1);
        assert_eq!(data["objects"][0]["id"], id.as_str());
        assert_eq!(data["objects"][0]["name"], "Torus");
        assert_eq!(data["objects"][0]["selected"], true);
    }

    #[test]
    fn test_add_model_shape_rejected() {
        let mut e = editor();
        let resp = run(&mut e, r#"{"command": "add_object", "shape": "glb"}"#);
        assert!(!resp.success);
        assert!(e.store().snapshot().is_empty());
    }

    #[test]
    fn test_transform_text_coerces() {
        let mut e = editor();
        let id = added_id(&run(&mut e, r#"{"command": "add_object", "shape": "cube"}"#));
        let cmd = format!(
            r#"{{"command": "update_transform", "id": "{id}", "kind": "position", "axis": "x", "value": "not-a-number"}}"#
        );
        assert!(run(&mut e, &cmd).success);
        assert_eq!(e.store().get(&id).unwrap().transform.position[0], 0.0);
    }

    #[test]
    fn test_set_color_invalid() {
        let mut e = editor();
        let id = added_id(&run(&mut e, r#"{"command": "add_object", "shape": "cube"}"#));
        let cmd = format!(r#"{{"command": "set_color", "id": "{id}", "color": "blue-ish"}}"#);
        let resp = run(&mut e, &cmd);
        assert!(!resp.success);
        assert_eq!(e.store().history().len(), 1);
    }

    #[test]
    fn test_boolean_requires_two_selected() {
        let mut e = editor();
        run(&mut e, r#"{"command": "add_object", "shape": "cube"}"#);
        let resp = run(&mut e, r#"{"command": "boolean", "op": "union"}"#);
        assert!(!resp.success);
        assert!(resp.error.unwrap().contains("exactly two"));
    }

    #[test]
    fn test_batch_and_history() {
        let mut e = editor();
        let batch = r#"[
            {"command": "add_object", "shape": "cube"},
            {"command": "add_object", "shape": "star"},
            {"command": "undo"},
            {"command": "history"}
        ]"#;
        let responses = execute_json_batch(&mut e, batch).unwrap();
        assert_eq!(responses.len(), 4);
        assert!(responses.iter().all(|r| r.success));

        let history = responses[3].data.as_ref().unwrap();
        assert_eq!(history["entry_count"], 2);
        assert_eq!(history["entries"][1]["label"], "Add Star");
        assert_eq!(history["entries"][0]["current"], true);
        assert_eq!(e.store().snapshot().len(), 1);
    }

    #[test]
    fn test_restore_unknown_entry() {
        let mut e = editor();
        let resp = run(&mut e, r#"{"command": "restore", "entry": 999}"#);
        assert!(!resp.success);
    }

    #[test]
    fn test_load_and_export_scene() {
        let mut e = editor();
        let scene = serde_json::to_value(crate::fixtures::showcase_scene()).unwrap();
        let cmd = serde_json::json!({ "command": "load_scene", "scene": scene }).to_string();
        assert!(run(&mut e, &cmd).success);
        assert_eq!(e.store().history().latest().unwrap().label, "Import Scene");

        let resp = run(&mut e, r#"{"command": "export_scene"}"#);
        let json = resp.data.unwrap()["scene_json"].as_str().unwrap().to_string();
        let objects: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(objects.as_array().unwrap().len(), e.store().snapshot().len());
    }

    #[test]
    fn test_import_url_unknown_extension() {
        let mut e = editor();
        let resp = run(&mut e, r#"{"command": "import_url", "url": "model.fbx"}"#);
        assert!(!resp.success);
    }
}
