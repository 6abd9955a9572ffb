pub mod scene;
pub mod selection;
pub mod settings;

use serde::{Deserialize, Serialize};

pub use scene::{
    ExtrusionSetting, HistoryLog, MirrorSetting, ObjectField, SceneStore, TransformKind,
};
pub use selection::SelectionState;
pub use settings::{EditorSettings, HistorySettings};

/// Active pointer tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// Clicks only select; dragging orbits the camera
    Select,
    /// Clicking a selected object starts a drag
    #[default]
    Move,
}
