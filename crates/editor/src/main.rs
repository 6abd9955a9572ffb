use std::path::{Path, PathBuf};
use std::time::Duration;

use scene_editor::command::execute_json_batch;
use scene_editor::state::{EditorSettings, SceneStore};
use scene_editor::viewport::loader::FileLoader;
use scene_editor::Editor;

/// Upper bound on waiting for referenced models before exporting
const LOAD_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Default)]
struct Args {
    scene: Option<PathBuf>,
    script: Option<PathBuf>,
    export: Option<PathBuf>,
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        let slot = match arg.as_str() {
            "--scene" => &mut args.scene,
            "--script" => &mut args.script,
            "--export" => &mut args.export,
            other => {
                tracing::warn!("ignoring unknown argument {other}");
                continue;
            }
        };
        match it.next() {
            Some(value) => *slot = Some(PathBuf::from(value)),
            None => tracing::error!("{arg} needs a path"),
        }
    }
    args
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scene_editor=info".into()),
        )
        .init();

    let args = parse_args();
    let settings = EditorSettings::load();
    let loader = FileLoader::new(tokio::runtime::Handle::current());
    let mut editor = Editor::new(settings, Box::new(loader));

    match &args.scene {
        Some(path) => open_scene(&mut editor, path),
        None => {
            if let Some(objects) = SceneStore::load_autosave() {
                tracing::info!("Restored autosave ({} objects)", objects.len());
                editor.edit(|s| s.set_scene(objects));
            }
        }
    }

    if let Some(path) = &args.script {
        run_script(&mut editor, path);
    }

    wait_for_loads(&mut editor).await;
    for notice in editor.take_notices() {
        tracing::info!("{:?}: {}", notice.level, notice.message);
    }

    if let Some(path) = &args.export {
        export(&editor, path);
    }

    editor.store().autosave();
}

fn open_scene(editor: &mut Editor, path: &Path) {
    match std::fs::read(path) {
        Ok(bytes) => {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if editor.import_file(&name, &bytes).is_ok() {
                tracing::info!(
                    "Loaded {} ({} objects)",
                    path.display(),
                    editor.store().snapshot().len()
                );
            }
        }
        Err(e) => tracing::error!("Failed to read scene file {}: {e}", path.display()),
    }
}

fn run_script(editor: &mut Editor, path: &Path) {
    let json = match std::fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to read script {}: {e}", path.display());
            return;
        }
    };
    match execute_json_batch(editor, &json) {
        Ok(responses) => {
            for (i, response) in responses.iter().enumerate() {
                match serde_json::to_string(response) {
                    Ok(line) => println!("{line}"),
                    Err(e) => tracing::error!("Failed to encode response {i}: {e}"),
                }
            }
        }
        Err(e) => tracing::error!("{e}"),
    }
}

async fn wait_for_loads(editor: &mut Editor) {
    let started = tokio::time::Instant::now();
    editor.tick();
    while editor.loads_pending() {
        if started.elapsed() > LOAD_TIMEOUT {
            tracing::warn!("Gave up waiting for model loads");
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        editor.tick();
    }
}

fn export(editor: &Editor, path: &Path) {
    let is_glb = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("glb"));
    let bytes = if is_glb {
        editor.export_glb()
    } else {
        match editor.export_scene_json() {
            Ok(json) => json.into_bytes(),
            Err(e) => {
                tracing::error!("Failed to serialize scene: {e}");
                return;
            }
        }
    };
    match std::fs::write(path, bytes) {
        Ok(()) => tracing::info!("Exported {}", path.display()),
        Err(e) => tracing::error!("Failed to write {}: {e}", path.display()),
    }
}
