use std::path::Path;
use std::process::{Command, ExitStatus};

use crate::error::{Result, SyncError, io_err};
use crate::store::PageStore;

/// Opens the cached script of `page_id` in `editor`.
///
/// `editor` may carry arguments (`"code --wait"`); the script path is
/// appended last.
pub fn open_page_script(store: &PageStore, editor: &str, page_id: &str) -> Result<ExitStatus> {
    let script_path = store.script_path(page_id)?;
    if !script_path.is_file() {
        return Err(io_err(
            &script_path,
            std::io::Error::from(std::io::ErrorKind::NotFound),
        ));
    }
    launch(editor, &script_path)
}

fn launch(editor: &str, path: &Path) -> Result<ExitStatus> {
    let mut parts = editor.split_whitespace();
    let program = parts.next().ok_or_else(|| SyncError::Editor {
        editor: editor.to_string(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty editor command"),
    })?;

    tracing::debug!("launching {editor} {}", path.display());
    Command::new(program)
        .args(parts)
        .arg(path)
        .status()
        .map_err(|source| SyncError::Editor {
            editor: editor.to_string(),
            source,
        })
}
