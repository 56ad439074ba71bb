pub mod apply;
pub mod check;
pub mod image;
pub mod normalize;

pub use apply::{apply, ApplyArgs};
pub use check::{check, CheckArgs};
pub use image::{mirror, rotate, MirrorArgs, RotateArgs};
pub use normalize::{normalize, NormalizeArgs};

use crate::config::Config;
use anyhow::{Context, Result};
use lectern_editor::{Document, EditSession};
use std::path::{Path, PathBuf};

/// Load `input` into an edit session configured from `cwd`
pub(crate) fn open_session(input: &Path, cwd: &Path) -> Result<EditSession> {
    let config = Config::load(cwd)?;
    let path = cwd.join(input);
    let document = Document::load(path.clone()).with_context(|| format!("cannot open {}", path.display()))?;
    let assets = config.asset_store(cwd, input);
    Ok(EditSession::with_config(session_id(&path), document, config.editor).with_assets(assets))
}

fn session_id(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

/// Write the session's document to `out`, or back to its own file
pub(crate) fn write_document(session: EditSession, out: Option<&PathBuf>, cwd: &Path) -> Result<PathBuf> {
    let mut document = session.into_document();
    match out {
        Some(out) => {
            let target = cwd.join(out);
            std::fs::write(&target, document.source())
                .with_context(|| format!("cannot write {}", target.display()))?;
            Ok(target)
        }
        None => {
            document.save()?;
            Ok(document.path.clone())
        }
    }
}

/// Parse a node path like `2.0.1` (child indices from the root)
pub(crate) fn parse_node_path(raw: &str) -> Result<Vec<usize>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    raw.split('.')
        .map(|part| {
            part.trim()
                .parse::<usize>()
                .with_context(|| format!("invalid node path {:?}", raw))
        })
        .collect()
}
