use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use lectern_editor::Document;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct NormalizeArgs {
    /// Document to normalize
    pub input: PathBuf,

    /// Print the normalized document instead of rewriting the file
    #[arg(long)]
    pub stdout: bool,
}

pub fn normalize(args: NormalizeArgs, cwd: &Path) -> Result<()> {
    let path = cwd.join(&args.input);
    let original = fs::read_to_string(&path).with_context(|| format!("cannot read {}", path.display()))?;
    let document = Document::from_source(path.clone(), &original)?;
    let normalized = document.source();

    if args.stdout {
        println!("{}", normalized);
        return Ok(());
    }

    if normalized == original {
        println!("{} {} already normalized", "✓".green(), args.input.display());
        return Ok(());
    }

    fs::write(&path, &normalized).with_context(|| format!("cannot write {}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = normalized.len(), "normalized document");
    println!("{} {}", "Normalized".green().bold(), args.input.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_rewrites_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("doc.html");
        fs::write(&file, "<ul><li><p><b>bold</b></p></li></ul>").unwrap();

        normalize(
            NormalizeArgs {
                input: PathBuf::from("doc.html"),
                stdout: false,
            },
            dir.path(),
        )
        .unwrap();

        assert_eq!(
            fs::read_to_string(&file).unwrap(),
            r#"<ul><li data-marker-bold="true"><p><strong>bold</strong></p></li></ul>"#
        );
    }
}
