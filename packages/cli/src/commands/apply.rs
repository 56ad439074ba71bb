use super::{open_session, write_document};
use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use lectern_editor::Command;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Document to edit
    pub input: PathBuf,

    /// JSON file holding an array of commands
    #[arg(short, long)]
    pub script: PathBuf,

    /// Write the result here instead of over the input
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Keep going after a command fails
    #[arg(long)]
    pub keep_going: bool,
}

pub async fn apply(args: ApplyArgs, cwd: &Path) -> Result<()> {
    let script_path = cwd.join(&args.script);
    let script = fs::read_to_string(&script_path).with_context(|| format!("cannot read {}", script_path.display()))?;
    let commands: Vec<Command> =
        serde_json::from_str(&script).with_context(|| format!("invalid command script {}", script_path.display()))?;

    let mut session = open_session(&args.input, cwd)?;
    println!("{} {} command(s) on {}", "Applying".green().bold(), commands.len(), args.input.display());

    let mut failures = 0;
    for (index, command) in commands.into_iter().enumerate() {
        let name = command.name();
        let outcome = session.execute(command).await;
        if outcome.success {
            println!("   {} {} {}", "✓".green(), index + 1, name);
            continue;
        }

        failures += 1;
        println!(
            "   {} {} {}: {}",
            "✗".red(),
            index + 1,
            name,
            outcome.error.as_deref().unwrap_or("failed")
        );
        if !args.keep_going {
            bail!("command {} ({}) failed; document left unchanged on disk", index + 1, name);
        }
    }

    let version = session.version();
    let target = write_document(session, args.out.as_ref(), cwd)?;
    tracing::info!(path = %target.display(), version, failures, "applied command script");
    println!("✨ {} {} (version {})", "Wrote".green().bold(), target.display(), version);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("doc.html"), "<p>hello</p>").unwrap();
        fs::write(
            dir.path().join("script.json"),
            r#"[
                { "command": "select", "path": [0], "from": 0, "to": 5 },
                { "command": "toggleBulletList" },
                { "command": "insertTable", "rows": 1, "cols": 1 }
            ]"#,
        )
        .unwrap();

        apply(
            ApplyArgs {
                input: PathBuf::from("doc.html"),
                script: PathBuf::from("script.json"),
                out: Some(PathBuf::from("out.html")),
                keep_going: false,
            },
            dir.path(),
        )
        .await
        .unwrap();

        assert_eq!(fs::read_to_string(dir.path().join("doc.html")).unwrap(), "<p>hello</p>");
        let written = fs::read_to_string(dir.path().join("out.html")).unwrap();
        assert!(written.starts_with("<ul><li><p>hello</p><table>"), "{}", written);
    }

    #[tokio::test]
    async fn test_failed_command_stops_script() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("doc.html"), "<p>hello</p>").unwrap();
        fs::write(
            dir.path().join("script.json"),
            r#"[{ "command": "setCellBackground", "color": "red" }]"#,
        )
        .unwrap();

        let result = apply(
            ApplyArgs {
                input: PathBuf::from("doc.html"),
                script: PathBuf::from("script.json"),
                out: None,
                keep_going: false,
            },
            dir.path(),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(fs::read_to_string(dir.path().join("doc.html")).unwrap(), "<p>hello</p>");
    }
}
