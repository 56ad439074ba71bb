use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use lectern_editor::{check as check_tree, Violation};
use lectern_parser::parse;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Documents to check
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Print a line for documents without issues too
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn check(args: CheckArgs, cwd: &Path) -> Result<()> {
    let mut total_violations = 0;

    for input in &args.inputs {
        let violations = check_file(&cwd.join(input))?;
        if violations.is_empty() {
            if args.verbose {
                println!("{} {}", "✓".green(), input.display());
            }
            continue;
        }

        println!("{} {}", "✗".red(), input.display());
        for violation in &violations {
            println!("   {}", violation);
        }
        total_violations += violations.len();
    }

    println!();
    println!("   Files checked: {}", args.inputs.len());
    if total_violations > 0 {
        println!("   {} {}", "Violations:".red(), total_violations);
        bail!("{} violation(s) found; run `lectern normalize` to settle derived attributes", total_violations);
    }
    println!("   {} No issues found!", "✓".green());
    Ok(())
}

/// Violations in the document as stored, before any settling
fn check_file(path: &Path) -> Result<Vec<Violation>> {
    let source = fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    let tree = parse(&source).with_context(|| format!("cannot parse {}", path.display()))?;
    Ok(check_tree(&tree))
}
