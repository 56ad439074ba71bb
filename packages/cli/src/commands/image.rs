use super::{open_session, parse_node_path, write_document};
use anyhow::{anyhow, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;
use lectern_editor::{EditSession, MirrorAxis, RasterOutcome, RotateDirection};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Direction {
    Left,
    Right,
}

impl From<Direction> for RotateDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Left => RotateDirection::Left,
            Direction::Right => RotateDirection::Right,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl From<Axis> for MirrorAxis {
    fn from(axis: Axis) -> Self {
        match axis {
            Axis::Horizontal => MirrorAxis::Horizontal,
            Axis::Vertical => MirrorAxis::Vertical,
        }
    }
}

#[derive(Args, Debug)]
pub struct RotateArgs {
    /// Document holding the image
    pub input: PathBuf,

    /// Child-index path of the image, e.g. `2.0`
    #[arg(short, long)]
    pub path: String,

    #[arg(short, long, value_enum, default_value = "right")]
    pub direction: Direction,

    /// Write the result here instead of over the input
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct MirrorArgs {
    /// Document holding the image
    pub input: PathBuf,

    /// Child-index path of the image, e.g. `2.0`
    #[arg(short, long)]
    pub path: String,

    #[arg(short, long, value_enum, default_value = "horizontal")]
    pub axis: Axis,

    /// Write the result here instead of over the input
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

pub async fn rotate(args: RotateArgs, cwd: &Path) -> Result<()> {
    let mut session = select_image(&args.input, &args.path, cwd)?;
    let outcome = session.rotate_image(args.direction.into()).await?;
    finish(session, outcome, "Rotated", args.out.as_ref(), cwd)
}

pub async fn mirror(args: MirrorArgs, cwd: &Path) -> Result<()> {
    let mut session = select_image(&args.input, &args.path, cwd)?;
    let outcome = session.mirror_image(args.axis.into()).await?;
    finish(session, outcome, "Mirrored", args.out.as_ref(), cwd)
}

fn select_image(input: &Path, path: &str, cwd: &Path) -> Result<EditSession> {
    let mut session = open_session(input, cwd)?;
    session.select_path(&parse_node_path(path)?, None, None)?;
    Ok(session)
}

fn finish(
    session: EditSession,
    outcome: RasterOutcome,
    verb: &str,
    out: Option<&PathBuf>,
    cwd: &Path,
) -> Result<()> {
    match outcome {
        RasterOutcome::Applied { .. } => {
            let target = write_document(session, out, cwd)?;
            println!("{} {}", verb.green().bold(), target.display());
            Ok(())
        }
        RasterOutcome::Discarded => Err(anyhow!("image changed while it was being processed")),
    }
}
